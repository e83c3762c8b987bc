use splice_engine::SpliceService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: SpliceService,
}

impl AppState {
    pub fn new(service: SpliceService) -> Self {
        Self { service }
    }
}
