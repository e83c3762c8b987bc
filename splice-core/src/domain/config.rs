//! Config domain types
//!
//! A config is a persisted, versioned specification of one pipeline step.
//! Repairs never mutate an existing revision; they produce the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields shared by every config variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMeta {
    /// Stable across repairs of the same logical step
    pub id: String,
    /// Starts at 1, incremented by every repair or upsert
    #[serde(default = "first_revision")]
    pub revision: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Natural-language description of what the step should achieve
    #[serde(default)]
    pub instruction: String,
}

fn first_revision() -> u32 {
    1
}

impl ConfigMeta {
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            revision: 1,
            created_at: now,
            updated_at: now,
            instruction: instruction.into(),
        }
    }
}

/// HTTP method used by an API config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the call executor walks through paged responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationKind {
    /// `{offset}` advances by `page_size` on every request
    OffsetBased,
    /// `{page}` starts at 1 and advances by one on every request
    PageBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub kind: PaginationKind,
    pub page_size: u32,
}

/// Specification of an outbound HTTP call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten)]
    pub meta: ConfigMeta,
    pub url_host: String,
    #[serde(default)]
    pub url_path: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    /// JSONPath selecting the payload inside the response body
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub response_schema: Option<Value>,
    #[serde(default)]
    pub documentation_url: Option<String>,
}

/// Where an extraction reads its raw data from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractSource {
    /// The output of the previous step, or the caller's input
    #[default]
    Input,
    /// A JSON document fetched over HTTP
    Http {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

/// Specification of a sub-value extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(flatten)]
    pub meta: ConfigMeta,
    #[serde(default)]
    pub source: ExtractSource,
    /// JSONPath selector; empty until generated
    #[serde(default)]
    pub selector: String,
    pub schema: Value,
}

/// Specification of a shape-to-shape mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(flatten)]
    pub meta: ConfigMeta,
    /// Lua mapping expression evaluated against `input`; empty until generated
    #[serde(default)]
    pub expression: String,
    pub schema: Value,
}

/// Discriminant of the config variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKind {
    Api,
    Extract,
    Transform,
}

impl ConfigKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Api => "api",
            ConfigKind::Extract => "extract",
            ConfigKind::Transform => "transform",
        }
    }
}

impl std::fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfigKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(ConfigKind::Api),
            "extract" => Ok(ConfigKind::Extract),
            "transform" => Ok(ConfigKind::Transform),
            other => Err(format!("unknown config kind '{}'", other)),
        }
    }
}

/// Any persisted step specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Config {
    Api(ApiConfig),
    Extract(ExtractConfig),
    Transform(TransformConfig),
}

impl Config {
    pub fn kind(&self) -> ConfigKind {
        match self {
            Config::Api(_) => ConfigKind::Api,
            Config::Extract(_) => ConfigKind::Extract,
            Config::Transform(_) => ConfigKind::Transform,
        }
    }

    pub fn meta(&self) -> &ConfigMeta {
        match self {
            Config::Api(c) => &c.meta,
            Config::Extract(c) => &c.meta,
            Config::Transform(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ConfigMeta {
        match self {
            Config::Api(c) => &mut c.meta,
            Config::Extract(c) => &mut c.meta,
            Config::Transform(c) => &mut c.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn revision(&self) -> u32 {
        self.meta().revision
    }

    /// Copy of this config as the next revision
    pub fn next_revision(&self) -> Self {
        let mut next = self.clone();
        let meta = next.meta_mut();
        meta.revision += 1;
        meta.updated_at = Utc::now();
        next
    }
}

impl From<ApiConfig> for Config {
    fn from(config: ApiConfig) -> Self {
        Config::Api(config)
    }
}

impl From<ExtractConfig> for Config {
    fn from(config: ExtractConfig) -> Self {
        Config::Extract(config)
    }
}

impl From<TransformConfig> for Config {
    fn from(config: TransformConfig) -> Self {
        Config::Transform(config)
    }
}
