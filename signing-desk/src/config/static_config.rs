//! Startup configuration for the signing desk.
//! Read once when the service starts; changing any of it requires a restart.

use serde::Deserialize;

/// Complete desk configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeskConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_backend")]
    pub backend: BackendConfig,

    #[serde(default = "default_workspace")]
    pub workspace: WorkspaceConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            backend: default_backend(),
            workspace: default_workspace(),
            limits: default_limits(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Signing backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the PDF signing API. Defaults to the local development backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Field placement and signature pad settings
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Signature field size in rendered pixels
    #[serde(default = "default_field_width")]
    pub field_width: f64,
    #[serde(default = "default_field_height")]
    pub field_height: f64,

    /// Drawing surface size in pixels
    #[serde(default = "default_pad_width")]
    pub pad_width: u32,
    #[serde(default = "default_pad_height")]
    pub pad_height: u32,

    #[serde(default = "default_pen_width")]
    pub pen_width: f32,

    /// Locale for labels and error messages
    #[serde(default = "default_locale")]
    pub locale: String,
}

/// Upload limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_backend() -> BackendConfig {
    BackendConfig {
        api_url: default_api_url(),
        timeout_secs: default_timeout_secs(),
    }
}

pub(crate) fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

pub(crate) fn default_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_workspace() -> WorkspaceConfig {
    WorkspaceConfig {
        field_width: default_field_width(),
        field_height: default_field_height(),
        pad_width: default_pad_width(),
        pad_height: default_pad_height(),
        pen_width: default_pen_width(),
        locale: default_locale(),
    }
}

pub(crate) fn default_field_width() -> f64 {
    200.0
}

pub(crate) fn default_field_height() -> f64 {
    60.0
}

pub(crate) fn default_pad_width() -> u32 {
    500
}

pub(crate) fn default_pad_height() -> u32 {
    200
}

pub(crate) fn default_pen_width() -> f32 {
    2.5
}

pub(crate) fn default_locale() -> String {
    "en".to_string()
}

pub(crate) fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_upload_bytes: default_max_upload_bytes(),
    }
}

pub(crate) fn default_max_upload_bytes() -> u64 {
    25 * 1024 * 1024
}
