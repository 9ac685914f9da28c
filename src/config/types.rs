use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on request bodies; larger uploads are answered with 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name reported by the health check.
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Location of the ONNX weights.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Edge length of the square model input.
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_post_process_mask")]
    pub post_process_mask: bool,
    #[serde(default)]
    pub intra_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            path: None,
            input_size: default_input_size(),
            post_process_mask: default_post_process_mask(),
            intra_threads: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_name() -> String {
    "silueta".to_string()
}

fn default_input_size() -> u32 {
    320
}

fn default_post_process_mask() -> bool {
    true
}
