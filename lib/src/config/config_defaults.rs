// lib/src/config/config_defaults.rs

use std::path::PathBuf;

use super::config_structs::StorageEngineType;

pub const DEFAULT_CONFIG_FILE: &str = "clinic.yaml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8082;
pub const DEFAULT_DATA_DIRECTORY: &str = "./data";
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_CHAT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_APPEND_RETRIES: u32 = 8;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// Development-only secret; `load_config` warns when it is still in use.
pub const DEFAULT_JWT_SECRET: &str = "change-me-development-secret-at-least-32-bytes";

pub fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
pub fn default_port() -> u16 {
    DEFAULT_PORT
}
pub fn default_cors_origins() -> Vec<String> {
    Vec::new()
}
pub fn default_storage_engine_type() -> StorageEngineType {
    StorageEngineType::Sled
}
pub fn default_data_directory() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIRECTORY)
}
pub fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}
pub fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}
pub fn default_chat_poll_interval_secs() -> u64 {
    DEFAULT_CHAT_POLL_INTERVAL_SECS
}
pub fn default_max_append_retries() -> u32 {
    DEFAULT_MAX_APPEND_RETRIES
}
pub fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}
pub fn default_token_ttl_hours() -> i64 {
    DEFAULT_TOKEN_TTL_HOURS
}
