pub mod csv_throttle_repository;
pub mod file_audit_sink;
pub mod json_cookie_store;
pub mod paths;
pub mod storage;
pub mod toml_settings_repository;

pub use crate::csv_throttle_repository::CsvThrottleRepository;
pub use crate::file_audit_sink::FileAuditSink;
pub use crate::json_cookie_store::JsonCookieStore;
pub use crate::paths::ShopdeskPaths;
pub use crate::toml_settings_repository::TomlSettingsRepository;
