pub mod config;
pub mod export;
pub mod record;

pub use config::{load_engine_config, load_engine_config_from_env, ConfigError, EngineConfig};
pub use export::{encode_csv, export_filename, CSV_HEADERS};
pub use record::{BusinessRecord, SessionMetrics};
