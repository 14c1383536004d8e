pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use config::{
    CONFIG_FILE, DATA_DIR_ENV, default_base_dir, load_config, load_config_file, parse_config,
    resolve_data_dir,
};
pub use error::{Result, StoreError};
pub use store::{SessionRecord, Store};

pub const DB_FILE: &str = "breathwave.db";
