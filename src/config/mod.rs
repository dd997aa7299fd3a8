pub mod schema;

pub use schema::{config_dir, Config, MemoryConfig, StoreConfig};
