pub mod cache;
pub mod config;
pub mod file;
pub mod splice;

pub use cache::{CachePolicy, DEFAULT_MAX_RAM_CACHE_SIZE, DiskCache};
pub use config::{CacheConfig, SpliceConfig, load_config, parse_config};
pub use file::{
    APPEND, READ, SpliceFile, WRITE, create_file, delete_file, file_properties, parse_open_mode,
    rename_file, resize_path, size_of,
};
pub use splice::{cut, insert};
