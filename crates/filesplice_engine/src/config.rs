use serde::Deserialize;
use tracing::{debug, instrument};

use filesplice_base::{FilePath, PalHandle, ResultExt, SpliceResult};

use crate::cache::{CachePolicy, DEFAULT_MAX_RAM_CACHE_SIZE, DiskCache};

/// Configuration read from `filesplice.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct SpliceConfig {
    /// How insert and cut hold the shifted tail.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// The `[cache]` table.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Cache file used to spill the tail. Without it the tail is held in memory.
    pub disk_cache_path: Option<String>,
    /// Largest chunk moved through memory at once when a cache file is used.
    #[serde(default = "default_max_ram_cache_size")]
    pub max_ram_cache_size: u64,
}

fn default_max_ram_cache_size() -> u64 {
    DEFAULT_MAX_RAM_CACHE_SIZE
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            disk_cache_path: None,
            max_ram_cache_size: DEFAULT_MAX_RAM_CACHE_SIZE,
        }
    }
}

impl SpliceConfig {
    /// The cache policy described by this config, with the cache file resolved through `pal`.
    pub fn cache_policy(&self, pal: &PalHandle) -> CachePolicy {
        match &self.cache.disk_cache_path {
            Some(path) => CachePolicy::Disk(DiskCache::new(
                pal.clone(),
                FilePath::from(path.as_str()),
                self.cache.max_ram_cache_size,
            )),
            None => CachePolicy::Memory,
        }
    }
}

/// Parse a TOML config document.
pub fn parse_config(source: &str) -> SpliceResult<SpliceConfig> {
    let config: SpliceConfig =
        toml::from_str(source).map_err(|e| filesplice_base::err!("Invalid config: {}", e))?;
    if config.cache.max_ram_cache_size == 0 {
        return Err(filesplice_base::err!(
            "Invalid config: max_ram_cache_size must be greater than zero"
        ));
    }
    Ok(config)
}

/// Load the config at `path`. A missing file yields the default config.
#[instrument(skip(pal), fields(path = %path))]
pub fn load_config(pal: &PalHandle, path: &FilePath) -> SpliceResult<SpliceConfig> {
    if !pal.file_properties(path)?.exists {
        debug!("no config file, using defaults");
        return Ok(SpliceConfig::default());
    }
    let source = pal.read_file_to_string(path)?;
    parse_config(&source).with_context(|| format!("Failed to load config from {}", path))
}
