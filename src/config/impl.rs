use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::{DEFAULT_CONFIG_PATH, StaticConfig};

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults when
/// [`init_config`] was never called.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration from `path` (or `geoipd.toml`).
///
/// If the file doesn't exist, uses in-memory defaults overlaid with
/// `GEOIPD__*` environment variables. Later calls are no-ops.
pub fn init_config(path: Option<&str>) {
    CONFIG.get_or_init(|| {
        ArcSwap::from_pointee(StaticConfig::load(path.unwrap_or(DEFAULT_CONFIG_PATH)))
    });
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn update_config<F>(f: F)
where
    F: FnOnce(&mut StaticConfig),
{
    let swap = CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()));
    let mut next = (*swap.load_full()).clone();
    f(&mut next);
    swap.store(Arc::new(next));
}
