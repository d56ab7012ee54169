//! Configuration: JSON file plus environment overrides.

pub mod loader;
pub mod schema;

pub use loader::{apply_env_overrides, load_config, load_with_env, save_config};
pub use schema::{Config, MockFallback, ProviderEntry, ProvidersConfig};
