//! Configuration.
//!
//! Resolved from tiers, lowest priority first, merged field by field:
//! 1. **Defaults** - compiled in
//! 2. **User** - `~/.todo-cache/config.yaml`
//! 3. **Project** - `$CWD/todo-cache/config.yaml`
//! 4. **Environment** - variables below
//!
//! An explicit file (`--config` or `TODO_CACHE_CONFIG_PATH`) replaces tiers
//! 2 and 3.
//!
//! ## Environment Variables
//! - `TODO_CACHE_CONFIG_PATH` - Explicit config file
//! - `TODO_CACHE_DATA_DIR` - Storage directory
//! - `TODO_CACHE_STALE_SECS` - Cache freshness window in seconds, for hosts that keep the cache across reads
//! - `TODO_CACHE_REQUIRE_AUTH` - `true`/`false`
//! - `TODO_CACHE_USER_DIR` - User config dir (default: `~/.todo-cache`)
//! - `TODO_CACHE_PROJECT_DIR` - Project config dir (default: `./todo-cache`)

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigPaths};
pub use types::*;
