//! Process-wide driver registry.
//!
//! ```rust,ignore
//! asql_core::register("sqlite", Arc::new(SqliteDriver::new()));
//! let conn = Connection::open("sqlite", "file::memory:").await?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::driver::Driver;

static DRIVERS: LazyLock<RwLock<HashMap<String, Arc<dyn Driver>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a driver under `name`, replacing any driver registered before.
pub fn register(name: impl Into<String>, driver: Arc<dyn Driver>) {
    let name = name.into();
    debug!(driver = %name, "registering driver");
    DRIVERS.write().insert(name, driver);
}

/// Look up a registered driver.
pub fn lookup(name: &str) -> Option<Arc<dyn Driver>> {
    DRIVERS.read().get(name).cloned()
}

/// Names of all registered drivers, sorted.
pub fn drivers() -> Vec<String> {
    let mut names: Vec<String> = DRIVERS.read().keys().cloned().collect();
    names.sort();
    names
}
