//! Script host - the page surface third-party integrations are installed into
//!
//! Vendors expect a script tag plus one or more globals (a command queue,
//! a function reference). Hosts implement [`ScriptHost`] over the real page;
//! [`MemoryScriptHost`] keeps everything in memory for headless use and tests.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

pub trait ScriptHost: Send + Sync {
    /// Append an external script to the page
    fn inject_script(&self, src: &str);

    /// Remove injected scripts whose source starts with `src_prefix`.
    ///
    /// Returns how many were removed.
    fn remove_scripts(&self, src_prefix: &str) -> usize;

    /// Install or replace a global hook
    fn set_global(&self, name: &str, value: Value);

    fn global(&self, name: &str) -> Option<Value>;

    /// Remove a global hook; `false` when it was not installed
    fn remove_global(&self, name: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryScriptHost {
    scripts: RwLock<Vec<String>>,
    globals: RwLock<BTreeMap<String, Value>>,
}

impl MemoryScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources of every injected script, in injection order
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.read().clone()
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.read().keys().cloned().collect()
    }
}

impl ScriptHost for MemoryScriptHost {
    fn inject_script(&self, src: &str) {
        self.scripts.write().push(src.to_string());
    }

    fn remove_scripts(&self, src_prefix: &str) -> usize {
        let mut scripts = self.scripts.write();
        let before = scripts.len();
        scripts.retain(|s| !s.starts_with(src_prefix));
        before - scripts.len()
    }

    fn set_global(&self, name: &str, value: Value) {
        self.globals.write().insert(name.to_string(), value);
    }

    fn global(&self, name: &str) -> Option<Value> {
        self.globals.read().get(name).cloned()
    }

    fn remove_global(&self, name: &str) -> bool {
        self.globals.write().remove(name).is_some()
    }
}
