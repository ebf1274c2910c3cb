//! Module sources and import bookkeeping

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::vm::{Module, VmError};

/// Source text of a module and where it came from.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Dotted module name (`pkg.counter`)
    pub name: String,
    /// Path or other origin description, for diagnostics
    pub origin: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            text: text.into(),
        }
    }

    /// Source that did not come from a file.
    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, "<inline>", text)
    }
}

/// Resolves dotted module names to source text for `import`.
pub trait ModuleSource: Send + Sync {
    fn resolve(&self, name: &str) -> Result<SourceFile, VmError>;
}

/// Per-load import state: the resolver, modules loaded so far, and the
/// chain of modules currently being loaded (for cycle detection).
pub struct ImportContext {
    source: Arc<dyn ModuleSource>,
    cache: FxHashMap<String, Arc<Module>>,
    loading: Vec<String>,
}

impl ImportContext {
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self {
            source,
            cache: FxHashMap::default(),
            loading: Vec::new(),
        }
    }

    pub fn cached(&self, name: &str) -> Option<Arc<Module>> {
        self.cache.get(name).cloned()
    }

    /// Mark `name` as being loaded; fails if it is already on the chain.
    pub fn begin(&mut self, name: &str) -> Result<(), VmError> {
        if self.loading.iter().any(|n| n == name) {
            let mut chain = self.loading.clone();
            chain.push(name.to_string());
            return Err(VmError::Import(format!(
                "import cycle: {}",
                chain.join(" -> ")
            )));
        }
        self.loading.push(name.to_string());
        Ok(())
    }

    /// Pop `name` off the loading chain, caching the module on success.
    pub fn finish(&mut self, name: &str, module: Option<Arc<Module>>) {
        if let Some(pos) = self.loading.iter().rposition(|n| n == name) {
            self.loading.remove(pos);
        }
        if let Some(module) = module {
            self.cache.insert(name.to_string(), module);
        }
    }

    pub fn resolve(&self, name: &str) -> Result<SourceFile, VmError> {
        self.source.resolve(name)
    }

    /// Names of modules imported so far.
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ImportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportContext")
            .field("cached", &self.loaded())
            .field("loading", &self.loading)
            .finish()
    }
}
