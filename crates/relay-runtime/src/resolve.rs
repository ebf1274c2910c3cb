//! Component resolution.
//!
//! A dotted component name `pkg.counter` is looked up in each search path in
//! order, first as `<path>/pkg/counter.<ext>`, then as the package entry
//! point `<path>/pkg/counter/mod.<ext>`.

use std::path::{Path, PathBuf};

use relay_engine::{ModuleSource, SourceFile, VmError};

/// Default component file extension
pub const DEFAULT_EXTENSION: &str = "rly";

/// Entry point of a directory component
const PACKAGE_ENTRY: &str = "mod";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid component name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("component '{name}' not found (searched {})", display_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    /// The component name that failed to resolve.
    pub fn component(&self) -> &str {
        match self {
            ResolveError::InvalidName { name, .. }
            | ResolveError::NotFound { name, .. }
            | ResolveError::Io { name, .. } => name,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps component names to source files on disk.
#[derive(Debug, Clone)]
pub struct ComponentResolver {
    paths: Vec<PathBuf>,
    extension: String,
}

impl ComponentResolver {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Use `extension` (without the leading dot) for component files.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Find the file a component name refers to.
    pub fn locate(&self, name: &str) -> Result<PathBuf, ResolveError> {
        let segments = validate_name(name)?;
        let mut searched = Vec::new();

        for root in &self.paths {
            let mut base = root.clone();
            base.extend(&segments);

            let file = base.with_extension(&self.extension);
            if file.is_file() {
                return Ok(file);
            }
            searched.push(file);

            let entry = base.join(PACKAGE_ENTRY).with_extension(&self.extension);
            if entry.is_file() {
                return Ok(entry);
            }
            searched.push(entry);
        }

        Err(ResolveError::NotFound {
            name: name.to_string(),
            searched,
        })
    }

    /// Locate and read a component.
    pub fn load_source(&self, name: &str) -> Result<SourceFile, ResolveError> {
        let path = self.locate(name)?;
        let text = read_source(&path).map_err(|source| ResolveError::Io {
            name: name.to_string(),
            path: path.clone(),
            source,
        })?;
        tracing::debug!(component = name, path = %path.display(), "resolved component");
        Ok(SourceFile::new(name, path.display().to_string(), text))
    }
}

impl ModuleSource for ComponentResolver {
    fn resolve(&self, name: &str) -> Result<SourceFile, VmError> {
        self.load_source(name).map_err(|e| VmError::Import(e.to_string()))
    }
}

fn read_source(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

/// Split a dotted name into path segments, rejecting anything that could
/// escape a search path.
fn validate_name(name: &str) -> Result<Vec<&str>, ResolveError> {
    let invalid = |reason| ResolveError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    let segments: Vec<&str> = name.split('.').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(invalid("empty name segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid("segments may only contain letters, digits, '_' and '-'"));
        }
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, relative: &str, text: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_dotted_names_map_to_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pkg/counter.rly", "let x = 1;");
        write(dir.path(), "shapes/mod.rly", "let y = 2;");

        let resolver = ComponentResolver::new(vec![dir.path().to_path_buf()]);
        assert_eq!(
            resolver.locate("pkg.counter").unwrap(),
            dir.path().join("pkg/counter.rly")
        );
        assert_eq!(
            resolver.locate("shapes").unwrap(),
            dir.path().join("shapes/mod.rly")
        );

        let source = resolver.load_source("pkg.counter").unwrap();
        assert_eq!(source.name, "pkg.counter");
        assert_eq!(source.text, "let x = 1;");
    }

    #[test]
    fn test_search_paths_are_tried_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), "a.rly", "first");
        write(second.path(), "a.rly", "second");
        write(second.path(), "b.rly", "only second");

        let resolver = ComponentResolver::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(resolver.load_source("a").unwrap().text, "first");
        assert_eq!(resolver.load_source("b").unwrap().text, "only second");
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "calc.relay", "let x = 1;");
        let resolver = ComponentResolver::new(vec![dir.path().to_path_buf()]).with_extension(".relay");
        assert_eq!(resolver.extension(), "relay");
        assert!(resolver.locate("calc").is_ok());
    }

    #[test]
    fn test_rejects_bad_names() {
        let resolver = ComponentResolver::new(vec![PathBuf::from(".")]);
        for name in ["", "a..b", ".a", "a/b", "..", "a\\b", "a b"] {
            assert!(
                matches!(resolver.locate(name), Err(ResolveError::InvalidName { .. })),
                "accepted {:?}",
                name
            );
        }
    }

    #[test]
    fn test_not_found_lists_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ComponentResolver::new(vec![dir.path().to_path_buf()]);
        let err = resolver.locate("missing").unwrap_err();
        assert_eq!(err.component(), "missing");
        let message = err.to_string();
        assert!(message.contains("missing.rly"), "{}", message);
        assert!(message.contains("mod.rly"), "{}", message);
    }
}
