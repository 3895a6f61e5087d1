//! Source file discovery and loading.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

use super::{parse_source, Language, SourceUnit};
use crate::error::{CoreError, CoreResult};

/// Find analysable source files under `root`, sorted by path.
///
/// Honours `.gitignore` and skips hidden files and directories.
pub fn discover_sources(root: &Path) -> CoreResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CoreError::Config(format!(
            "source directory not found: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkBuilder::new(root).hidden(true).git_ignore(true).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.into_path();
        if let Some(language) = Language::from_path(&path) {
            if language.accepts(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "Discovered source files");
    Ok(files)
}

/// Read and parse one file. The unit's path is made relative to `root`.
pub fn load_unit(root: &Path, path: &Path) -> CoreResult<SourceUnit> {
    let language = Language::from_path(path)
        .ok_or_else(|| CoreError::UnsupportedLanguage(path.display().to_string()))?;

    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let content = std::fs::read_to_string(path)?;
    parse_source(language, &relative, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::create_dir_all(root.join(".venv")).unwrap();
        std::fs::write(root.join("pkg/b.py"), "").unwrap();
        std::fs::write(root.join("a.py"), "").unwrap();
        std::fs::write(root.join("pkg/store.go"), "package pkg\n").unwrap();
        std::fs::write(root.join("pkg/store_test.go"), "package pkg\n").unwrap();
        std::fs::write(root.join(".venv/site.py"), "").unwrap();
        std::fs::write(root.join("notes.md"), "").unwrap();

        let files: Vec<_> = discover_sources(root)
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["a.py", "pkg/b.py", "pkg/store.go"]);
    }

    #[test]
    fn test_load_unit_uses_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        let file = dir.path().join("app/service.py");
        std::fs::write(&file, "class Service:\n    def run(self):\n        pass\n").unwrap();

        let unit = load_unit(dir.path(), &file).unwrap();
        assert_eq!(unit.path, "app/service.py");
        assert_eq!(unit.declarations.len(), 1);
        assert_eq!(unit.declarations[0].members.len(), 1);
    }

    #[test]
    fn test_load_unit_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.py");
        std::fs::write(&file, "class :\n").unwrap();

        let err = load_unit(dir.path(), &file).unwrap_err();
        assert!(matches!(err, CoreError::Parse { ref path, .. } if path == "bad.py"));
    }
}
