//! Manifest directory listing.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Extension of rendered manifest files.
pub const MANIFEST_EXTENSION: &str = "yaml";

/// List the `*.yaml` files directly inside `dir`, keyed and sorted by file name.
///
/// Dot-files such as `.canary.yaml` are included. A directory that does not
/// exist lists as empty.
pub fn list_yaml_files(dir: &Path) -> io::Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        files.insert(name.to_string(), path.clone());
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_yaml_files_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["web-prod.yaml", "api-stg.yaml", "notes.txt", "api.yml", ".hidden.yaml"] {
            std::fs::write(dir.path().join(name), "kind: Service\n").expect("write");
        }
        std::fs::create_dir(dir.path().join("nested.yaml")).expect("mkdir");

        let files = list_yaml_files(dir.path()).expect("list");
        let names: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(names, vec![".hidden.yaml", "api-stg.yaml", "web-prod.yaml"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = list_yaml_files(&dir.path().join("absent")).expect("list");
        assert!(files.is_empty());
    }
}
