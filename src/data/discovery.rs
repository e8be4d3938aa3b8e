use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{DataError, Result};

/// Immediate child directories of `root`, one per exchange.
pub fn list_subdirectories(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    info!(root = %root.display(), "Reading subdirectories");

    let entries = fs::read_dir(root).map_err(|source| DataError::Discovery {
        path: root.to_path_buf(),
        source,
    })?;

    let mut directories = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        // is_dir follows symlinks
        if path.is_dir() {
            directories.push(path);
        }
    }

    debug!(root = %root.display(), count = directories.len(), "Found subdirectories");
    Ok(directories)
}

/// Up to `limit` `.csv` files directly inside `dir`, in directory listing order.
pub fn find_csv_files(dir: impl AsRef<Path>, limit: usize) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    info!(dir = %dir.display(), limit, "Searching for csv files");

    if limit == 0 {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| DataError::Discovery {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::with_capacity(limit);
    for entry in entries {
        let entry = entry.map_err(|source| DataError::Discovery {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_csv(&path) {
            files.push(path);
            if files.len() == limit {
                break;
            }
        }
    }

    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_lists_only_directories() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("LSE")).unwrap();
        fs::create_dir(root.path().join("NYSE")).unwrap();
        File::create(root.path().join("README.txt")).unwrap();

        let mut dirs = list_subdirectories(root.path()).unwrap();
        dirs.sort();

        assert_eq!(
            dirs,
            vec![root.path().join("LSE"), root.path().join("NYSE")]
        );
    }

    #[test]
    fn test_missing_root_is_discovery_error() {
        let root = tempfile::tempdir().unwrap();
        let result = list_subdirectories(root.path().join("missing"));
        assert!(matches!(result, Err(DataError::Discovery { .. })));
    }

    #[test]
    fn test_file_limit_enforced() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["A.csv", "B.csv", "C.csv", "D.csv", "E.csv"] {
            File::create(dir.path().join(name)).unwrap();
        }

        assert_eq!(find_csv_files(dir.path(), 2).unwrap().len(), 2);
        assert_eq!(find_csv_files(dir.path(), 10).unwrap().len(), 5);
        assert!(find_csv_files(dir.path(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_skips_non_csv_and_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("prices.csv")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        fs::create_dir(dir.path().join("archive.csv")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        File::create(dir.path().join("nested").join("old.csv")).unwrap();

        let files = find_csv_files(dir.path(), 10).unwrap();

        assert_eq!(files, vec![dir.path().join("prices.csv")]);
    }

    #[test]
    fn test_file_path_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("VALID_DATA.csv");
        File::create(&file).unwrap();

        let result = find_csv_files(&file, 2);
        assert!(matches!(result, Err(DataError::Discovery { .. })));
    }
}
