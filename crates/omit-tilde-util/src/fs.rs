use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File extensions treated as JavaScript/TypeScript sources.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// Directory names never descended into when collecting sources.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Whether `path` carries one of the [`SOURCE_EXTENSIONS`].
#[must_use]
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Collect source files below `root`, sorted by path.
///
/// A `root` that is itself a file is returned as-is when it is a source file.
/// `node_modules` and hidden directories are skipped.
///
/// # Errors
/// Returns an error if `root` does not exist or a directory cannot be read.
pub fn collect_source_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let meta = fs::metadata(root)?;
    if meta.is_file() {
        return Ok(if is_source_file(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && is_source_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_to_string_lossy_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x80, 0x81])
            .unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert!(content.starts_with("Hello"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("src/index.ts")));
        assert!(is_source_file(Path::new("a.mjs")));
        assert!(!is_source_file(Path::new("style.css")));
        assert!(!is_source_file(Path::new("Makefile")));
    }

    #[test]
    fn test_collect_source_files_skips_node_modules_and_hidden() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/lib")).unwrap();
        fs::create_dir_all(root.join("node_modules/lodash")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("src/index.ts"), "").unwrap();
        fs::write(root.join("src/lib/util.js"), "").unwrap();
        fs::write(root.join("src/readme.md"), "").unwrap();
        fs::write(root.join("node_modules/lodash/index.js"), "").unwrap();
        fs::write(root.join(".cache/x.js"), "").unwrap();

        let files = collect_source_files(root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/index.ts", "src/lib/util.js"]);
    }

    #[test]
    fn test_collect_source_files_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.tsx");
        fs::write(&file, "").unwrap();

        assert_eq!(collect_source_files(&file).unwrap(), vec![file]);
        assert!(collect_source_files(&dir.path().join("missing")).is_err());
    }
}
