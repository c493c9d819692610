use crate::error::{RekeyError, Result};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Reads every line of every regular file beneath `root`.
///
/// Files are read in parallel, each into its own buffer, and the buffers are
/// concatenated once all reads have finished. Line order within a file is
/// kept; order between files is not.
pub fn load_lines(root: impl AsRef<Path>) -> Result<Vec<String>> {
    let root = root.as_ref();
    let start = Instant::now();
    info!(path = %root.display(), "Loading data folder");

    let files = list_files(root)?;

    let per_file = files
        .par_iter()
        .map(|path| read_file_lines(path))
        .collect::<Result<Vec<_>>>()?;

    let total = per_file.iter().map(Vec::len).sum();
    let mut lines = Vec::with_capacity(total);
    for chunk in per_file {
        lines.extend(chunk);
    }

    info!(
        path = %root.display(),
        files = files.len(),
        lines = lines.len(),
        duration_secs = start.elapsed().as_secs_f64(),
        "Data folder loaded"
    );
    Ok(lines)
}

fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| RekeyError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn read_file_lines(path: &Path) -> Result<Vec<String>> {
    let start = Instant::now();
    let read_err = |source| RekeyError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let lines = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_err)?;

    debug!(
        file = %path.display(),
        lines = lines.len(),
        duration_secs = start.elapsed().as_secs_f64(),
        "File read"
    );
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top.txt"), "one\ntwo\n").unwrap();
        fs::write(dir.path().join("a/b/deep.txt"), "three").unwrap();

        let mut lines = load_lines(dir.path()).unwrap();
        lines.sort();
        assert_eq!(lines, vec!["one", "three", "two"]);
    }

    #[test]
    fn keeps_order_within_a_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("events.txt"), "c\na\nb\n").unwrap();

        let lines = load_lines(dir.path()).unwrap();
        assert_eq!(lines, vec!["c", "a", "b"]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("win.txt"), "first\r\nsecond\r\n").unwrap();

        let lines = load_lines(dir.path()).unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn empty_folder_yields_no_lines() {
        let dir = TempDir::new().unwrap();
        assert!(load_lines(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_a_walk_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = load_lines(&missing).unwrap_err();
        assert!(matches!(err, RekeyError::Walk { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinked_files_and_folders() {
        use std::os::unix::fs::symlink;

        let data = TempDir::new().unwrap();
        fs::create_dir_all(data.path().join("shared")).unwrap();
        fs::write(data.path().join("real.txt"), "linked\n").unwrap();
        fs::write(data.path().join("shared/more.txt"), "nested\n").unwrap();

        let dir = TempDir::new().unwrap();
        symlink(data.path().join("real.txt"), dir.path().join("l.txt")).unwrap();
        symlink(data.path().join("shared"), dir.path().join("shared")).unwrap();

        let mut lines = load_lines(dir.path()).unwrap();
        lines.sort();
        assert_eq!(lines, vec!["linked", "nested"]);
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.txt");
        fs::write(&bad, [0x66, 0x6f, 0xff, 0xfe, b'\n']).unwrap();

        match load_lines(dir.path()).unwrap_err() {
            RekeyError::Read { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error: {other}"),
        }
    }
}
