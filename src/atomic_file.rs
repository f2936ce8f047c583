use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use log::trace;

/// Replaces `path` with `contents` so that readers only ever observe the old or the new version.
///
/// The data is written to a hidden sibling, synced to disk and renamed over the target.
pub fn write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = tmp_sibling(path);

    trace!("writing to {}", tmp_path.display());
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");

    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_write_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        assert_ok!(write(&path, b"old"));
        assert_ok!(write(&path, b"new"));

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_fails_without_parent() {
        let dir = tempdir().unwrap();

        assert_err!(write(&dir.path().join("missing/state.json"), b"data"));
    }
}
