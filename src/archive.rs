use std::{
    ffi::OsStr,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive root {0} does not exist")]
    MissingRoot(PathBuf),
    #[error("cannot package {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Packs the content of `root` into a gzip compressed tarball at `destination`.
///
/// The tarball is assembled in `staging_dir` and only moved to `destination` once complete, so
/// `destination` never holds a partial package. Entry names are relative to `root`.
pub fn package(root: &Path, destination: &Path, staging_dir: &Path) -> Result<(), ArchiveError> {
    if !root.is_dir() {
        return Err(ArchiveError::MissingRoot(root.to_path_buf()));
    }
    fs::create_dir_all(staging_dir).map_err(io_error(staging_dir))?;
    let staged = staging_dir.join(destination.file_name().unwrap_or(OsStr::new("archive.tar.gz")));
    debug!("staging package at {}", staged.display());

    let file = File::create(&staged).map_err(io_error(&staged))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let mut entries = fs::read_dir(root)
        .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
        .map_err(io_error(root))?;
    entries.sort_by_key(fs::DirEntry::file_name);
    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        let file_type = entry.file_type().map_err(io_error(&path))?;
        let appended = if file_type.is_dir() {
            builder.append_dir_all(&name, &path)
        } else {
            builder.append_path_with_name(&path, &name)
        };
        appended.map_err(io_error(&path))?;
    }

    let file = builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(io_error(&staged))?;
    file.sync_all().map_err(io_error(&staged))?;
    drop(file);

    move_into_place(&staged, destination).map_err(io_error(destination))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError {
    let path = path.to_path_buf();
    move |source| ArchiveError::Io { path, source }
}

fn move_into_place(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Err(error) = fs::rename(from, to) {
        warn!(
            "cannot rename {} to {}, copying instead: {error}",
            from.display(),
            to.display()
        );
        let tmp = to.with_extension("part");
        fs::copy(from, &tmp)?;
        fs::rename(&tmp, to)?;
        fs::remove_file(from)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, io::Read as _};

    use assertables::*;
    use flate2::read::GzDecoder;
    use rstest::*;
    use tempfile::{TempDir, tempdir};

    use super::*;

    /// Entry names of a package, directories with a trailing slash.
    fn entries(package: &Path) -> BTreeSet<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(package).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let mut name = entry.path().unwrap().to_string_lossy().into_owned();
                if entry.header().entry_type().is_dir() && !name.ends_with('/') {
                    name.push('/');
                }
                name
            })
            .collect()
    }

    #[fixture]
    fn dir() -> TempDir {
        tempdir().unwrap()
    }

    #[rstest]
    fn test_package_contains_tree(dir: TempDir) {
        let root = dir.path().join("me@example.com");
        fs::create_dir_all(root.join("Inbox/.eml")).unwrap();
        fs::create_dir_all(root.join("Empty")).unwrap();
        fs::write(root.join("Inbox/a.eml"), "a").unwrap();
        fs::write(root.join("saved_emails.json"), "{}").unwrap();
        let destination = dir.path().join("work.tar.gz");

        assert_ok!(package(&root, &destination, &dir.path().join("tmp")));

        let entries = entries(&destination);
        assert_contains!(entries, &"Inbox/a.eml".to_string());
        assert_contains!(entries, &"Inbox/.eml/".to_string());
        assert_contains!(entries, &"Empty/".to_string());
        assert_contains!(entries, &"saved_emails.json".to_string());
        assert!(!dir.path().join("tmp/work.tar.gz").exists());
    }

    #[rstest]
    fn test_package_round_trips_content(dir: TempDir) {
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("Inbox")).unwrap();
        fs::write(root.join("Inbox/a.eml"), "Subject: a").unwrap();
        let destination = dir.path().join("out/work.tar.gz");

        package(&root, &destination, &dir.path().join("tmp")).unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&destination).unwrap()));
        let mut entry = archive
            .entries()
            .unwrap()
            .map(Result::unwrap)
            .find(|entry| entry.path().unwrap().ends_with("a.eml"))
            .unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "Subject: a");
    }

    #[rstest]
    fn test_package_requires_root(dir: TempDir) {
        let result = package(
            &dir.path().join("missing"),
            &dir.path().join("work.tar.gz"),
            dir.path(),
        );

        assert!(matches!(result, Err(ArchiveError::MissingRoot(_))));
        assert!(!dir.path().join("work.tar.gz").exists());
    }
}
