//! Capability-based filesystem helpers built on `cap-std` and `camino`.

use std::io;
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Whether `path` names an existing regular file.
pub(crate) fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other("database path should include a file name"))?;
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.metadata(name).map(|meta| meta.is_file())
}

/// Create every missing directory above `path`.
pub(crate) fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (root, relative) = split_root(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    root.create_dir_all(&relative)
}

/// Open the directory an absolute or relative path starts from and return
/// the remainder relative to it.
fn split_root(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let mut components = std_path.components();
    let root = match components.next() {
        Some(Component::Prefix(prefix)) => {
            let mut root = prefix.as_os_str().to_os_string();
            let mut rest = components.clone();
            if matches!(rest.next(), Some(Component::RootDir)) {
                root.push(std::path::MAIN_SEPARATOR_STR);
                components = rest;
            }
            Utf8PathBuf::from_path_buf(root.into())
                .map_err(|_| io::Error::other("non-UTF-8 path prefix"))?
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR_STR),
        _ => {
            let dir = fs_utf8::Dir::open_ambient_dir(".", ambient_authority())?;
            return Ok((dir, path.to_path_buf()));
        }
    };
    let relative = Utf8PathBuf::from_path_buf(components.as_path().to_path_buf())
        .map_err(|_| io::Error::other("non-UTF-8 path"))?;
    let dir = fs_utf8::Dir::open_ambient_dir(&root, ambient_authority())?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[rstest]
    fn creates_nested_parents_for_absolute_paths() {
        let dir = TempDir::new().expect("tempdir");
        let target = utf8(&dir).join("a/b/places.sqlite");
        ensure_parent_dir(&target).expect("create parents");
        assert!(target.parent().is_some_and(Utf8Path::is_dir));
    }

    #[rstest]
    fn bare_file_names_need_no_parent() {
        ensure_parent_dir(Utf8Path::new("places.sqlite")).expect("no-op");
    }

    #[rstest]
    fn file_checks_distinguish_files_and_directories() {
        let dir = TempDir::new().expect("tempdir");
        let root = utf8(&dir);
        let file = root.join("places.sqlite");
        let nested = root.join("nested");
        std::fs::write(&file, b"").expect("write file");
        std::fs::create_dir(&nested).expect("create dir");

        assert!(file_is_file(&file).expect("inspect file"));
        assert!(!file_is_file(&nested).expect("inspect dir"));
        let missing = file_is_file(&root.join("missing.sqlite")).expect_err("missing file");
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }
}
