//! Capability-scoped filesystem helpers for the on-disk catalogue cache.
//!
//! Paths supplied by users are resolved once into an ambient directory
//! handle; everything after that goes through `cap-std` so writes stay
//! inside the chosen cache directory.
#![forbid(unsafe_code)]

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;

/// Suffix of the scratch file used by [`write_atomic`].
const TEMP_SUFFIX: &str = ".tmp";

/// Create `path` (and any missing ancestors) and open it as a directory.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    let (base, relative) = split_base(path)?;
    let base_dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    if relative.as_str().is_empty() {
        return Ok(base_dir);
    }
    base_dir.create_dir_all(&relative)?;
    base_dir.open_dir(&relative)
}

/// Read `name` from `dir` as UTF-8, returning `None` when it does not exist.
pub fn read_optional(dir: &fs_utf8::Dir, name: &str) -> io::Result<Option<String>> {
    match dir.read_to_string(name) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Replace `name` in `dir` with `contents`.
///
/// The data is written to a sibling scratch file first and renamed into
/// place, so readers never observe a partially written file.
pub fn write_atomic(dir: &fs_utf8::Dir, name: &str, contents: &str) -> io::Result<()> {
    let scratch = format!(".{name}{TEMP_SUFFIX}");
    dir.write(&scratch, contents.as_bytes())?;
    if let Err(err) = dir.rename(&scratch, dir, name) {
        // Leave no scratch file behind.
        let _ = dir.remove_file(&scratch);
        return Err(err);
    }
    Ok(())
}

/// Read the UTF-8 file at `path`.
pub fn read_file(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = open_parent(path)?;
    dir.read_to_string(name)
}

/// Atomically replace the file at `path`, creating its directory if needed.
pub fn write_file(path: &Utf8Path, contents: &str) -> io::Result<()> {
    let name = file_name(path)?;
    let dir = ensure_dir(parent_of(path))?;
    write_atomic(&dir, name, contents)
}

fn open_parent(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, &str)> {
    let name = file_name(path)?;
    let dir = fs_utf8::Dir::open_ambient_dir(parent_of(path), ambient_authority())?;
    Ok((dir, name))
}

fn parent_of(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

fn file_name(path: &Utf8Path) -> io::Result<&str> {
    path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{path} does not name a file"),
        )
    })
}

/// Split `path` into an ambient base (`/`, a drive root, `.` or a run of
/// `..`) and the remaining relative components.
///
/// `..` cancels the preceding normal component lexically; leading ones
/// become part of the base, so `cap-std` never sees a parent component.
pub fn split_base(path: &Utf8Path) -> io::Result<(Utf8PathBuf, Utf8PathBuf)> {
    let mut base = Utf8PathBuf::new();
    let mut relative = Utf8PathBuf::new();

    for component in path.components() {
        match component {
            Utf8Component::Prefix(prefix) => base.push(prefix.as_str()),
            Utf8Component::RootDir => base.push(std::path::MAIN_SEPARATOR_STR),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !relative.pop() {
                    base.push("..");
                }
            }
            Utf8Component::Normal(part) => relative.push(part),
        }
    }

    if base.as_str().is_empty() {
        base.push(".");
    }
    Ok((base, relative))
}
