//! Secure extraction of tar+gzip archives
//!
//! Archives come from the network and are treated as hostile. Every entry
//! is resolved against the canonical destination root before anything is
//! written for it, and the entry is rejected unless it stays inside that
//! root.
//!
//! # Containment
//!
//! Two checks run per entry, both before any mutation:
//!
//! 1. Lexical: `root` joined with the entry path, with `.` dropped and `..`
//!    popped, must equal `root` or be a descendant of it (component-wise).
//! 2. On disk: the deepest already existing ancestor of the target is
//!    canonicalized and must also be inside `root`. This stops a symlink
//!    extracted earlier from redirecting a later write.
//!
//! Regular files keep only the entry's permission bits (`0o777`). Setuid,
//! setgid and sticky bits from the archive are dropped.
//!
//! Extraction is not transactional. Entries written before a failure stay
//! on disk; callers discard them by resetting the layer.

use crate::error::ArchiveError;
use crate::util::{create_dir_0755 as create_dir_all, set_mode};
use flate2::read::MultiGzDecoder;
use std::fs::{self, OpenOptions};
use std::io::{self, Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::EntryType;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Unpack a gzip-compressed tar stream into `dest`.
///
/// `dest` is created if it does not exist. Existing files are overwritten.
pub fn extract(archive: &[u8], dest: &Path) -> Result<(), ArchiveError> {
    create_dir_all(dest)
        .map_err(|e| ArchiveError::fs(format!("creating destination {}", dest.display()), e))?;
    let root = fs::canonicalize(dest).map_err(|e| {
        ArchiveError::fs(format!("canonicalizing destination {}", dest.display()), e)
    })?;

    let tar_bytes = gunzip(archive)?;
    let mut tarball = tar::Archive::new(Cursor::new(tar_bytes));
    let entries = tarball.entries().map_err(ArchiveError::CorruptTarHeader)?;

    for entry in entries {
        let mut entry = entry.map_err(ArchiveError::CorruptTarHeader)?;
        let entry_path = entry
            .path()
            .map_err(ArchiveError::CorruptTarHeader)?
            .into_owned();
        let entry_type = entry.header().entry_type();

        let target = contained_target(&root, &entry_path)?;

        match entry_type {
            EntryType::Directory => {
                ensure_on_disk_within(&root, &target, &entry_path)?;
                create_dir_all(&target).map_err(|e| {
                    ArchiveError::fs(format!("creating directory {}", target.display()), e)
                })?;
            }
            EntryType::Symlink => {
                let parent = target.parent().unwrap_or(&root);
                ensure_on_disk_within(&root, parent, &entry_path)?;
                let link = entry
                    .link_name()
                    .map_err(ArchiveError::CorruptTarHeader)?
                    .ok_or_else(|| {
                        ArchiveError::CorruptTarHeader(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("symlink {} has no target", entry_path.display()),
                        ))
                    })?
                    .into_owned();
                match symlink(&link, &target) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        debug!("Symlink {} already exists, keeping it", target.display());
                    }
                    Err(e) => {
                        return Err(ArchiveError::fs(
                            format!(
                                "creating symlink {} -> {}",
                                target.display(),
                                link.display()
                            ),
                            e,
                        ))
                    }
                }
            }
            EntryType::Regular => {
                ensure_on_disk_within(&root, &target, &entry_path)?;
                let mode = entry.header().mode().map_err(ArchiveError::CorruptTarHeader)? & 0o777;
                write_file(&mut entry, &target, mode)?;
            }
            other => {
                return Err(ArchiveError::UnsupportedEntryType {
                    path: entry_path,
                    kind: entry_type_name(other),
                });
            }
        }

        debug!("Extracted {}", entry_path.display());
    }

    Ok(())
}

/// Decompress every gzip member fully so envelope and tar failures stay distinct
fn gunzip(archive: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    if archive.len() < GZIP_MAGIC.len() || archive[..2] != GZIP_MAGIC {
        return Err(ArchiveError::CorruptCompression(io::Error::new(
            io::ErrorKind::InvalidData,
            "missing gzip magic bytes",
        )));
    }

    let mut out = Vec::new();
    MultiGzDecoder::new(archive)
        .read_to_end(&mut out)
        .map_err(ArchiveError::CorruptCompression)?;
    Ok(out)
}

/// Join `entry` onto `root` lexically and require the result to stay inside.
///
/// Leading `/` or drive prefixes are ignored, matching a plain path join.
fn contained_target(root: &Path, entry: &Path) -> Result<PathBuf, ArchiveError> {
    let mut target = root.to_path_buf();
    for component in entry.components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::ParentDir => {
                target.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if target.starts_with(root) {
        Ok(target)
    } else {
        Err(ArchiveError::PathEscape {
            entry: entry.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}

/// Canonicalize the deepest existing ancestor of `target` and require it inside `root`
fn ensure_on_disk_within(root: &Path, target: &Path, entry: &Path) -> Result<(), ArchiveError> {
    let escape = || ArchiveError::PathEscape {
        entry: entry.to_path_buf(),
        root: root.to_path_buf(),
    };

    let mut probe = target;
    loop {
        if fs::symlink_metadata(probe).is_ok() {
            // A dangling symlink cannot be proven to stay inside.
            let resolved = fs::canonicalize(probe).map_err(|_| escape())?;
            return if resolved.starts_with(root) {
                Ok(())
            } else {
                Err(escape())
            };
        }
        match probe.parent() {
            Some(parent) => probe = parent,
            None => return Err(escape()),
        }
    }
}

fn write_file<R: Read>(content: &mut R, target: &Path, mode: u32) -> Result<(), ArchiveError> {
    if let Some(parent) = target.parent() {
        create_dir_all(parent).map_err(|e| {
            ArchiveError::fs(format!("creating directory for {}", target.display()), e)
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options
        .open(target)
        .map_err(|e| ArchiveError::fs(format!("creating file {}", target.display()), e))?;
    io::copy(content, &mut file)
        .map_err(|e| ArchiveError::fs(format!("writing file {}", target.display()), e))?;
    file.flush()
        .and_then(|()| file.sync_all())
        .map_err(|e| ArchiveError::fs(format!("closing file {}", target.display()), e))?;
    drop(file);

    // Creation mode is filtered by the umask; the entry's bits are authoritative.
    set_mode(target, mode)
        .map_err(|e| ArchiveError::fs(format!("setting mode on {}", target.display()), e))
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are only extracted on unix hosts",
    ))
}

fn entry_type_name(kind: EntryType) -> String {
    match kind {
        EntryType::Link => "hard-link".to_string(),
        EntryType::Char => "character-device".to_string(),
        EntryType::Block => "block-device".to_string(),
        EntryType::Fifo => "fifo".to_string(),
        EntryType::Continuous => "contiguous-file".to_string(),
        other => format!("{:?} ({:#04x})", other, other.as_byte()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    enum Item<'a> {
        Dir(&'a str),
        File(&'a str, u32, &'a [u8]),
        Link(&'a str, &'a str),
        Fifo(&'a str),
    }

    /// Build a tar.gz in memory. Paths are written into the raw header so
    /// hostile names like `../x` survive (the builder would reject them).
    fn tar_gz(entries: &[Item<'_>]) -> Vec<u8> {
        gzip(&tar_bytes(entries))
    }

    fn tar_bytes(entries: &[Item<'_>]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for item in entries {
            let mut header = Header::new_gnu();
            let empty: &[u8] = &[];
            let (name, kind, mode, data): (&str, EntryType, u32, &[u8]) = match item {
                Item::Dir(name) => (*name, EntryType::Directory, 0o755, empty),
                Item::File(name, mode, data) => (*name, EntryType::Regular, *mode, *data),
                Item::Link(name, _) => (*name, EntryType::Symlink, 0o777, empty),
                Item::Fifo(name) => (*name, EntryType::Fifo, 0o644, empty),
            };
            {
                let raw = header.as_old_mut();
                raw.name = [0; 100];
                raw.name[..name.len()].copy_from_slice(name.as_bytes());
            }
            header.set_entry_type(kind);
            header.set_mode(mode);
            header.set_size(data.len() as u64);
            if let Item::Link(_, target) = item {
                header.set_link_name(target).unwrap();
            }
            header.set_cksum();
            builder.append(&header, data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn mode_of(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn extracts_directory_and_file_with_mode() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[Item::Dir("d/"), Item::File("d/f.txt", 0o644, b"hello")]);

        extract(&data, dir.path()).unwrap();

        assert!(dir.path().join("d").is_dir());
        let file = dir.path().join("d/f.txt");
        assert_eq!(fs::read(&file).unwrap(), b"hello");
        assert_eq!(mode_of(&file), 0o644);
    }

    #[test]
    fn executable_bits_preserved() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[Item::File("xcaddy", 0o755, b"#!/bin/sh\n")]);

        extract(&data, dir.path()).unwrap();

        assert_eq!(mode_of(&dir.path().join("xcaddy")), 0o755);
    }

    #[test]
    fn special_mode_bits_are_dropped() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[Item::File("su", 0o4755, b"x"), Item::File("tmp", 0o1777, b"y")]);

        extract(&data, dir.path()).unwrap();

        assert_eq!(mode_of(&dir.path().join("su")), 0o755);
        assert_eq!(mode_of(&dir.path().join("tmp")), 0o777);
    }

    #[test]
    fn file_without_directory_entry_creates_parents() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[Item::File("a/b/c.txt", 0o600, b"deep")]);

        extract(&data, dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("a/b/c.txt")).unwrap(), b"deep");
        assert!(dir.path().join("a/b").is_dir());
    }

    #[test]
    fn parent_traversal_is_rejected_before_writing() {
        let outer = TempDir::new().unwrap();
        let dest = outer.path().join("layer/bin");
        let data = tar_gz(&[Item::File("../../etc/passwd", 0o644, b"root::0:0")]);

        let err = extract(&data, &dest).unwrap_err();

        assert!(matches!(err, ArchiveError::PathEscape { .. }));
        assert!(!outer.path().join("etc").exists());
        assert!(!outer.path().join("layer/etc").exists());
    }

    #[test]
    fn sibling_prefix_is_not_inside() {
        let outer = TempDir::new().unwrap();
        let dest = outer.path().join("bin");
        let data = tar_gz(&[Item::File("../bin-evil/x", 0o644, b"x")]);

        let err = extract(&data, &dest).unwrap_err();

        assert!(matches!(err, ArchiveError::PathEscape { .. }));
        assert!(!outer.path().join("bin-evil").exists());
    }

    #[test]
    fn dot_segments_that_stay_inside_are_allowed() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[Item::File("./a/../b.txt", 0o644, b"ok")]);

        extract(&data, dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("b.txt")).unwrap(), b"ok");
    }

    #[test]
    fn absolute_entry_lands_inside_root() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[Item::File("/etc/motd", 0o644, b"hi")]);

        extract(&data, dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("etc/motd")).unwrap(), b"hi");
    }

    #[test]
    fn write_through_extracted_symlink_is_rejected() {
        let outer = TempDir::new().unwrap();
        let dest = outer.path().join("bin");
        let victim = outer.path().join("victim");
        fs::create_dir_all(&victim).unwrap();
        let data = tar_gz(&[
            Item::Link("escape", victim.to_str().unwrap()),
            Item::File("escape/owned.txt", 0o644, b"pwned"),
        ]);

        let err = extract(&data, &dest).unwrap_err();

        assert!(matches!(err, ArchiveError::PathEscape { .. }));
        assert!(!victim.join("owned.txt").exists());
    }

    #[test]
    fn symlink_is_created_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[
            Item::File("pkgx", 0o755, b"bin"),
            Item::Link("pkgm", "pkgx"),
        ]);

        extract(&data, dir.path()).unwrap();
        extract(&data, dir.path()).unwrap();

        let link = dir.path().join("pkgm");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("pkgx"));
        assert_eq!(fs::read(&link).unwrap(), b"bin");
    }

    #[test]
    fn existing_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("d")).unwrap();
        let data = tar_gz(&[Item::Dir("d/")]);

        extract(&data, dir.path()).unwrap();
        assert!(dir.path().join("d").is_dir());
    }

    #[test]
    fn existing_file_is_truncated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f"), b"much longer old content").unwrap();
        let data = tar_gz(&[Item::File("f", 0o644, b"new")]);

        extract(&data, dir.path()).unwrap();
        assert_eq!(fs::read(dir.path().join("f")).unwrap(), b"new");
    }

    #[test]
    fn unsupported_entry_aborts_before_later_entries() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[
            Item::File("first.txt", 0o644, b"1"),
            Item::Fifo("pipe"),
            Item::File("after.txt", 0o644, b"2"),
        ]);

        let err = extract(&data, dir.path()).unwrap_err();

        assert!(matches!(err, ArchiveError::UnsupportedEntryType { .. }));
        // No rollback: the entry before the failure stays.
        assert!(dir.path().join("first.txt").exists());
        assert!(!dir.path().join("pipe").exists());
        assert!(!dir.path().join("after.txt").exists());
    }

    #[test]
    fn every_gzip_member_is_read() {
        let dir = TempDir::new().unwrap();
        let tar = tar_bytes(&[
            Item::File("first", 0o644, b"1"),
            Item::File("second", 0o644, b"2"),
        ]);
        // Header and one data block per entry; pigz-style output splits anywhere.
        let (head, tail) = tar.split_at(1024);
        let mut data = gzip(head);
        data.extend(gzip(tail));

        extract(&data, dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("first")).unwrap(), b"1");
        assert_eq!(fs::read(dir.path().join("second")).unwrap(), b"2");
    }

    #[test]
    fn non_gzip_input_is_corrupt_compression() {
        let dir = TempDir::new().unwrap();
        let err = extract(b"PK\x03\x04 definitely a zip", dir.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::CorruptCompression(_)));
    }

    #[test]
    fn garbage_tar_is_corrupt_header() {
        let dir = TempDir::new().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[b'x'; 512]).unwrap();
        let data = encoder.finish().unwrap();

        let err = extract(&data, dir.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::CorruptTarHeader(_)));
    }

    #[test]
    fn empty_archive_extracts_nothing() {
        let dir = TempDir::new().unwrap();
        let data = tar_gz(&[]);

        extract(&data, dir.path()).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn contained_target_checks_components() {
        let root = Path::new("/layers/caddy/bin");
        assert_eq!(
            contained_target(root, Path::new("a/./b")).unwrap(),
            PathBuf::from("/layers/caddy/bin/a/b")
        );
        assert_eq!(contained_target(root, Path::new(".")).unwrap(), root);
        assert!(contained_target(root, Path::new("a/../../x")).is_err());
    }
}
