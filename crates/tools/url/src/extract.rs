//! Archive extraction.
//!
//! Dispatches purely on the file-name suffix. Tar formats honor
//! strip-components; zip archives are always extracted as-is.

use flate2::read::GzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use toolshed_core::{Error, IoContext, Result};
use tracing::{debug, warn};
use xz2::read::XzDecoder;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.xz` / `.txz`
    TarXz,
}

impl ArchiveFormat {
    /// Detect the format from a file name, case-insensitively.
    #[must_use]
    pub fn detect(file_name: &str) -> Option<Self> {
        let name = file_name.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else {
            None
        }
    }

    /// Whether strip-components applies to this format.
    #[must_use]
    pub const fn supports_strip(self) -> bool {
        !matches!(self, Self::Zip)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::TarGz => write!(f, "tar.gz"),
            Self::TarXz => write!(f, "tar.xz"),
        }
    }
}

/// Extract `archive` into `dest`, choosing the format from its file name.
///
/// # Errors
///
/// Returns [`Error::Format`] for an unrecognized suffix or a corrupt archive,
/// and [`Error::Io`] if `dest` cannot be created.
pub fn extract(archive: &Path, dest: &Path, strip_components: usize) -> Result<()> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = ArchiveFormat::detect(&name)
        .ok_or_else(|| Error::format(format!("unsupported archive format: {name}")))?;
    extract_as(format, archive, dest, strip_components)
}

/// Extract `archive` into `dest` as `format`.
///
/// # Errors
///
/// Same as [`extract`], minus suffix detection.
pub fn extract_as(
    format: ArchiveFormat,
    archive: &Path,
    dest: &Path,
    strip_components: usize,
) -> Result<()> {
    std::fs::create_dir_all(dest).with_path(dest, "creating extraction directory")?;
    let file = File::open(archive).with_path(archive, "opening archive")?;

    if strip_components > 0 && !format.supports_strip() {
        debug!(archive = ?archive, "strip-components ignored for zip archives");
    }

    let count = match format {
        ArchiveFormat::Zip => extract_zip(file, archive, dest)?,
        ArchiveFormat::TarGz => extract_tar(
            GzDecoder::new(BufReader::new(file)),
            archive,
            dest,
            strip_components,
        )?,
        ArchiveFormat::TarXz => extract_tar(
            XzDecoder::new(BufReader::new(file)),
            archive,
            dest,
            strip_components,
        )?,
    };

    debug!(archive = ?archive, dest = ?dest, %format, entries = count, "Extracted archive");
    Ok(())
}

fn corrupt(archive: &Path, e: impl fmt::Display) -> Error {
    Error::format(format!("failed to extract {}: {e}", archive.display()))
}

fn extract_tar<R: Read>(reader: R, archive_path: &Path, dest: &Path, strip: usize) -> Result<usize> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let mut count = 0;

    for entry in archive.entries().map_err(|e| corrupt(archive_path, e))? {
        let mut entry = entry.map_err(|e| corrupt(archive_path, e))?;
        let path = entry
            .path()
            .map_err(|e| corrupt(archive_path, e))?
            .into_owned();

        let Some(relative) = strip_path(&path, strip) else {
            continue;
        };
        if has_symlink_ancestor(dest, &relative) {
            warn!(entry = ?path, "Skipping archive entry below a symbolic link");
            continue;
        }
        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).with_path(parent, "creating directory")?;
        }

        let kind = entry.header().entry_type();
        if kind.is_hard_link() {
            let link = entry
                .link_name()
                .map_err(|e| corrupt(archive_path, e))?
                .map(std::borrow::Cow::into_owned);
            let Some(source) = link.and_then(|link| strip_path(&link, strip)) else {
                warn!(entry = ?path, "Skipping hard link to a target outside destination");
                continue;
            };
            if has_symlink_ancestor(dest, &source) {
                warn!(entry = ?path, "Skipping hard link to a target below a symbolic link");
                continue;
            }
            let source = dest.join(source);
            remove_existing(&target)?;
            std::fs::hard_link(&source, &target).with_path(&target, "creating hard link")?;
            count += 1;
            continue;
        }
        if kind.is_symlink() {
            let link = entry.link_name().map_err(|e| corrupt(archive_path, e))?;
            if !link.is_some_and(|link| link_stays_inside(&relative, &link)) {
                warn!(entry = ?path, "Skipping symbolic link pointing outside destination");
                continue;
            }
        }

        entry
            .unpack(&target)
            .map_err(|e| corrupt(archive_path, e))?;
        count += 1;
    }

    Ok(count)
}

/// Whether any directory between `dest` and the entry at `relative` is a
/// symbolic link.
fn has_symlink_ancestor(dest: &Path, relative: &Path) -> bool {
    let Some(parent) = relative.parent() else {
        return false;
    };
    let mut current = dest.to_path_buf();
    parent.components().any(|component| {
        current.push(component);
        std::fs::symlink_metadata(&current).is_ok_and(|meta| meta.file_type().is_symlink())
    })
}

/// Whether a symlink at `relative` with target `link` resolves inside the
/// destination. Only leading `..` segments are accepted.
fn link_stays_inside(relative: &Path, link: &Path) -> bool {
    let mut depth = relative.parent().map_or(0, |p| p.components().count());
    let mut descended = false;
    for component in link.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(_) => descended = true,
            Component::ParentDir if !descended && depth > 0 => depth -= 1,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    descended
}

fn remove_existing(target: &Path) -> Result<()> {
    match std::fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => Err(Error::format(format!(
            "cannot replace directory {} with a link",
            target.display()
        ))),
        Ok(_) => std::fs::remove_file(target).with_path(target, "replacing file"),
        Err(_) => Ok(()),
    }
}

/// Drop the first `strip` segments of a tar entry path.
///
/// Returns `None` for entries that are consumed entirely by stripping or
/// that would leave the destination.
fn strip_path(path: &Path, strip: usize) -> Option<PathBuf> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => segments.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                warn!(entry = ?path, "Skipping archive entry outside destination");
                return None;
            }
        }
    }
    if segments.len() <= strip {
        return None;
    }
    Some(segments[strip..].iter().collect())
}

fn extract_zip(file: File, archive_path: &Path, dest: &Path) -> Result<usize> {
    let mut archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(archive_path, e))?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| corrupt(archive_path, e))?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %entry.name(), "Skipping archive entry outside destination");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target).with_path(&target, "creating directory")?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).with_path(parent, "creating directory")?;
        }
        let mut out = File::create(&target).with_path(&target, "creating file")?;
        std::io::copy(&mut entry, &mut out).map_err(|e| corrupt(archive_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode & 0o7777))
                .with_path(&target, "setting permissions")?;
        }
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tar::{Builder, EntryType};
    use tempfile::TempDir;
    use toolshed_core::ErrorKind;

    fn append_all<W: Write>(builder: &mut Builder<W>, files: &[(&str, &[u8])]) {
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, &content[..]).unwrap();
        }
    }

    fn create_test_tarball(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let tarball_path = dir.join(name);
        let file = File::create(&tarball_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);
        append_all(&mut builder, files);
        builder.into_inner().unwrap().finish().unwrap();
        tarball_path
    }

    fn create_test_zip(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let zip_path = dir.join(name);
        let mut writer = zip::ZipWriter::new(File::create(&zip_path).unwrap());
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        for (path, content) in files {
            writer.start_file(*path, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        zip_path
    }

    #[test]
    fn test_detect() {
        assert_eq!(ArchiveFormat::detect("a.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect("a.TAR.GZ"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect("a.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect("a.tar.xz"), Some(ArchiveFormat::TarXz));
        assert_eq!(ArchiveFormat::detect("a.txz"), Some(ArchiveFormat::TarXz));
        assert_eq!(ArchiveFormat::detect("a.gz"), None);
        assert_eq!(ArchiveFormat::detect("rust-analyzer"), None);
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(
            strip_path(Path::new("clangd_18/bin/clangd"), 1),
            Some(PathBuf::from("bin/clangd"))
        );
        assert_eq!(strip_path(Path::new("./top/bin"), 1), Some(PathBuf::from("bin")));
        assert_eq!(strip_path(Path::new("top/"), 1), None);
        assert_eq!(strip_path(Path::new("../evil"), 0), None);
        assert_eq!(strip_path(Path::new("/etc/passwd"), 0), None);
    }

    #[test]
    fn test_tar_gz_strip_removes_one_segment() {
        let temp = TempDir::new().unwrap();
        let archive = create_test_tarball(
            temp.path(),
            "tool.tar.gz",
            &[("tool-1.0/bin/tool", b"binary"), ("tool-1.0/README", b"docs")],
        );
        let dest = temp.path().join("out");

        extract(&archive, &dest, 1).unwrap();

        assert_eq!(std::fs::read(dest.join("bin/tool")).unwrap(), b"binary");
        assert!(dest.join("README").is_file());
        assert!(!dest.join("tool-1.0").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = create_test_tarball(temp.path(), "t.tgz", &[("bin/tool", b"x")]);
        let dest = temp.path().join("out");
        extract(&archive, &dest, 0).unwrap();

        let mode = std::fs::metadata(dest.join("bin/tool")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_zip_ignores_strip() {
        let temp = TempDir::new().unwrap();
        let archive = create_test_zip(
            temp.path(),
            "tool.zip",
            &[("tool-1.0/bin/tool", b"binary")],
        );
        let dest = temp.path().join("out");

        extract(&archive, &dest, 1).unwrap();

        assert_eq!(
            std::fs::read(dest.join("tool-1.0/bin/tool")).unwrap(),
            b"binary"
        );
        assert!(!dest.join("bin").exists());
    }

    #[test]
    fn test_tar_xz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool.tar.xz");
        let encoder = xz2::write::XzEncoder::new(File::create(&archive).unwrap(), 6);
        let mut builder = Builder::new(encoder);
        append_all(&mut builder, &[("pkg/lib/x.so", b"elf")]);
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        extract(&archive, &dest, 1).unwrap();
        assert_eq!(std::fs::read(dest.join("lib/x.so")).unwrap(), b"elf");
    }

    #[test]
    fn test_tar_skips_escaping_entries() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar.gz");
        let encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        let mut builder = Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        let name = b"../escaped";
        header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &b"evil"[..]).unwrap();
        append_all(&mut builder, &[("ok.txt", b"fine")]);
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        extract(&archive, &dest, 0).unwrap();

        assert!(dest.join("ok.txt").is_file());
        assert!(!temp.path().join("escaped").exists());
    }

    fn append_link<W: Write>(builder: &mut Builder<W>, kind: EntryType, path: &str, target: &Path) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_path(path).unwrap();
        header.set_link_name(target).unwrap();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_cksum();
        builder.append(&header, std::io::empty()).unwrap();
    }

    fn gz_builder(path: &Path) -> Builder<GzEncoder<File>> {
        Builder::new(GzEncoder::new(
            File::create(path).unwrap(),
            Compression::default(),
        ))
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_does_not_write_through_absolute_symlink() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        std::fs::create_dir(&outside).unwrap();

        let archive = temp.path().join("evil.tar.gz");
        let mut builder = gz_builder(&archive);
        append_link(&mut builder, EntryType::Symlink, "pkg/escape", &outside);
        append_all(&mut builder, &[("pkg/escape/pwned", b"evil")]);
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        extract(&archive, &dest, 0).unwrap();

        assert!(!outside.join("pwned").exists());
        let escape = dest.join("pkg/escape");
        assert!(!std::fs::symlink_metadata(&escape).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(escape.join("pwned")).unwrap(), b"evil");
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_skips_relative_symlink_leaving_destination() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar.gz");
        let mut builder = gz_builder(&archive);
        append_link(&mut builder, EntryType::Symlink, "top/up", Path::new("../../.."));
        append_link(&mut builder, EntryType::Symlink, "top/sneaky", Path::new("lib/../../.."));
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        extract(&archive, &dest, 1).unwrap();

        assert!(std::fs::symlink_metadata(dest.join("up")).is_err());
        assert!(std::fs::symlink_metadata(dest.join("sneaky")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_keeps_internal_symlink() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool.tar.gz");
        let mut builder = gz_builder(&archive);
        append_all(&mut builder, &[("tool-1.0/lib/libtool.so.1", b"elf")]);
        append_link(
            &mut builder,
            EntryType::Symlink,
            "tool-1.0/bin/libtool.so",
            Path::new("../lib/libtool.so.1"),
        );
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        extract(&archive, &dest, 1).unwrap();

        assert_eq!(
            std::fs::read_link(dest.join("bin/libtool.so")).unwrap(),
            PathBuf::from("../lib/libtool.so.1")
        );
        assert_eq!(std::fs::read(dest.join("bin/libtool.so")).unwrap(), b"elf");
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_skips_entries_below_existing_symlink() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        std::fs::create_dir(&outside).unwrap();
        let dest = temp.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        std::os::unix::fs::symlink(&outside, dest.join("link")).unwrap();

        let archive = create_test_tarball(temp.path(), "t.tar.gz", &[("link/file", b"x")]);
        extract(&archive, &dest, 0).unwrap();

        assert!(!outside.join("file").exists());
    }

    #[test]
    fn test_tar_hard_link_is_stripped() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool-1.0.tar.gz");
        let mut builder = gz_builder(&archive);
        append_all(&mut builder, &[("tool-1.0/bin/tool", b"binary")]);
        append_link(
            &mut builder,
            EntryType::Link,
            "tool-1.0/bin/tool-alias",
            Path::new("tool-1.0/bin/tool"),
        );
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        extract(&archive, &dest, 1).unwrap();

        assert_eq!(std::fs::read(dest.join("bin/tool-alias")).unwrap(), b"binary");
        assert_eq!(std::fs::read(dest.join("bin/tool")).unwrap(), b"binary");
    }

    #[test]
    fn test_tar_skips_hard_link_outside_destination() {
        let temp = TempDir::new().unwrap();
        let secret = temp.path().join("secret");
        std::fs::write(&secret, b"secret").unwrap();

        let archive = temp.path().join("evil.tar.gz");
        let mut builder = gz_builder(&archive);
        append_link(&mut builder, EntryType::Link, "pkg/stolen", &secret);
        append_link(&mut builder, EntryType::Link, "pkg/up", Path::new("../secret"));
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        extract(&archive, &dest, 0).unwrap();

        assert!(!dest.join("pkg/stolen").exists());
        assert!(!dest.join("pkg/up").exists());
    }

    #[test]
    fn test_link_stays_inside() {
        let at = Path::new("bin/alias");
        assert!(link_stays_inside(at, Path::new("tool")));
        assert!(link_stays_inside(at, Path::new("../lib/tool")));
        assert!(link_stays_inside(at, Path::new("./tool")));
        assert!(!link_stays_inside(at, Path::new("../../tool")));
        assert!(!link_stays_inside(at, Path::new("lib/../../x")));
        assert!(!link_stays_inside(at, Path::new("/usr/bin/tool")));
        assert!(!link_stays_inside(at, Path::new("..")));
    }

    #[test]
    fn test_unknown_suffix_is_format_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool.rar");
        std::fs::write(&archive, b"Rar!").unwrap();

        let err = extract(&archive, &temp.path().join("out"), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("tool.rar"));
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_corrupt_archive_is_format_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("tool.tar.gz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();

        let err = extract(&archive, &temp.path().join("out"), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
