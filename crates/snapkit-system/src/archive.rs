//! Snap archives: gzip-compressed tarballs with `meta/package.yaml` at the root

use flate2::read::GzDecoder;
use sha2::{Digest, Sha512};
use snapkit_core::{MANIFEST_PATH, Manifest};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};

use crate::error::{Result, SystemError};

/// Presence of this file enables the legacy config hook
pub const CONFIG_HOOK_PATH: &str = "meta/hooks/config";

pub const LICENSE_PATH: &str = "meta/license.txt";

/// Verify-and-extract interface for package archives
pub trait ArchiveExtractor: Send + Sync {
    /// Check the archive digest and return it as lowercase hex
    ///
    /// Without an expected digest the archive is only accepted when
    /// `allow_unauthenticated` is set.
    fn verify(
        &self,
        archive: &Path,
        expected_sha512: Option<&str>,
        allow_unauthenticated: bool,
    ) -> Result<String>;

    /// Content of one file inside the archive
    fn read_file(&self, archive: &Path, name: &str) -> Result<Option<Vec<u8>>>;

    /// Unpack the whole archive into `dest`
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Parse the manifest shipped in the archive
    fn read_manifest(&self, archive: &Path) -> Result<Manifest> {
        let data = self
            .read_file(archive, MANIFEST_PATH)?
            .ok_or_else(|| SystemError::PackageCorrupt {
                reason: format!("no {} in {}", MANIFEST_PATH, archive.display()),
            })?;
        let has_config_hook = self.read_file(archive, CONFIG_HOOK_PATH)?.is_some();
        Ok(Manifest::parse(&data, has_config_hook)?)
    }
}

/// [`ArchiveExtractor`] for `.snap` files written with `tar` and `flate2`
#[derive(Debug, Clone, Default)]
pub struct TarArchive;

fn corrupt(archive: &Path, e: impl std::fmt::Display) -> SystemError {
    SystemError::PackageCorrupt {
        reason: format!("{}: {}", archive.display(), e),
    }
}

fn open(archive: &Path) -> Result<tar::Archive<GzDecoder<File>>> {
    let file = File::open(archive).map_err(|e| corrupt(archive, e))?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

/// Entry path without a leading `./`
fn normalized(path: &Path) -> String {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Lowercase hex SHA-512 of a file
pub fn sha512_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

impl ArchiveExtractor for TarArchive {
    fn verify(
        &self,
        archive: &Path,
        expected_sha512: Option<&str>,
        allow_unauthenticated: bool,
    ) -> Result<String> {
        let digest = sha512_file(archive).map_err(|e| corrupt(archive, e))?;

        if allow_unauthenticated {
            return Ok(digest);
        }
        match expected_sha512 {
            Some(expected) if expected.eq_ignore_ascii_case(&digest) => Ok(digest),
            Some(expected) => Err(SystemError::SignatureInvalid {
                reason: format!("sha512 mismatch: expected {}, got {}", expected, digest),
            }),
            None => Err(SystemError::SignatureInvalid {
                reason: format!("no digest to verify {} against", archive.display()),
            }),
        }
    }

    fn read_file(&self, archive: &Path, name: &str) -> Result<Option<Vec<u8>>> {
        let mut tar = open(archive)?;
        for entry in tar.entries().map_err(|e| corrupt(archive, e))? {
            let mut entry = entry.map_err(|e| corrupt(archive, e))?;
            let found = normalized(&entry.path().map_err(|e| corrupt(archive, e))?) == name;
            if found {
                let mut data = Vec::new();
                entry
                    .read_to_end(&mut data)
                    .map_err(|e| corrupt(archive, e))?;
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        std::fs::create_dir_all(dest)?;
        let mut tar = open(archive)?;
        tar.set_preserve_permissions(true);
        tar.unpack(dest).map_err(|e| corrupt(archive, e))
    }
}

/// Build a snap archive from `(path, content)` pairs
pub fn build_archive(dest: &Path, files: &[(&str, &[u8])]) -> Result<()> {
    let file = File::create(dest)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(if path.starts_with("bin/") { 0o755 } else { 0o644 });
        header.set_mtime(0);
        header.set_cksum();
        builder.append_data(&mut header, path, *content)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}
