use std::fs::{self, File};
use std::io;
use std::path::Path;

use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The archive is damaged or not an archive at all; distinguished so
    /// callers can tell "bad file" from "bad disk".
    #[error("archive is corrupt or not a valid package: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError>;
}

/// Zip-format extractor for install archives.
#[derive(Debug, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(file).map_err(map_zip_error)?;

        fs::create_dir_all(destination)?;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(map_zip_error)?;
            let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
                return Err(ExtractError::Corrupt(format!(
                    "entry '{}' escapes the destination directory",
                    entry.name()
                )));
            };

            let out_path = destination.join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
        }
        Ok(())
    }
}

fn map_zip_error(err: ZipError) -> ExtractError {
    match err {
        ZipError::Io(err) => ExtractError::Io(err),
        other => ExtractError::Corrupt(other.to_string()),
    }
}
