use std::{fs, io, path::{Path, PathBuf}};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;

use super::BallotSheet;

pub const DEFAULT_BALLOT_FILE: &str = "votacao.json";

#[derive(Debug, Error)]
pub enum BallotFileError {
    #[error("ballot file io error: {0}")]
    Io(#[from] io::Error),

    #[error("ballot file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON file holding the ballot sheet. Writers do not lock; the last
/// save wins.
#[derive(Clone, Debug)]
pub struct BallotFile {
    path: PathBuf,
}

impl BallotFile {
    pub fn new(path: impl Into<PathBuf>) -> BallotFile {
        BallotFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as the seeded sheet.
    pub fn load(&self) -> Result<BallotSheet, BallotFileError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not found, starting from seed options", self.path.display());
                Ok(BallotSheet::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, sheet: &BallotSheet) -> Result<(), BallotFileError> {
        let mut bytes = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
        sheet.serialize(&mut serializer)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}
