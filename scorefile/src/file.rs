//! Path-bound handle over the save codec.

use std::path::{Path, PathBuf};

use crate::error::SaveError;
use crate::record::{Save, Score};
use crate::save::{CHECKSUM_LEN, add_score_to_file, file_checksums, load_from_file, save_to_file};

/// Path used when the caller does not name one.
pub const DEFAULT_PATH: &str = "save.sf";

/// A save file on disk.
///
/// # Example
/// ```no_run
/// use scorefile::{Date, Initials, Save, SaveFile, Score};
///
/// let file = SaveFile::default();
/// let mut save = Save::from_scores(vec![Score::new(
///     Date::new(27, 4, 24),
///     102030,
///     Initials::new("AMK")?,
/// )])?;
/// file.write(&mut save)?;
///
/// let loaded = file.read()?;
/// assert_eq!(loaded.score_count(), 1);
/// # Ok::<(), scorefile::SaveError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveFile {
    path: PathBuf,
}

impl Default for SaveFile {
    fn default() -> Self {
        SaveFile::new(DEFAULT_PATH)
    }
}

impl SaveFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        SaveFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Sign `save` and write it, storing the checksum in `save`.
    pub fn write(&self, save: &mut Save) -> Result<(), SaveError> {
        save_to_file(&self.path, save)
    }

    /// Read and verify the save.
    pub fn read(&self) -> Result<Save, SaveError> {
        load_from_file(&self.path)
    }

    /// Whether the file no longer matches the checksum stored in it.
    pub fn is_tampered(&self) -> Result<bool, SaveError> {
        match file_checksums(&self.path)? {
            (Some(stored), computed) => Ok(stored != computed),
            (None, _) => Err(SaveError::Truncated {
                expected: CHECKSUM_LEN,
                actual: std::fs::metadata(&self.path)?.len() as usize,
                checksum_matches: false,
            }),
        }
    }

    /// Append `score` to the stored table and write it back.
    pub fn add_score(&self, score: Score) -> Result<Save, SaveError> {
        add_score_to_file(&self.path, score)
    }
}
