//! In-memory score table.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};

use crate::error::SaveError;

/// Width of the initials slot. Three characters plus a terminator.
pub const INITIALS_LEN: usize = 4;

/// Most scores a save can hold; the count is stored in one byte.
pub const MAX_SCORES: usize = u8::MAX as usize;

/// Calendar date with a two-digit year, e.g. `28/4/24`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Date {
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

impl Date {
    pub const fn new(day: u8, month: u8, year: u8) -> Self {
        Date { day, month, year }
    }

    /// Today's local date.
    pub fn today() -> Self {
        Self::from(Local::now().date_naive())
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date {
            day: date.day() as u8,
            month: date.month() as u8,
            year: date.year().rem_euclid(100) as u8,
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.day, self.month, self.year)
    }
}

/// Player initials in their fixed on-disk slot.
///
/// Bytes after the terminator are kept as-is so a slot read from disk is
/// written back unchanged.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Initials([u8; INITIALS_LEN]);

impl Initials {
    /// Build from exactly three printable ASCII characters.
    pub fn new(text: &str) -> Result<Self, SaveError> {
        let bytes = text.as_bytes();
        if bytes.len() != INITIALS_LEN - 1 || !bytes.iter().all(u8::is_ascii_graphic) {
            return Err(SaveError::InvalidInitials(text.to_string()));
        }

        let mut slot = [0u8; INITIALS_LEN];
        slot[..bytes.len()].copy_from_slice(bytes);
        Ok(Initials(slot))
    }

    /// Wrap a raw slot without validation.
    pub const fn from_bytes(bytes: [u8; INITIALS_LEN]) -> Self {
        Initials(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; INITIALS_LEN] {
        &self.0
    }

    /// Text up to the first NUL, or `None` if that is not valid UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(INITIALS_LEN);
        std::str::from_utf8(&self.0[..end]).ok()
    }
}

impl FromStr for Initials {
    type Err = SaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Initials::new(s)
    }
}

impl fmt::Display for Initials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_str() {
            Some(text) => f.write_str(text),
            None => write!(f, "{:02x?}", self.0),
        }
    }
}

impl fmt::Debug for Initials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_str() {
            Some(text) => write!(f, "Initials({text:?})"),
            None => write!(f, "Initials({:02x?})", self.0),
        }
    }
}

/// One leaderboard entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Score {
    pub date: Date,
    pub value: u32,
    pub initials: Initials,
}

impl Score {
    pub const fn new(date: Date, value: u32, initials: Initials) -> Self {
        Score { date, value, initials }
    }
}

/// A high-score table as stored in a save file.
///
/// The score count is the length of the owned score list, which never
/// exceeds [`MAX_SCORES`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Save {
    checksum: u32,
    pub date: Date,
    scores: Vec<Score>,
}

impl Save {
    /// Zero-dated save with `count` zeroed score slots.
    pub fn zeroed(count: usize) -> Result<Self, SaveError> {
        check_capacity(count)?;
        Ok(Save {
            checksum: 0,
            date: Date::default(),
            scores: vec![Score::default(); count],
        })
    }

    /// Save dated `date` holding `scores`.
    pub fn new(date: Date, scores: Vec<Score>) -> Result<Self, SaveError> {
        check_capacity(scores.len())?;
        Ok(Save {
            checksum: 0,
            date,
            scores,
        })
    }

    /// Save dated today holding `scores`.
    pub fn from_scores(scores: Vec<Score>) -> Result<Self, SaveError> {
        Self::new(Date::today(), scores)
    }

    pub(crate) fn from_parts(checksum: u32, date: Date, scores: Vec<Score>) -> Self {
        debug_assert!(scores.len() <= MAX_SCORES);
        Save {
            checksum,
            date,
            scores,
        }
    }

    /// Checksum from the last write or read; zero for a fresh save.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub(crate) fn set_checksum(&mut self, checksum: u32) {
        self.checksum = checksum;
    }

    pub fn score_count(&self) -> u8 {
        self.scores.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    /// Mutable view of the scores. The count cannot change through it.
    pub fn scores_mut(&mut self) -> &mut [Score] {
        &mut self.scores
    }

    pub fn get(&self, index: usize) -> Option<&Score> {
        self.scores.get(index)
    }

    /// Add `score` at the end of the table.
    ///
    /// # Errors
    /// [`SaveError::CapacityExceeded`] when the table is full; the save is
    /// left unchanged.
    pub fn push(&mut self, score: Score) -> Result<(), SaveError> {
        check_capacity(self.scores.len() + 1)?;
        self.scores.push(score);
        Ok(())
    }

    /// Consume the save and return it with `score` appended.
    pub fn append(mut self, score: Score) -> Result<Self, SaveError> {
        self.push(score)?;
        Ok(self)
    }

    pub fn into_scores(self) -> Vec<Score> {
        self.scores
    }
}

fn check_capacity(count: usize) -> Result<(), SaveError> {
    if count > MAX_SCORES {
        return Err(SaveError::CapacityExceeded { count });
    }
    Ok(())
}
