use thiserror::Error;

/// Errors produced while building, writing or reading a save.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The save file could not be opened, read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file ends before every declared field was read.
    ///
    /// `checksum_matches` tells whether the bytes that are present still
    /// match the stored checksum. A cut-off file never does; a file whose
    /// count byte was raised and then re-signed does.
    #[error("save file truncated: expected {expected} bytes, found {actual} (checksum matches: {checksum_matches})")]
    Truncated {
        expected: usize,
        actual: usize,
        checksum_matches: bool,
    },

    /// The file carries bytes past the last declared score record.
    #[error("save file has {actual} bytes, layout declares {expected}")]
    TrailingBytes { expected: usize, actual: usize },

    /// The stored checksum does not match the file contents.
    #[error("checksum mismatch (stored {stored:#010x}, computed {computed:#010x}): save file has been tampered with")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// A save can hold at most 255 scores.
    #[error("a save holds at most 255 scores, got {count}")]
    CapacityExceeded { count: usize },

    #[error("initials must be exactly 3 printable ASCII characters, got {0:?}")]
    InvalidInitials(String),
}

impl SaveError {
    /// The file parsed but its checksum disagrees.
    pub fn is_tampered(&self) -> bool {
        matches!(self, SaveError::ChecksumMismatch { .. })
    }

    /// The file does not match the layout its header declares.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            SaveError::Truncated { .. } | SaveError::TrailingBytes { .. }
        )
    }
}
