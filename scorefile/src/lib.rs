//! Checksummed binary high-score table.
//!
//! A save file holds a dated table of up to 255 scores. The first four bytes
//! carry a chunked Adler-32 checksum over the whole file, verified on every
//! read so edited files are rejected.

pub mod checksum;
pub mod error;
pub mod file;
pub mod record;
pub mod save;

pub use checksum::{CHUNK_SIZE, adler32, checksum_reader, file_checksum};
pub use error::SaveError;
pub use file::{DEFAULT_PATH, SaveFile};
pub use record::{Date, INITIALS_LEN, Initials, MAX_SCORES, Save, Score};
pub use save::{
    HEADER_LEN, SCORE_RECORD_LEN, add_score_to_file, decode, encode, file_checksums,
    file_is_tampered, load, load_from_file, save, save_to_file,
};
