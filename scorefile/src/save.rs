//! Save file codec.
//!
//! Layout, little-endian:
//!
//! | offset | size        | field                     |
//! |--------|-------------|---------------------------|
//! | 0      | 4           | checksum                  |
//! | 4      | 3           | save date (day, month, yy)|
//! | 7      | 1           | score count               |
//! | 8      | 11 x count  | score records             |
//!
//! A score record is the score date (3 bytes), the score value (4 bytes) and
//! the initials slot (4 bytes), without padding.
//!
//! The checksum is [`file_checksum`] over the whole file with the checksum
//! field read as zero.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use bytemuck_derive::{Pod, Zeroable};

use crate::checksum::{checksum_reader, file_checksum};
use crate::error::SaveError;
use crate::record::{Date, INITIALS_LEN, Initials, Save, Score};

/// Bytes taken by the checksum field at the start of the file.
pub const CHECKSUM_LEN: usize = 4;

/// Checksum, save date and score count.
pub const HEADER_LEN: usize = 8;

/// One score record on disk.
pub const SCORE_RECORD_LEN: usize = 11;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SaveHeader {
    pub checksum: [u8; CHECKSUM_LEN],
    pub day: u8,
    pub month: u8,
    pub year: u8,
    pub score_count: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ScoreRecord {
    pub day: u8,
    pub month: u8,
    pub year: u8,
    pub value: [u8; 4],
    pub initials: [u8; INITIALS_LEN],
}

const _: () = assert!(std::mem::size_of::<SaveHeader>() == HEADER_LEN);
const _: () = assert!(std::mem::size_of::<ScoreRecord>() == SCORE_RECORD_LEN);

impl SaveHeader {
    fn date(&self) -> Date {
        Date::new(self.day, self.month, self.year)
    }
}

impl From<&Score> for ScoreRecord {
    fn from(score: &Score) -> Self {
        ScoreRecord {
            day: score.date.day,
            month: score.date.month,
            year: score.date.year,
            value: score.value.to_le_bytes(),
            initials: *score.initials.as_bytes(),
        }
    }
}

impl From<ScoreRecord> for Score {
    fn from(record: ScoreRecord) -> Self {
        Score {
            date: Date::new(record.day, record.month, record.year),
            value: u32::from_le_bytes(record.value),
            initials: Initials::from_bytes(record.initials),
        }
    }
}

/// File size of a save holding `score_count` scores.
pub const fn encoded_len(score_count: usize) -> usize {
    HEADER_LEN + score_count * SCORE_RECORD_LEN
}

/// Checksum of a file image with its checksum field read as zero.
pub fn image_checksum(bytes: &[u8]) -> u32 {
    let mut image = bytes.to_vec();
    let field = CHECKSUM_LEN.min(image.len());
    image[..field].fill(0);
    file_checksum(&image)
}

/// Whether `bytes` fails to match `stored`.
///
/// Never modifies the image; the checksum field is zeroed on a copy.
pub fn image_is_tampered(bytes: &[u8], stored: u32) -> bool {
    image_checksum(bytes) != stored
}

/// Checksum field as stored in `bytes`, if the image is long enough.
fn stored_checksum(bytes: &[u8]) -> Option<u32> {
    let field = bytes.get(..CHECKSUM_LEN)?;
    let mut stored = [0u8; CHECKSUM_LEN];
    stored.copy_from_slice(field);
    Some(u32::from_le_bytes(stored))
}

/// Serialize `save` into a signed file image.
///
/// The computed checksum is also stored in `save`.
pub fn encode(save: &mut Save) -> Vec<u8> {
    let header = SaveHeader {
        checksum: [0; CHECKSUM_LEN],
        day: save.date.day,
        month: save.date.month,
        year: save.date.year,
        score_count: save.score_count(),
    };

    let mut bytes = Vec::with_capacity(encoded_len(save.scores().len()));
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    for score in save.scores() {
        bytes.extend_from_slice(bytemuck::bytes_of(&ScoreRecord::from(score)));
    }

    let checksum = file_checksum(&bytes);
    bytes[..CHECKSUM_LEN].copy_from_slice(&checksum.to_le_bytes());
    save.set_checksum(checksum);

    bytes
}

/// Parse and verify a file image.
///
/// # Errors
/// - [`SaveError::Truncated`] if the image is shorter than its header declares
/// - [`SaveError::ChecksumMismatch`] if the stored checksum does not match
/// - [`SaveError::TrailingBytes`] if a correctly signed image is too long
pub fn decode(bytes: &[u8]) -> Result<Save, SaveError> {
    let truncated = |expected: usize| SaveError::Truncated {
        expected,
        actual: bytes.len(),
        checksum_matches: stored_checksum(bytes)
            .is_some_and(|stored| image_checksum(bytes) == stored),
    };

    if bytes.len() < HEADER_LEN {
        return Err(truncated(HEADER_LEN));
    }

    let header: SaveHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
    let expected = encoded_len(header.score_count as usize);
    if bytes.len() < expected {
        return Err(truncated(expected));
    }

    let stored = u32::from_le_bytes(header.checksum);
    let computed = image_checksum(bytes);
    if computed != stored {
        log::warn!(
            "Save checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored,
            computed
        );
        return Err(SaveError::ChecksumMismatch { stored, computed });
    }

    if bytes.len() > expected {
        return Err(SaveError::TrailingBytes {
            expected,
            actual: bytes.len(),
        });
    }

    let scores = bytes[HEADER_LEN..expected]
        .chunks_exact(SCORE_RECORD_LEN)
        .map(|chunk| Score::from(bytemuck::pod_read_unaligned::<ScoreRecord>(chunk)))
        .collect();

    Ok(Save::from_parts(stored, header.date(), scores))
}

/// Write a signed save to a writer.
pub fn save<W: Write>(writer: &mut W, save: &mut Save) -> Result<(), SaveError> {
    let bytes = encode(save);
    writer.write_all(&bytes)?;
    Ok(())
}

/// Read and verify a save from a reader.
pub fn load<R: Read>(reader: &mut R) -> Result<Save, SaveError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode(&bytes)
}

/// Write a signed save to `path`, replacing any existing file.
///
/// The image goes to a temporary file in the same directory which is synced
/// and then renamed over `path`, so readers see either the old file or the
/// complete new one. The replacement keeps the permissions of the file it
/// replaces; a new file gets the mode a plain create would give it.
pub fn save_to_file<P: AsRef<Path>>(path: P, save: &mut Save) -> Result<(), SaveError> {
    let path = path.as_ref();
    let bytes = encode(save);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // masked by the umask like any other create
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    let mut tmp = builder.tempfile_in(dir)?;
    match fs::metadata(path) {
        Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    log::debug!(
        "Saved {} scores ({} bytes, checksum {:#010x}) to {:?}",
        save.score_count(),
        bytes.len(),
        save.checksum(),
        path
    );
    Ok(())
}

/// Read and verify the save at `path`.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Save, SaveError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let save = load(&mut file)?;

    log::debug!("Loaded {} scores from {:?}", save.score_count(), path);
    Ok(save)
}

/// Stored and recomputed checksum of the file at `path`.
///
/// The file is streamed through [`checksum_reader`] with its checksum field
/// read as zero; it is only ever opened for reading. The stored value is
/// `None` when the file is shorter than the checksum field.
pub fn file_checksums<P: AsRef<Path>>(path: P) -> Result<(Option<u32>, u32), SaveError> {
    let mut file = File::open(path)?;

    let mut field = Vec::with_capacity(CHECKSUM_LEN);
    (&mut file).take(CHECKSUM_LEN as u64).read_to_end(&mut field)?;

    let mut zeroed = io::repeat(0).take(field.len() as u64).chain(file);
    let computed = checksum_reader(&mut zeroed)?;

    Ok((stored_checksum(&field), computed))
}

/// Whether the file at `path` fails to match `stored`.
pub fn file_is_tampered<P: AsRef<Path>>(path: P, stored: u32) -> Result<bool, SaveError> {
    let (_, computed) = file_checksums(path)?;
    Ok(computed != stored)
}

/// Read the save at `path`, append `score` and write it back.
///
/// Nothing is written unless the existing file reads back cleanly.
pub fn add_score_to_file<P: AsRef<Path>>(path: P, score: Score) -> Result<Save, SaveError> {
    let path = path.as_ref();
    let mut updated = load_from_file(path)?.append(score)?;
    save_to_file(path, &mut updated)?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Save {
        Save::new(
            Date::new(28, 4, 24),
            vec![
                Score::new(Date::new(27, 4, 24), 102030, Initials::new("AMK").unwrap()),
                Score::new(Date::new(25, 2, 23), 101010, Initials::new("DBJ").unwrap()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn empty_save_layout() {
        let mut save = Save::new(Date::new(28, 4, 24), Vec::new()).unwrap();
        let bytes = encode(&mut save);

        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[4..], &[28, 4, 24, 0]);
        assert_eq!(save.checksum(), 0x00B4_0038);
        assert_eq!(&bytes[..4], &0x00B4_0038u32.to_le_bytes());
    }

    #[test]
    fn sample_layout_is_stable() {
        let mut save = sample();
        let bytes = encode(&mut save);

        assert_eq!(bytes.len(), encoded_len(2));
        assert_eq!(bytes.len(), 30);
        assert_eq!(
            bytes,
            [
                0x86, 0x04, 0x75, 0x37, // checksum
                28, 4, 24, 2, // save date, count
                27, 4, 24, 0x8E, 0x8E, 0x01, 0x00, b'A', b'M', b'K', 0, //
                25, 2, 23, 0x92, 0x8A, 0x01, 0x00, b'D', b'B', b'J', 0,
            ]
        );
        assert_eq!(save.checksum(), 0x3775_0486);
    }

    #[test]
    fn decode_round_trip() {
        let mut save = sample();
        let bytes = encode(&mut save);
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded, save);
        assert_eq!(decoded.checksum(), save.checksum());
    }

    #[test]
    fn image_checksum_ignores_stored_field() {
        let mut save = sample();
        let mut bytes = encode(&mut save);
        let expected = image_checksum(&bytes);

        bytes[..4].copy_from_slice(&[0xAA; 4]);
        assert_eq!(image_checksum(&bytes), expected);
        assert!(!image_is_tampered(&bytes, expected));
        assert!(image_is_tampered(&bytes, expected ^ 1));
    }

    #[test]
    fn short_images_are_truncated() {
        for len in 0..HEADER_LEN {
            let err = decode(&vec![0; len]).unwrap_err();
            assert!(matches!(err, SaveError::Truncated { expected: 8, actual, .. } if actual == len));
        }

        let mut save = sample();
        let bytes = encode(&mut save);
        let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            SaveError::Truncated {
                expected: 30,
                actual: 29,
                checksum_matches: false
            }
        ));
    }

    #[test]
    fn flipped_byte_is_tampering() {
        let mut save = sample();
        let bytes = encode(&mut save);

        let mut corrupt = bytes.clone();
        corrupt[20] ^= 0x01;
        assert!(decode(&corrupt).unwrap_err().is_tampered());
    }

    #[test]
    fn appended_bytes() {
        let mut save = sample();
        let mut bytes = encode(&mut save);
        bytes.push(0);

        // foreign bytes are not covered by the stored checksum
        assert!(decode(&bytes).unwrap_err().is_tampered());

        // re-signed with the extra byte the layout still rejects it
        let checksum = image_checksum(&bytes);
        bytes[..4].copy_from_slice(&checksum.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(SaveError::TrailingBytes { expected: 30, actual: 31 })
        ));
    }

    #[test]
    fn streamed_file_checksum_matches_image() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("image.sf");

        let mut save = sample();
        let signed = encode(&mut save);
        let long: Vec<u8> = (0..700u32).map(|i| (i * 7 % 256) as u8).collect();

        for image in [&signed[..], &signed[..2], &[0u8; 0][..], &long[..]] {
            std::fs::write(&path, image).unwrap();

            let (stored, computed) = file_checksums(&path).unwrap();
            assert_eq!(stored, stored_checksum(image));
            assert_eq!(computed, image_checksum(image));
        }

        std::fs::write(&path, &signed).unwrap();
        assert!(!file_is_tampered(&path, save.checksum()).unwrap());
        assert!(file_is_tampered(&path, save.checksum() ^ 1).unwrap());
    }

    #[test]
    fn writer_and_reader() {
        let mut save = sample();
        let mut buffer = Vec::new();
        super::save(&mut buffer, &mut save).unwrap();

        let loaded = load(&mut buffer.as_slice()).unwrap();
        assert_eq!(loaded, save);
    }
}
