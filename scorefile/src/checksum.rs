//! Chunked Adler-32 checksum used to sign save files.
//!
//! The input is split into fixed [`CHUNK_SIZE`] byte chunks. Every chunk is
//! hashed on its own and the per-chunk values are folded together with XOR,
//! starting from [`CHECKSUM_SEED`]. This is not the same value as a single
//! Adler-32 pass over the whole input, and the chunk boundaries are part of
//! the file format.

use std::io::{self, Read};

/// Size of one checksum chunk in bytes.
pub const CHUNK_SIZE: usize = 128;

/// Largest prime below 2^16.
pub const ADLER_MOD: u32 = 65521;

/// Starting value of the XOR fold. Non-zero so an all-zero file does not
/// checksum to zero.
pub const CHECKSUM_SEED: u32 = 1;

/// Adler-32 over a single byte slice.
#[inline]
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for &byte in bytes {
        a = (a + byte as u32) % ADLER_MOD;
        b = (b + a) % ADLER_MOD;
    }

    (b << 16) | a
}

/// Combined checksum of an in-memory file image.
///
/// Empty input produces no chunks and yields [`CHECKSUM_SEED`].
pub fn file_checksum(data: &[u8]) -> u32 {
    data.chunks(CHUNK_SIZE)
        .fold(CHECKSUM_SEED, |combined, chunk| combined ^ adler32(chunk))
}

/// Combined checksum of everything `reader` yields.
///
/// Each chunk buffer is filled completely before it is hashed, so short
/// reads from the underlying source never move a chunk boundary. The result
/// always equals [`file_checksum`] over the same bytes. File verification
/// (`save::file_checksums`) streams through this.
pub fn checksum_reader<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut combined = CHECKSUM_SEED;

    loop {
        let filled = fill_chunk(reader, &mut buffer)?;
        if filled == 0 {
            break;
        }

        combined ^= adler32(&buffer[..filled]);

        if filled < CHUNK_SIZE {
            break;
        }
    }

    Ok(combined)
}

/// Read until `buffer` is full or the source is exhausted.
fn fill_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
