use sha1::{Digest, Sha1};
use std::io::{self, Write};

/// Size of the SHA-1 trailer appended to pack and index files
pub const CHECKSUM_SIZE: usize = 20;

/// Writer that hashes everything passing through it
///
/// Used to emit files whose last 20 bytes are the SHA-1 of all preceding bytes.
#[derive(Debug)]
pub struct Checksum<W: Write> {
    writer: W,
    digest: Sha1,
}

impl<W: Write> Checksum<W> {
    pub fn new(writer: W) -> Self {
        Checksum {
            writer,
            digest: Sha1::new(),
        }
    }

    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.digest.update(data);
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.write(&value.to_be_bytes())
    }

    /// Append the digest of everything written so far and hand back the writer
    pub fn write_checksum(mut self) -> io::Result<(W, [u8; CHECKSUM_SIZE])> {
        let checksum: [u8; CHECKSUM_SIZE] = self.digest.clone().finalize().into();
        self.writer.write_all(&checksum)?;
        self.writer.flush()?;

        Ok((self.writer, checksum))
    }
}

pub fn digest(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
    Sha1::digest(data).into()
}

/// Check that the trailing 20 bytes are the SHA-1 of the bytes before them
pub fn verify_trailer(data: &[u8]) -> bool {
    match data.len().checked_sub(CHECKSUM_SIZE) {
        Some(body_len) => digest(&data[..body_len])[..] == data[body_len..],
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_trailer_verifies() {
        let mut checksum = Checksum::new(Vec::new());
        checksum.write(b"some index bytes").unwrap();
        checksum.write_u32(42).unwrap();
        let (bytes, trailer) = checksum.write_checksum().unwrap();

        assert!(verify_trailer(&bytes));
        assert_eq!(&bytes[bytes.len() - CHECKSUM_SIZE..], &trailer);
    }

    #[test]
    fn flipped_bit_fails_verification() {
        let (mut bytes, _) = {
            let mut checksum = Checksum::new(Vec::new());
            checksum.write(b"payload").unwrap();
            checksum.write_checksum().unwrap()
        };
        bytes[0] ^= 0x01;

        assert!(!verify_trailer(&bytes));
    }

    #[test]
    fn too_short_input_never_verifies() {
        assert!(!verify_trailer(&[0u8; 10]));
    }
}
