use embedded_storage::nor_flash::{
    check_erase,
    check_read,
    check_write,
    ErrorType,
    NorFlash,
    NorFlashError,
    NorFlashErrorKind,
    ReadNorFlash,
};

/// Erase granularity of the in-memory flash. Image page sizes have to be a multiple of it.
pub const ERASE_SIZE: usize = 1024;

/// NOR flash backed by a `Vec<u8>`. Programming only clears bits, erasing sets a whole block to
/// `0xFF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemFlash {
    buf: Vec<u8>,
}

impl MemFlash {
    /// A fully erased flash of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0xFF; size],
        }
    }

    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemFlashError(NorFlashErrorKind);

impl NorFlashError for MemFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        self.0
    }
}

impl ErrorType for MemFlash {
    type Error = MemFlashError;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len()).map_err(MemFlashError)?;

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = 4;

    const ERASE_SIZE: usize = ERASE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to).map_err(MemFlashError)?;

        self.buf[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len()).map_err(MemFlashError)?;

        let offset = offset as usize;
        for (cell, &value) in self.buf[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *cell &= value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_only_clears_bits() {
        let mut flash = MemFlash::new(ERASE_SIZE);

        flash.write(0, &[0xF0, 0x0F, 0xFF, 0x00]).unwrap();
        flash.write(0, &[0x3C, 0xFF, 0xFF, 0xFF]).unwrap();

        assert_eq!(&flash.as_bytes()[..4], &[0x30, 0x0F, 0xFF, 0x00]);
    }

    #[test]
    fn erase_restores_block() {
        let mut flash = MemFlash::from_bytes(vec![0x00; 2 * ERASE_SIZE]);

        flash.erase(ERASE_SIZE as u32, 2 * ERASE_SIZE as u32).unwrap();

        assert!(flash.as_bytes()[..ERASE_SIZE].iter().all(|&b| b == 0x00));
        assert!(flash.as_bytes()[ERASE_SIZE..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn rejects_misaligned_access() {
        let mut flash = MemFlash::new(ERASE_SIZE);

        assert_eq!(
            flash.write(2, &[0; 4]).unwrap_err().kind(),
            NorFlashErrorKind::NotAligned
        );
        assert_eq!(
            flash.erase(0, 512).unwrap_err().kind(),
            NorFlashErrorKind::NotAligned
        );
        assert_eq!(
            flash.read(ERASE_SIZE as u32, &mut [0; 1]).unwrap_err().kind(),
            NorFlashErrorKind::OutOfBounds
        );
    }
}
