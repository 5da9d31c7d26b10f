#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use flash_eeprom::raw::{PACKET_SIZE, PAGE_HEADER_SIZE};
use flash_eeprom::{Config, PageId};

pub const FLASH_SECTOR_SIZE: usize = 1024;
// Smallest unit the flash programs at once. An 8-byte packet takes two operations.
pub const WORD_SIZE: usize = 4;
pub const SLOTS_PER_PAGE: usize = (FLASH_SECTOR_SIZE - PAGE_HEADER_SIZE) / PACKET_SIZE;

#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    /// A single operation that fails, every later one succeeds again.
    pub fail_operation: Option<usize>,
    pub operations: Vec<Operation>,
    /// Byte offset and bits of that byte which can no longer be programmed to zero.
    pub stuck_bits: Vec<(usize, u8)>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    pub fn new(pages: usize) -> Self {
        Self {
            buf: vec![0xffu8; FLASH_SECTOR_SIZE * pages],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(pages: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; FLASH_SECTOR_SIZE * pages],
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn from_buf(buf: Vec<u8>) -> Self {
        Self {
            buf,
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    /// Simulates a power loss after `operations` more operations.
    pub fn fail_in(&mut self, operations: usize) {
        self.fail_after_operation = self.operations.len() + operations;
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }

    pub fn page_offset(page: PageId) -> usize {
        page as usize * FLASH_SECTOR_SIZE
    }

    pub fn slot_offset(page: PageId, slot: usize) -> usize {
        Self::page_offset(page) + PAGE_HEADER_SIZE + slot * PACKET_SIZE
    }

    pub fn set_status_word(&mut self, page: PageId, value: u32) {
        let offset = Self::page_offset(page);
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn status_word(&self, page: PageId) -> u32 {
        let offset = Self::page_offset(page);
        u32::from_le_bytes(self.buf[offset..offset + 4].try_into().unwrap())
    }

    pub fn slot(&self, page: PageId, slot: usize) -> [u8; PACKET_SIZE] {
        let offset = Self::slot_offset(page, slot);
        self.buf[offset..offset + PACKET_SIZE].try_into().unwrap()
    }

    pub fn set_slot(&mut self, page: PageId, slot: usize, bytes: [u8; PACKET_SIZE]) {
        let offset = Self::slot_offset(page, slot);
        self.buf[offset..offset + PACKET_SIZE].copy_from_slice(&bytes);
    }

    /// Flips bits in place, bypassing the program rules. Models cell degradation.
    pub fn flip_bits(&mut self, offset: usize, mask: u8) {
        self.buf[offset] ^= mask;
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn fault(&mut self) -> bool {
        if self.fail_operation == Some(self.operations.len()) {
            self.fail_operation = None;
            return true;
        }
        self.operations.len() >= self.fail_after_operation
    }
}

pub fn config() -> Config {
    Config::contiguous(0, FLASH_SECTOR_SIZE as u32)
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        if self.fault() {
            return Err(FlashError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        if self.fault() {
            return Err(FlashError);
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }
        Ok(())
    }

    /// Programs word by word, so a power loss can tear a packet in half.
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len() > 0);

        for (index, word) in bytes.chunks(WORD_SIZE).enumerate() {
            if self.fault() {
                return Err(FlashError);
            }

            let word_offset = offset as usize + index * WORD_SIZE;
            self.operations.push(Operation::Write {
                offset: word_offset as u32,
                len: WORD_SIZE,
            });

            for (i, &val) in word.iter().enumerate() {
                let addr = word_offset + i;
                let stuck = self
                    .stuck_bits
                    .iter()
                    .filter(|(stuck_addr, _)| *stuck_addr == addr)
                    .fold(0u8, |acc, (_, mask)| acc | mask);
                // NOR flash can only flip bits from 1 to 0
                self.buf[addr] &= val | stuck;
            }
        }
        Ok(())
    }
}
