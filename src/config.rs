use crate::error::Error;
use crate::page::PageId;
use crate::platform::{AlignedOps, Platform};
use crate::raw::{PACKET_SIZE, PAGE_HEADER_SIZE};

/// Placement of the two pages inside the flash address space of the backend.
///
/// Both pages have the same size, must start on an erase boundary and span whole erase blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub page0_base: u32,
    pub page1_base: u32,
    pub page_size: u32,
    /// Read every packet back after programming it and retry in the next slot on a mismatch.
    pub verify_writes: bool,
}

impl Config {
    pub const fn new(page0_base: u32, page1_base: u32, page_size: u32) -> Self {
        Self {
            page0_base,
            page1_base,
            page_size,
            verify_writes: true,
        }
    }

    /// Page 1 directly follows page 0.
    pub const fn contiguous(base: u32, page_size: u32) -> Self {
        Self::new(base, base.saturating_add(page_size), page_size)
    }

    pub const fn with_write_verification(mut self, enabled: bool) -> Self {
        self.verify_writes = enabled;
        self
    }

    pub const fn page_base(&self, page: PageId) -> u32 {
        match page {
            PageId::Page0 => self.page0_base,
            PageId::Page1 => self.page1_base,
        }
    }

    /// Number of packets a page can hold after its header.
    pub const fn slots_per_page(&self) -> usize {
        (self.page_size as usize).saturating_sub(PAGE_HEADER_SIZE) / PACKET_SIZE
    }

    pub(crate) fn validate<T: Platform>(&self, capacity: usize) -> Result<(), Error> {
        if !T::supports_word_access() {
            return Err(Error::AlignmentError);
        }

        let page_size = self.page_size as usize;
        if !page_size.is_multiple_of(PACKET_SIZE)
            || !T::is_erase_aligned(page_size)
            || !T::is_erase_aligned(self.page0_base as usize)
            || !T::is_erase_aligned(self.page1_base as usize)
        {
            return Err(Error::AlignmentError);
        }

        if self.slots_per_page() == 0 {
            return Err(Error::BadParam);
        }

        let (low, high) = if self.page0_base <= self.page1_base {
            (self.page0_base as u64, self.page1_base as u64)
        } else {
            (self.page1_base as u64, self.page0_base as u64)
        };
        if low + page_size as u64 > high || high + page_size as u64 > capacity as u64 {
            return Err(Error::BadParam);
        }

        Ok(())
    }
}
