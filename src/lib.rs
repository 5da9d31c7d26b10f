#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

mod compact;
pub mod config;
pub mod error;
pub mod page;
pub mod platform;
pub mod raw;
mod recovery;
mod scrub;
mod store;

pub use config::Config;
pub use page::{PageId, PageStatus};
pub use raw::Packet;

use crate::error::Error;
use crate::platform::Platform;
use crate::store::Cursor;
#[cfg(feature = "defmt")]
use defmt::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct EepromStatistics {
    pub active_page: PageId,
    /// Indexed by `PageId as usize`.
    pub pages: [PageStatistics; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageStatistics {
    pub status: PageStatus,
    pub erase_count: u32,
    pub entries: EntryStatistics,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryStatistics {
    pub empty: u32,
    pub written: u32,
    pub freed: u32,
    pub corrupted: u32,
}

/// Two-page EEPROM emulation. Keeps the write cursor in memory, everything else lives in flash.
pub struct Eeprom<T: Platform> {
    pub(crate) hal: T,
    pub(crate) config: Config,
    pub(crate) cursor: Cursor,
    pub(crate) initialized: bool,
    pub(crate) faulted: bool,
}

impl<T: Platform> Eeprom<T> {
    /// Validates the page layout against the backend. Does not touch the flash, call
    /// [`Eeprom::init`] before accessing variables.
    pub fn new(config: Config, hal: T) -> Result<Eeprom<T>, Error> {
        config.validate::<T>(hal.capacity())?;

        Ok(Self {
            hal,
            config,
            cursor: Cursor {
                page: PageId::Page0,
                next_slot: None,
            },
            initialized: false,
            faulted: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Inspects both page headers and repairs whatever a power loss left behind:
    /// 1. Resume the active page, or compact it if it is full
    /// 2. Finish or restart an interrupted transfer
    /// 3. Format both pages if the headers contradict each other
    ///
    /// Afterwards stale duplicates are tombstoned. Corrupted packets found on the way are left
    /// in place and reported by [`Eeprom::read_var`] and [`Eeprom::check_data_integrity`].
    pub fn init(&mut self) -> Result<(), Error> {
        self.initialized = false;
        self.faulted = false;

        let result = self.recover();
        self.latch_fault(result)?;
        self.initialized = true;

        match self.scrub() {
            Ok(()) => Ok(()),
            Err(e @ Error::FlashError) => {
                self.faulted = true;
                Err(e)
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                warn!("init: integrity check failed: {}", _e);

                Ok(())
            }
        }
    }

    /// Erases both pages, activates page 0 and leaves the store ready for writes. Clears an earlier
    /// fault like [`Eeprom::init`] does.
    pub fn format(&mut self) -> Result<(), Error> {
        self.initialized = false;
        self.faulted = false;

        let result = self.reformat();
        self.latch_fault(result)?;
        self.initialized = true;
        Ok(())
    }

    /// Writes a value. The previous value of the variable is only freed after the new one has been
    /// programmed (and verified, see [`Config::verify_writes`]).
    ///
    /// `0x0000` and `0xFFFF` are reserved and rejected with [`Error::WriteError`], as is a write
    /// into a store whose pages are full of distinct variables.
    ///
    /// A full page is compacted right after the write. If that compaction fails, its error is
    /// returned although the new value has already been stored and superseded the old one.
    pub fn write_var(&mut self, virtual_address: u16, data: u32) -> Result<(), Error> {
        self.ensure_writable()?;

        let result = self.store_var(virtual_address, data);
        self.latch_fault(result)
    }

    /// Reads the newest value of a variable.
    pub fn read_var(&mut self, virtual_address: u16) -> Result<u32, Error> {
        self.ensure_initialized()?;

        let result = self.load_var(virtual_address);
        self.latch_fault(result)
    }

    /// Frees a variable. Missing variables are ignored.
    pub fn delete_var(&mut self, virtual_address: u16) -> Result<(), Error> {
        self.ensure_writable()?;

        let end = self.cursor_end();
        let result = self.free_var(virtual_address, end);
        self.latch_fault(result)
    }

    /// Verifies the checksum of every live packet in the active page and tombstones duplicates.
    /// Stops at the first corrupted packet with [`Error::DataCorrupted`].
    pub fn check_data_integrity(&mut self) -> Result<(), Error> {
        self.ensure_writable()?;

        let result = self.scrub();
        self.latch_fault(result)
    }

    /// Copies the newest intact packet of every variable into `buffer`, newest first, and returns
    /// the number of packets copied. Corrupted packets are skipped.
    ///
    /// Fails with [`Error::BadParam`] if `buffer` is too small. Sizing it with
    /// [`Config::slots_per_page`] always suffices.
    pub fn read_all_var(&mut self, buffer: &mut [Packet]) -> Result<usize, Error> {
        self.ensure_initialized()?;

        let result = self.collect_vars(buffer);
        self.latch_fault(result)
    }

    /// True if neither page body holds any packet. Page headers are not considered, so a freshly
    /// formatted store is erased.
    pub fn is_eeprom_erased(&mut self) -> Result<bool, Error> {
        let result = self.are_pages_erased();
        self.latch_fault(result)
    }

    /// Raw erase counter of a page. `0xFFFF_FFFF` for a page that has never been erased by this
    /// crate.
    pub fn erase_count(&mut self, page: PageId) -> Result<u32, Error> {
        let result = self.read_erase_count(page);
        self.latch_fault(result)
    }

    pub fn page_status(&mut self, page: PageId) -> Result<PageStatus, Error> {
        let result = self.read_page_status(page);
        self.latch_fault(result)
    }

    /// The page receiving writes, `None` before a successful `init()`.
    pub fn active_page(&self) -> Option<PageId> {
        self.initialized.then_some(self.cursor.page)
    }

    /// Returns detailed statistics about both pages
    pub fn statistics(&mut self) -> Result<EepromStatistics, Error> {
        self.ensure_initialized()?;

        let result = self.collect_statistics();
        self.latch_fault(result)
    }

    fn are_pages_erased(&mut self) -> Result<bool, Error> {
        Ok(self.is_page_erased(PageId::Page0)? && self.is_page_erased(PageId::Page1)?)
    }

    fn collect_statistics(&mut self) -> Result<EepromStatistics, Error> {
        Ok(EepromStatistics {
            active_page: self.cursor.page,
            pages: [
                self.page_statistics(PageId::Page0)?,
                self.page_statistics(PageId::Page1)?,
            ],
        })
    }

    fn page_statistics(&mut self, page: PageId) -> Result<PageStatistics, Error> {
        let mut entries = EntryStatistics::default();
        for slot in 0..self.slots_per_page() {
            let packet = self.load_packet(page, slot)?;
            if packet.is_empty() {
                entries.empty += 1;
            } else if packet.is_freed() {
                entries.freed += 1;
            } else if packet.is_intact() {
                entries.written += 1;
            } else {
                entries.corrupted += 1;
            }
        }

        Ok(PageStatistics {
            status: self.read_page_status(page)?,
            erase_count: self.read_erase_count(page)?,
            entries,
        })
    }

    fn ensure_initialized(&self) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), Error> {
        self.ensure_initialized()?;
        if self.faulted {
            return Err(Error::FlashError);
        }
        Ok(())
    }

    /// A failing backend leaves the pages in an unknown state, refuse writes until `init()`.
    fn latch_fault<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        match result {
            Err(e @ (Error::FlashError | Error::EraseError)) => {
                self.faulted = true;
                Err(e)
            }
            other => other,
        }
    }
}
