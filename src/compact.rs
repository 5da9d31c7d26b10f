use crate::Eeprom;
use crate::error::Error;
use crate::page::{PageId, PageStatus};
use crate::platform::Platform;
use crate::store::Cursor;
#[cfg(feature = "defmt")]
use defmt::{debug, warn};

impl<T: Platform> Eeprom<T> {
    /// Moves the live packets of the full active page to the other page. A failed compaction
    /// leaves the store faulted until the next `init()`.
    pub(crate) fn compact(&mut self) -> Result<(), Error> {
        let source = self.cursor.page;
        match self.transfer(source, source.other()) {
            Ok(()) => Ok(()),
            Err(e) => {
                #[cfg(feature = "defmt")]
                warn!("compact: transfer from {} failed: {}", source, e);

                self.faulted = true;
                Err(e)
            }
        }
    }

    /// Makes room in a full active page by compacting it, which only helps if some of its slots
    /// were freed. A page full of distinct variables is left alone to save the erase cycle.
    pub(crate) fn reclaim_space(&mut self) -> Result<usize, Error> {
        let page = self.cursor.page;
        if !self.contains_freed_slot(page)? {
            return Err(Error::WriteError);
        }

        self.compact()?;
        self.cursor.next_slot.ok_or(Error::WriteError)
    }

    fn contains_freed_slot(&mut self, page: PageId) -> Result<bool, Error> {
        for slot in 0..self.slots_per_page() {
            if self.load_packet(page, slot)?.is_freed() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Copies every live slot of `source` to `destination` in order, erases `source` and makes
    /// `destination` the active page.
    ///
    /// Until `source` is erased a power loss leaves it untouched and recovery restarts the
    /// transfer. Afterwards the `Receiving` destination is completed by recovery.
    pub(crate) fn transfer(&mut self, source: PageId, destination: PageId) -> Result<(), Error> {
        if source == destination {
            return Err(Error::BadParam);
        }

        #[cfg(feature = "defmt")]
        debug!("transfer: {} -> {}", source, destination);

        if !self.is_page_blank(destination)? {
            self.erase_page(destination)?;
        }
        self.set_page_status(destination, PageStatus::Receiving)?;
        self.cursor = Cursor {
            page: destination,
            next_slot: Some(0),
        };

        let slots = self.slots_per_page();
        let mut next = 0;
        for slot in 0..slots {
            let packet = self.load_packet(source, slot)?;
            if !packet.is_live() {
                continue;
            }
            if next == slots {
                return Err(Error::WriteError);
            }

            self.program_packet(destination, next, &packet)?;
            next += 1;
        }

        self.erase_page(source)?;
        self.set_page_status(destination, PageStatus::Active)?;
        self.cursor.next_slot = (next < slots).then_some(next);

        Ok(())
    }

    /// Discards the partial copy in `destination` and runs the whole transfer again.
    pub(crate) fn restart_transfer(
        &mut self,
        source: PageId,
        destination: PageId,
    ) -> Result<(), Error> {
        if source == destination {
            return Err(Error::BadParam);
        }

        self.erase_page(destination)?;
        self.transfer(source, destination)
    }
}
