use crate::Eeprom;
use crate::error::Error;
use crate::page::PageId;
use crate::platform::Platform;
use crate::raw::{Packet, is_valid_virtual_address};
#[cfg(feature = "defmt")]
use defmt::{debug, trace, warn};

/// Write position inside the active page. Rebuilt from flash by recovery, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct Cursor {
    pub(crate) page: PageId,
    /// First empty slot, `None` once the page is full.
    pub(crate) next_slot: Option<usize>,
}

impl<T: Platform> Eeprom<T> {
    /// Exclusive upper bound of the occupied slots of the active page.
    pub(crate) fn cursor_end(&self) -> usize {
        self.cursor
            .next_slot
            .unwrap_or_else(|| self.slots_per_page())
    }

    /// Adopts `page` as the active page and points the cursor at its first empty slot.
    /// Returns false if the page is full.
    pub(crate) fn locate_cursor(&mut self, page: PageId) -> Result<bool, Error> {
        let next_slot = self.find_next_write_slot(page)?;
        self.cursor = Cursor { page, next_slot };

        #[cfg(feature = "defmt")]
        debug!("locate_cursor: {}", self.cursor);

        Ok(next_slot.is_some())
    }

    fn advance_cursor(&mut self, written_slot: usize) {
        let next = written_slot + 1;
        self.cursor.next_slot = (next < self.slots_per_page()).then_some(next);
    }

    /// Appends a packet at the cursor, tombstones the previous copy of the variable and compacts
    /// once the page is full.
    pub(crate) fn store_var(&mut self, virtual_address: u16, data: u32) -> Result<(), Error> {
        if !is_valid_virtual_address(virtual_address) {
            return Err(Error::WriteError);
        }

        let mut slot = match self.cursor.next_slot {
            Some(slot) => slot,
            None => self.reclaim_space()?,
        };
        let page = self.cursor.page;
        let packet = Packet::new(virtual_address, data);

        #[cfg(feature = "defmt")]
        trace!(
            "store_var: {:#06x} = {:#010x} @ {}[{}]",
            virtual_address, data, page, slot
        );

        loop {
            self.program_packet(page, slot, &packet)?;
            if !self.config.verify_writes || self.load_packet(page, slot)? == packet {
                break;
            }

            #[cfg(feature = "defmt")]
            warn!("store_var: verification failed @ {}[{}]", page, slot);

            self.program_packet(page, slot, &Packet::FREED)?;
            slot += 1;
            if slot == self.slots_per_page() {
                self.cursor.next_slot = None;
                self.compact()?;
                return Err(Error::WriteError);
            }
            self.cursor.next_slot = Some(slot);
        }

        // the new packet is confirmed, only now the old one may go
        self.free_var(virtual_address, slot)?;

        self.advance_cursor(slot);
        if self.cursor.next_slot.is_none() {
            self.compact()?;
        }

        Ok(())
    }

    /// The newest packet of the variable decides, older copies are never consulted.
    pub(crate) fn load_var(&mut self, virtual_address: u16) -> Result<u32, Error> {
        if !is_valid_virtual_address(virtual_address) {
            return Err(Error::ReadError);
        }

        let page = self.cursor.page;
        for slot in (0..self.cursor_end()).rev() {
            let packet = self.load_packet(page, slot)?;
            if packet.virtual_address != virtual_address {
                continue;
            }

            return if packet.has_valid_crc() {
                Ok(packet.data)
            } else {
                Err(Error::DataCorrupted)
            };
        }

        Err(Error::ReadError)
    }

    /// Tombstones the newest packet of the variable below slot `end`. A missing variable is not an
    /// error.
    pub(crate) fn free_var(&mut self, virtual_address: u16, end: usize) -> Result<(), Error> {
        if end > self.slots_per_page() || !is_valid_virtual_address(virtual_address) {
            return Err(Error::BadParam);
        }

        let page = self.cursor.page;
        for slot in (0..end).rev() {
            if self.load_packet(page, slot)?.virtual_address == virtual_address {
                #[cfg(feature = "defmt")]
                trace!("free_var: {:#06x} @ {}[{}]", virtual_address, page, slot);

                return self.program_packet(page, slot, &Packet::FREED);
            }
        }

        Ok(())
    }

    /// Copies the newest intact packet of every variable into `buffer`, newest first.
    pub(crate) fn collect_vars(&mut self, buffer: &mut [Packet]) -> Result<usize, Error> {
        let page = self.cursor.page;
        let mut count = 0;

        for slot in (0..self.cursor_end()).rev() {
            let packet = self.load_packet(page, slot)?;
            if !packet.is_intact() {
                continue;
            }
            if buffer[..count]
                .iter()
                .any(|known| known.virtual_address == packet.virtual_address)
            {
                continue;
            }

            let entry = buffer.get_mut(count).ok_or(Error::BadParam)?;
            *entry = packet;
            count += 1;
        }

        Ok(count)
    }
}
