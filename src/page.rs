use crate::Eeprom;
use crate::error::Error;
use crate::platform::Platform;
use crate::raw::{
    PAGE_ERASE_COUNT_OFFSET, PAGE_HEADER_SIZE, PAGE_STATUS_OFFSET, PACKET_SIZE, Packet, PageMagic,
    read_packet, read_word, write_packet, write_word,
};
#[cfg(feature = "defmt")]
use defmt::trace;

/// One of the two physical pages.
#[derive(
    strum::FromRepr, strum::Display, strum::EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PageId {
    Page0 = 0,
    Page1 = 1,
}

impl PageId {
    pub const fn other(self) -> Self {
        match self {
            PageId::Page0 => PageId::Page1,
            PageId::Page1 => PageId::Page0,
        }
    }
}

impl TryFrom<u8> for PageId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PageId::from_repr(value).ok_or(Error::BadParam)
    }
}

/// Decoded page status word. The discriminants index the recovery table.
#[derive(
    strum::Display, strum::EnumIter, strum::EnumCount, Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PageStatus {
    Erased = 0,
    Receiving = 1,
    Active = 2,
    /// The status word matches none of the known magics.
    Undefined = 3,
}

impl PageStatus {
    pub(crate) const fn magic(self) -> Option<PageMagic> {
        match self {
            PageStatus::Erased => Some(PageMagic::Erased),
            PageStatus::Receiving => Some(PageMagic::Receiving),
            PageStatus::Active => Some(PageMagic::Active),
            PageStatus::Undefined => None,
        }
    }
}

impl From<PageMagic> for PageStatus {
    fn from(val: PageMagic) -> Self {
        match val {
            PageMagic::Erased => PageStatus::Erased,
            PageMagic::Receiving => PageStatus::Receiving,
            PageMagic::Active => PageStatus::Active,
        }
    }
}

impl From<u32> for PageStatus {
    fn from(val: u32) -> Self {
        PageMagic::from_repr(val)
            .map(PageStatus::from)
            .unwrap_or(PageStatus::Undefined)
    }
}

impl<T: Platform> Eeprom<T> {
    pub(crate) fn slots_per_page(&self) -> usize {
        self.config.slots_per_page()
    }

    pub(crate) fn slot_offset(&self, page: PageId, slot: usize) -> u32 {
        self.config.page_base(page) + (PAGE_HEADER_SIZE + slot * PACKET_SIZE) as u32
    }

    pub(crate) fn read_page_status(&mut self, page: PageId) -> Result<PageStatus, Error> {
        let base = self.config.page_base(page);
        read_word(&mut self.hal, base + PAGE_STATUS_OFFSET).map(PageStatus::from)
    }

    /// Programs a new status word. Only transitions that clear bits of the current word are
    /// accepted, an unknown word may still be forced to `Active`.
    pub(crate) fn set_page_status(&mut self, page: PageId, status: PageStatus) -> Result<(), Error> {
        let magic = status.magic().ok_or(Error::BadParam)? as u32;
        let offset = self.config.page_base(page) + PAGE_STATUS_OFFSET;

        let current = read_word(&mut self.hal, offset)?;
        if current & magic != magic {
            return Err(Error::InvalidTransition);
        }
        if current == magic {
            return Ok(());
        }

        #[cfg(feature = "defmt")]
        trace!("set_page_status: {} {:#010x} -> {}", page, current, status);

        write_word(&mut self.hal, offset, magic)
    }

    pub(crate) fn read_erase_count(&mut self, page: PageId) -> Result<u32, Error> {
        let base = self.config.page_base(page);
        read_word(&mut self.hal, base + PAGE_ERASE_COUNT_OFFSET)
    }

    /// Erases the page and persists the incremented erase count. The status word ends up erased.
    pub(crate) fn erase_page(&mut self, page: PageId) -> Result<(), Error> {
        let erase_count = match self.read_erase_count(page)? {
            u32::MAX => 0,
            count => count,
        };

        #[cfg(feature = "defmt")]
        trace!("erase_page: {} (#{})", page, erase_count);

        let base = self.config.page_base(page);
        self.hal
            .erase(base, base + self.config.page_size)
            .map_err(|_| Error::EraseError)?;

        write_word(
            &mut self.hal,
            base + PAGE_ERASE_COUNT_OFFSET,
            erase_count.wrapping_add(1),
        )
    }

    /// Every slot of the page body is empty. The header is not inspected.
    pub(crate) fn is_page_erased(&mut self, page: PageId) -> Result<bool, Error> {
        Ok(self.find_first_used_slot(page)?.is_none())
    }

    /// Erased status word and erased body, so the page can receive a transfer as is.
    pub(crate) fn is_page_blank(&mut self, page: PageId) -> Result<bool, Error> {
        Ok(self.read_page_status(page)? == PageStatus::Erased && self.is_page_erased(page)?)
    }

    /// Index of the first empty slot, `None` if the page is full.
    pub(crate) fn find_next_write_slot(&mut self, page: PageId) -> Result<Option<usize>, Error> {
        for slot in 0..self.slots_per_page() {
            if self.load_packet(page, slot)?.is_empty() {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    fn find_first_used_slot(&mut self, page: PageId) -> Result<Option<usize>, Error> {
        for slot in 0..self.slots_per_page() {
            if !self.load_packet(page, slot)?.is_empty() {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    pub(crate) fn load_packet(&mut self, page: PageId, slot: usize) -> Result<Packet, Error> {
        let offset = self.slot_offset(page, slot);
        read_packet(&mut self.hal, offset)
    }

    pub(crate) fn program_packet(
        &mut self,
        page: PageId,
        slot: usize,
        packet: &Packet,
    ) -> Result<(), Error> {
        let offset = self.slot_offset(page, slot);
        write_packet(&mut self.hal, offset, packet)
    }
}
