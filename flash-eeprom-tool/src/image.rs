use std::collections::BTreeMap;
use std::fmt;

use flash_eeprom::raw::{PACKET_SIZE, PAGE_HEADER_SIZE};
use flash_eeprom::{Config, Eeprom, Packet, PageId, PageStatus};

use crate::error::Error;
use crate::mem_flash::{MemFlash, ERASE_SIZE};
use crate::VariableSet;

/// Formats a blank two-page flash and writes every variable through the library, so the image is
/// exactly what a device would hold after the same writes.
pub(crate) fn generate_image_data(
    variables: &VariableSet,
    page_size: usize,
) -> Result<Vec<u8>, Error> {
    let config = page_config(page_size)?;

    // init() gives up on a page without a single empty slot
    let capacity = config.slots_per_page().saturating_sub(1);
    if variables.variables.len() > capacity {
        return Err(Error::TooManyVariables {
            count: variables.variables.len(),
            capacity,
        });
    }

    let mut flash = MemFlash::new(2 * page_size);
    {
        let mut eeprom = Eeprom::new(config, &mut flash)?;
        eeprom.format()?;
        for (&address, &value) in &variables.variables {
            eeprom.write_var(address, value)?;
        }
    }

    Ok(flash.into_bytes())
}

/// Runs recovery on a copy of the image and reads back the newest intact value of every variable.
pub(crate) fn parse_image_data(data: &[u8]) -> Result<VariableSet, Error> {
    let config = page_config(image_page_size(data.len())?)?;

    let mut flash = MemFlash::from_bytes(data.to_vec());
    let mut eeprom = Eeprom::new(config, &mut flash)?;
    eeprom.init()?;

    let mut buffer = vec![Packet::EMPTY; config.slots_per_page()];
    let count = eeprom.read_all_var(&mut buffer)?;

    let variables: BTreeMap<u16, u32> = buffer[..count]
        .iter()
        .map(|packet| (packet.virtual_address, packet.data))
        .collect();

    Ok(VariableSet { variables })
}

/// Decodes headers and slots of both pages without interpreting or repairing anything.
pub fn inspect_image(data: &[u8]) -> Result<ImageReport, Error> {
    let page_size = image_page_size(data.len())?;
    let slots_per_page = page_config(page_size)?.slots_per_page();

    let pages = [PageId::Page0, PageId::Page1]
        .into_iter()
        .map(|page| {
            let base = page as usize * page_size;
            inspect_page(page, &data[base..base + page_size], slots_per_page)
        })
        .collect();

    Ok(ImageReport { page_size, pages })
}

fn inspect_page(page: PageId, data: &[u8], slots_per_page: usize) -> PageReport {
    let status_word = read_u32(data, 0);

    let slots = (0..slots_per_page)
        .filter_map(|slot| {
            let offset = PAGE_HEADER_SIZE + slot * PACKET_SIZE;
            let mut raw = [0u8; PACKET_SIZE];
            raw.copy_from_slice(&data[offset..offset + PACKET_SIZE]);

            let packet = Packet::from_bytes(raw);
            (!packet.is_empty()).then_some(SlotReport { slot, raw, packet })
        })
        .collect();

    PageReport {
        page,
        status_word,
        status: PageStatus::from(status_word),
        erase_count: read_u32(data, 4),
        slots,
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn page_config(page_size: usize) -> Result<Config, Error> {
    if page_size == 0 || !page_size.is_multiple_of(ERASE_SIZE) {
        return Err(Error::InvalidPageSize(page_size));
    }
    let page_size = u32::try_from(page_size).map_err(|_| Error::InvalidPageSize(page_size))?;

    Ok(Config::contiguous(0, page_size))
}

fn image_page_size(len: usize) -> Result<usize, Error> {
    let page_size = len / 2;
    if page_size == 0 || !page_size.is_multiple_of(ERASE_SIZE) || page_size * 2 != len {
        return Err(Error::InvalidImageSize(len));
    }
    Ok(page_size)
}

/// Raw contents of both pages of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    pub page_size: usize,
    pub pages: Vec<PageReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub page: PageId,
    pub status_word: u32,
    pub status: PageStatus,
    pub erase_count: u32,
    /// Every slot that is not empty, in flash order.
    pub slots: Vec<SlotReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReport {
    pub slot: usize,
    pub raw: [u8; PACKET_SIZE],
    pub packet: Packet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Freed,
    Valid,
    Corrupted,
}

impl SlotReport {
    pub fn state(&self) -> SlotState {
        if self.packet.is_freed() {
            SlotState::Freed
        } else if self.packet.is_intact() {
            SlotState::Valid
        } else {
            SlotState::Corrupted
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotState::Freed => "freed",
            SlotState::Valid => "valid",
            SlotState::Corrupted => "corrupted",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ImageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for page in &self.pages {
            writeln!(
                f,
                "{} @ {:#08x}: {} ({:#010x}), erase count {}, {} used slots",
                page.page,
                page.page as usize * self.page_size,
                page.status,
                page.status_word,
                page.erase_count,
                page.slots.len()
            )?;
            for slot in &page.slots {
                writeln!(
                    f,
                    "  [{:4}] {}  address {:#06x}  crc {:#06x}  data {:#010x}  {}",
                    slot.slot,
                    hex::encode_upper(slot.raw),
                    slot.packet.virtual_address,
                    slot.packet.crc,
                    slot.packet.data,
                    slot.state()
                )?;
            }
        }
        Ok(())
    }
}
