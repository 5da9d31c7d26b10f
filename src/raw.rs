use crate::error::Error;
use crate::platform::Platform;
use core::mem::size_of;
#[cfg(feature = "defmt")]
use defmt::trace;

pub const PAGE_STATUS_SIZE: usize = size_of::<u32>();
pub const PAGE_ERASE_COUNT_SIZE: usize = size_of::<u32>();
pub const PAGE_HEADER_SIZE: usize = PAGE_STATUS_SIZE + PAGE_ERASE_COUNT_SIZE;
pub const PACKET_SIZE: usize = size_of::<u64>();

pub(crate) const PAGE_STATUS_OFFSET: u32 = 0;
pub(crate) const PAGE_ERASE_COUNT_OFFSET: u32 = PAGE_STATUS_SIZE as u32;

/// Lowest and highest virtual address a variable may use. `0x0000` and `0xFFFF` collide with the
/// address field of freed and empty slots.
pub const MIN_VIRTUAL_ADDRESS: u16 = 0x0001;
pub const MAX_VIRTUAL_ADDRESS: u16 = 0xFFFE;

// Bits cleared when a page starts receiving a transfer, and when it becomes the active page.
const PSB_RECEIVING: u32 = 0x5555_5555;
const PSB_ACTIVE: u32 = 0xAAAA_AAAA;

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Copy, Clone)]
#[repr(u32)]
pub(crate) enum PageMagic {
    // All bits set, default state after flash erase.
    Erased = u32::MAX,

    // Page is the destination of a running transfer.
    Receiving = PageMagic::Erased as u32 & !PSB_RECEIVING,

    // Page holds the current variables and accepts writes.
    Active = PageMagic::Receiving as u32 & !PSB_ACTIVE,
}

pub const PAGE_STATUS_ERASED: u32 = PageMagic::Erased as u32;
pub const PAGE_STATUS_RECEIVING: u32 = PageMagic::Receiving as u32;
pub const PAGE_STATUS_ACTIVE: u32 = PageMagic::Active as u32;

const _: () = assert!(PAGE_STATUS_RECEIVING == 0xAAAA_AAAA);
const _: () = assert!(PAGE_STATUS_ACTIVE == 0x0000_0000);

/// One 8-byte record of the append-only log.
///
/// Packed into a `u64` as `[virtual_address:16][crc:16][data:32]` and stored little-endian, so the
/// data word occupies the lower four bytes of the slot and is programmed first.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    pub virtual_address: u16,
    pub crc: u16,
    pub data: u32,
}

impl Packet {
    /// An unprogrammed slot.
    pub const EMPTY: Packet = Packet::from_bits(u64::MAX);

    /// A tombstoned slot.
    pub const FREED: Packet = Packet::from_bits(0);

    /// Creates a packet with a matching checksum.
    pub const fn new(virtual_address: u16, data: u32) -> Self {
        Self {
            virtual_address,
            crc: Self::checksum(virtual_address, data),
            data,
        }
    }

    /// Sum of the address and both data halves, truncated to 16 bits.
    pub const fn checksum(virtual_address: u16, data: u32) -> u16 {
        let sum = virtual_address as u32 + (data & 0xFFFF) + (data >> 16);
        sum as u16
    }

    pub const fn to_bits(self) -> u64 {
        ((self.virtual_address as u64) << 48) | ((self.crc as u64) << 32) | self.data as u64
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self {
            virtual_address: (bits >> 48) as u16,
            crc: (bits >> 32) as u16,
            data: bits as u32,
        }
    }

    pub const fn to_bytes(self) -> [u8; PACKET_SIZE] {
        self.to_bits().to_le_bytes()
    }

    pub const fn from_bytes(bytes: [u8; PACKET_SIZE]) -> Self {
        Self::from_bits(u64::from_le_bytes(bytes))
    }

    pub const fn is_empty(&self) -> bool {
        self.to_bits() == u64::MAX
    }

    pub const fn is_freed(&self) -> bool {
        self.to_bits() == 0
    }

    /// Neither empty nor freed. Torn and corrupted packets are live too.
    pub const fn is_live(&self) -> bool {
        !self.is_empty() && !self.is_freed()
    }

    pub const fn has_valid_crc(&self) -> bool {
        self.crc == Self::checksum(self.virtual_address, self.data)
    }

    /// A checksum match on a packet carrying a usable virtual address.
    pub const fn is_intact(&self) -> bool {
        is_valid_virtual_address(self.virtual_address) && self.has_valid_crc()
    }
}

pub const fn is_valid_virtual_address(virtual_address: u16) -> bool {
    virtual_address >= MIN_VIRTUAL_ADDRESS && virtual_address <= MAX_VIRTUAL_ADDRESS
}

pub(crate) fn read_word<T: Platform>(hal: &mut T, offset: u32) -> Result<u32, Error> {
    let mut buf = [0u8; PAGE_STATUS_SIZE];
    hal.read(offset, &mut buf).map_err(|_| Error::FlashError)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn write_word<T: Platform>(hal: &mut T, offset: u32, value: u32) -> Result<(), Error> {
    #[cfg(feature = "defmt")]
    trace!("write_word @{:#08x}: {:#010x}", offset, value);

    hal.write(offset, &value.to_le_bytes()).map_err(|_| Error::FlashError)
}

pub(crate) fn read_packet<T: Platform>(hal: &mut T, offset: u32) -> Result<Packet, Error> {
    let mut buf = [0u8; PACKET_SIZE];
    hal.read(offset, &mut buf).map_err(|_| Error::FlashError)?;
    Ok(Packet::from_bytes(buf))
}

/// Programs all eight bytes with a single backend call. Drivers with a smaller write granularity
/// split it, data word first.
pub(crate) fn write_packet<T: Platform>(
    hal: &mut T,
    offset: u32,
    packet: &Packet,
) -> Result<(), Error> {
    #[cfg(feature = "defmt")]
    trace!("write_packet @{:#08x}: {}", offset, packet);

    hal.write(offset, &packet.to_bytes()).map_err(|_| Error::FlashError)
}
