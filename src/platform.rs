use embedded_storage::nor_flash::NorFlash;

/// Any NOR flash driver implementing [`embedded_storage::nor_flash::NorFlash`] can back the
/// store, including `&mut` references to one. See README.md for an example.
pub trait Platform: NorFlash {}

impl<T: NorFlash> Platform for T {}

/// Layout checks against the granularity of the backend.
pub trait AlignedOps: Platform {
    /// Header words and packet halves are programmed and read as 4-byte words.
    fn supports_word_access() -> bool {
        is_aligned(WORD_SIZE, Self::WRITE_SIZE) && is_aligned(WORD_SIZE, Self::READ_SIZE)
    }

    fn is_erase_aligned(value: usize) -> bool {
        is_aligned(value, Self::ERASE_SIZE)
    }
}

impl<T: Platform> AlignedOps for T {}

pub(crate) const WORD_SIZE: usize = 4;

#[inline(always)]
const fn is_aligned(value: usize, alignment: usize) -> bool {
    if alignment == 0 {
        false
    } else if alignment.is_power_of_two() {
        value & (alignment - 1) == 0
    } else {
        value.is_multiple_of(alignment)
    }
}
