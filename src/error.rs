use thiserror::Error;

/// Errors that can occur during EEPROM emulation operations. Marked as non-exhaustive to allow
/// for future additions without breaking the API. A caller would likely only need to handle
/// ReadError, DataCorrupted and WriteError as the other errors are static or require a re-init.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// `init()` (or `format()`) has to succeed before variables can be accessed.
    #[error("not initialized")]
    NotInitialized,

    /// A page status may only move towards cleared bits: Erased -> Receiving -> Active.
    #[error("invalid page status transition")]
    InvalidTransition,

    /// Both pages are full of live variables, even after a transfer.
    #[error("no write space left after recovery")]
    Unrecoverable,

    /// The internal error value is returned from the provided `&mut impl NorFlash`, or an
    /// earlier failure left the store faulted until the next `init()`.
    #[error("internal flash error")]
    FlashError,

    /// A parameter is outside its valid range: page id, scan start, buffer capacity or layout.
    #[error("bad parameter")]
    BadParam,

    /// The virtual address has never been written or was deleted.
    #[error("variable not found")]
    ReadError,

    /// The packet could not be written. Either the address is reserved (`0x0000`, `0xFFFF`),
    /// the store is full or no slot of the page could be verified.
    #[error("write failed")]
    WriteError,

    /// The backend failed to erase a page.
    #[error("erase failed")]
    EraseError,

    /// Page bases and sizes have to be aligned to the flash erase size, page sizes to the packet
    /// size, and the flash read/write granularity has to divide a word.
    #[error("misaligned flash layout")]
    AlignmentError,

    /// The newest packet of a variable (or any live packet during an integrity check) failed its
    /// checksum.
    #[error("corrupted data")]
    DataCorrupted,
}
