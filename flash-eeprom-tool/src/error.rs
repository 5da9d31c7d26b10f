use thiserror::Error;

/// Errors that can occur while converting between CSV files and flash-eeprom images.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("invalid virtual address: {0}")]
    InvalidAddress(String),

    #[error("invalid page size {0}: must be a non-zero multiple of 1024 bytes")]
    InvalidPageSize(usize),

    #[error("invalid image size {0}: must hold two pages of a multiple of 1024 bytes")]
    InvalidImageSize(usize),

    #[error("{count} variables do not fit into pages of {capacity} slots")]
    TooManyVariables { count: usize, capacity: usize },

    #[error("eeprom error: {0}")]
    EepromError(#[from] flash_eeprom::error::Error),
}
