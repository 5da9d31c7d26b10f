//! Generator, parser and inspector for flash-eeprom images.
//!
//! An image is the raw content of both pages, page 0 first. Images are produced by running the
//! `flash-eeprom` library against an in-memory flash, so they match what a device would hold.

pub mod error;
pub mod image;
pub mod mem_flash;

mod csv;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

pub use error::Error;
pub use image::{inspect_image, ImageReport, PageReport, SlotReport, SlotState};
pub use mem_flash::MemFlash;

/// The newest value of every variable, keyed by virtual address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    pub variables: BTreeMap<u16, u32>,
}

impl VariableSet {
    /// Parse `address,value` CSV content from a string.
    ///
    /// Both columns accept decimal or `0x`-prefixed hex. The reserved addresses `0x0000` and
    /// `0xFFFF` are rejected, a repeated address keeps the value of its last row.
    pub fn from_csv(content: &str) -> Result<Self, Error> {
        csv::parser::parse_csv(content)
    }

    /// Parse a CSV file at the given `path`.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        csv::parser::parse_csv(&content)
    }

    /// Serialize to CSV and return the content as a `String`.
    ///
    /// Rows are sorted by address and written as `0x%04X,0x%08X`.
    pub fn to_csv(&self) -> Result<String, Error> {
        csv::writer::write_csv_content(self)
    }

    /// Serialize to a CSV file at the given `path`.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        csv::writer::write_csv(self, path)
    }

    /// Generate an image of two pages of `page_size` bytes each.
    ///
    /// `page_size` must be a multiple of 1024 and the page must have a slot for every variable.
    pub fn generate_image(&self, page_size: usize) -> Result<Vec<u8>, Error> {
        image::generate_image_data(self, page_size)
    }

    /// Generate an image and write it to `path`.
    pub fn generate_image_file<P: AsRef<Path>>(
        &self,
        path: P,
        page_size: usize,
    ) -> Result<(), Error> {
        let data = self.generate_image(page_size)?;
        fs::File::create(path)?.write_all(&data)?;
        Ok(())
    }

    /// Recover an image in memory and read back all variables. The input is not modified.
    pub fn parse_image(data: &[u8]) -> Result<Self, Error> {
        image::parse_image_data(data)
    }

    /// Parse an image file at the given `path`.
    pub fn parse_image_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let data = fs::read(path)?;
        image::parse_image_data(&data)
    }
}
