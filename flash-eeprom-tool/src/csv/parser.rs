use std::collections::BTreeMap;

use flash_eeprom::raw::is_valid_virtual_address;

use crate::error::Error;
use crate::VariableSet;

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    address: String,
    value: String,
}

/// Parse `address,value` CSV content into a [`VariableSet`]. A later row for the same address
/// replaces an earlier one.
pub(crate) fn parse_csv(content: &str) -> Result<VariableSet, Error> {
    let mut variables = BTreeMap::new();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    for result in reader.deserialize() {
        let row: CsvRow = result?;

        let address = parse_number(&row.address, u16::from_str_radix)
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", row.address, e)))?;
        if !is_valid_virtual_address(address) {
            return Err(Error::InvalidAddress(format!("{} is reserved", row.address)));
        }

        let value = parse_number(&row.value, u32::from_str_radix)
            .map_err(|e| Error::InvalidValue(format!("{}: {}", row.value, e)))?;

        variables.insert(address, value);
    }

    Ok(VariableSet { variables })
}

/// Decimal, or hexadecimal with a `0x` prefix.
pub(crate) fn parse_number<T>(
    s: &str,
    from_str_radix: fn(&str, u32) -> Result<T, std::num::ParseIntError>,
) -> Result<T, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => from_str_radix(hex, 16),
        None => from_str_radix(s, 10),
    }
}
