use std::path::Path;

use csv::Writer;

use crate::error::Error;
use crate::VariableSet;

/// Serialize a variable set to a CSV file at the given `output_path`.
///
/// Rows are sorted by address, both columns are written as fixed-width hex.
pub(crate) fn write_csv<P: AsRef<Path>>(
    variables: &VariableSet,
    output_path: P,
) -> Result<(), Error> {
    let mut wtr = Writer::from_path(output_path)?;
    write_records(&mut wtr, variables)
}

/// Serialize a variable set to CSV and return the content as a `String`.
pub(crate) fn write_csv_content(variables: &VariableSet) -> Result<String, Error> {
    let mut wtr = Writer::from_writer(Vec::new());
    write_records(&mut wtr, variables)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidValue(format!("CSV output is not valid UTF-8: {}", e)))
}

fn write_records<W: std::io::Write>(
    wtr: &mut Writer<W>,
    variables: &VariableSet,
) -> Result<(), Error> {
    wtr.write_record(["address", "value"])?;

    for (address, value) in &variables.variables {
        wtr.write_record([format!("0x{:04X}", address), format!("0x{:08X}", value)])?;
    }

    wtr.flush()?;
    Ok(())
}
