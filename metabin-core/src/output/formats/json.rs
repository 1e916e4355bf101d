use std::io::Write;

use serde::Serialize;

use crate::types::MetabinError;

/// Write any serializable value as pretty-printed JSON followed by a newline
pub fn write_json<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
) -> Result<(), MetabinError> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(std::io::Error::from)?;
    writeln!(writer)?;
    Ok(())
}
