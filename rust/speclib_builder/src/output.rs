use crate::calibration::Calibrators;
use crate::errors::{
    BuildError,
    Result,
};
use crate::models::{
    LIBRARY_COLUMNS,
    LibraryRecord,
};
use std::io::Write;
use std::path::Path;
use tracing::info;

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer)
}

/// Writes the library as a tab separated table in [`LIBRARY_COLUMNS`] order.
///
/// The header is always written, even for an empty library.
pub fn write_library<W: Write>(records: &[LibraryRecord], writer: W) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(LIBRARY_COLUMNS)?;
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush().map_err(|e| BuildError::io(e, "<library writer>"))?;
    Ok(())
}

pub fn write_library_file<P: AsRef<Path>>(records: &[LibraryRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| BuildError::io(e, path))?;
    write_library(records, std::io::BufWriter::new(file))?;
    info!("Wrote {} transitions to {}", records.len(), path.display());
    Ok(())
}

/// Writes one `run`/`intercept`/`slope` row per calibrated run.
pub fn write_calibrators<W: Write>(calibrators: &Calibrators, writer: W) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(["run", "intercept", "slope"])?;
    for cal in calibrators.values() {
        wtr.serialize((&cal.run_id, cal.intercept, cal.slope))?;
    }
    wtr.flush().map_err(|e| BuildError::io(e, "<calibrator writer>"))?;
    Ok(())
}

pub fn write_calibrators_file<P: AsRef<Path>>(calibrators: &Calibrators, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| BuildError::io(e, path))?;
    write_calibrators(calibrators, std::io::BufWriter::new(file))?;
    info!(
        "Wrote {} RT calibrators to {}",
        calibrators.len(),
        path.display()
    );
    Ok(())
}
