use crate::errors::{
    BuildError,
    Result,
};
use crate::models::ReferenceTable;
use std::io::Read;
use std::path::Path;
use tracing::info;

impl ReferenceTable {
    /// Reads a tab separated table with a header row.
    pub fn from_tsv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(reader);

        let columns = rdr.headers()?.iter().map(|s| s.to_string()).collect();
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self { columns, rows })
    }

    pub fn from_tsv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| BuildError::io(e, path))?;
        let table = Self::from_tsv_reader(file)?;
        info!(
            "Read reference table with {} columns and {} rows from {}",
            table.columns.len(),
            table.rows.len(),
            path.display()
        );
        Ok(table)
    }
}
