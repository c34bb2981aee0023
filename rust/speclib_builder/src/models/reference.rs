use crate::errors::{
    BuildError,
    Result,
};
use crate::modifications::ModificationConvention;
use std::collections::{
    HashMap,
    HashSet,
};
use std::path::PathBuf;
use tracing::debug;

/// Column names used when the reference table carries more than two columns.
pub const WIDE_SEQUENCE_COLUMN: &str = "ModifiedPeptideSequence";
pub const WIDE_TIME_COLUMN: &str = "NormalizedRetentionTime";

/// An untyped, already parsed table (header plus string cells).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Where the reference index comes from.
#[derive(Debug, Clone)]
pub enum ReferenceIndexSource {
    /// Tab separated file with a header row.
    Path(PathBuf),
    Table(ReferenceTable),
}

impl From<PathBuf> for ReferenceIndexSource {
    fn from(p: PathBuf) -> Self {
        ReferenceIndexSource::Path(p)
    }
}

impl From<ReferenceTable> for ReferenceIndexSource {
    fn from(t: ReferenceTable) -> Self {
        ReferenceIndexSource::Table(t)
    }
}

impl ReferenceIndexSource {
    pub fn load(self) -> Result<ReferenceIndex> {
        match self {
            ReferenceIndexSource::Path(path) => {
                let table = ReferenceTable::from_tsv_file(&path).map_err(|e| {
                    BuildError::InvalidReferenceIndex(format!(
                        "unable to read {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                ReferenceIndex::from_table(&table)
            }
            ReferenceIndexSource::Table(table) => ReferenceIndex::from_table(&table),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub sequence: String,
    pub reference_time: f64,
}

/// Reference (iRT) peptides keyed by their modified sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceIndex {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceIndex {
    pub fn new(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    /// Shapes a parsed table into `(sequence, reference_time)` entries.
    ///
    /// Two column tables are read by position. Wider tables are projected to
    /// [`WIDE_SEQUENCE_COLUMN`] and [`WIDE_TIME_COLUMN`], dropping exact duplicates.
    pub fn from_table(table: &ReferenceTable) -> Result<Self> {
        let n_cols = table.columns.len();
        let (seq_idx, time_idx, dedup) = match n_cols {
            2 => (0, 1, false),
            n if n > 2 => {
                let find = |name: &str| {
                    table.columns.iter().position(|c| c == name).ok_or_else(|| {
                        BuildError::InvalidReferenceIndex(format!(
                            "wide reference table is missing column {}",
                            name
                        ))
                    })
                };
                (find(WIDE_SEQUENCE_COLUMN)?, find(WIDE_TIME_COLUMN)?, true)
            }
            n => {
                return Err(BuildError::InvalidReferenceIndex(format!(
                    "expected at least 2 columns, found {}",
                    n
                )));
            }
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(table.rows.len());
        for (i, row) in table.rows.iter().enumerate() {
            let (Some(seq), Some(time)) = (row.get(seq_idx), row.get(time_idx)) else {
                return Err(BuildError::InvalidReferenceIndex(format!(
                    "row {} has {} cells, expected {}",
                    i + 1,
                    row.len(),
                    n_cols
                )));
            };
            let reference_time: f64 = time.trim().parse().map_err(|_| {
                BuildError::InvalidReferenceIndex(format!(
                    "row {}: reference time {:?} is not a number",
                    i + 1,
                    time
                ))
            })?;
            if dedup && !seen.insert((seq.as_str(), reference_time.to_bits())) {
                continue;
            }
            entries.push(ReferenceEntry {
                sequence: seq.clone(),
                reference_time,
            });
        }

        debug!(
            "Shaped reference index with {} entries from {} rows",
            entries.len(),
            table.rows.len()
        );
        Ok(Self { entries })
    }

    pub fn normalize(mut self, convention: &ModificationConvention) -> Self {
        for e in self.entries.iter_mut() {
            e.sequence = convention.normalize(&e.sequence);
        }
        self
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All reference times per sequence, in table order.
    pub fn times_by_sequence(&self) -> HashMap<&str, Vec<f64>> {
        let mut out: HashMap<&str, Vec<f64>> = HashMap::new();
        for e in &self.entries {
            out.entry(e.sequence.as_str())
                .or_default()
                .push(e.reference_time);
        }
        out
    }
}
