//! Readers for the MaxQuant `msms.txt` and `evidence.txt` tables.
//!
//! Every MS/MS match is joined to its evidence row (`Evidence ID` -> `id`)
//! to pick up the aligned retention time and the ion mobility of the precursor.

use crate::errors::{
    BuildError,
    Result,
};
use crate::models::PsmRecord;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{
    debug,
    info,
    warn,
};

pub const DEFAULT_ION_MOBILITY_COLUMN: &str = "Ion mobility index";

const EVIDENCE_ID_COLUMN: &str = "id";
const EVIDENCE_RT_COLUMN: &str = "Calibrated Retention Time";

/// Represents a single row of an `msms.txt` file
#[derive(Debug, Clone, Deserialize)]
struct MsmsRow {
    #[serde(rename = "id")]
    id: String,
    #[serde(rename = "Evidence ID")]
    evidence_id: String,
    #[serde(rename = "Raw file")]
    raw_file: String,
    #[serde(rename = "Sequence")]
    sequence: String,
    #[serde(rename = "Modified sequence")]
    modified_sequence: String,
    #[serde(rename = "Retention time")]
    retention_time: Option<f64>,
    #[serde(rename = "PEP")]
    pep: Option<f64>,
    #[serde(rename = "Charge")]
    charge: i32,
    #[serde(rename = "m/z")]
    precursor_mz: f64,
    #[serde(rename = "Masses")]
    masses: Option<String>,
    #[serde(rename = "Intensities")]
    intensities: Option<String>,
    #[serde(rename = "Proteins")]
    proteins: Option<String>,
    #[serde(rename = "Reverse")]
    reverse: Option<String>,
}

/// The evidence columns needed for the library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceRow {
    pub calibrated_retention_time: f64,
    pub ion_mobility: Option<f64>,
}

fn parse_optional_f64(value: &str, field: &str, line: u64) -> Result<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| BuildError::ParseField {
            field: field.to_string(),
            value: value.to_string(),
            line,
        })
}

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .from_reader(reader)
}

/// Reads `evidence.txt` content into a map keyed by the evidence `id`.
///
/// The ion mobility column is selected by name since its header differs
/// between MaxQuant versions.
pub fn read_evidence<R: Read>(
    reader: R,
    ion_mobility_column: &str,
) -> Result<HashMap<String, EvidenceRow>> {
    let mut rdr = tsv_reader(reader);
    let headers = rdr.headers()?.clone();
    let find = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| BuildError::MissingColumn {
                column: column.to_string(),
                context: "evidence table".to_string(),
            })
    };
    let id_idx = find(EVIDENCE_ID_COLUMN)?;
    let rt_idx = find(EVIDENCE_RT_COLUMN)?;
    let im_idx = find(ion_mobility_column)?;

    let mut out = HashMap::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let cell = |i: usize| record.get(i).unwrap_or("");

        let calibrated_retention_time =
            parse_optional_f64(cell(rt_idx), EVIDENCE_RT_COLUMN, line)?.unwrap_or(f64::NAN);
        let ion_mobility = parse_optional_f64(cell(im_idx), ion_mobility_column, line)?
            .filter(|v| !v.is_nan());

        if out
            .insert(
                cell(id_idx).to_string(),
                EvidenceRow {
                    calibrated_retention_time,
                    ion_mobility,
                },
            )
            .is_some()
        {
            warn!("Duplicate evidence id {} (line {})", cell(id_idx), line);
        }
    }
    debug!("Read {} evidence rows", out.len());
    Ok(out)
}

/// Reads `msms.txt` content and joins it against the evidence rows.
///
/// Matches without an evidence row are dropped.
pub fn read_msms<R: Read>(
    reader: R,
    evidence: &HashMap<String, EvidenceRow>,
) -> Result<Vec<PsmRecord>> {
    let mut rdr = tsv_reader(reader);
    let mut out = Vec::new();
    let mut n_unmatched = 0;

    for result in rdr.deserialize() {
        let row: MsmsRow = result?;
        let Some(ev) = evidence.get(&row.evidence_id) else {
            n_unmatched += 1;
            continue;
        };
        out.push(PsmRecord {
            id: row.id,
            raw_file: row.raw_file,
            modified_sequence: row.modified_sequence,
            sequence: row.sequence,
            retention_time: row.retention_time,
            calibrated_retention_time: ev.calibrated_retention_time,
            pep: row.pep.unwrap_or(f64::NAN),
            charge: row.charge,
            precursor_mz: row.precursor_mz,
            masses: row.masses.unwrap_or_default(),
            intensities: row.intensities.unwrap_or_default(),
            proteins: row.proteins.unwrap_or_default(),
            ion_mobility: ev.ion_mobility,
            reverse: row.reverse,
        });
    }

    if n_unmatched > 0 {
        warn!("{} MS/MS matches had no evidence row and were dropped", n_unmatched);
    }
    Ok(out)
}

/// Loads and joins `msms.txt` and `evidence.txt`.
pub fn read_maxquant_tables<P: AsRef<Path>, Q: AsRef<Path>>(
    msms_path: P,
    evidence_path: Q,
    ion_mobility_column: &str,
) -> Result<Vec<PsmRecord>> {
    let evidence_path = evidence_path.as_ref();
    let msms_path = msms_path.as_ref();

    info!("Reading evidence from {}", evidence_path.display());
    let evidence_file =
        std::fs::File::open(evidence_path).map_err(|e| BuildError::io(e, evidence_path))?;
    let evidence = read_evidence(evidence_file, ion_mobility_column)?;

    info!("Reading MS/MS matches from {}", msms_path.display());
    let msms_file = std::fs::File::open(msms_path).map_err(|e| BuildError::io(e, msms_path))?;
    let psms = read_msms(msms_file, &evidence)?;

    info!("Parsed {} PSMs", psms.len());
    Ok(psms)
}
