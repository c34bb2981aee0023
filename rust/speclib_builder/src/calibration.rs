//! Per-run selection of iRT calibration points and fitting of the calibrators.

use crate::errors::{
    BuildError,
    Result,
};
use crate::models::psm::is_better_pep;
use crate::models::{
    PsmRecord,
    ReferenceIndex,
};
use calibrt::{
    CalibRtError,
    CalibrationResult,
    DiagnosticSink,
    Point,
    fit_with_diagnostics,
};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::{
    info,
    warn,
};

/// Run id -> calibrator, in calibration order.
pub type Calibrators = IndexMap<String, CalibrationResult>;

/// The reference-matched points of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCalibrationSet {
    pub run_id: String,
    pub sequences: Vec<String>,
    pub points: Vec<Point>,
}

/// Picks the lowest PEP match per (run, sequence) among the reference peptides.
///
/// Runs come out in ascending run-id order, sequences ascending within a run.
/// A sequence listed more than once in the reference gives one point per listing.
/// `psms` are expected to be normalized and to carry an observed RT.
pub fn select_calibration_sets(
    psms: &[PsmRecord],
    reference: &ReferenceIndex,
) -> Vec<RunCalibrationSet> {
    let reference_times = reference.times_by_sequence();

    let mut best: BTreeMap<(&str, &str), &PsmRecord> = BTreeMap::new();
    for psm in psms {
        if psm.observed_rt().is_none()
            || !reference_times.contains_key(psm.modified_sequence.as_str())
        {
            continue;
        }
        best.entry((psm.raw_file.as_str(), psm.modified_sequence.as_str()))
            .and_modify(|current| {
                if is_better_pep(psm.pep, current.pep) {
                    *current = psm;
                }
            })
            .or_insert(psm);
    }

    let mut sets: Vec<RunCalibrationSet> = Vec::new();
    for ((run_id, sequence), psm) in best {
        let (Some(observed_time), Some(times)) =
            (psm.observed_rt(), reference_times.get(sequence))
        else {
            continue;
        };
        if sets.last().is_none_or(|s| s.run_id != run_id) {
            sets.push(RunCalibrationSet {
                run_id: run_id.to_string(),
                sequences: Vec::new(),
                points: Vec::new(),
            });
        }
        let Some(set) = sets.last_mut() else {
            continue;
        };
        for &reference_time in times {
            set.sequences.push(sequence.to_string());
            set.points.push(Point {
                x: observed_time,
                y: reference_time,
            });
        }
    }
    sets
}

/// Fits one calibrator per run. Failed runs are reported, not propagated.
pub fn calibrate_runs<S: DiagnosticSink + ?Sized>(
    sets: &[RunCalibrationSet],
    sink: &mut S,
) -> (Calibrators, Vec<CalibRtError>) {
    let mut calibrators = Calibrators::with_capacity(sets.len());
    let mut failures = Vec::new();

    for set in sets {
        match fit_with_diagnostics(&set.run_id, &set.points, sink) {
            Ok(cal) => {
                info!(
                    "Calibrated run {} on {} iRT peptides: iRT = {:.4} + {:.4} * RT",
                    set.run_id,
                    set.points.len(),
                    cal.intercept,
                    cal.slope
                );
                calibrators.insert(set.run_id.clone(), cal);
            }
            Err(e) => {
                warn!("Skipping run {}: {}", set.run_id, e);
                failures.push(e);
            }
        }
    }

    (calibrators, failures)
}

/// Maps the calibrated retention time of `psm` onto the reference scale.
pub fn apply_calibration(psm: &PsmRecord, calibrators: &Calibrators) -> Result<f64> {
    calibrators
        .get(&psm.raw_file)
        .map(|cal| cal.predict(psm.calibrated_retention_time))
        .ok_or_else(|| BuildError::MissingCalibrator {
            run: psm.raw_file.clone(),
        })
}
