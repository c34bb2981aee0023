use crate::annotation::{
    FragmentChargeAnnotator,
    PassThroughAnnotator,
};
use crate::calibration::{
    Calibrators,
    RunCalibrationSet,
    apply_calibration,
    calibrate_runs,
    select_calibration_sets,
};
use crate::errors::{
    BuildError,
    Result,
};
use crate::fragments::expand_fragments;
use crate::models::psm::is_better_pep;
use crate::models::{
    LibraryRecord,
    PsmRecord,
    ReferenceIndexSource,
};
use crate::modifications::{
    MAXQUANT,
    ModificationConvention,
    UNIMOD,
};
use calibrt::{
    CalibRtError,
    DiagnosticReport,
    DiagnosticSink,
    NullDiagnostics,
};
use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::{
    BTreeMap,
    HashSet,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Where to write the calibration plots; `None` disables plotting.
    pub diagnostics_path: Option<PathBuf>,
    /// Drop decoys before choosing the best hit per (sequence, charge).
    /// By default the best hit is picked first, so a winning decoy hides
    /// the target for that precursor.
    pub filter_decoys_before_best_hit: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            diagnostics_path: Some(PathBuf::from(calibrt::report::DEFAULT_REPORT_PATH)),
            filter_decoys_before_best_hit: false,
        }
    }
}

/// Counters collected while building, mostly for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildSummary {
    pub n_input_psms: usize,
    pub n_missing_rt: usize,
    /// Runs without a calibrator and the reason why.
    pub skipped_runs: Vec<(String, String)>,
    pub n_uncalibrated_psms: usize,
    pub n_best_hits: usize,
    pub n_decoys_removed: usize,
    pub n_precursors: usize,
    pub n_transitions: usize,
    pub n_duplicates_removed: usize,
}

#[derive(Debug, Clone)]
pub struct LibraryBuild {
    pub records: Vec<LibraryRecord>,
    pub calibrators: Calibrators,
    pub summary: BuildSummary,
}

struct CalibratedPsm {
    psm: PsmRecord,
    calibrated_rt: f64,
}

/// Turns search-engine matches plus an iRT reference into a transition library.
#[derive(Debug, Clone)]
pub struct LibraryBuilder<A: FragmentChargeAnnotator = PassThroughAnnotator> {
    options: BuilderOptions,
    annotator: A,
    psm_convention: ModificationConvention,
    reference_convention: ModificationConvention,
}

impl Default for LibraryBuilder {
    fn default() -> Self {
        Self::new(BuilderOptions::default())
    }
}

impl LibraryBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self {
            options,
            annotator: PassThroughAnnotator,
            psm_convention: MAXQUANT,
            reference_convention: UNIMOD,
        }
    }
}

impl<A: FragmentChargeAnnotator> LibraryBuilder<A> {
    pub fn with_annotator<B: FragmentChargeAnnotator>(self, annotator: B) -> LibraryBuilder<B> {
        LibraryBuilder {
            options: self.options,
            annotator,
            psm_convention: self.psm_convention,
            reference_convention: self.reference_convention,
        }
    }

    pub fn with_conventions(
        mut self,
        psm_convention: ModificationConvention,
        reference_convention: ModificationConvention,
    ) -> Self {
        self.psm_convention = psm_convention;
        self.reference_convention = reference_convention;
        self
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Builds the library, writing the calibration plots to
    /// [`BuilderOptions::diagnostics_path`] when set.
    ///
    /// The plot document only spans the calibration step: it is created once the
    /// calibration sets are known and closed before the library is expanded.
    pub fn build(
        &self,
        psms: Vec<PsmRecord>,
        reference: impl Into<ReferenceIndexSource>,
    ) -> Result<LibraryBuild> {
        self.build_inner(psms, reference.into(), |sets| self.calibrate_with_report(sets))
    }

    /// Like [`LibraryBuilder::build`] but sends the calibration plots to `sink`.
    pub fn build_with_sink<S: DiagnosticSink + ?Sized>(
        &self,
        psms: Vec<PsmRecord>,
        reference: impl Into<ReferenceIndexSource>,
        sink: &mut S,
    ) -> Result<LibraryBuild> {
        self.build_inner(psms, reference.into(), |sets| calibrate_runs(sets, sink))
    }

    fn calibrate_with_report(
        &self,
        sets: &[RunCalibrationSet],
    ) -> (Calibrators, Vec<CalibRtError>) {
        let report = self.options.diagnostics_path.as_ref().and_then(|path| {
            DiagnosticReport::create(path)
                .map_err(|e| warn!("Calibration plots disabled: {}", e))
                .ok()
        });
        let Some(mut report) = report else {
            return calibrate_runs(sets, &mut NullDiagnostics);
        };

        // Closed on drop as well, should calibration unwind.
        let out = calibrate_runs(sets, &mut report);
        if let Err(e) = report.close() {
            warn!("Failed to close calibration report: {}", e);
        }
        out
    }

    fn build_inner(
        &self,
        psms: Vec<PsmRecord>,
        reference: ReferenceIndexSource,
        calibrate: impl FnOnce(&[RunCalibrationSet]) -> (Calibrators, Vec<CalibRtError>),
    ) -> Result<LibraryBuild> {
        let st = Instant::now();
        let mut summary = BuildSummary {
            n_input_psms: psms.len(),
            ..Default::default()
        };

        let reference = reference.load()?.normalize(&self.reference_convention);
        info!("Loaded reference index with {} entries", reference.len());

        let psms: Vec<PsmRecord> = psms
            .into_iter()
            .filter(|p| p.observed_rt().is_some())
            .map(|mut p| {
                p.modified_sequence = self.psm_convention.normalize(&p.modified_sequence);
                p
            })
            .collect();
        summary.n_missing_rt = summary.n_input_psms - psms.len();
        if summary.n_missing_rt > 0 {
            debug!(
                "Dropped {} PSMs without a retention time",
                summary.n_missing_rt
            );
        }

        let sets = select_calibration_sets(&psms, &reference);
        let (calibrators, failures) = calibrate(&sets);
        summary.skipped_runs = failures
            .iter()
            .map(|e| (e.run_id().to_string(), e.to_string()))
            .collect();

        let calibrated = calibrate_psms(&psms, &calibrators, &mut summary)?;
        let best_hits = self.best_hits(calibrated, &mut summary);
        summary.n_precursors = best_hits.len();

        let mut library = Vec::new();
        for hit in &best_hits {
            let template = LibraryRecord {
                transition_group_id: hit.psm.id.clone(),
                precursor_mz: hit.psm.precursor_mz,
                product_mz: f64::NAN,
                precursor_charge: hit.psm.charge,
                calibrated_rt: hit.calibrated_rt,
                library_intensity: f64::NAN,
                peptide_sequence: hit.psm.sequence.clone(),
                modified_peptide_sequence: hit.psm.modified_sequence.clone(),
                protein_name: hit.psm.proteins.clone(),
                ion_mobility: hit.psm.ion_mobility,
                decoy: false,
                transition_name: String::new(),
            };
            library.extend(expand_fragments(
                &template,
                &hit.psm.masses,
                &hit.psm.intensities,
            )?);
        }

        let library = self.annotator.annotate(library, &psms);
        let library = assign_derived_fields(library);
        let n_expanded = library.len();
        let library = drop_duplicate_rows(library);
        summary.n_duplicates_removed = n_expanded - library.len();
        summary.n_transitions = library.len();

        info!(
            "Built library with {} transitions for {} precursors in {:?}",
            summary.n_transitions,
            summary.n_precursors,
            st.elapsed()
        );

        Ok(LibraryBuild {
            records: library,
            calibrators,
            summary,
        })
    }

    /// Keeps the lowest PEP record per (sequence, charge) and removes decoys,
    /// in the order set by the options.
    fn best_hits(
        &self,
        calibrated: Vec<CalibratedPsm>,
        summary: &mut BuildSummary,
    ) -> Vec<CalibratedPsm> {
        let mut n_decoys = 0;
        let calibrated: Vec<CalibratedPsm> = if self.options.filter_decoys_before_best_hit {
            calibrated
                .into_iter()
                .filter(|c| {
                    let keep = !c.psm.is_decoy();
                    n_decoys += usize::from(!keep);
                    keep
                })
                .collect()
        } else {
            calibrated
        };

        let mut best: BTreeMap<(String, i32), CalibratedPsm> = BTreeMap::new();
        for c in calibrated {
            let key = (c.psm.modified_sequence.clone(), c.psm.charge);
            match best.get_mut(&key) {
                Some(current) => {
                    if is_better_pep(c.psm.pep, current.psm.pep) {
                        *current = c;
                    }
                }
                None => {
                    best.insert(key, c);
                }
            }
        }
        summary.n_best_hits = best.len();

        let out: Vec<CalibratedPsm> = best
            .into_values()
            .filter(|c| {
                let keep = !c.psm.is_decoy();
                n_decoys += usize::from(!keep);
                keep
            })
            .collect();

        summary.n_decoys_removed = n_decoys;
        debug!(
            "Kept {} best hits, removed {} decoys",
            out.len(),
            summary.n_decoys_removed
        );
        out
    }
}

/// Applies the run calibrators; records of runs without one are left out.
fn calibrate_psms(
    psms: &[PsmRecord],
    calibrators: &Calibrators,
    summary: &mut BuildSummary,
) -> Result<Vec<CalibratedPsm>> {
    let mut missing: IndexMap<&str, usize> = IndexMap::new();
    let mut out = Vec::with_capacity(psms.len());

    for psm in psms {
        match apply_calibration(psm, calibrators) {
            Ok(calibrated_rt) => out.push(CalibratedPsm {
                psm: psm.clone(),
                calibrated_rt,
            }),
            Err(BuildError::MissingCalibrator { .. }) => {
                *missing.entry(psm.raw_file.as_str()).or_default() += 1;
            }
            Err(e) => return Err(e),
        }
    }

    for (run, n) in &missing {
        warn!(
            "Excluding {} PSMs of run {}: no RT calibrator available",
            n, run
        );
        if !summary.skipped_runs.iter().any(|(r, _)| r == run) {
            summary
                .skipped_runs
                .push((run.to_string(), "no reference peptides identified".into()));
        }
    }
    summary.n_uncalibrated_psms = missing.values().sum();
    Ok(out)
}

/// Sets the constant decoy flag and the per-fragment transition name.
fn assign_derived_fields(mut library: Vec<LibraryRecord>) -> Vec<LibraryRecord> {
    for rec in library.iter_mut() {
        rec.decoy = false;
        rec.transition_name = rec.format_transition_name();
    }
    library
}

/// Drops exact duplicate rows, keeping the first occurrence.
fn drop_duplicate_rows(library: Vec<LibraryRecord>) -> Vec<LibraryRecord> {
    let mut keep = Vec::with_capacity(library.len());
    {
        let mut seen = HashSet::with_capacity(library.len());
        for rec in library.iter() {
            keep.push(seen.insert(rec.row_key()));
        }
    }
    library
        .into_iter()
        .zip(keep)
        .filter_map(|(rec, k)| k.then_some(rec))
        .collect()
}
