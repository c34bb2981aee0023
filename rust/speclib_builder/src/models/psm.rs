use serde::{
    Deserialize,
    Serialize,
};

/// A single peptide-spectrum match, already joined with its evidence row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsmRecord {
    /// Identifier of the match, becomes the `transition_group_id`.
    pub id: String,
    /// Raw file (run) the spectrum was acquired in.
    pub raw_file: String,
    pub modified_sequence: String,
    pub sequence: String,
    /// RT of the MS2 spectrum, used to fit the run calibrator.
    pub retention_time: Option<f64>,
    /// Aligned RT of the precursor, the value the calibrator is applied to.
    pub calibrated_retention_time: f64,
    /// Posterior error probability.
    pub pep: f64,
    pub charge: i32,
    pub precursor_mz: f64,
    /// `;` separated fragment masses.
    pub masses: String,
    /// `;` separated fragment intensities, parallel to `masses`.
    pub intensities: String,
    pub proteins: String,
    pub ion_mobility: Option<f64>,
    /// Non-empty for reverse (decoy) hits.
    pub reverse: Option<String>,
}

impl PsmRecord {
    /// The observed retention time, if it is usable.
    pub fn observed_rt(&self) -> Option<f64> {
        self.retention_time.filter(|rt| rt.is_finite())
    }

    pub fn is_decoy(&self) -> bool {
        self.reverse
            .as_deref()
            .is_some_and(|flag| !flag.trim().is_empty())
    }
}

/// Whether `candidate` should replace `current` as the best scoring hit.
///
/// Lower PEP wins, NaN never wins and ties keep the current hit.
pub(crate) fn is_better_pep(candidate: f64, current: f64) -> bool {
    !candidate.is_nan() && (current.is_nan() || candidate < current)
}
