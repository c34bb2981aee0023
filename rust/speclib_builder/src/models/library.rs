use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};

/// Column order of the written library.
pub const LIBRARY_COLUMNS: [&str; 12] = [
    "transition_group_id",
    "PrecursorMz",
    "ProductMz",
    "PrecursorCharge",
    "Tr_recalibrated",
    "LibraryIntensity",
    "PeptideSequence",
    "FullUniModPeptideName",
    "ProteinName",
    "PrecursorIonMobility",
    "decoy",
    "transition_name",
];

/// One transition (precursor, fragment) of the spectral library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRecord {
    #[serde(rename = "transition_group_id")]
    pub transition_group_id: String,
    #[serde(rename = "PrecursorMz")]
    pub precursor_mz: f64,
    #[serde(rename = "ProductMz")]
    pub product_mz: f64,
    #[serde(rename = "PrecursorCharge")]
    pub precursor_charge: i32,
    #[serde(rename = "Tr_recalibrated")]
    pub calibrated_rt: f64,
    #[serde(rename = "LibraryIntensity")]
    pub library_intensity: f64,
    #[serde(rename = "PeptideSequence")]
    pub peptide_sequence: String,
    #[serde(rename = "FullUniModPeptideName")]
    pub modified_peptide_sequence: String,
    #[serde(rename = "ProteinName")]
    pub protein_name: String,
    #[serde(rename = "PrecursorIonMobility")]
    pub ion_mobility: Option<f64>,
    #[serde(
        rename = "decoy",
        serialize_with = "serialize_flag",
        deserialize_with = "deserialize_flag"
    )]
    pub decoy: bool,
    #[serde(rename = "transition_name")]
    pub transition_name: String,
}

// Hashable view of a row; floats compare by bit pattern.
type RowKey<'a> = (
    &'a str,
    u64,
    u64,
    i32,
    u64,
    u64,
    &'a str,
    &'a str,
    &'a str,
    Option<u64>,
    bool,
    &'a str,
);

impl LibraryRecord {
    /// Identity used for exact-duplicate removal.
    pub(crate) fn row_key(&self) -> RowKey<'_> {
        (
            &self.transition_group_id,
            self.precursor_mz.to_bits(),
            self.product_mz.to_bits(),
            self.precursor_charge,
            self.calibrated_rt.to_bits(),
            self.library_intensity.to_bits(),
            &self.peptide_sequence,
            &self.modified_peptide_sequence,
            &self.protein_name,
            self.ion_mobility.map(f64::to_bits),
            self.decoy,
            &self.transition_name,
        )
    }

    /// `<group id>_<precursor m/z>_<product m/z>`, with the m/z values spelled
    /// the way the table columns write them (`400.0`, not `400`).
    pub fn format_transition_name(&self) -> String {
        format!(
            "{}_{:?}_{:?}",
            self.transition_group_id, self.precursor_mz, self.product_mz
        )
    }
}

fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let v = i32::deserialize(deserializer)?;
    Ok(v != 0)
}
