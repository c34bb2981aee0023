//! Builds an assay (transition) library for targeted DIA/PASEF analysis from
//! MaxQuant search results and an iRT reference index.

pub mod annotation;
pub mod builder;
pub mod calibration;
pub mod data_sources;
pub mod errors;
pub mod fragments;
pub mod models;
pub mod modifications;
pub mod output;

pub use annotation::{
    FragmentChargeAnnotator,
    PassThroughAnnotator,
};
pub use builder::{
    BuildSummary,
    BuilderOptions,
    LibraryBuild,
    LibraryBuilder,
};
pub use calibration::Calibrators;
pub use calibrt::{
    CalibrationResult,
    DEFAULT_REPORT_PATH,
};
pub use errors::BuildError;
pub use models::{
    LibraryRecord,
    PsmRecord,
    ReferenceIndex,
    ReferenceIndexSource,
    ReferenceTable,
};
