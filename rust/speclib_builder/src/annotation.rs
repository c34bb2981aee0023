use crate::models::{
    LibraryRecord,
    PsmRecord,
};

/// Assigns product-ion charges to the expanded fragment rows.
pub trait FragmentChargeAnnotator {
    fn annotate(&self, library: Vec<LibraryRecord>, psms: &[PsmRecord]) -> Vec<LibraryRecord>;
}

/// Leaves the library untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughAnnotator;

impl FragmentChargeAnnotator for PassThroughAnnotator {
    fn annotate(&self, library: Vec<LibraryRecord>, _psms: &[PsmRecord]) -> Vec<LibraryRecord> {
        library
    }
}
