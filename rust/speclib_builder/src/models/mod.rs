pub mod library;
pub mod psm;
pub mod reference;

pub use library::{
    LIBRARY_COLUMNS,
    LibraryRecord,
};
pub use psm::PsmRecord;
pub use reference::{
    ReferenceEntry,
    ReferenceIndex,
    ReferenceIndexSource,
    ReferenceTable,
};
