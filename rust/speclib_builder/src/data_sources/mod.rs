pub mod maxquant;
mod reference_file;

pub use maxquant::{
    DEFAULT_ION_MOBILITY_COLUMN,
    read_maxquant_tables,
};
