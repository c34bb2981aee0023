use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a spectral library from MaxQuant output.
    Build(BuildArgs),
    /// Write a template configuration file.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Parser, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the msms.txt file (will over-write the config file)
    #[arg(short, long)]
    pub msms: Option<PathBuf>,

    /// Path to the evidence.txt file (will over-write the config file)
    #[arg(short, long)]
    pub evidence: Option<PathBuf>,

    /// Path to the iRT reference table (will over-write the config file)
    #[arg(short, long)]
    pub irt: Option<PathBuf>,

    /// Path of the output library
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path of the calibration plots document
    #[arg(short, long)]
    pub diagnostics: Option<PathBuf>,

    /// Also write the per-run calibrators to this path
    #[arg(long)]
    pub calibrators: Option<PathBuf>,

    /// Evidence column holding the precursor ion mobility
    #[arg(long)]
    pub im_column: Option<String>,

    /// Skip the calibration plots
    #[arg(long)]
    pub no_plot: bool,

    /// Remove decoys before picking the best hit per precursor
    #[arg(long)]
    pub decoys_first: bool,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path of the template to write.
    #[arg(short, long)]
    pub output_path: PathBuf,
}
