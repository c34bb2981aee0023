use serde::{
    Deserialize,
    Serialize,
};
use speclib_builder::{
    BuilderOptions,
    DEFAULT_REPORT_PATH,
};
use speclib_builder::data_sources::DEFAULT_ION_MOBILITY_COLUMN;
use std::path::{
    Path,
    PathBuf,
};

use crate::cli::BuildArgs;
use crate::error::CliError;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InputConfig {
    pub msms: PathBuf,
    pub evidence: PathBuf,
    pub irt: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub im_column: String,
    pub plot: bool,
    pub filter_decoys_before_best_hit: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            im_column: DEFAULT_ION_MOBILITY_COLUMN.to_string(),
            plot: true,
            filter_decoys_before_best_hit: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    pub library: PathBuf,
    #[serde(default = "default_diagnostics_path")]
    pub diagnostics: PathBuf,
    #[serde(default)]
    pub calibrators: Option<PathBuf>,
}

fn default_diagnostics_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_PATH)
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| CliError::Io {
            source: e,
            path: path.to_string_lossy().to_string(),
        })?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn template() -> Self {
        Self {
            input: Some(InputConfig {
                msms: PathBuf::from("combined/txt/msms.txt"),
                evidence: PathBuf::from("combined/txt/evidence.txt"),
                irt: PathBuf::from("irt.tsv"),
            }),
            analysis: AnalysisConfig::default(),
            output: Some(OutputConfig {
                library: PathBuf::from("pasef_library.tsv"),
                diagnostics: default_diagnostics_path(),
                calibrators: None,
            }),
        }
    }

    /// Loads the config file (if any) and applies the command line overrides.
    pub fn with_cli_args(args: &BuildArgs) -> Result<Self, CliError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let input = config.input.take();
        let msms = args
            .msms
            .clone()
            .or_else(|| input.as_ref().map(|i| i.msms.clone()));
        let evidence = args
            .evidence
            .clone()
            .or_else(|| input.as_ref().map(|i| i.evidence.clone()));
        let irt = args
            .irt
            .clone()
            .or_else(|| input.as_ref().map(|i| i.irt.clone()));
        config.input = match (msms, evidence, irt) {
            (Some(msms), Some(evidence), Some(irt)) => Some(InputConfig {
                msms,
                evidence,
                irt,
            }),
            _ => {
                return Err(CliError::Config(
                    "No input provided, please provide msms, evidence and irt paths in either the config file or with the --msms/--evidence/--irt flags".to_string(),
                ));
            }
        };

        if let Some(im_column) = &args.im_column {
            config.analysis.im_column = im_column.clone();
        }
        if args.no_plot {
            config.analysis.plot = false;
        }
        if args.decoys_first {
            config.analysis.filter_decoys_before_best_hit = true;
        }

        let mut output = match (config.output.take(), &args.output) {
            (Some(mut out), Some(library)) => {
                out.library = library.clone();
                out
            }
            (None, Some(library)) => OutputConfig {
                library: library.clone(),
                diagnostics: default_diagnostics_path(),
                calibrators: None,
            },
            (Some(out), None) => out,
            (None, None) => {
                return Err(CliError::Config(
                    "No output library provided, please provide one in either the config file or with the --output flag".to_string(),
                ));
            }
        };
        if let Some(diagnostics) = &args.diagnostics {
            output.diagnostics = diagnostics.clone();
        }
        if let Some(calibrators) = &args.calibrators {
            output.calibrators = Some(calibrators.clone());
        }
        config.output = Some(output);

        Ok(config)
    }

    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            diagnostics_path: if self.analysis.plot {
                self.output.as_ref().map(|o| o.diagnostics.clone())
            } else {
                None
            },
            filter_decoys_before_best_hit: self.analysis.filter_decoys_before_best_hit,
        }
    }
}
