use crate::config::Config;
use crate::error::CliError;
use speclib_builder::data_sources::read_maxquant_tables;
use speclib_builder::output::{
    write_calibrators_file,
    write_library_file,
};
use speclib_builder::{
    LibraryBuilder,
    ReferenceIndexSource,
};
use std::time::Instant;
use tracing::{
    info,
    warn,
};

pub fn build_library(config: &Config) -> Result<(), CliError> {
    let (Some(input), Some(output)) = (&config.input, &config.output) else {
        return Err(CliError::Config(
            "Both the input and output sections are required".to_string(),
        ));
    };

    let st = Instant::now();
    let psms = read_maxquant_tables(&input.msms, &input.evidence, &config.analysis.im_column)?;
    info!("Loading search results took: {:?}", st.elapsed());

    let builder = LibraryBuilder::new(config.builder_options());
    let build = builder.build(psms, ReferenceIndexSource::Path(input.irt.clone()))?;

    for (run, reason) in &build.summary.skipped_runs {
        warn!("Run {} is not in the library: {}", run, reason);
    }
    info!("Build summary: {:?}", build.summary);

    write_library_file(&build.records, &output.library)?;
    if let Some(path) = &output.calibrators {
        write_calibrators_file(&build.calibrators, path)?;
    }

    info!("Finished in {:?}", st.elapsed());
    Ok(())
}
