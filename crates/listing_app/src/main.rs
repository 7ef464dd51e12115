mod cli;

use clap::Parser;
use engine_logging::engine_info;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    engine_logging::initialize(cli.log_destination(), cli.log_level());

    let reports = cli::run(&cli)?;
    for report in &reports {
        engine_info!(
            "Normalized {} candidates -> {}",
            report.candidate_count,
            report.output_path.display()
        );
        println!("{}", report.output_path.display());
    }
    Ok(())
}
