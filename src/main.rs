use anyhow::Result;
use balanza::cli::{Cli, OutputFormat};
use balanza::config::Config;
use balanza::report;
use balanza::runner::Runner;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = Config::load(&args.config)?;
    let runner = Runner::new(config, args.trace_dir)?;
    let summary = runner.run();

    match args.format {
        OutputFormat::Text => print!("{}", report::render_summary(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if !summary.failures.is_empty() {
        anyhow::bail!(
            "{} page(s) could not be audited; see the report for details",
            summary.failures.len()
        );
    }
    let failed = summary.failed_audit_count();
    if failed > 0 {
        anyhow::bail!("{failed} budget check(s) failed");
    }
    Ok(())
}
