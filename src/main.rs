use clap::Parser;
use foodhub_metrics::cli::{init_logging, run, Cli};
use foodhub_metrics::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    run(cli).await
}
