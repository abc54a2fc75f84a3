use anyhow::Result;
use gitsweep::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();
    cli.execute()
}
