//! Provides the main entry point to the program.
use anyhow::Result;

fn main() -> Result<()> {
    heatplan::cli::run_cli()
}
