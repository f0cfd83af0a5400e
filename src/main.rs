//! linegraph CLI entry point
//!
//! Parses the command line, runs the selected command and turns failures
//! into readable error output:
//! - `render` - render a chart request stored as JSON
//! - `invalidate` - purge cached charts drawn from a file
//! - `config` - manage the configuration file

use anyhow::Result;
use clap::Parser;
use linegraph::cli;
use linegraph::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
