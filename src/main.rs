//! openapi-declare - command-line tool for deriving OpenAPI component schemas from Rust
//! model types.
//!
//! # Usage
//!
//! ```bash
//! openapi-declare [OPTIONS] <PATH>
//! ```
//!
//! # Examples
//!
//! Document every struct under a directory as YAML:
//! ```bash
//! openapi-declare ./src/models -o openapi.yaml
//! ```
//!
//! Document selected types as JSON, failing on any broken reference:
//! ```bash
//! openapi-declare ./src/models -t Pet -t Category -f json --validate
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_declare::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-declare starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
