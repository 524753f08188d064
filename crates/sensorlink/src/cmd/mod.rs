use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use sensorlink_registry::TableConfig;

use crate::exit::{registry_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reclaim and decode one received frame.
    Decode(DecodeArgs),
    /// Build a padded frame from fields.
    Encode(EncodeArgs),
    /// Run the router over a simulated radio fed from a file.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex, sequence byte last.
    pub frame: String,
    /// Table config (JSON) with extra field names.
    #[arg(long, value_name = "FILE", env = "SENSORLINK_CONFIG")]
    pub config: Option<PathBuf>,
    /// Treat an empty payload as malformed.
    #[arg(long)]
    pub reject_empty: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Field to include, in order (e.g. t=2731). Repeatable.
    #[arg(long = "field", short = 'f', value_name = "NAME=VALUE", required = true)]
    pub fields: Vec<String>,
    /// Sequence byte to append.
    #[arg(long, default_value = "0")]
    pub seq: u8,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// File of `<channel> <hex>` lines; blank lines and `#` comments are skipped.
    pub file: PathBuf,
    /// Table config (JSON) with nodes, field names and sensors.
    #[arg(long, value_name = "FILE", env = "SENSORLINK_CONFIG")]
    pub config: Option<PathBuf>,
    /// Node address for the next free channel. Repeatable.
    #[arg(long = "node", value_name = "ADDRESS")]
    pub nodes: Vec<String>,
    /// Router config (JSON).
    #[arg(long, value_name = "FILE")]
    pub router_config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Table config from `path`, or the defaults.
pub fn load_tables(path: Option<&Path>) -> CliResult<TableConfig> {
    match path {
        Some(path) => TableConfig::from_file(path)
            .map_err(|err| registry_error("failed to load table config", err)),
        None => Ok(TableConfig::default()),
    }
}
