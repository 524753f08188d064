mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sensorlink", version, about = "Sensor radio frame router CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "SENSORLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decode_subcommand() {
        let cli = Cli::try_parse_from(["sensorlink", "decode", "a16174190aab00000005"])
            .expect("decode args should parse");
        assert!(matches!(cli.command, Command::Decode(_)));
    }

    #[test]
    fn parses_repeated_encode_fields() {
        let cli = Cli::try_parse_from([
            "sensorlink", "encode", "-f", "t=2731", "--field", "hum=40", "--seq", "9",
        ])
        .expect("encode args should parse");

        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.fields, vec!["t=2731", "hum=40"]);
                assert_eq!(args.seq, 9);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn encode_requires_a_field() {
        let err = Cli::try_parse_from(["sensorlink", "encode"])
            .expect_err("missing fields should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_replay_with_nodes() {
        let cli = Cli::try_parse_from([
            "sensorlink",
            "--format",
            "json",
            "replay",
            "frames.txt",
            "--node",
            "b3b4b5b6f1",
            "--node",
            "b3b4b5b6cd",
        ])
        .expect("replay args should parse");

        match cli.command {
            Command::Replay(args) => assert_eq!(args.nodes.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
