use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a payload and print the encoded bytes.
    Encode(EncodeArgs),
    /// Decode framed bytes and print the envelope fields.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Unit id (sub-device address).
    #[arg(long, short = 'u', default_value_t = modframe_envelope::envelope::DEFAULT_UNIT_ID)]
    pub unit: u8,
    /// Function code.
    #[arg(long, short = 'f')]
    pub function: u8,
    /// Transaction id; values above 65535 wrap.
    #[arg(long, short = 't', default_value_t = 0)]
    pub transaction: u32,
    /// Protocol id.
    #[arg(long, default_value_t = modframe_envelope::envelope::DEFAULT_PROTOCOL_ID)]
    pub protocol: u16,
    /// Use headless (serial) framing.
    #[arg(long)]
    pub headless: bool,
    /// Payload as hex (e.g. "00 6b 00 03").
    #[arg(long, short = 'p', conflicts_with = "file")]
    pub payload: Option<String>,
    /// Read the binary payload from a file.
    #[arg(long, conflicts_with = "payload")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Framed bytes as hex. Read from stdin when neither this nor --file is given.
    #[arg(conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read the framed bytes (binary) from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Input uses headless (serial) framing.
    #[arg(long)]
    pub headless: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
