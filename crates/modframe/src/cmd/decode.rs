use std::fs;
use std::io::{Cursor, Read};

use modframe_envelope::{EnvelopeError, EnvelopeReader, FramingConfig, Message, RawPayload};
use tracing::info;

use crate::cmd::DecodeArgs;
use crate::exit::{envelope_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::hex::parse_hex;
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = resolve_input(&args)?;
    let messages = decode_all(&wire, args.headless)?;

    for message in &messages {
        print_message(message, format);
    }
    info!(count = messages.len(), bytes = wire.len(), "decoded messages");
    Ok(SUCCESS)
}

fn resolve_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|err| io_error("failed reading stdin", err))?;
    parse_hex(&text)
}

/// Decode every message in `wire`. Networked input may hold several
/// back-to-back frames; headless input is a single frame.
fn decode_all(wire: &[u8], headless: bool) -> CliResult<Vec<Message<RawPayload>>> {
    if wire.is_empty() {
        return Err(CliError::new(USAGE, "no input bytes to decode"));
    }

    let config = if headless {
        FramingConfig::headless()
    } else {
        FramingConfig::networked()
    };
    let mut reader = EnvelopeReader::with_config(Cursor::new(wire), config);

    let mut messages = Vec::new();
    loop {
        match reader.read_raw() {
            Ok(message) => messages.push(message),
            Err(EnvelopeError::ConnectionClosed) => break,
            Err(err) => {
                return Err(envelope_error(
                    &format!("decode failed at message {}", messages.len() + 1),
                    err,
                ))
            }
        }
    }
    Ok(messages)
}
