use std::fs;

use modframe_envelope::{Message, RawPayload};
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{envelope_error, io_error, CliResult, SUCCESS};
use crate::hex::parse_hex;
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = build_message(&args)?;
    let wire = message
        .to_bytes()
        .map_err(|err| envelope_error("encode failed", err))?;

    debug!(
        size = wire.len(),
        output_length = message.output_length(),
        "encoded message"
    );
    print_encoded(message.envelope(), &wire, format);
    Ok(SUCCESS)
}

fn build_message(args: &EncodeArgs) -> CliResult<Message<RawPayload>> {
    let body = resolve_payload(args)?;
    let mut message = Message::new(args.unit, args.function, RawPayload::new(body))
        .map_err(|err| envelope_error("invalid payload", err))?;

    let envelope = message.envelope_mut();
    envelope.set_transaction_id(args.transaction);
    envelope.set_protocol_id(args.protocol);
    envelope.set_headless(args.headless);
    Ok(message)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.payload {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::{DATA_INVALID, USAGE};

    fn args(payload: Option<&str>) -> EncodeArgs {
        EncodeArgs {
            unit: 0x11,
            function: 0x03,
            transaction: 0x1_0002,
            protocol: 0,
            headless: false,
            payload: payload.map(str::to_string),
            file: None,
        }
    }

    #[test]
    fn builds_networked_message() {
        let message = build_message(&args(Some("00 6b 00 03"))).unwrap();
        assert_eq!(message.envelope().transaction_id(), 2);
        assert_eq!(
            message.to_hex().unwrap(),
            "00 02 00 00 00 06 11 03 00 6b 00 03"
        );
    }

    #[test]
    fn builds_headless_message() {
        let mut args = args(Some("00 6b 00 03"));
        args.headless = true;
        let message = build_message(&args).unwrap();
        assert_eq!(message.to_hex().unwrap(), "11 03 00 6b 00 03");
    }

    #[test]
    fn empty_payload_by_default() {
        let message = build_message(&args(None)).unwrap();
        assert_eq!(message.envelope().data_length(), 2);
    }

    #[test]
    fn oversized_payload_is_data_invalid() {
        let hex = "00".repeat(254);
        let err = build_message(&args(Some(&hex))).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn malformed_hex_is_usage_error() {
        let err = build_message(&args(Some("0g"))).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
