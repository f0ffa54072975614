use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use modframe_envelope::{to_hex, Envelope, Message, RawPayload};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Function bit marking an exception response.
const EXCEPTION_FLAG: u8 = 0x80;

#[derive(Serialize, Debug, PartialEq)]
pub struct MessageOutput {
    pub framing: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_length: Option<u16>,
    pub unit_id: u8,
    pub function_code: u8,
    pub function_name: &'static str,
    pub exception: bool,
    pub payload_size: usize,
    pub payload: String,
    pub output_length: usize,
}

impl MessageOutput {
    pub fn from_message(message: &Message<RawPayload>) -> Self {
        let env = message.envelope();
        let prefix = |value: u16| (!env.is_headless()).then_some(value);
        Self {
            framing: framing_name(env),
            transaction_id: prefix(env.transaction_id()),
            protocol_id: prefix(env.protocol_id()),
            data_length: prefix(env.data_length()),
            unit_id: env.unit_id(),
            function_code: env.function_code(),
            function_name: function_name(env.function_code()),
            exception: env.function_code() & EXCEPTION_FLAG != 0,
            payload_size: message.payload().len(),
            payload: to_hex(message.payload().as_bytes()),
            output_length: env.output_length(),
        }
    }
}

#[derive(Serialize, Debug)]
struct EncodedOutput<'a> {
    framing: &'static str,
    size: usize,
    output_length: usize,
    hex: &'a str,
}

pub fn print_message(message: &Message<RawPayload>, format: OutputFormat) {
    let out = MessageOutput::from_message(message);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["framing".to_string(), out.framing.to_string()]);
            if let Some(tid) = out.transaction_id {
                table.add_row(vec!["transaction_id".to_string(), tid.to_string()]);
            }
            if let Some(pid) = out.protocol_id {
                table.add_row(vec!["protocol_id".to_string(), pid.to_string()]);
            }
            if let Some(len) = out.data_length {
                table.add_row(vec!["data_length".to_string(), len.to_string()]);
            }
            table.add_row(vec!["unit_id".to_string(), out.unit_id.to_string()]);
            table.add_row(vec![
                "function".to_string(),
                format!("{} ({})", out.function_code, out.function_name),
            ]);
            table.add_row(vec!["payload".to_string(), out.payload.clone()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let prefix = match (out.transaction_id, out.protocol_id, out.data_length) {
                (Some(tid), Some(pid), Some(len)) => format!("tid={tid} pid={pid} len={len} "),
                _ => String::new(),
            };
            println!(
                "{prefix}unit={} function={} ({}) payload=[{}]",
                out.unit_id, out.function_code, out.function_name, out.payload
            );
        }
        OutputFormat::Raw => print_raw(message.payload().as_bytes()),
    }
}

pub fn print_encoded(envelope: &Envelope, wire: &[u8], format: OutputFormat) {
    let hex = to_hex(wire);
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                framing: framing_name(envelope),
                size: wire.len(),
                output_length: envelope.output_length(),
                hex: &hex,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAMING", "SIZE", "OUTPUT LENGTH", "BYTES"])
                .add_row(vec![
                    framing_name(envelope).to_string(),
                    wire.len().to_string(),
                    envelope.output_length().to_string(),
                    hex,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{hex}"),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn framing_name(envelope: &Envelope) -> &'static str {
    if envelope.is_headless() {
        "headless"
    } else {
        "networked"
    }
}

/// Human-readable name for a public function code.
pub fn function_name(code: u8) -> &'static str {
    match code & !EXCEPTION_FLAG {
        1 => "READ_COILS",
        2 => "READ_DISCRETE_INPUTS",
        3 => "READ_HOLDING_REGISTERS",
        4 => "READ_INPUT_REGISTERS",
        5 => "WRITE_SINGLE_COIL",
        6 => "WRITE_SINGLE_REGISTER",
        7 => "READ_EXCEPTION_STATUS",
        8 => "DIAGNOSTICS",
        11 => "GET_COMM_EVENT_COUNTER",
        12 => "GET_COMM_EVENT_LOG",
        15 => "WRITE_MULTIPLE_COILS",
        16 => "WRITE_MULTIPLE_REGISTERS",
        17 => "REPORT_SERVER_ID",
        20 => "READ_FILE_RECORD",
        21 => "WRITE_FILE_RECORD",
        22 => "MASK_WRITE_REGISTER",
        23 => "READ_WRITE_MULTIPLE_REGISTERS",
        24 => "READ_FIFO_QUEUE",
        43 => "ENCAPSULATED_INTERFACE",
        _ => "UNKNOWN",
    }
}
