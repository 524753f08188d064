use sensorlink_frame::{encode_payload, Field, FieldValue, FrameWriter};
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_raw, table, to_hex, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    sequence: u8,
    payload_len: usize,
    payload: String,
    frame: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let fields = args
        .fields
        .iter()
        .map(|arg| parse_field(arg))
        .collect::<CliResult<Vec<_>>>()?;

    let payload = encode_payload(&fields).map_err(|err| frame_error("encode failed", err))?;
    let frame = FrameWriter::with_sequence(args.seq)
        .build(&payload)
        .map_err(|err| frame_error("encode failed", err))?;

    let output = EncodeOutput {
        sequence: args.seq,
        payload_len: payload.len(),
        payload: to_hex(&payload),
        frame: to_hex(&frame),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut rows = table(["SEQ", "PAYLOAD BYTES", "FRAME"]);
            rows.add_row(vec![
                output.sequence.to_string(),
                output.payload_len.to_string(),
                output.frame.clone(),
            ]);
            println!("{rows}");
        }
        OutputFormat::Pretty => println!("{}", output.frame),
        OutputFormat::Raw => print_raw(&frame),
    }
    Ok(SUCCESS)
}

/// `NAME=VALUE`, where VALUE is an integer, a float, `true`/`false`, or text.
fn parse_field(arg: &str) -> CliResult<Field> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| CliError::new(USAGE, format!("expected NAME=VALUE, got {arg:?}")))?;
    if name.is_empty() {
        return Err(CliError::new(USAGE, format!("empty field name in {arg:?}")));
    }
    Ok(Field::new(name, parse_value(raw)))
}

fn parse_value(raw: &str) -> FieldValue {
    if let Ok(int) = raw.parse::<i64>() {
        return FieldValue::Integer(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return FieldValue::Float(float);
    }
    match raw {
        "true" => FieldValue::Bool(true),
        "false" => FieldValue::Bool(false),
        text => FieldValue::Text(text.to_string()),
    }
}
