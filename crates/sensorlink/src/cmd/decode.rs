use sensorlink_frame::{reclaim, DecoderConfig, EmptyPayload, FieldValue, PayloadDecoder};
use sensorlink_radio::FRAME_SIZE;
use sensorlink_registry::SensorType;
use serde::Serialize;

use crate::cmd::{load_tables, DecodeArgs};
use crate::exit::{decode_error, registry_error, CliError, CliResult, SUCCESS};
use crate::output::{from_hex, print_json, print_raw, table, to_hex, OutputFormat};

#[derive(Serialize)]
struct FieldRow {
    name: String,
    value: FieldValue,
    /// `None` when the name is not mapped.
    sensor_type: Option<SensorType>,
}

#[derive(Serialize)]
struct DecodeOutput {
    frame_len: usize,
    sequence: Option<u8>,
    payload: String,
    fields: Vec<FieldRow>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut frame = from_hex(&args.frame)
        .map_err(|err| CliError::invalid(format!("invalid frame hex: {err}")))?;
    if frame.is_empty() {
        return Err(CliError::invalid("frame is empty"));
    }
    if frame.len() > FRAME_SIZE {
        return Err(CliError::invalid(format!(
            "frame is {} bytes, max {FRAME_SIZE}",
            frame.len()
        )));
    }

    let types = load_tables(args.config.as_deref())?
        .type_table()
        .map_err(|err| registry_error("invalid table config", err))?;

    let frame_len = frame.len();
    let sequence = frame.last().copied();
    let payload = reclaim(&mut frame).to_vec();

    let decoder = PayloadDecoder::new(DecoderConfig {
        empty_payload: if args.reject_empty {
            EmptyPayload::Reject
        } else {
            EmptyPayload::Accept
        },
        ..DecoderConfig::default()
    });
    let decoded = decoder
        .decode(&payload)
        .map_err(|err| decode_error("decode failed", err))?;

    let fields = decoded
        .iter()
        .map(|field| FieldRow {
            name: field.name.clone(),
            value: field.value.clone(),
            sensor_type: types.resolve_type(&field.name).ok(),
        })
        .collect();
    let output = DecodeOutput {
        frame_len,
        sequence,
        payload: to_hex(&payload),
        fields,
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut rows = table(["FIELD", "VALUE", "SENSOR TYPE"]);
            for field in &output.fields {
                rows.add_row(vec![
                    field.name.clone(),
                    field.value.to_string(),
                    type_label(field.sensor_type),
                ]);
            }
            println!("{rows}");
        }
        OutputFormat::Pretty => {
            println!(
                "sequence={} payload={} ({} bytes) fields={}",
                output.sequence.map_or("-".to_string(), |s| s.to_string()),
                output.payload,
                payload.len(),
                output.fields.len()
            );
            for field in &output.fields {
                println!(
                    "  {}={} ({})",
                    field.name,
                    field.value,
                    type_label(field.sensor_type)
                );
            }
        }
        OutputFormat::Raw => print_raw(&payload),
    }
    Ok(SUCCESS)
}

fn type_label(sensor_type: Option<SensorType>) -> String {
    sensor_type.map_or_else(|| "unknown".to_string(), |ty| ty.to_string())
}
