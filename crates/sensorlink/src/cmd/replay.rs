use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use sensorlink_frame::FieldValue;
use sensorlink_radio::{ChannelId, SimRadio, FRAME_SIZE};
use sensorlink_registry::{
    Listener, NodeAddress, NodeTable, SensorManager, SensorType, SensorTypeMask, TableConfig,
};
use sensorlink_router::{Router, RouterConfig, StatsSnapshot};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::{load_tables, ReplayArgs};
use crate::exit::{
    io_error, registry_error, router_error, CliError, CliResult, INTERNAL, SUCCESS,
};
use crate::output::{from_hex, print_json, table, OutputFormat};

#[derive(Debug, Clone, Serialize)]
struct ReadingRow {
    node: NodeAddress,
    sensor_type: SensorType,
    value: FieldValue,
}

#[derive(Serialize)]
struct ReplayOutput {
    frames_queued: usize,
    readings: Vec<ReadingRow>,
    stats: StatsSnapshot,
}

struct QueuedFrame {
    channel: ChannelId,
    bytes: Vec<u8>,
}

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = read_frames(&args.file)?;
    let mut tables = load_tables(args.config.as_deref())?;
    for node in &args.nodes {
        let address =
            NodeAddress::new(node).map_err(|err| registry_error("invalid --node", err))?;
        tables.nodes.push(address);
    }
    let router_config = match &args.router_config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|err| io_error(&format!("failed to read {}", path.display()), err))?;
            RouterConfig::from_json(&json).map_err(|err| router_error("invalid router config", err))?
        }
        None => RouterConfig::default(),
    };

    let (nodes, sensors) = build_tables(&tables)?;
    let readings = Arc::new(Mutex::new(Vec::new()));
    for address in sensors.addresses() {
        let sink = Arc::clone(&readings);
        let listener = Listener::new(SensorTypeMask::ALL, move |reading| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ReadingRow {
                    node: reading.sensor.address().clone(),
                    sensor_type: reading.sensor_type,
                    value: reading.value.clone(),
                });
        });
        sensors
            .register_listener(&address, listener)
            .map_err(|err| CliError::new(INTERNAL, err.to_string()))?;
    }

    let radio = SimRadio::new();
    let types = tables
        .type_table()
        .map_err(|err| registry_error("invalid table config", err))?;
    let router = Router::builder(router_config, radio.clone(), sensors)
        .with_nodes(nodes)
        .with_types(types)
        .build();
    router
        .start()
        .map_err(|err| router_error("router start failed", err))?;
    let running = router.is_running();

    for frame in &frames {
        radio.push_frame(frame.channel, frame.bytes.clone());
        radio.raise_interrupt();
    }
    router
        .shutdown()
        .map_err(|err| router_error("router shutdown failed", err))?;

    // Frames left behind by bounded cycles.
    if running {
        while radio.pending_total() > 0 {
            router.drain_once();
        }
    }
    info!(frames = frames.len(), "replay finished");

    let output = ReplayOutput {
        frames_queued: frames.len(),
        readings: readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone(),
        stats: router.stats().snapshot(),
    };
    print_output(&output, format);
    Ok(SUCCESS)
}

/// Node table plus a sensor manager. Without configured sensors, every node
/// gets a sensor accepting all types.
fn build_tables(tables: &TableConfig) -> CliResult<(NodeTable, Arc<SensorManager>)> {
    let nodes = tables
        .node_table()
        .map_err(|err| registry_error("invalid node table", err))?;
    let sensors = tables
        .sensor_manager()
        .map_err(|err| registry_error("invalid sensor table", err))?;
    if tables.sensors.is_empty() {
        for (_, address) in nodes.entries() {
            sensors
                .register_sensor(address.clone(), SensorTypeMask::ALL)
                .map_err(|err| registry_error("invalid node table", err))?;
        }
    }
    Ok((nodes, Arc::new(sensors)))
}

fn read_frames(path: &Path) -> CliResult<Vec<QueuedFrame>> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed to read {}", path.display()), err))?;

    let mut frames = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame = parse_line(line)
            .map_err(|err| CliError::invalid(format!("{}:{}: {err}", path.display(), index + 1)))?;
        frames.push(frame);
    }
    debug!(frames = frames.len(), "replay file parsed");
    Ok(frames)
}

fn parse_line(line: &str) -> Result<QueuedFrame, String> {
    let (channel, hex) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| "expected `<channel> <hex>`".to_string())?;
    let channel = channel
        .parse::<u8>()
        .ok()
        .and_then(ChannelId::new)
        .ok_or_else(|| format!("invalid channel {channel:?}"))?;
    let bytes = from_hex(hex)?;
    if bytes.is_empty() || bytes.len() > FRAME_SIZE {
        return Err(format!("frame must be 1 to {FRAME_SIZE} bytes, got {}", bytes.len()));
    }
    Ok(QueuedFrame { channel, bytes })
}

fn print_output(output: &ReplayOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(output),
        OutputFormat::Table => {
            let mut readings = table(["NODE", "SENSOR TYPE", "VALUE"]);
            for reading in &output.readings {
                readings.add_row(vec![
                    reading.node.to_string(),
                    reading.sensor_type.to_string(),
                    reading.value.to_string(),
                ]);
            }
            println!("{readings}");

            let stats = &output.stats;
            let mut summary = table(["FRAMES", "READ", "FIELDS", "FRAMES DROPPED", "FIELDS SKIPPED"]);
            summary.add_row(vec![
                output.frames_queued.to_string(),
                stats.frames_read.to_string(),
                stats.fields_dispatched.to_string(),
                stats.frames_dropped().to_string(),
                stats.fields_skipped().to_string(),
            ]);
            println!("{summary}");
        }
        OutputFormat::Pretty => {
            for reading in &output.readings {
                println!(
                    "{} {}={}",
                    reading.node, reading.sensor_type, reading.value
                );
            }
            let stats = &output.stats;
            println!(
                "frames={} read={} fields={} dropped={} skipped={}",
                output.frames_queued,
                stats.frames_read,
                stats.fields_dispatched,
                stats.frames_dropped(),
                stats.fields_skipped()
            );
        }
    }
}
