//! Collector node over a simulated radio: two sensor nodes send raw
//! temperature readings and a listener prints them.
//!
//! Run with:
//!   cargo run --example collector

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sensorlink::frame::{Field, FrameWriter};
use sensorlink::radio::{ChannelId, SimRadio};
use sensorlink::registry::{
    Listener, NodeAddress, NodeTable, SensorManager, SensorType, TemperatureRawData,
};
use sensorlink::router::{Router, RouterConfig};

const NODES: [&str; 2] = ["b3b4b5b6f1", "b3b4b5b6cd"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sensors = Arc::new(SensorManager::new());
    for node in NODES {
        let address = NodeAddress::new(node)?;
        sensors.register_sensor(address.clone(), SensorType::AMBIENT_TEMPERATURE_RAW)?;
        sensors.register_listener(
            &address,
            Listener::new(SensorType::AMBIENT_TEMPERATURE_RAW, |reading| {
                match TemperatureRawData::from_value(reading.value) {
                    Some(data) => eprintln!(
                        "{}: raw temperature {} (valid: {})",
                        reading.sensor.address(),
                        data.raw,
                        data.is_valid
                    ),
                    None => eprintln!(
                        "{}: unexpected value {}",
                        reading.sensor.address(),
                        reading.value
                    ),
                }
            }),
        )?;
    }

    let radio = SimRadio::new();
    let router = Router::builder(RouterConfig::default(), radio.clone(), sensors)
        .with_nodes(NodeTable::from_addresses(&NODES)?)
        .build();
    router.start()?;

    // Each node sends a few frames with an incrementing sequence byte.
    let mut writers = [FrameWriter::new(), FrameWriter::with_sequence(100)];
    for round in 0..3 {
        for (channel, writer) in ChannelId::all().zip(writers.iter_mut()) {
            let raw = 2700 + i64::from(channel.get()) * 10 + round;
            let frame = writer.build_fields(&[Field::new("t", raw)])?;
            radio.push_frame(channel, frame.to_vec());
        }
        radio.raise_interrupt();
        thread::sleep(Duration::from_millis(50));
    }

    router.shutdown()?;
    let stats = router.stats().snapshot();
    eprintln!(
        "interrupts={} frames={} fields={} dropped={}",
        stats.interrupts,
        stats.frames_read,
        stats.fields_dispatched,
        stats.frames_dropped()
    );
    Ok(())
}
