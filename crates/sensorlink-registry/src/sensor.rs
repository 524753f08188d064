use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use sensorlink_frame::FieldValue;
use tracing::{debug, trace};

use crate::error::{ReadError, RegistryError, Result, UnknownNodeError};
use crate::nodes::NodeAddress;
use crate::sensor_type::{SensorType, SensorTypeMask};

/// The local sensor framework as seen by the router.
///
/// `read` is synchronous: every listener subscribed to the sensor and type
/// has run by the time it returns.
pub trait SensorFramework: Send + Sync {
    /// Virtual sensor registered for a node, if any.
    fn find_sensor(&self, address: &NodeAddress) -> Option<SensorHandle>;

    /// Deliver one raw value of `sensor_type` from `sensor` to its listeners.
    fn read(
        &self,
        sensor: &SensorHandle,
        sensor_type: SensorType,
        value: &FieldValue,
    ) -> std::result::Result<(), ReadError>;
}

/// Cheap, cloneable reference to a registered virtual sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorHandle {
    inner: Arc<SensorInfo>,
}

#[derive(Debug, PartialEq, Eq)]
struct SensorInfo {
    id: u32,
    address: NodeAddress,
    types: SensorTypeMask,
}

impl SensorHandle {
    pub fn id(&self) -> u32 {
        self.inner.id
    }

    pub fn address(&self) -> &NodeAddress {
        &self.inner.address
    }

    /// Types this sensor produces.
    pub fn types(&self) -> SensorTypeMask {
        self.inner.types
    }
}

/// One value delivered to a listener.
#[derive(Debug, Clone, Copy)]
pub struct SensorReading<'a> {
    pub sensor: &'a SensorHandle,
    pub sensor_type: SensorType,
    pub value: &'a FieldValue,
}

type ListenerFn = dyn Fn(&SensorReading<'_>) + Send + Sync;

/// A callback subscribed to a set of sensor types.
#[derive(Clone)]
pub struct Listener {
    types: SensorTypeMask,
    callback: Arc<ListenerFn>,
}

impl Listener {
    pub fn new<F>(types: impl Into<SensorTypeMask>, callback: F) -> Self
    where
        F: Fn(&SensorReading<'_>) + Send + Sync + 'static,
    {
        Self {
            types: types.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn types(&self) -> SensorTypeMask {
        self.types
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("types", &self.types)
            .finish()
    }
}

struct VirtualSensor {
    handle: SensorHandle,
    listeners: RwLock<Vec<Listener>>,
    reads: AtomicU64,
}

/// In-process sensor framework: virtual sensors keyed by node address.
#[derive(Default)]
pub struct SensorManager {
    sensors: RwLock<HashMap<NodeAddress, Arc<VirtualSensor>>>,
    next_id: AtomicU32,
}

impl SensorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the virtual sensor for a remote node.
    pub fn register_sensor(
        &self,
        address: NodeAddress,
        types: impl Into<SensorTypeMask>,
    ) -> Result<SensorHandle> {
        let mut sensors = self.sensors.write().unwrap_or_else(PoisonError::into_inner);
        if sensors.contains_key(&address) {
            return Err(RegistryError::DuplicateSensor(address));
        }

        let handle = SensorHandle {
            inner: Arc::new(SensorInfo {
                id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                address: address.clone(),
                types: types.into(),
            }),
        };
        sensors.insert(
            address.clone(),
            Arc::new(VirtualSensor {
                handle: handle.clone(),
                listeners: RwLock::new(Vec::new()),
                reads: AtomicU64::new(0),
            }),
        );
        debug!(node = %address, id = handle.id(), "virtual sensor registered");
        Ok(handle)
    }

    /// Remove a node's virtual sensor. Outstanding handles stop reading.
    pub fn remove_sensor(&self, address: &NodeAddress) -> Option<SensorHandle> {
        self.sensors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address)
            .map(|sensor| sensor.handle.clone())
    }

    /// Subscribe `listener` to a node's sensor.
    pub fn register_listener(
        &self,
        address: &NodeAddress,
        listener: Listener,
    ) -> std::result::Result<(), UnknownNodeError> {
        let sensor = self.lookup(address).ok_or_else(|| UnknownNodeError {
            address: address.clone(),
        })?;
        sensor
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
        Ok(())
    }

    /// Successful reads delivered to a node's sensor so far.
    pub fn read_count(&self, address: &NodeAddress) -> u64 {
        self.lookup(address)
            .map_or(0, |sensor| sensor.reads.load(Ordering::Relaxed))
    }

    /// Registered node addresses, sorted.
    pub fn addresses(&self) -> Vec<NodeAddress> {
        let mut addresses: Vec<_> = self
            .sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        addresses.sort();
        addresses
    }

    fn lookup(&self, address: &NodeAddress) -> Option<Arc<VirtualSensor>> {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }
}

impl SensorFramework for SensorManager {
    fn find_sensor(&self, address: &NodeAddress) -> Option<SensorHandle> {
        self.lookup(address).map(|sensor| sensor.handle.clone())
    }

    fn read(
        &self,
        sensor: &SensorHandle,
        sensor_type: SensorType,
        value: &FieldValue,
    ) -> std::result::Result<(), ReadError> {
        let registered = self
            .lookup(sensor.address())
            .filter(|registered| registered.handle == *sensor)
            .ok_or_else(|| ReadError::NotRegistered(sensor.address().clone()))?;

        if !sensor.types().contains(sensor_type) {
            return Err(ReadError::Unsupported {
                address: sensor.address().clone(),
                sensor_type,
            });
        }
        if sensor_type == SensorType::AMBIENT_TEMPERATURE_RAW && value.as_i64().is_none() {
            return Err(ReadError::InvalidValue {
                sensor_type,
                found: value.type_name(),
            });
        }

        // Snapshot so a listener may subscribe more listeners without deadlocking.
        let listeners: Vec<Listener> = registered
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|listener| listener.types.contains(sensor_type))
            .cloned()
            .collect();

        let reading = SensorReading {
            sensor,
            sensor_type,
            value,
        };
        for listener in &listeners {
            (listener.callback)(&reading);
        }

        registered.reads.fetch_add(1, Ordering::Relaxed);
        trace!(
            node = %sensor.address(),
            %sensor_type,
            listeners = listeners.len(),
            "sensor read dispatched"
        );
        Ok(())
    }
}

impl std::fmt::Debug for SensorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorManager")
            .field("sensors", &self.addresses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<(SensorType, FieldValue)>>>, Listener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = Listener::new(SensorTypeMask::ALL, move |reading| {
            sink.lock()
                .unwrap()
                .push((reading.sensor_type, reading.value.clone()));
        });
        (seen, listener)
    }

    #[test]
    fn read_invokes_listener_synchronously() {
        let manager = SensorManager::new();
        let node = addr("b3b4b5b6f1");
        manager
            .register_sensor(node.clone(), SensorType::AMBIENT_TEMPERATURE_RAW)
            .unwrap();
        let (seen, listener) = recorder();
        manager.register_listener(&node, listener).unwrap();

        let sensor = manager.find_sensor(&node).unwrap();
        manager
            .read(&sensor, SensorType::AMBIENT_TEMPERATURE_RAW, &2731.into())
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(SensorType::AMBIENT_TEMPERATURE_RAW, FieldValue::Integer(2731))]
        );
        assert_eq!(manager.read_count(&node), 1);
    }

    #[test]
    fn listener_filtered_by_type() {
        let manager = SensorManager::new();
        let node = addr("b3b4b5b6f1");
        let types: SensorTypeMask = [SensorType::Light, SensorType::Pressure]
            .into_iter()
            .collect();
        let sensor = manager.register_sensor(node.clone(), types).unwrap();

        let (seen, _) = recorder();
        let sink = Arc::clone(&seen);
        manager
            .register_listener(
                &node,
                Listener::new(SensorType::Light, move |reading| {
                    sink.lock()
                        .unwrap()
                        .push((reading.sensor_type, reading.value.clone()));
                }),
            )
            .unwrap();

        manager.read(&sensor, SensorType::Pressure, &1013.into()).unwrap();
        manager.read(&sensor, SensorType::Light, &300.into()).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(SensorType::Light, FieldValue::Integer(300))]
        );
        assert_eq!(manager.read_count(&node), 2);
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let manager = SensorManager::new();
        let node = addr("b3b4b5b6f1");
        let sensor = manager.register_sensor(node, SensorType::Light).unwrap();

        assert!(matches!(
            manager.read(&sensor, SensorType::Pressure, &1.into()),
            Err(ReadError::Unsupported { sensor_type: SensorType::Pressure, .. })
        ));
    }

    #[test]
    fn raw_temperature_requires_integer() {
        let manager = SensorManager::new();
        let node = addr("b3b4b5b6f1");
        let sensor = manager
            .register_sensor(node, SensorType::AMBIENT_TEMPERATURE_RAW)
            .unwrap();

        assert!(matches!(
            manager.read(&sensor, SensorType::AMBIENT_TEMPERATURE_RAW, &"hot".into()),
            Err(ReadError::InvalidValue { found: "text", .. })
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let manager = SensorManager::new();
        let node = addr("b3b4b5b6f1");
        manager.register_sensor(node.clone(), SensorTypeMask::ALL).unwrap();
        assert!(matches!(
            manager.register_sensor(node, SensorTypeMask::ALL),
            Err(RegistryError::DuplicateSensor(_))
        ));
    }

    #[test]
    fn unknown_node_lookups() {
        let manager = SensorManager::new();
        let node = addr("b3b4b5b6f1");
        assert!(manager.find_sensor(&node).is_none());
        let (_, listener) = recorder();
        assert_eq!(
            manager.register_listener(&node, listener).unwrap_err(),
            UnknownNodeError { address: node }
        );
    }

    #[test]
    fn removed_sensor_handle_stops_reading() {
        let manager = SensorManager::new();
        let node = addr("b3b4b5b6f1");
        let sensor = manager.register_sensor(node.clone(), SensorTypeMask::ALL).unwrap();
        assert!(manager.remove_sensor(&node).is_some());

        assert!(matches!(
            manager.read(&sensor, SensorType::Light, &1.into()),
            Err(ReadError::NotRegistered(_))
        ));
        // A new registration for the same node does not revive old handles.
        manager.register_sensor(node, SensorTypeMask::ALL).unwrap();
        assert!(matches!(
            manager.read(&sensor, SensorType::Light, &1.into()),
            Err(ReadError::NotRegistered(_))
        ));
    }

    #[test]
    fn listener_may_subscribe_from_callback() {
        let manager = Arc::new(SensorManager::new());
        let node = addr("b3b4b5b6f1");
        let sensor = manager.register_sensor(node.clone(), SensorTypeMask::ALL).unwrap();

        let inner = Arc::clone(&manager);
        let inner_node = node.clone();
        manager
            .register_listener(
                &node,
                Listener::new(SensorTypeMask::ALL, move |_| {
                    let _ = inner.register_listener(
                        &inner_node,
                        Listener::new(SensorTypeMask::NONE, |_| {}),
                    );
                }),
            )
            .unwrap();

        manager.read(&sensor, SensorType::Light, &1.into()).unwrap();
        assert_eq!(manager.addresses(), vec![node]);
    }
}
