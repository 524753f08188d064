use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, TryLockError};

use tracing::trace;

use crate::error::{RadioError, Result};
use crate::traits::Transceiver;

/// Device name used when the configuration does not name one.
pub const DEFAULT_DEVICE_NAME: &str = "nrf24l01_0";

/// The single long-lived handle to a radio transceiver.
///
/// All access goes through [`RadioDevice::open`], which grants exclusive use
/// until the returned [`RadioGuard`] is dropped. Opening never times out: the
/// device is expected to always become available, so waiting is a liveness
/// assumption rather than a failure mode.
pub struct RadioDevice<T> {
    name: String,
    inner: Mutex<T>,
}

impl<T: Transceiver> RadioDevice<T> {
    /// Wrap a transceiver under a device name.
    pub fn new(name: impl Into<String>, transceiver: T) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(transceiver),
        }
    }

    /// Acquire exclusive access, blocking until the current holder releases it.
    pub fn open(&self) -> Result<RadioGuard<'_, T>> {
        let guard = self.inner.lock().map_err(|_| RadioError::Poisoned {
            device: self.name.clone(),
        })?;
        trace!(device = %self.name, "radio handle acquired");
        Ok(RadioGuard {
            name: &self.name,
            guard,
        })
    }

    /// Acquire exclusive access only if nobody currently holds it.
    pub fn try_open(&self) -> Result<Option<RadioGuard<'_, T>>> {
        match self.inner.try_lock() {
            Ok(guard) => {
                trace!(device = %self.name, "radio handle acquired");
                Ok(Some(RadioGuard {
                    name: &self.name,
                    guard,
                }))
            }
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Poisoned(_)) => Err(RadioError::Poisoned {
                device: self.name.clone(),
            }),
        }
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume the device and return the transceiver.
    pub fn into_inner(self) -> Result<T> {
        let name = self.name;
        self.inner
            .into_inner()
            .map_err(|_| RadioError::Poisoned { device: name })
    }
}

impl<T> std::fmt::Debug for RadioDevice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioDevice")
            .field("name", &self.name)
            .finish()
    }
}

/// Exclusive access to a [`RadioDevice`]; released when dropped.
pub struct RadioGuard<'a, T> {
    name: &'a str,
    guard: MutexGuard<'a, T>,
}

impl<T> RadioGuard<'_, T> {
    /// Name of the device this guard holds.
    pub fn device_name(&self) -> &str {
        self.name
    }
}

impl<T> Deref for RadioGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for RadioGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for RadioGuard<'_, T> {
    fn drop(&mut self) {
        trace!(device = %self.name, "radio handle released");
    }
}
