use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use sensorlink_radio::{RadioDevice, Transceiver};
use sensorlink_registry::{NodeTable, SensorFramework, TypeTable};
use tracing::{debug, info, warn};

use crate::config::{NodeRole, RouterConfig};
use crate::dispatch::Dispatcher;
use crate::error::{Result, RouterError};
use crate::scheduler::{DrainReport, DrainScheduler};
use crate::stats::RouterStats;

const WORKER_THREAD_NAME: &str = "sensorlink-drain";


struct Shared<T> {
    device: RadioDevice<T>,
    nodes: NodeTable,
    dispatcher: Dispatcher,
    scheduler: Mutex<DrainScheduler>,
    stats: Arc<RouterStats>,
}

impl<T: Transceiver> Shared<T> {
    /// Cycles never overlap: the scheduler lock makes each one run to completion.
    fn run_cycle(&self) -> DrainReport {
        let mut scheduler = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let report = scheduler.run_cycle(&self.device, &self.nodes, &self.dispatcher);

        self.stats
            .record_cycle(report.frames_read(), report.read_errors, report.bound_exhausted);
        if report.transport_error.is_some() {
            self.stats.record_transport_error();
        }
        for frame in &report.frames {
            self.stats.record_frame(&frame.result);
        }
        report
    }
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn stop(self) -> thread::Result<()> {
        // The worker owns the receiver until it exits, so this cannot fail.
        let _ = self.stop.send(());
        self.handle.join()
    }
}

/// Receives frames from sensor nodes and turns them into sensor reads.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use sensorlink_radio::SimRadio;
/// # use sensorlink_registry::{NodeTable, SensorManager};
/// # use sensorlink_router::{Router, RouterConfig};
/// let sensors = Arc::new(SensorManager::new());
/// let router = Router::builder(RouterConfig::default(), SimRadio::new(), sensors)
///     .with_nodes(NodeTable::from_addresses(&["b3b4b5b6f1"])?)
///     .build();
/// router.start()?;
/// # Ok::<(), sensorlink_router::RouterError>(())
/// ```
pub struct Router<T> {
    config: RouterConfig,
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<Worker>>,
}

/// Collects the tables a [`Router`] is built from.
pub struct RouterBuilder<T> {
    config: RouterConfig,
    transceiver: T,
    sensors: Arc<dyn SensorFramework>,
    nodes: NodeTable,
    types: TypeTable,
}

impl<T: Transceiver + 'static> RouterBuilder<T> {
    /// Channel to node table. Empty by default.
    pub fn with_nodes(mut self, nodes: NodeTable) -> Self {
        self.nodes = nodes;
        self
    }

    /// Field name table. [`TypeTable::with_defaults`] by default.
    pub fn with_types(mut self, types: TypeTable) -> Self {
        self.types = types;
        self
    }

    pub fn build(self) -> Router<T> {
        let dispatcher = Dispatcher::new(
            Arc::new(self.types),
            self.sensors,
            self.config.decoder.clone(),
        );
        Router {
            shared: Arc::new(Shared {
                device: RadioDevice::new(self.config.device_name.clone(), self.transceiver),
                nodes: self.nodes,
                dispatcher,
                scheduler: Mutex::new(DrainScheduler::new(self.config.drain_bound)),
                stats: Arc::new(RouterStats::new()),
            }),
            config: self.config,
            worker: Mutex::new(None),
        }
    }
}

impl<T: Transceiver + 'static> Router<T> {
    pub fn builder(
        config: RouterConfig,
        transceiver: T,
        sensors: Arc<dyn SensorFramework>,
    ) -> RouterBuilder<T> {
        RouterBuilder {
            config,
            transceiver,
            sensors,
            nodes: NodeTable::new(),
            types: TypeTable::with_defaults(),
        }
    }

    /// A router with the default field names and no nodes.
    pub fn new(config: RouterConfig, transceiver: T, sensors: Arc<dyn SensorFramework>) -> Self {
        Self::builder(config, transceiver, sensors).build()
    }

    /// Start receiving.
    ///
    /// Installs the receive callback and returns without waiting for frames.
    /// An interrupt queues a drain cycle on a single worker thread; interrupts
    /// raised while a cycle is already queued are merged into it.
    /// Calling it again while running does nothing, and on a
    /// [`NodeRole::Sensor`] node it never does anything. Failing to open the
    /// radio or install the callback is the only error.
    pub fn start(&self) -> Result<()> {
        if self.config.role == NodeRole::Sensor {
            debug!("sensor role, router not started");
            return Ok(());
        }

        let mut worker = self.worker();
        if worker.is_some() {
            return Ok(());
        }

        // One slot: an interrupt raised while a cycle is already pending
        // adds nothing, since that cycle drains every channel anyway.
        let (pending, interrupts) = channel::bounded(1);
        let (stop, stopped) = channel::bounded(1);
        let rearm = pending.clone();
        {
            let mut radio = self.shared.device.open()?;
            let stats = Arc::clone(&self.shared.stats);
            radio.set_receive_callback(Arc::new(move || {
                stats.record_interrupt();
                // Full: a cycle is already pending. Disconnected: shut down.
                let _ = pending.try_send(());
            }))?;
        }

        let shared = Arc::clone(&self.shared);
        let queue = CycleQueue {
            pending: rearm,
            interrupts,
            stopped,
        };
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || drain_worker(&shared, &queue))
            .map_err(RouterError::WorkerSpawn)?;

        info!(
            device = self.shared.device.name(),
            nodes = self.shared.nodes.len(),
            bound = self.config.drain_bound,
            "router started"
        );
        *worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Stop the worker after it has run the cycle for any pending interrupt.
    ///
    /// Interrupts raised afterwards are ignored. The router can be started
    /// again.
    pub fn shutdown(&self) -> Result<()> {
        let Some(worker) = self.worker().take() else {
            return Ok(());
        };
        worker.stop().map_err(|_| RouterError::WorkerPanicked)?;
        info!(device = self.shared.device.name(), "router stopped");
        Ok(())
    }

    /// Run one drain cycle on the calling thread.
    pub fn drain_once(&self) -> DrainReport {
        self.shared.run_cycle()
    }

    /// Whether the drain worker is alive.
    pub fn is_running(&self) -> bool {
        self.worker()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.shared.nodes
    }

    pub fn types(&self) -> &TypeTable {
        self.shared.dispatcher.types()
    }

    pub fn stats(&self) -> &RouterStats {
        &self.shared.stats
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Drop for Router<T> {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.stop().is_err() {
                warn!("drain worker panicked");
            }
        }
    }
}

impl<T> std::fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("nodes", &self.shared.nodes)
            .finish()
    }
}

struct CycleQueue {
    pending: Sender<()>,
    interrupts: Receiver<()>,
    stopped: Receiver<()>,
}

impl CycleQueue {
    /// Run one cycle. A cycle cut short by the step bound queues another,
    /// so frames left on the radio do not wait for the next interrupt.
    fn run<T: Transceiver>(&self, shared: &Shared<T>) {
        if shared.run_cycle().bound_exhausted {
            let _ = self.pending.try_send(());
        }
    }
}

fn drain_worker<T: Transceiver>(shared: &Shared<T>, queue: &CycleQueue) {
    debug!("drain worker running");
    loop {
        channel::select! {
            recv(queue.interrupts) -> _ => queue.run(shared),
            recv(queue.stopped) -> _ => {
                // An interrupt may have landed together with the stop request.
                if queue.interrupts.try_recv().is_ok() {
                    queue.run(shared);
                }
                break;
            }
        }
    }
    debug!("drain worker exiting");
}

/// Start `router`. See [`Router::start`].
pub fn start_router<T: Transceiver + 'static>(router: &Router<T>) -> Result<()> {
    router.start()
}
