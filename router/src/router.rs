use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use router_net::{Inbound, LinkEndpoint};
use router_proto::{Classification, Packet, RoutingState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Constructed,
    Running,
    Stopping,
    Stopped,
}

struct RunningTasks {
    dispatch: JoinHandle<()>,
    periodic: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// One simulated router: owns its link endpoints, its distance vector and
/// route table, and the periodic-update timer.
///
/// State machine: `Constructed -> Running -> Stopping -> Stopped`, one
/// way. `start()` is only valid from `Constructed`, `stop()` only from
/// `Running`.
pub struct Router {
    name: String,
    update_time: Duration,
    endpoints: HashMap<u16, LinkEndpoint>,
    state: Mutex<RoutingState>,
    phase: Mutex<Phase>,
    tasks: Mutex<Option<RunningTasks>>,
}

impl Router {
    /// Binds every configured endpoint. A bind failure is fatal for the
    /// whole router and is propagated to the caller — typically the
    /// topology harness.
    pub async fn new(config: RouterConfig) -> Result<Arc<Self>> {
        let mut endpoints = HashMap::with_capacity(config.ports.len());
        for port in &config.ports {
            let endpoint = LinkEndpoint::bind(port.input, port.output).await?;
            endpoints.insert(port.output, endpoint);
        }
        Ok(Arc::new(Self {
            name: config.name.clone(),
            update_time: config.update_time,
            endpoints,
            state: Mutex::new(RoutingState::new(config.name)),
            phase: Mutex::new(Phase::Constructed),
            tasks: Mutex::new(None),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A stable snapshot of the route table, handy for tests and
    /// diagnostics.
    pub fn route_table(&self) -> HashMap<String, u16> {
        self.state.lock().unwrap().route_table().clone()
    }

    /// A stable snapshot of the distance vector.
    pub fn distance_vector(&self) -> HashMap<String, u32> {
        self.state.lock().unwrap().distance_vector().clone()
    }

    /// Brings up all endpoints, emits the initial Hello fan-out, and
    /// schedules the periodic broadcast.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut phase = self.phase.lock().unwrap();
            if *phase != Phase::Constructed {
                return Err(Error::InvalidState {
                    name: self.name.clone(),
                });
            }
            *phase = Phase::Running;
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        for endpoint in self.endpoints.values() {
            endpoint.start(inbound_tx.clone());
        }
        // Only the endpoints' own clones should keep the channel alive —
        // dropping ours lets `dispatch_loop` observe `None` once every
        // endpoint has stopped.
        drop(inbound_tx);

        self.broadcast(true);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatch = tokio::spawn(Self::dispatch_loop(self.clone(), inbound_rx));
        let periodic = tokio::spawn(Self::periodic_loop(
            self.clone(),
            self.update_time,
            shutdown_rx,
        ));

        *self.tasks.lock().unwrap() = Some(RunningTasks {
            dispatch,
            periodic,
            shutdown_tx,
        });
        Ok(())
    }

    /// Cancels the periodic timer, stops every endpoint, and waits for all
    /// background work to drain before returning.
    pub async fn stop(self: &Arc<Self>) -> Result<()> {
        {
            let mut phase = self.phase.lock().unwrap();
            if *phase != Phase::Running {
                return Err(Error::InvalidState {
                    name: self.name.clone(),
                });
            }
            *phase = Phase::Stopping;
        }

        let tasks = self.tasks.lock().unwrap().take();
        if let Some(tasks) = tasks {
            let _ = tasks.shutdown_tx.send(true);
            for endpoint in self.endpoints.values() {
                endpoint.stop().await;
            }
            let _ = tasks.periodic.await;
            let _ = tasks.dispatch.await;
        }

        *self.phase.lock().unwrap() = Phase::Stopped;
        Ok(())
    }

    async fn periodic_loop(
        router: Arc<Router>,
        update_time: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(update_time);
        // The first tick fires immediately; the startup Hello already
        // covers that moment, so consume it without broadcasting.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = interval.tick() => router.broadcast(false),
            }
        }
    }

    async fn dispatch_loop(router: Arc<Router>, mut inbound_rx: mpsc::UnboundedReceiver<Inbound>) {
        while let Some(Inbound { via_port, bytes }) = inbound_rx.recv().await {
            router.handle_inbound(via_port, bytes);
        }
    }

    fn handle_inbound(&self, via_port: u16, bytes: Bytes) {
        let packet = match Packet::decode(&bytes) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(router = %self.name, %err, "dropping malformed packet");
                return;
            }
        };

        let known_ports: Vec<u16> = self.endpoints.keys().copied().collect();
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.classify(via_port, packet, &known_ports)
        };

        match outcome {
            Classification::Deliver { msg } => {
                info!("[{}] Success! Data: {}", self.name, msg);
            }
            Classification::Broadcast { triggered_update } => {
                if triggered_update {
                    self.broadcast(false);
                }
            }
            Classification::Forward { via_port, packet } => match self.endpoints.get(&via_port) {
                Some(endpoint) => endpoint.enqueue(Bytes::from(packet.encode())),
                None => warn!(
                    router = %self.name,
                    via_port,
                    "route points at an endpoint that no longer exists, dropping"
                ),
            },
            Classification::Drop(reason) => {
                debug!(router = %self.name, ?reason, "dropping packet");
            }
        }
    }

    /// Emits a Hello (`hello = true`) or Update (`hello = false`) control
    /// packet on every endpoint, each carrying that endpoint's own input
    /// port as the diagnostic `port` field.
    fn broadcast(&self, hello: bool) {
        let state = self.state.lock().unwrap();
        for endpoint in self.endpoints.values() {
            let packet = if hello {
                state.hello_packet(endpoint.input_port())
            } else {
                state.update_packet(endpoint.input_port())
            };
            endpoint.enqueue(Bytes::from(packet.encode()));
        }
    }
}
