use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::error::{Error, Result};

/// Datagrams larger than this are never sent by this implementation and
/// are the largest a listener will accept in one read.
const INBOUND_BUFFER_SIZE: usize = 1024;

/// One packet delivered by a [`LinkEndpoint`] to the router, tagged with
/// the endpoint's own output port so the router knows which link it
/// arrived on — this is the "receiving endpoint" the distance-vector
/// protocol uses to populate the route table, not anything carried inside
/// the packet's own bytes.
#[derive(Debug)]
pub struct Inbound {
    pub via_port: u16,
    pub bytes: Bytes,
}

/// A full-duplex local UDP link between this router and one neighbor,
/// bound to a fixed `(input, output)` port pair at construction.
///
/// One task blocked on `recv_from` racing a shutdown signal, one task
/// draining an outbound queue, both joined by `stop()`.
#[derive(Debug)]
pub struct LinkEndpoint {
    input_port: u16,
    output_port: u16,
    socket: Arc<UdpSocket>,
    outbound_tx: mpsc::UnboundedSender<Bytes>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl LinkEndpoint {
    /// Binds the inbound listener socket. A bind failure here is fatal for
    /// this endpoint and is propagated with `?`.
    pub async fn bind(input_port: u16, output_port: u16) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, input_port));
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            input_port,
            output_port,
            socket: Arc::new(socket),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(None),
        })
    }

    pub fn input_port(&self) -> u16 {
        self.input_port
    }

    pub fn output_port(&self) -> u16 {
        self.output_port
    }

    /// Enqueues a pre-serialized packet for delivery to the peer. Never
    /// blocks and never confirms delivery; if the send loop has already
    /// stopped the packet is silently dropped.
    pub fn enqueue(&self, packet: Bytes) {
        let _ = self.outbound_tx.send(packet);
    }

    /// Spawns the listener and sender loops. `inbound` is shared across
    /// every endpoint of a router, tagged per-datagram with this
    /// endpoint's output port.
    pub fn start(&self, inbound: mpsc::UnboundedSender<Inbound>) {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .unwrap()
            .take()
            .expect("LinkEndpoint::start called more than once");

        let recv_task = tokio::spawn(Self::recv_loop(
            self.socket.clone(),
            self.input_port,
            self.output_port,
            self.shutdown_rx.clone(),
            inbound,
        ));
        let send_task = tokio::spawn(Self::send_loop(
            self.output_port,
            outbound_rx,
            self.shutdown_rx.clone(),
        ));

        *self.tasks.lock().unwrap() = Some((recv_task, send_task));
    }

    /// Signals both loops to terminate and waits for them to drain.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let tasks = self.tasks.lock().unwrap().take();
        if let Some((recv_task, send_task)) = tasks {
            let _ = recv_task.await;
            let _ = send_task.await;
        }
    }

    async fn recv_loop(
        socket: Arc<UdpSocket>,
        input_port: u16,
        output_port: u16,
        mut shutdown: watch::Receiver<bool>,
        inbound: mpsc::UnboundedSender<Inbound>,
    ) {
        let mut buf = [0u8; INBOUND_BUFFER_SIZE];
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    trace!(input_port, "recv loop stopping");
                    return;
                }
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((n, _src)) => {
                            let bytes = Bytes::copy_from_slice(&buf[..n]);
                            if inbound.send(Inbound { via_port: output_port, bytes }).is_err() {
                                // Router has gone away; nothing left to deliver to.
                                return;
                            }
                        }
                        Err(err) => {
                            if *shutdown.borrow() {
                                return;
                            }
                            warn!(input_port, %err, "recv error on link endpoint");
                        }
                    }
                }
            }
        }
    }

    async fn send_loop(
        output_port: u16,
        mut outbound_rx: mpsc::UnboundedReceiver<Bytes>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                maybe_packet = outbound_rx.recv() => {
                    match maybe_packet {
                        Some(packet) => Self::send_one(output_port, packet).await,
                        None => return,
                    }
                }
            }
        }
        // Drain whatever was already queued before giving up the socket.
        while let Ok(packet) = outbound_rx.try_recv() {
            Self::send_one(output_port, packet).await;
        }
    }

    /// Sends one packet via a short-lived socket, opened and closed once
    /// per send. A failed send is logged and never retried — the
    /// distance-vector protocol's periodic re-broadcast is the recovery
    /// path.
    async fn send_one(output_port: u16, packet: Bytes) {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, output_port));
        match UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await {
            Ok(socket) => {
                if let Err(err) = socket.send_to(&packet, addr).await {
                    warn!(output_port, %err, "send failed on link endpoint");
                }
            }
            Err(err) => warn!(output_port, %err, "failed to open outbound socket"),
        }
    }
}
