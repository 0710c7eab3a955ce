use super::handler::{ClientProtocol, QueryHandler};
use crate::dns::transport::{read_with_length_prefix, send_with_length_prefix};
use nsresolv_domain::{DomainError, ProxyConfig};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

const MAX_UDP_QUERY_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Stopped,
    Starting,
    Serving,
    Stopping,
}

struct Running {
    /// Stops accepting new queries and connections.
    shutdown: CancellationToken,
    /// Cancels queries still in flight after the drain grace period.
    abort: CancellationToken,
    tracker: TaskTracker,
    local_addrs: Vec<SocketAddr>,
}

/// Embedded DNS proxy of one namespace: UDP and TCP listeners on every
/// proxy address, all sharing one [`QueryHandler`].
pub struct DnsProxy {
    namespace: String,
    addresses: Vec<IpAddr>,
    config: ProxyConfig,
    handler: Arc<QueryHandler>,
    state: Mutex<ProxyState>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl DnsProxy {
    pub fn new(
        namespace: impl Into<String>,
        addresses: Vec<IpAddr>,
        handler: Arc<QueryHandler>,
        config: ProxyConfig,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            addresses,
            config,
            handler,
            state: Mutex::new(ProxyState::Stopped),
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> ProxyState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn handler(&self) -> &Arc<QueryHandler> {
        &self.handler
    }

    fn set_state(&self, next: ProxyState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(namespace = %self.namespace, from = ?*state, to = ?next, "Proxy state change");
        *state = next;
    }

    /// Addresses the listeners are bound to; empty when stopped.
    pub async fn local_addrs(&self) -> Vec<SocketAddr> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|running| running.local_addrs.clone())
            .unwrap_or_default()
    }

    /// Binds every listener and starts serving. Starting a serving proxy
    /// returns its current addresses.
    pub async fn start(&self) -> Result<Vec<SocketAddr>, DomainError> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            return Ok(current.local_addrs.clone());
        }

        self.set_state(ProxyState::Starting);
        let listeners = match self.bind_all().await {
            Ok(listeners) => listeners,
            Err(e) => {
                self.set_state(ProxyState::Stopped);
                warn!(namespace = %self.namespace, error = %e, "DNS proxy failed to start");
                return Err(e);
            }
        };

        let shutdown = CancellationToken::new();
        let abort = CancellationToken::new();
        let tracker = TaskTracker::new();
        let mut local_addrs = Vec::with_capacity(listeners.len());

        for (addr, udp, tcp) in listeners {
            local_addrs.push(addr);

            tracker.spawn(run_udp_listener(
                Arc::new(udp),
                Arc::clone(&self.handler),
                tracker.clone(),
                shutdown.clone(),
                abort.clone(),
            ));
            tracker.spawn(run_tcp_listener(
                tcp,
                Arc::clone(&self.handler),
                tracker.clone(),
                shutdown.clone(),
                abort.clone(),
                self.config.tcp_idle_timeout(),
            ));
        }

        self.set_state(ProxyState::Serving);
        info!(namespace = %self.namespace, addrs = ?local_addrs, "DNS proxy serving");

        *running = Some(Running {
            shutdown,
            abort,
            tracker,
            local_addrs: local_addrs.clone(),
        });
        Ok(local_addrs)
    }

    async fn bind_all(&self) -> Result<Vec<(SocketAddr, UdpSocket, TcpListener)>, DomainError> {
        let mut listeners = Vec::with_capacity(self.addresses.len());
        for ip in &self.addresses {
            let requested = SocketAddr::new(*ip, self.config.listen_port);
            let bind_error = |addr: SocketAddr, e: std::io::Error| DomainError::Bind {
                addr: addr.to_string(),
                reason: e.to_string(),
            };

            let udp = UdpSocket::bind(requested)
                .await
                .map_err(|e| bind_error(requested, e))?;
            // TCP follows the port UDP actually got, so port 0 binds one pair.
            let bound = udp.local_addr().map_err(|e| bind_error(requested, e))?;
            let tcp = TcpListener::bind(bound)
                .await
                .map_err(|e| bind_error(bound, e))?;

            listeners.push((bound, udp, tcp));
        }
        Ok(listeners)
    }

    /// Stops accepting queries, waits up to the drain grace period for
    /// in-flight ones, then cancels the rest and releases the sockets.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(current) = running.take() else {
            return;
        };

        self.set_state(ProxyState::Stopping);
        current.shutdown.cancel();
        current.tracker.close();

        let grace = self.config.drain_grace();
        if tokio::time::timeout(grace, current.tracker.wait()).await.is_err() {
            warn!(
                namespace = %self.namespace,
                in_flight = current.tracker.len(),
                "Drain grace period expired, cancelling remaining queries"
            );
            current.abort.cancel();
            current.tracker.wait().await;
        }

        self.set_state(ProxyState::Stopped);
        info!(namespace = %self.namespace, "DNS proxy stopped");
    }
}

impl Drop for DnsProxy {
    fn drop(&mut self) {
        if let Some(current) = self.running.get_mut().take() {
            current.shutdown.cancel();
            current.abort.cancel();
        }
    }
}

async fn run_udp_listener(
    socket: Arc<UdpSocket>,
    handler: Arc<QueryHandler>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    abort: CancellationToken,
) {
    let mut recv_buf = vec![0u8; MAX_UDP_QUERY_SIZE];

    loop {
        let (n, from) = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = socket.recv_from(&mut recv_buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    debug!(error = %e, "UDP recv error");
                    continue;
                }
            },
        };

        let query = recv_buf[..n].to_vec();
        let handler = Arc::clone(&handler);
        let socket = Arc::clone(&socket);
        let abort = abort.clone();
        tracker.spawn(async move {
            tokio::select! {
                _ = abort.cancelled() => {}
                response = handler.handle(&query, ClientProtocol::Udp) => {
                    if let Some(response) = response {
                        if let Err(e) = socket.send_to(&response, from).await {
                            debug!(client = %from, error = %e, "Failed to send UDP response");
                        }
                    }
                }
            }
        });
    }
}

async fn run_tcp_listener(
    listener: TcpListener,
    handler: Arc<QueryHandler>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    abort: CancellationToken,
    idle_timeout: Duration,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    debug!(error = %e, "TCP accept error");
                    continue;
                }
            },
        };

        tracker.spawn(serve_tcp_connection(
            stream,
            peer,
            Arc::clone(&handler),
            shutdown.clone(),
            abort.clone(),
            idle_timeout,
        ));
    }
}

async fn serve_tcp_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<QueryHandler>,
    shutdown: CancellationToken,
    abort: CancellationToken,
    idle_timeout: Duration,
) {
    loop {
        let query = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = tokio::time::timeout(idle_timeout, read_with_length_prefix(&mut stream)) => {
                match read {
                    Ok(Ok(query)) => query,
                    // Closed by the client, malformed framing, or idle.
                    _ => break,
                }
            }
        };

        let response = tokio::select! {
            _ = abort.cancelled() => break,
            response = handler.handle(&query, ClientProtocol::Tcp) => response,
        };

        if let Some(response) = response {
            if let Err(e) = send_with_length_prefix(&mut stream, &response).await {
                debug!(client = %peer, error = %e, "Failed to send TCP response");
                break;
            }
        }
    }
}
