#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    io,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use topos::{Config, Host, Id, Overlay, PeerStream};
use tracing_subscriber::{fmt, EnvFilter};

pub fn enable_tracing() {
    fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

// Produces a local address from the supplied port.
pub fn localhost_with_port(port: u16) -> SocketAddr {
    format!("127.0.0.1:{port}").parse().unwrap()
}

/// An in-memory stream tagged with the identifier of the peer at the other end.
pub struct MemoryStream {
    remote: Id,
    inner: DuplexStream,
}

impl MemoryStream {
    /// Creates a connected pair of streams between `a` and `b`, the first one is `a`'s end.
    pub fn pair(a: Id, b: Id, max_buf_size: usize) -> (Self, Self) {
        let (a_end, b_end) = tokio::io::duplex(max_buf_size);

        (
            Self {
                remote: b,
                inner: a_end,
            },
            Self {
                remote: a,
                inner: b_end,
            },
        )
    }
}

impl PeerStream for MemoryStream {
    fn remote_peer(&self) -> Id {
        self.remote
    }
}

impl AsyncRead for MemoryStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

type Handler = Arc<dyn Fn(MemoryStream) + Send + Sync>;

/// Routes streams between in-memory hosts.
#[derive(Clone)]
pub struct Network {
    max_buf_size: usize,
    handlers: Arc<RwLock<HashMap<Id, Handler>>>,
    stalled: Arc<RwLock<HashSet<Id>>>,
}

impl Default for Network {
    fn default() -> Self {
        Self::with_buf_size(64)
    }
}

impl Network {
    /// Streams opened on this network block writers once `max_buf_size` bytes are unread.
    pub fn with_buf_size(max_buf_size: usize) -> Self {
        Self {
            max_buf_size,
            handlers: Default::default(),
            stalled: Default::default(),
        }
    }

    /// Registers the handler incoming streams for `id` are passed to.
    pub fn register(&self, id: Id, handler: impl Fn(MemoryStream) + Send + Sync + 'static) {
        self.handlers.write().insert(id, Arc::new(handler));
    }

    /// Makes opening streams to `id` hang forever, as with a peer that drops every packet.
    pub fn stall(&self, id: Id) {
        self.stalled.write().insert(id);
    }

    pub fn is_reachable(&self, id: &Id) -> bool {
        self.handlers.read().contains_key(id)
    }

    pub fn host(&self, local_id: Id) -> MemoryHost {
        MemoryHost {
            local_id,
            network: self.clone(),
            pair_attempts: Default::default(),
            pair_failures: Default::default(),
            pair_delay: Default::default(),
        }
    }
}

/// A host whose streams never leave the process.
pub struct MemoryHost {
    local_id: Id,
    network: Network,
    pair_attempts: Arc<RwLock<Vec<Id>>>,
    pair_failures: Arc<RwLock<HashSet<Id>>>,
    pair_delay: Arc<RwLock<Option<Duration>>>,
}

impl MemoryHost {
    /// Every peer `pair` was called with, in order.
    pub fn pair_attempts(&self) -> Vec<Id> {
        self.pair_attempts.read().clone()
    }

    /// Makes pairing with the peer fail even if it is reachable.
    pub fn fail_pairing_with(&self, id: Id) {
        self.pair_failures.write().insert(id);
    }

    /// Makes every pairing take at least `delay` to complete.
    pub fn delay_pairing(&self, delay: Duration) {
        *self.pair_delay.write() = Some(delay);
    }
}

#[async_trait::async_trait]
impl Host for MemoryHost {
    type Stream = MemoryStream;

    async fn new_stream(&self, peer: Id, _protocol: &str) -> io::Result<Self::Stream> {
        let is_stalled = self.network.stalled.read().contains(&peer);
        if is_stalled {
            std::future::pending::<()>().await;
        }

        let handler = self
            .network
            .handlers
            .read()
            .get(&peer)
            .cloned()
            .ok_or(io::ErrorKind::ConnectionRefused)?;

        let (local, remote) = MemoryStream::pair(self.local_id, peer, self.network.max_buf_size);
        handler(remote);

        Ok(local)
    }

    async fn pair(&self, peer: Id) -> io::Result<()> {
        self.pair_attempts.write().push(peer);

        let delay = *self.pair_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.network.is_reachable(&peer) && !self.pair_failures.read().contains(&peer) {
            Ok(())
        } else {
            Err(io::ErrorKind::ConnectionRefused.into())
        }
    }
}

pub type TestNode = Arc<Overlay<MemoryHost>>;

pub fn test_config() -> Config {
    Config::default()
        .with_probe_timeout(Duration::from_millis(200))
        .with_discovery_interval(Duration::from_millis(10))
}

/// Creates a node on the network which answers probes with its overlay.
pub fn create_node(network: &Network, config: Config) -> TestNode {
    let id = Id::rand();
    let node = Arc::new(Overlay::new(id, network.host(id), config));

    let responder = node.clone();
    network.register(id, move |stream| {
        let responder = responder.clone();
        tokio::spawn(async move { responder.handle_probe(stream).await });
    });

    node
}

/// Creates a node which isn't reachable on the network.
pub fn create_detached_node(network: &Network, config: Config) -> TestNode {
    let id = Id::rand();
    Arc::new(Overlay::new(id, network.host(id), config))
}

/// Makes `peer` known to `node`: routing table entry and an address.
pub fn introduce(node: &TestNode, peer: Id, port: u16) {
    assert!(node.routing_table().insert(peer));
    node.peers().add_addrs(peer, [localhost_with_port(port)]);
}

/// Registers a peer which holds incoming streams open without ever answering.
pub fn silent_peer(network: &Network) -> Id {
    let id = Id::rand();
    network.register(id, |stream| {
        tokio::spawn(async move {
            let _stream = stream;
            std::future::pending::<()>().await
        });
    });

    id
}

/// Registers a peer which echoes probes with every bit flipped.
pub fn corrupting_peer(network: &Network) -> Id {
    let id = Id::rand();
    network.register(id, |mut stream| {
        tokio::spawn(async move {
            let mut buf = [0u8; 32];
            if stream.read_exact(&mut buf).await.is_ok() {
                buf.iter_mut().for_each(|byte| *byte = !*byte);
                let _ = stream.write_all(&buf).await;
            }
        });
    });

    id
}
