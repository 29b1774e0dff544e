//! Byte-stream transport layer for S7 communication.
//!
//! This module defines the [`Transport`] trait, the seam between the protocol
//! engine and the network, and [`TcpTransport`], the ISO-on-TCP
//! implementation. The transport is protocol agnostic: it moves bytes and
//! reports failures, nothing more.
//!
//! # Behavior
//!
//! - **Connect** - A reachability probe (plain TCP connect) bounded by the
//!   connect timeout runs before the real connection is opened.
//! - **Receive** - Waits until the requested number of bytes is available,
//!   polling every 2 ms. On timeout any partially arrived bytes are drained
//!   and discarded so the stream does not stay misaligned.
//! - **Failures** - A peer close or failed read yields
//!   [`S7Error::DataReceive`]; a failed write closes the socket and yields
//!   [`S7Error::DataSend`].
//! - **Close** - Idempotent; the close observer fires once per live socket.
//!
//! # Example
//!
//! ```no_run
//! use s7_client::{TcpTransport, Timeouts, Transport};
//! use std::time::Duration;
//!
//! let mut transport = TcpTransport::new(Timeouts::default().with_read(Duration::from_secs(5)));
//! transport.set_close_observer(Some(Box::new(|| println!("socket closed"))));
//! transport.connect("192.168.0.1", 102)?;
//! transport.send(&[0x03, 0x00, 0x00, 0x07, 0x02, 0xF0, 0x80])?;
//! # Ok::<(), s7_client::S7Error>(())
//! ```

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, S7Error};

/// Default timeout for connect, read and write operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Polling period while waiting for incoming data.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Callback invoked when a live socket is closed.
pub type CloseObserver = Box<dyn FnMut() + Send>;

/// Connect, read and write timeouts.
///
/// # Example
///
/// ```
/// use s7_client::Timeouts;
/// use std::time::Duration;
///
/// let timeouts = Timeouts::default().with_connect(Duration::from_millis(500));
/// assert_eq!(timeouts.connect, Duration::from_millis(500));
/// assert_eq!(timeouts.read, Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timeouts {
    /// Bound for the reachability probe and for the connect itself.
    pub connect: Duration,
    /// Bound for waiting on incoming bytes.
    pub read: Duration,
    /// Bound for a single send.
    pub write: Duration,
}

impl Timeouts {
    /// Uses the same duration for all three timeouts.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            connect: timeout,
            read: timeout,
            write: timeout,
        }
    }

    /// Sets the connect timeout.
    pub fn with_connect(mut self, timeout: Duration) -> Self {
        self.connect = timeout;
        self
    }

    /// Sets the read timeout.
    pub fn with_read(mut self, timeout: Duration) -> Self {
        self.read = timeout;
        self
    }

    /// Sets the write timeout.
    pub fn with_write(mut self, timeout: Duration) -> Self {
        self.write = timeout;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

/// Reliable ordered byte stream used by the client.
///
/// Implementations must collapse their failures into the transport kinds of
/// [`S7Error`]: [`S7Error::ConnectionFailed`], [`S7Error::DataSend`],
/// [`S7Error::DataReceive`] and [`S7Error::NotConnected`].
pub trait Transport {
    /// Opens the stream to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::ConnectionFailed`] if the peer is unreachable.
    fn connect(&mut self, host: &str, port: u16) -> Result<()>;

    /// Sends all of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::DataSend`] (and closes the stream) on failure.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Fills `buffer` completely or fails after the read timeout.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::DataReceive`] on timeout, peer close or I/O failure.
    fn recv_exact(&mut self, buffer: &mut [u8]) -> Result<()>;

    /// Closes the stream. Calling it on a closed stream does nothing.
    fn close(&mut self);

    /// Returns `true` while the stream is open.
    fn is_connected(&self) -> bool;

    /// Returns the current timeouts.
    fn timeouts(&self) -> Timeouts;

    /// Replaces the timeouts. Applies to subsequent operations.
    fn set_timeouts(&mut self, timeouts: Timeouts);

    /// Installs (or removes) the callback fired when a live stream closes.
    fn set_close_observer(&mut self, observer: Option<CloseObserver>);
}

/// TCP implementation of [`Transport`].
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: Option<SocketAddr>,
    timeouts: Timeouts,
    on_close: Option<CloseObserver>,
}

impl TcpTransport {
    /// Creates a disconnected transport.
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            stream: None,
            peer: None,
            timeouts,
            on_close: None,
        }
    }

    /// Returns the address of the connected peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                warn!(host, port, error = %e, "cannot resolve host");
                S7Error::ConnectionFailed
            })?
            .collect();
        if addrs.is_empty() {
            return Err(S7Error::ConnectionFailed);
        }
        Ok(addrs)
    }

    fn open(addr: &SocketAddr, timeout: Duration) -> std::io::Result<TcpStream> {
        if timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(addr, timeout)
        }
    }

    /// Waits until `size` bytes can be read without blocking.
    fn wait_for_data(&mut self, size: usize) -> Result<()> {
        let timeout = self.timeouts.read;
        let stream = self.stream.as_ref().ok_or(S7Error::NotConnected)?;
        stream
            .set_nonblocking(true)
            .map_err(|_| S7Error::DataReceive)?;

        let mut probe = vec![0u8; size];
        let started = Instant::now();
        let outcome = loop {
            match stream.peek(&mut probe) {
                Ok(0) => break Err(true),
                Ok(n) if n >= size => break Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "receive failed");
                    break Err(false);
                }
            }
            if started.elapsed() > timeout {
                warn!(?timeout, expected = size, "receive timeout, flushing input");
                let mut flush = [0u8; 512];
                let mut s = stream;
                while let Ok(n) = s.read(&mut flush) {
                    if n == 0 {
                        break;
                    }
                }
                break Err(false);
            }
            thread::sleep(POLL_INTERVAL);
        };

        let restored = stream.set_nonblocking(false);
        match outcome {
            Ok(()) => restored.map_err(|_| S7Error::DataReceive),
            Err(peer_closed) => {
                if peer_closed {
                    warn!("connection closed by peer");
                    self.close();
                }
                Err(S7Error::DataReceive)
            }
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Timeouts::default())
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.close();
        let addrs = Self::resolve(host, port)?;
        let timeout = self.timeouts.connect;

        let mut last_err = None;
        for addr in &addrs {
            // Reachability probe, dropped right away
            if let Err(e) = Self::open(addr, timeout) {
                last_err = Some(e);
                continue;
            }
            match Self::open(addr, timeout) {
                Ok(stream) => {
                    // Both only fail on an already broken socket
                    let _ = stream.set_nodelay(true);
                    let write = (!self.timeouts.write.is_zero()).then_some(self.timeouts.write);
                    let _ = stream.set_write_timeout(write);
                    debug!(%addr, "tcp connected");
                    self.stream = Some(stream);
                    self.peer = Some(*addr);
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }

        if let Some(e) = last_err {
            warn!(host, port, error = %e, "tcp connect failed");
        }
        Err(S7Error::ConnectionFailed)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(S7Error::NotConnected)?;
        match stream.write_all(data).and_then(|_| stream.flush()) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, len = data.len(), "send failed");
                self.close();
                Err(S7Error::DataSend)
            }
        }
    }

    fn recv_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        self.wait_for_data(buffer.len())?;
        let stream = self.stream.as_mut().ok_or(S7Error::NotConnected)?;
        match stream.read_exact(buffer) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "read failed");
                if e.kind() == ErrorKind::UnexpectedEof {
                    self.close();
                }
                Err(S7Error::DataReceive)
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            self.peer = None;
            debug!("tcp closed");
            if let Some(observer) = self.on_close.as_mut() {
                observer();
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
        if let Some(stream) = &self.stream {
            let write = (!timeouts.write.is_zero()).then_some(timeouts.write);
            let _ = stream.set_write_timeout(write);
        }
    }

    fn set_close_observer(&mut self, observer: Option<CloseObserver>) {
        self.on_close = observer;
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .field("timeouts", &self.timeouts)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}
