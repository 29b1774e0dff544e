//! High-level S7 client for communicating with Siemens PLCs.
//!
//! This module provides the [`Client`] struct, which is the primary interface
//! for communicating with S7-300/400/1200/1500 CPUs over ISO-on-TCP.
//!
//! # Overview
//!
//! The client provides a high-level API that handles:
//! - The three stage handshake (TCP, ISO connection, PDU negotiation)
//! - Splitting area transfers into PDU sized telegrams
//! - Batched multi-variable access (see [`MultiVar`](crate::MultiVar))
//! - System status list retrieval and the info records built on it
//! - PLC control, clock, session password and block info requests
//!
//! # Example
//!
//! ```no_run
//! use s7_client::{Area, Client, ClientConfig, WordLength};
//!
//! // CPU in rack 0, slot 2
//! let config = ClientConfig::new("192.168.0.10", 0, 2);
//! let mut client = Client::new(config);
//! client.connect()?;
//!
//! // Read 16 bytes from DB1 starting at DBB0
//! let mut buffer = [0u8; 16];
//! client.db_read(1, 0, &mut buffer)?;
//!
//! // Write two reals to DB1.DBD20 and DB1.DBD24
//! let mut data = [0u8; 8];
//! s7_client::utils::set_real_at(&mut data, 0, 1.5)?;
//! s7_client::utils::set_real_at(&mut data, 4, 2.5)?;
//! client.write_area(Area::DB, 1, 20, 2, WordLength::Real, &data)?;
//!
//! println!("{} negotiated {} bytes", client, client.pdu_negotiated());
//! # Ok::<(), s7_client::S7Error>(())
//! ```
//!
//! # Connection lifecycle
//!
//! | State | Reached after |
//! |-------|---------------|
//! | [`ConnectionState::Disconnected`] | creation, [`Client::disconnect`] or any handshake failure |
//! | [`ConnectionState::TransportConnected`] | TCP connect |
//! | [`ConnectionState::NetworkConnected`] | ISO connection confirm |
//! | [`ConnectionState::Established`] | PDU negotiation |
//!
//! # Thread Safety
//!
//! Every operation takes `&mut self`, so one client carries at most one
//! request in flight. Use one client per thread; `Client<TcpTransport>` is
//! `Send`.

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tracing::{debug, trace, warn};

use crate::command::{
    BlockInfoCommand, BlockType, ConnectionRequest, ControlCommand, MultiReadCommand,
    MultiWriteCommand, NegotiatePduCommand, ReadAreaCommand, SetDateTimeCommand,
    SetPasswordCommand, SzlFirstCommand, SzlNextCommand, UserDataCommand, WriteAreaCommand,
    wrap_payload, MAX_VARS, WRITE_HEADER_SIZE,
};
use crate::error::{Result, S7Error};
use crate::header::{
    clamp_pdu_size, Addressing, ConnectionType, Tsap, DEFAULT_PDU_SIZE, DEFAULT_S7_PORT,
    ISO_HEADER_SIZE, MIN_PDU_SIZE,
};
use crate::memory::{Area, WordLength};
use crate::multivar::DataItem;
use crate::response::{BlockInfo, CpuStatus, S7Response};
use crate::szl::{
    CpInfo, CpuInfo, OrderCode, Protection, Szl, SzlHeader, SZL_CPU_INFO, SZL_CP_INFO,
    SZL_ORDER_CODE, SZL_PROTECTION,
};
use crate::transport::{CloseObserver, TcpTransport, Timeouts, Transport};

/// Parameter number of the remote port.
pub const PARAM_REMOTE_PORT: u32 = 2;
/// Parameter number of the connect (ping) timeout, in ms.
pub const PARAM_PING_TIMEOUT: u32 = 3;
/// Parameter number of the send timeout, in ms.
pub const PARAM_SEND_TIMEOUT: u32 = 4;
/// Parameter number of the receive timeout, in ms.
pub const PARAM_RECV_TIMEOUT: u32 = 5;
/// Parameter number of the requested PDU size.
pub const PARAM_PDU_REQUEST: u32 = 10;

/// Overhead of a read reply (ISO + S7 header + item header).
const READ_OVERHEAD: usize = 18;

/// Largest 3-byte area address.
const MAX_ADDRESS: u32 = 0x00FF_FFFF;

/// Configuration for creating an S7 client.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// PLC IP address or hostname.
    pub host: String,
    /// ISO-on-TCP port.
    pub port: u16,
    /// TSAP selection.
    pub addressing: Addressing,
    /// Connection resource type.
    pub connection_type: ConnectionType,
    /// Requested PDU size, always within 240..=960.
    pub pdu_size: u16,
    /// Connect, read and write timeouts.
    pub timeouts: Timeouts,
    /// Free-form name used in logs and `Display`.
    pub name: String,
}

impl ClientConfig {
    /// Creates a configuration for the CPU at `rack`/`slot`.
    ///
    /// Uses port 102, a PG connection, a 480 byte PDU request and 2 second
    /// timeouts.
    ///
    /// # Arguments
    ///
    /// * `host` - PLC IP address or hostname
    /// * `rack` - Rack number (usually 0)
    /// * `slot` - CPU slot (2 for S7-300, 1 or 0 for S7-1200/1500)
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::ClientConfig;
    ///
    /// let config = ClientConfig::new("192.168.0.10", 0, 2);
    /// assert_eq!(config.port, 102);
    /// assert_eq!(config.pdu_size, 480);
    /// ```
    pub fn new(host: impl Into<String>, rack: u16, slot: u16) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_S7_PORT,
            addressing: Addressing::RackSlot { rack, slot },
            connection_type: ConnectionType::default(),
            pdu_size: DEFAULT_PDU_SIZE,
            timeouts: Timeouts::default(),
            name: String::new(),
        }
    }

    /// Sets a custom port (default is 102).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Uses explicit TSAPs instead of rack/slot.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::{ClientConfig, Tsap};
    ///
    /// // LOGO! 0BA8: local 01.00, remote 02.00
    /// let config = ClientConfig::new("192.168.0.3", 0, 0)
    ///     .with_tsaps(Tsap::new(0x0100), Tsap::new(0x0200));
    /// ```
    pub fn with_tsaps(mut self, local: Tsap, remote: Tsap) -> Self {
        self.addressing = Addressing::Tsap { local, remote };
        self
    }

    /// Sets the connection type (default is PG).
    pub fn with_connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }

    /// Sets the requested PDU size, clamped to 240..=960.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::ClientConfig;
    ///
    /// let config = ClientConfig::new("192.168.0.10", 0, 2).with_pdu_size(2000);
    /// assert_eq!(config.pdu_size, 960);
    /// ```
    pub fn with_pdu_size(mut self, pdu_size: u16) -> Self {
        self.pdu_size = clamp_pdu_size(pdu_size);
        self
    }

    /// Uses `timeout` for connect, read and write.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::new("192.168.0.10", 0, 2)
    ///     .with_timeout(Duration::from_secs(5));
    /// assert_eq!(config.timeouts.read, Duration::from_secs(5));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts = Timeouts::uniform(timeout);
        self
    }

    /// Sets the three timeouts individually.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Names the client.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Handshake progress of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// TCP connected, ISO connection pending.
    TransportConnected,
    /// ISO connected, PDU negotiation pending.
    NetworkConnected,
    /// Ready for requests.
    Established,
}

/// S7 client for communicating with Siemens PLCs.
///
/// Generic over its [`Transport`] so tests can substitute an in-memory peer;
/// the default is [`TcpTransport`].
///
/// Every operation records its outcome: [`last_error`](Self::last_error)
/// holds the error of the last failed call and
/// [`exec_time`](Self::exec_time) the duration of the last successful one.
///
/// # Example
///
/// ```no_run
/// use s7_client::{Client, ClientConfig};
///
/// let mut client = Client::new(ClientConfig::new("192.168.0.10", 0, 2).with_name("press"));
/// client.connect()?;
/// let status = client.plc_get_status()?;
/// println!("{client} is {status}");
/// # Ok::<(), s7_client::S7Error>(())
/// ```
pub struct Client<T: Transport = TcpTransport> {
    transport: T,
    config: ClientConfig,
    state: ConnectionState,
    pdu_length: u16,
    last_error: Option<S7Error>,
    exec_time: Duration,
    /// Receive buffer, lent to each reply and taken back afterwards.
    rx: Vec<u8>,
}

impl Client<TcpTransport> {
    /// Creates a disconnected TCP client.
    pub fn new(config: ClientConfig) -> Self {
        let transport = TcpTransport::new(config.timeouts);
        Self::with_transport(config, transport)
    }

    /// Creates a client for `host` at `rack`/`slot` and connects it.
    ///
    /// # Errors
    ///
    /// Returns the first failing handshake stage's error.
    pub fn connect_to(host: impl Into<String>, rack: u16, slot: u16) -> Result<Self> {
        let mut client = Self::new(ClientConfig::new(host, rack, slot));
        client.connect()?;
        Ok(client)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a disconnected client over `transport`.
    ///
    /// The transport's timeouts are replaced by the configured ones.
    pub fn with_transport(config: ClientConfig, mut transport: T) -> Self {
        transport.set_timeouts(config.timeouts);
        Self {
            transport,
            config,
            state: ConnectionState::Disconnected,
            pdu_length: 0,
            last_error: None,
            exec_time: Duration::ZERO,
            rx: Vec::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Changes the peer and its TSAPs. Takes effect on the next connect.
    pub fn set_connection_params(&mut self, host: impl Into<String>, local: Tsap, remote: Tsap) {
        self.config.host = host.into();
        self.config.addressing = Addressing::Tsap { local, remote };
    }

    /// Changes the connection type. Takes effect on the next connect.
    pub fn set_connection_type(&mut self, connection_type: ConnectionType) {
        self.config.connection_type = connection_type;
    }

    /// Returns the connection type.
    pub fn connection_type(&self) -> ConnectionType {
        self.config.connection_type
    }

    /// Installs a callback fired when the socket closes.
    pub fn on_closed(&mut self, observer: Option<CloseObserver>) {
        self.transport.set_close_observer(observer);
    }

    /// Returns the handshake state.
    pub fn state(&self) -> ConnectionState {
        if self.transport.is_connected() {
            self.state
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Returns `true` once the handshake completed and the socket is open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Established
    }

    /// Returns the requested PDU size.
    pub fn pdu_requested(&self) -> u16 {
        self.config.pdu_size
    }

    /// Returns the PDU size granted by the CPU, 0 while not connected.
    pub fn pdu_negotiated(&self) -> u16 {
        self.pdu_length
    }

    /// Returns the error of the last failed operation.
    pub fn last_error(&self) -> Option<S7Error> {
        self.last_error
    }

    /// Returns the duration of the last successful operation.
    pub fn exec_time(&self) -> Duration {
        self.exec_time
    }

    /// Runs `op`, recording its error or its duration.
    fn track<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let started = Instant::now();
        let result = op(self);
        match &result {
            Ok(_) => {
                self.exec_time = started.elapsed();
                self.last_error = None;
            }
            Err(e) => {
                self.exec_time = Duration::ZERO;
                self.last_error = Some(*e);
            }
        }
        result
    }

    // ==================== Connection ====================

    /// Connects to the PLC.
    ///
    /// Runs the TCP connect, the ISO connection request and the PDU
    /// negotiation. Any failing stage closes the socket before returning.
    /// Calling it on an established connection does nothing.
    ///
    /// # Errors
    ///
    /// - [`S7Error::ConnectionFailed`] if the PLC is unreachable
    /// - [`S7Error::IsoConnect`] / [`S7Error::InvalidPdu`] if the ISO
    ///   connection is refused
    /// - [`S7Error::NegotiatingPdu`] if the PDU negotiation fails
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.track(|c| {
            let result = c.handshake();
            if let Err(e) = result {
                warn!(client = %c, state = ?c.state, error = %e, "handshake failed");
                c.teardown();
            }
            result
        })
    }

    fn handshake(&mut self) -> Result<()> {
        self.teardown();
        self.transport.set_timeouts(self.config.timeouts);
        self.transport.connect(&self.config.host, self.config.port)?;
        self.state = ConnectionState::TransportConnected;
        debug!(host = %self.config.host, port = self.config.port, "transport connected");

        let (local, remote) = self.config.addressing.resolve(self.config.connection_type);
        let request = ConnectionRequest::new(local, remote).to_bytes()?;
        self.transact(&request, S7Response::check_iso_confirm)?;
        self.state = ConnectionState::NetworkConnected;
        debug!(%local, %remote, "iso connected");

        let request = NegotiatePduCommand::new(self.config.pdu_size).to_bytes()?;
        self.pdu_length = self.transact(&request, S7Response::negotiated_pdu)?;
        self.state = ConnectionState::Established;
        debug!(
            requested = self.config.pdu_size,
            negotiated = self.pdu_length,
            "pdu negotiated"
        );
        Ok(())
    }

    fn teardown(&mut self) {
        self.transport.close();
        self.state = ConnectionState::Disconnected;
        self.pdu_length = 0;
    }

    /// Closes the connection.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!(client = %self, "disconnecting");
        }
        self.teardown();
    }

    // ==================== Parameters ====================

    /// Reads a runtime parameter by number.
    ///
    /// | Number | Parameter |
    /// |--------|-----------|
    /// | 2 | remote port |
    /// | 3 | connect (ping) timeout, ms |
    /// | 4 | send timeout, ms |
    /// | 5 | receive timeout, ms |
    /// | 10 | requested PDU size |
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidParamNumber`] for any other number.
    pub fn get_param(&self, number: u32) -> Result<u32> {
        let millis = |d: Duration| u32::try_from(d.as_millis()).unwrap_or(u32::MAX);
        let timeouts = self.config.timeouts;
        match number {
            PARAM_REMOTE_PORT => Ok(u32::from(self.config.port)),
            PARAM_PING_TIMEOUT => Ok(millis(timeouts.connect)),
            PARAM_SEND_TIMEOUT => Ok(millis(timeouts.write)),
            PARAM_RECV_TIMEOUT => Ok(millis(timeouts.read)),
            PARAM_PDU_REQUEST => Ok(u32::from(self.config.pdu_size)),
            _ => Err(S7Error::InvalidParamNumber),
        }
    }

    /// Writes a runtime parameter by number. See [`get_param`](Self::get_param).
    ///
    /// The PDU request is clamped to 240..=960.
    ///
    /// # Errors
    ///
    /// - [`S7Error::InvalidParamNumber`] for an unknown number
    /// - [`S7Error::InvalidParams`] for a port outside the 16-bit range
    /// - [`S7Error::CannotChangeParam`] when changing the port while connected
    pub fn set_param(&mut self, number: u32, value: u32) -> Result<()> {
        let mut timeouts = self.config.timeouts;
        match number {
            PARAM_REMOTE_PORT => {
                let port = u16::try_from(value).map_err(|_| S7Error::InvalidParams)?;
                if self.is_connected() && port != self.config.port {
                    return Err(S7Error::CannotChangeParam);
                }
                self.config.port = port;
                return Ok(());
            }
            PARAM_PING_TIMEOUT => timeouts.connect = Duration::from_millis(value.into()),
            PARAM_SEND_TIMEOUT => timeouts.write = Duration::from_millis(value.into()),
            PARAM_RECV_TIMEOUT => timeouts.read = Duration::from_millis(value.into()),
            PARAM_PDU_REQUEST => {
                let size = u16::try_from(value).unwrap_or(u16::MAX);
                self.config.pdu_size = clamp_pdu_size(size);
                return Ok(());
            }
            _ => return Err(S7Error::InvalidParamNumber),
        }
        self.config.timeouts = timeouts;
        self.transport.set_timeouts(timeouts);
        Ok(())
    }

    // ==================== Telegram exchange ====================

    fn send_telegram(&mut self, telegram: &[u8]) -> Result<()> {
        if !self.transport.is_connected() {
            return Err(S7Error::NotConnected);
        }
        trace!(len = telegram.len(), "sending telegram");
        self.transport.send(telegram)
    }

    /// Receives one complete telegram, skipping empty keep-alive frames.
    fn recv_iso_packet(&mut self) -> Result<S7Response> {
        let limit = usize::from(self.config.pdu_size.max(self.pdu_length)) + ISO_HEADER_SIZE;
        loop {
            let mut head = [0u8; 4];
            self.transport.recv_exact(&mut head)?;
            let size = usize::from(u16::from_be_bytes([head[2], head[3]]));

            if size == ISO_HEADER_SIZE {
                let mut rest = [0u8; ISO_HEADER_SIZE - 4];
                self.transport.recv_exact(&mut rest)?;
                trace!("empty telegram skipped");
                continue;
            }
            if !(MIN_PDU_SIZE..=limit).contains(&size) {
                warn!(size, limit, "telegram length out of range");
                return Err(S7Error::InvalidPdu);
            }

            let mut bytes = std::mem::take(&mut self.rx);
            bytes.clear();
            bytes.resize(size, 0);
            bytes[..4].copy_from_slice(&head);
            let received = self
                .transport
                .recv_exact(&mut bytes[4..ISO_HEADER_SIZE])
                .and_then(|_| self.transport.recv_exact(&mut bytes[ISO_HEADER_SIZE..]));
            if let Err(e) = received {
                self.rx = bytes;
                return Err(e);
            }
            trace!(len = size, pdu_type = bytes[5], "telegram received");
            return Ok(S7Response::from_bytes(bytes));
        }
    }

    fn exchange(&mut self, telegram: &[u8]) -> Result<S7Response> {
        self.send_telegram(telegram)?;
        self.recv_iso_packet()
    }

    /// Exchanges `telegram` and parses the reply, keeping its buffer for the
    /// next one.
    fn transact<R>(&mut self, telegram: &[u8], parse: impl FnOnce(&S7Response) -> Result<R>) -> Result<R> {
        let reply = self.exchange(telegram)?;
        let result = parse(&reply);
        self.rx = reply.into_bytes();
        result
    }

    fn require_connection(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(S7Error::NotConnected)
        }
    }

    // ==================== Area read/write ====================

    /// Reads `amount` elements of `word_length` from a memory area.
    ///
    /// Transfers larger than one PDU are split into several requests and
    /// reassembled into `buffer`. Counter and timer areas always use their
    /// own word length; bit reads always transfer one element.
    ///
    /// # Arguments
    ///
    /// * `area` - Memory area to read
    /// * `db_number` - Data block number (only used for [`Area::DB`])
    /// * `start` - First element (bit address `byte * 8 + bit` for bits)
    /// * `amount` - Number of elements
    /// * `word_length` - Element type
    /// * `buffer` - Destination, at least `amount * word_length.size()` bytes
    ///
    /// # Returns
    ///
    /// The number of bytes read.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::BufferTooSmall`] if `buffer` cannot hold the data,
    /// transport errors, or the error reported by the CPU. Nothing is
    /// reported as transferred when any chunk fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7_client::{Area, Client, ClientConfig, WordLength};
    ///
    /// let mut client = Client::connect_to("192.168.0.10", 0, 2)?;
    /// let mut buffer = [0u8; 8];
    /// // Two DINTs from MD100
    /// let read = client.read_area(Area::MK, 0, 100, 2, WordLength::DInt, &mut buffer)?;
    /// assert_eq!(read, 8);
    /// # Ok::<(), s7_client::S7Error>(())
    /// ```
    pub fn read_area(
        &mut self,
        area: Area,
        db_number: u16,
        start: u32,
        amount: usize,
        word_length: WordLength,
        buffer: &mut [u8],
    ) -> Result<usize> {
        self.track(|c| c.read_area_chunks(area, db_number, start, amount, word_length, buffer))
    }

    fn read_area_chunks(
        &mut self,
        area: Area,
        db_number: u16,
        start: u32,
        amount: usize,
        word_length: WordLength,
        buffer: &mut [u8],
    ) -> Result<usize> {
        self.require_connection()?;
        let (word_length, amount, elem_size) = normalize(area, word_length, amount)?;
        let total = amount * elem_size;
        if buffer.len() < total {
            return Err(S7Error::BufferTooSmall);
        }
        let max_elements = usize::from(self.pdu_length).saturating_sub(READ_OVERHEAD) / elem_size;
        if max_elements == 0 {
            return Err(S7Error::SizeOverPdu);
        }

        let mut start = start;
        let mut offset = 0;
        let mut remaining = amount;
        while remaining > 0 {
            let elements = remaining.min(max_elements);
            let size = elements * elem_size;
            check_address(word_length, start)?;
            // elements <= max_elements < PDU size
            let request =
                ReadAreaCommand::new(area, db_number, word_length, start, elements as u16)
                    .to_bytes()?;
            trace!(%area, db_number, start, elements, "read chunk");
            self.transact(&request, |reply| reply.read_data(&mut buffer[offset..offset + size]))?;
            offset += size;
            remaining -= elements;
            start = advance(start, elements, elem_size)?;
        }
        debug!(%area, db_number, bytes = offset, "area read");
        Ok(offset)
    }

    /// Writes `amount` elements of `word_length` to a memory area.
    ///
    /// Splits the transfer like [`read_area`](Self::read_area).
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::BufferTooSmall`] if `data` is shorter than the
    /// transfer, transport errors, or the error reported by the CPU.
    pub fn write_area(
        &mut self,
        area: Area,
        db_number: u16,
        start: u32,
        amount: usize,
        word_length: WordLength,
        data: &[u8],
    ) -> Result<usize> {
        self.track(|c| c.write_area_chunks(area, db_number, start, amount, word_length, data))
    }

    fn write_area_chunks(
        &mut self,
        area: Area,
        db_number: u16,
        start: u32,
        amount: usize,
        word_length: WordLength,
        data: &[u8],
    ) -> Result<usize> {
        self.require_connection()?;
        let (word_length, amount, elem_size) = normalize(area, word_length, amount)?;
        let total = amount * elem_size;
        if data.len() < total {
            return Err(S7Error::BufferTooSmall);
        }
        let max_elements = usize::from(self.pdu_length).saturating_sub(WRITE_HEADER_SIZE) / elem_size;
        if max_elements == 0 {
            return Err(S7Error::SizeOverPdu);
        }

        let mut start = start;
        let mut offset = 0;
        let mut remaining = amount;
        while remaining > 0 {
            let elements = remaining.min(max_elements);
            let size = elements * elem_size;
            check_address(word_length, start)?;
            let request = WriteAreaCommand::new(
                area,
                db_number,
                word_length,
                start,
                elements as u16,
                &data[offset..offset + size],
            )?
            .to_bytes()?;
            trace!(%area, db_number, start, elements, "write chunk");
            self.transact(&request, S7Response::check_write_ack)?;
            offset += size;
            remaining -= elements;
            start = advance(start, elements, elem_size)?;
        }
        debug!(%area, db_number, bytes = offset, "area written");
        Ok(offset)
    }

    /// Reads `buffer.len()` bytes from data block `db_number`.
    pub fn db_read(&mut self, db_number: u16, start: u32, buffer: &mut [u8]) -> Result<()> {
        let len = buffer.len();
        self.read_area(Area::DB, db_number, start, len, WordLength::Byte, buffer)
            .map(|_| ())
    }

    /// Writes `data` to data block `db_number`.
    pub fn db_write(&mut self, db_number: u16, start: u32, data: &[u8]) -> Result<()> {
        self.write_area(Area::DB, db_number, start, data.len(), WordLength::Byte, data)
            .map(|_| ())
    }

    /// Reads flag (merker) bytes.
    pub fn mb_read(&mut self, start: u32, buffer: &mut [u8]) -> Result<()> {
        let len = buffer.len();
        self.read_area(Area::MK, 0, start, len, WordLength::Byte, buffer)
            .map(|_| ())
    }

    /// Writes flag (merker) bytes.
    pub fn mb_write(&mut self, start: u32, data: &[u8]) -> Result<()> {
        self.write_area(Area::MK, 0, start, data.len(), WordLength::Byte, data)
            .map(|_| ())
    }

    /// Reads process input bytes.
    pub fn eb_read(&mut self, start: u32, buffer: &mut [u8]) -> Result<()> {
        let len = buffer.len();
        self.read_area(Area::PE, 0, start, len, WordLength::Byte, buffer)
            .map(|_| ())
    }

    /// Writes process input bytes.
    pub fn eb_write(&mut self, start: u32, data: &[u8]) -> Result<()> {
        self.write_area(Area::PE, 0, start, data.len(), WordLength::Byte, data)
            .map(|_| ())
    }

    /// Reads process output bytes.
    pub fn ab_read(&mut self, start: u32, buffer: &mut [u8]) -> Result<()> {
        let len = buffer.len();
        self.read_area(Area::PA, 0, start, len, WordLength::Byte, buffer)
            .map(|_| ())
    }

    /// Writes process output bytes.
    pub fn ab_write(&mut self, start: u32, data: &[u8]) -> Result<()> {
        self.write_area(Area::PA, 0, start, data.len(), WordLength::Byte, data)
            .map(|_| ())
    }

    /// Reads `values.len()` timers starting at `start`.
    ///
    /// Each 2-byte timer is returned as `b[1] << 8 | b[0]`.
    pub fn tm_read(&mut self, start: u32, values: &mut [u16]) -> Result<()> {
        self.read_swapped(Area::TM, start, values)
    }

    /// Writes timers starting at `start`, mirroring [`tm_read`](Self::tm_read).
    pub fn tm_write(&mut self, start: u32, values: &[u16]) -> Result<()> {
        self.write_swapped(Area::TM, start, values)
    }

    /// Reads `values.len()` counters starting at `start`.
    ///
    /// Each 2-byte counter is returned as `b[1] << 8 | b[0]`.
    pub fn ct_read(&mut self, start: u32, values: &mut [u16]) -> Result<()> {
        self.read_swapped(Area::CT, start, values)
    }

    /// Writes counters starting at `start`, mirroring [`ct_read`](Self::ct_read).
    pub fn ct_write(&mut self, start: u32, values: &[u16]) -> Result<()> {
        self.write_swapped(Area::CT, start, values)
    }

    fn read_swapped(&mut self, area: Area, start: u32, values: &mut [u16]) -> Result<()> {
        let word_length = area.forced_word_length(WordLength::Word);
        let mut raw = vec![0u8; values.len() * 2];
        self.read_area(area, 0, start, values.len(), word_length, &mut raw)?;
        for (value, pair) in values.iter_mut().zip(raw.chunks_exact(2)) {
            *value = u16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(())
    }

    fn write_swapped(&mut self, area: Area, start: u32, values: &[u16]) -> Result<()> {
        let word_length = area.forced_word_length(WordLength::Word);
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.write_area(area, 0, start, values.len(), word_length, &raw)
            .map(|_| ())
    }

    // ==================== Multi variables ====================

    /// Reads up to 20 variables in one request.
    ///
    /// Each item's outcome is stored in the item; the returned error only
    /// covers failures of the whole request. Prefer
    /// [`MultiVar`](crate::MultiVar), which builds the items for you.
    ///
    /// # Errors
    ///
    /// - [`S7Error::TooManyItems`] for more than 20 items
    /// - [`S7Error::FunctionRefused`] for an empty batch
    /// - [`S7Error::SizeOverPdu`] if the request does not fit the PDU
    pub fn read_multi_vars(&mut self, items: &mut [DataItem<'_>]) -> Result<()> {
        self.track(|c| c.multi_read(items))
    }

    fn multi_read(&mut self, items: &mut [DataItem<'_>]) -> Result<()> {
        check_batch(items.len())?;
        self.require_connection()?;
        for item in items.iter_mut() {
            item.set_result(Err(S7Error::ItemNotAvailable));
        }

        let specs = items.iter().map(|i| *i.spec()).collect();
        let request = MultiReadCommand::new(specs)?.to_bytes()?;
        if request.len() > usize::from(self.pdu_length) {
            return Err(S7Error::SizeOverPdu);
        }
        self.transact(&request, |reply| {
            let parts = reply.multi_read_items(items.len())?;
            for (item, part) in items.iter_mut().zip(parts) {
                match part {
                    Ok(data) => item.fill(data),
                    Err(e) => item.set_result(Err(e)),
                }
            }
            Ok(())
        })?;
        debug!(items = items.len(), "multi read done");
        Ok(())
    }

    /// Writes up to 20 variables in one request.
    ///
    /// See [`read_multi_vars`](Self::read_multi_vars).
    pub fn write_multi_vars(&mut self, items: &mut [DataItem<'_>]) -> Result<()> {
        self.track(|c| c.multi_write(items))
    }

    fn multi_write(&mut self, items: &mut [DataItem<'_>]) -> Result<()> {
        check_batch(items.len())?;
        self.require_connection()?;
        for item in items.iter_mut() {
            item.set_result(Err(S7Error::ItemNotAvailable));
        }

        let request =
            MultiWriteCommand::new(items.iter().map(|i| (*i.spec(), i.data())).collect())?
                .to_bytes()?;
        if request.len() > usize::from(self.pdu_length) {
            return Err(S7Error::SizeOverPdu);
        }
        let results = self.transact(&request, |reply| reply.multi_write_results(items.len()))?;
        for (item, result) in items.iter_mut().zip(results) {
            item.set_result(result);
        }
        debug!(items = items.len(), "multi write done");
        Ok(())
    }

    // ==================== System status list ====================

    /// Reads a complete system status list.
    ///
    /// Follows the CPU's segmentation until it reports no more data. The
    /// result holds exactly the length declared by the first segment; bytes
    /// the CPU did not send read as zero.
    ///
    /// # Errors
    ///
    /// - [`S7Error::InvalidPlcAnswer`] if the CPU rejects the list
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7_client::Client;
    ///
    /// let mut client = Client::connect_to("192.168.0.10", 0, 2)?;
    /// let szl = client.read_szl(0x0011, 0x0000)?;
    /// println!("{} records, {} bytes", szl.header.record_count, szl.len());
    /// # Ok::<(), s7_client::S7Error>(())
    /// ```
    pub fn read_szl(&mut self, id: u16, index: u16) -> Result<Szl> {
        self.track(|c| c.szl_exchange(id, index))
    }

    fn szl_exchange(&mut self, id: u16, index: u16) -> Result<Szl> {
        self.require_connection()?;
        let mut header = SzlHeader::default();
        let mut data = Vec::new();
        let mut sequence_out: u16 = 0;
        let mut sequence_in: u8 = 0;
        let mut first = true;

        loop {
            sequence_out = sequence_out.wrapping_add(1);
            let request = if first {
                SzlFirstCommand::new(id, index, sequence_out).to_bytes()?
            } else {
                SzlNextCommand::new(sequence_out, sequence_in).to_bytes()?
            };
            let more = self.transact(&request, |reply| {
                let segment = reply.szl_segment(first)?;
                if let Some(h) = segment.header {
                    header = h;
                }
                data.extend_from_slice(segment.data);
                sequence_in = segment.sequence_in;
                trace!(id, index, segment = sequence_out, len = segment.data.len(), "szl segment");
                Ok(segment.more)
            })?;
            if !more {
                break;
            }
            first = false;
        }

        let declared = usize::from(header.length);
        if data.len() < declared {
            warn!(id, index, declared, received = data.len(), "szl shorter than declared");
        }
        data.resize(declared, 0);
        debug!(id, index, len = declared, "szl read");
        Ok(Szl { header, data })
    }

    /// Reads the CPU order code and firmware version.
    pub fn get_order_code(&mut self) -> Result<OrderCode> {
        self.track(|c| OrderCode::from_szl(&c.szl_exchange(SZL_ORDER_CODE, 0x0000)?))
    }

    /// Reads the CPU identification strings.
    pub fn get_cpu_info(&mut self) -> Result<CpuInfo> {
        self.track(|c| CpuInfo::from_szl(&c.szl_exchange(SZL_CPU_INFO, 0x0000)?))
    }

    /// Reads the communication limits of the CPU.
    pub fn get_cp_info(&mut self) -> Result<CpInfo> {
        self.track(|c| CpInfo::from_szl(&c.szl_exchange(SZL_CP_INFO, 0x0001)?))
    }

    /// Reads the protection levels.
    pub fn get_protection(&mut self) -> Result<Protection> {
        self.track(|c| Protection::from_szl(&c.szl_exchange(SZL_PROTECTION, 0x0004)?))
    }

    // ==================== Blocks ====================

    /// Reads the metadata of a block.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the CPU, e.g.
    /// [`S7Error::ItemNotAvailable`] for a missing block.
    pub fn get_ag_block_info(&mut self, block_type: BlockType, number: u16) -> Result<BlockInfo> {
        self.track(|c| c.block_info(block_type, number))
    }

    fn block_info(&mut self, block_type: BlockType, number: u16) -> Result<BlockInfo> {
        self.require_connection()?;
        let request = BlockInfoCommand::new(block_type, number).to_bytes()?;
        self.transact(&request, S7Response::block_info)
    }

    /// Reads a whole data block, sized by its block info.
    ///
    /// # Returns
    ///
    /// The data block size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::BufferTooSmall`] if `buffer` is smaller than the DB.
    pub fn db_get(&mut self, db_number: u16, buffer: &mut [u8]) -> Result<usize> {
        self.track(|c| {
            let size = usize::from(c.block_info(BlockType::DB, db_number)?.mc7_size);
            if size > buffer.len() {
                return Err(S7Error::BufferTooSmall);
            }
            c.read_area_chunks(Area::DB, db_number, 0, size, WordLength::Byte, &mut buffer[..size])
        })
    }

    /// Fills a whole data block with `value`.
    pub fn db_fill(&mut self, db_number: u16, value: u8) -> Result<()> {
        self.track(|c| {
            let size = usize::from(c.block_info(BlockType::DB, db_number)?.mc7_size);
            let data = vec![value; size];
            c.write_area_chunks(Area::DB, db_number, 0, size, WordLength::Byte, &data)
                .map(|_| ())
        })
    }

    // ==================== Date/time ====================

    /// Reads the PLC clock.
    pub fn get_plc_date_time(&mut self) -> Result<NaiveDateTime> {
        self.track(|c| {
            c.require_connection()?;
            c.transact(&UserDataCommand::GetDateTime.to_bytes(), S7Response::plc_date_time)
        })
    }

    /// Sets the PLC clock.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidValue`] for years outside 1990..=2089 and
    /// [`S7Error::InvalidPlcAnswer`] if the CPU rejects the time.
    pub fn set_plc_date_time(&mut self, date_time: NaiveDateTime) -> Result<()> {
        self.track(|c| {
            c.require_connection()?;
            let request = SetDateTimeCommand::new(date_time).to_bytes()?;
            c.transact(&request, S7Response::check_set_date_time)
        })
    }

    /// Sets the PLC clock to the local time of this machine.
    pub fn set_plc_system_date_time(&mut self) -> Result<()> {
        self.set_plc_date_time(chrono::Local::now().naive_local())
    }

    // ==================== Control ====================

    /// Warm restarts the CPU.
    pub fn plc_hot_start(&mut self) -> Result<()> {
        self.control(ControlCommand::HotStart)
    }

    /// Cold restarts the CPU.
    pub fn plc_cold_start(&mut self) -> Result<()> {
        self.control(ControlCommand::ColdStart)
    }

    /// Stops the CPU.
    pub fn plc_stop(&mut self) -> Result<()> {
        self.control(ControlCommand::Stop)
    }

    fn control(&mut self, command: ControlCommand) -> Result<()> {
        self.track(|c| {
            c.require_connection()?;
            c.transact(&command.to_bytes(), |reply| reply.check_control(command))?;
            debug!(client = %c, ?command, "run mode changed");
            Ok(())
        })
    }

    /// Reads the CPU run/stop state.
    pub fn plc_get_status(&mut self) -> Result<CpuStatus> {
        self.track(|c| {
            c.require_connection()?;
            c.transact(&UserDataCommand::GetCpuStatus.to_bytes(), S7Response::cpu_status)
        })
    }

    // ==================== Security ====================

    /// Opens a password protected session. Only 8 characters are sent.
    pub fn set_session_password(&mut self, password: &str) -> Result<()> {
        self.track(|c| {
            c.require_connection()?;
            let request = SetPasswordCommand::new(password).to_bytes()?;
            c.transact(&request, S7Response::check_set_password)
        })
    }

    /// Clears the session password.
    pub fn clear_session_password(&mut self) -> Result<()> {
        self.track(|c| {
            c.require_connection()?;
            c.transact(&UserDataCommand::ClearPassword.to_bytes(), S7Response::check_clear_password)
        })
    }

    // ==================== Low level ====================

    /// Sends a raw S7 payload and returns the raw reply payload.
    ///
    /// The payload is wrapped in TPKT + COTP headers; the reply's headers are
    /// stripped.
    pub fn iso_exchange_buffer(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.track(|c| {
            c.require_connection()?;
            let request = wrap_payload(payload)?;
            c.transact(&request, |reply| Ok(reply.payload().to_vec()))
        })
    }
}

impl<T: Transport> std::fmt::Display for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let host = if self.config.host.is_empty() {
            "0.0.0.0"
        } else {
            &self.config.host
        };
        write!(f, "PLC {}@{}", self.config.name, host)
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("pdu_length", &self.pdu_length)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Applies the area and word length rules of a transfer.
///
/// Returns the effective word length, element count and element size:
/// counter and timer areas force their word length, bit transfers move one
/// element, every other type is flattened to bytes.
fn normalize(area: Area, word_length: WordLength, amount: usize) -> Result<(WordLength, usize, usize)> {
    let word_length = area.forced_word_length(word_length);
    match word_length {
        WordLength::Bit => Ok((WordLength::Bit, 1, 1)),
        WordLength::Counter | WordLength::Timer => Ok((word_length, amount, word_length.size())),
        _ => {
            let bytes = amount
                .checked_mul(word_length.size())
                .ok_or(S7Error::InvalidParams)?;
            Ok((WordLength::Byte, bytes, 1))
        }
    }
}

/// Moves `start` past `elements` transferred elements of `elem_size` bytes.
fn advance(start: u32, elements: usize, elem_size: usize) -> Result<u32> {
    let step = elements
        .checked_mul(elem_size)
        .and_then(|step| u32::try_from(step).ok())
        .ok_or(S7Error::InvalidParams)?;
    start.checked_add(step).ok_or(S7Error::InvalidParams)
}

/// Rejects start addresses that do not fit the 3-byte wire address.
fn check_address(word_length: WordLength, start: u32) -> Result<()> {
    let limit = if word_length.is_direct() {
        MAX_ADDRESS
    } else {
        MAX_ADDRESS >> 3
    };
    if start <= limit {
        Ok(())
    } else {
        Err(S7Error::InvalidParams)
    }
}

fn check_batch(count: usize) -> Result<()> {
    match count {
        0 => Err(S7Error::FunctionRefused),
        n if n > MAX_VARS => Err(S7Error::TooManyItems),
        _ => Ok(()),
    }
}
