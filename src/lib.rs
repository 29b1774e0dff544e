//! # Siemens S7 Protocol Library
//!
//! A Rust library for communicating with Siemens S7-300/400/1200/1500 PLCs
//! using the S7 protocol over ISO-on-TCP (RFC 1006).
//!
//! This is a **client-only** library: it connects, reads and writes memory,
//! queries system information and controls the CPU. Each call runs to
//! completion before returning. No automatic retries, caching, or
//! reconnection.
//!
//! ## Features
//!
//! - **Handshake** - TCP connect, ISO connection request and PDU negotiation
//! - **Fragmentation** - area transfers larger than one PDU are split for you
//! - **Multi-variable access** - up to 20 variables per request via [`MultiVar`]
//! - **System info** - order code, CPU/CP info and protection from status lists
//! - **Control** - hot/cold start, stop, status, clock and session password
//! - **No panics** - all errors returned as `Result<T, S7Error>`
//!
//! ## Quick Start
//!
//! ```no_run
//! use s7_client::{Client, ClientConfig};
//!
//! fn main() -> s7_client::Result<()> {
//!     // S7-300 CPU in rack 0, slot 2
//!     let config = ClientConfig::new("192.168.0.10", 0, 2);
//!     let mut client = Client::new(config);
//!     client.connect()?;
//!
//!     // Read DB1.DBB0..DBB15
//!     let mut buffer = [0u8; 16];
//!     client.db_read(1, 0, &mut buffer)?;
//!     println!("DB1: {:02X?}", buffer);
//!
//!     // Decode a REAL at DB1.DBD4
//!     let value = s7_client::utils::get_real_at(&buffer, 4)?;
//!     println!("DB1.DBD4 = {value}");
//!
//!     // Write three bytes to DB3
//!     client.db_write(3, 0, &[1, 2, 3])?;
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! ## Memory Areas
//!
//! | Area | Description | Lean accessors |
//! |------|-------------|----------------|
//! | [`Area::PE`] | Process inputs | `eb_read` / `eb_write` |
//! | [`Area::PA`] | Process outputs | `ab_read` / `ab_write` |
//! | [`Area::MK`] | Flags (merkers) | `mb_read` / `mb_write` |
//! | [`Area::DB`] | Data blocks | `db_read` / `db_write` |
//! | [`Area::CT`] | Counters | `ct_read` / `ct_write` |
//! | [`Area::TM`] | Timers | `tm_read` / `tm_write` |
//!
//! ## Multi-variable Access
//!
//! ```no_run
//! use s7_client::{Area, Client, MultiVar, S7Tag, WordLength};
//!
//! # let mut client = Client::connect_to("192.168.0.10", 0, 2)?;
//! let mut level = [0u8; 4];
//! let mut alarms = [0u8; 2];
//! let mut batch = MultiVar::new(&mut client);
//! batch.add(S7Tag::new(Area::DB, 10, 0, 1, WordLength::Real), &mut level)?;
//! batch.add(S7Tag::new(Area::MK, 0, 20, 1, WordLength::Word), &mut alarms)?;
//! let results = batch.read()?;
//! assert_eq!(results.len(), 2);
//! # Ok::<(), s7_client::S7Error>(())
//! ```
//!
//! ## PLC Control and Info
//!
//! ```no_run
//! # use s7_client::{Client, CpuStatus};
//! # let mut client = Client::connect_to("192.168.0.10", 0, 2)?;
//! let order = client.get_order_code()?;
//! println!("{} V{}", order.code, order.version());
//!
//! if client.plc_get_status()? == CpuStatus::Run {
//!     client.plc_stop()?;
//! }
//! println!("PLC clock: {}", client.get_plc_date_time()?);
//! # Ok::<(), s7_client::S7Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, S7Error>`](Result). Every error has a
//! stable numeric code ([`S7Error::code`]) and a text ([`error_text`]).
//!
//! ```no_run
//! use s7_client::{Client, ClientConfig, S7Error};
//!
//! let mut client = Client::new(ClientConfig::new("192.168.0.10", 0, 2));
//! let mut buffer = [0u8; 4];
//! match client.connect().and_then(|_| client.db_read(99, 0, &mut buffer)) {
//!     Ok(()) => println!("DB99: {:?}", buffer),
//!     Err(S7Error::ItemNotAvailable) => println!("DB99 does not exist"),
//!     Err(e) if e.is_transport() => println!("network problem: {e}"),
//!     Err(e) => println!("error 0x{:08X}: {}", e.code(), e),
//! }
//! ```
//!
//! ## Logging
//!
//! The library emits [`tracing`] events: `debug` for handshake stages and
//! completed transfers, `trace` for every telegram, `warn` for failed
//! handshakes and malformed replies. Install any subscriber to see them.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
mod command;
mod error;
mod header;
mod memory;
mod multivar;
mod response;
mod szl;
mod telegram;
mod transport;
pub mod utils;

#[cfg(test)]
mod mock;

// Public re-exports
pub use client::{
    Client, ClientConfig, ConnectionState, PARAM_PDU_REQUEST, PARAM_PING_TIMEOUT,
    PARAM_RECV_TIMEOUT, PARAM_REMOTE_PORT, PARAM_SEND_TIMEOUT,
};
pub use command::{
    encode_password, wire_address, wrap_payload, BlockInfoCommand, BlockType, ConnectionRequest,
    ControlCommand, MultiReadCommand, MultiWriteCommand, NegotiatePduCommand, ReadAreaCommand,
    SetDateTimeCommand, SetPasswordCommand, SzlFirstCommand, SzlNextCommand, UserDataCommand,
    VarSpec, WriteAreaCommand, MAX_VARS, READ_HEADER_SIZE, WRITE_HEADER_SIZE,
};
pub use error::{cpu_error, error_text, Result, S7Error};
pub use header::{
    clamp_pdu_size, Addressing, ConnectionType, Tsap, DEFAULT_PDU_SIZE, DEFAULT_S7_PORT,
    ISO_HEADER_SIZE, MAX_PDU_SIZE_TO_REQUEST, MIN_PDU_SIZE_TO_REQUEST,
};
pub use memory::{Area, WordLength};
pub use multivar::{DataItem, MultiVar, S7Tag};
pub use response::{BlockInfo, CpuStatus, S7Response, SzlSegment};
pub use szl::{
    CpInfo, CpuInfo, OrderCode, Protection, Szl, SzlHeader, SZL_CPU_INFO, SZL_CP_INFO,
    SZL_ORDER_CODE, SZL_PROTECTION,
};
pub use telegram::Telegram;
pub use transport::{CloseObserver, TcpTransport, Timeouts, Transport, DEFAULT_TIMEOUT};
