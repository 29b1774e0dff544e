//! ISO-on-TCP framing constants and connection addressing.
//!
//! Every S7 telegram travels inside two nested headers:
//!
//! | Bytes | Layer | Content |
//! |-------|-------|---------|
//! | 0..4 | TPKT (RFC 1006) | `0x03 0x00` + big-endian total length |
//! | 4..7 | COTP DT (ISO 8073) | `0x02 0xF0 0x80` |
//! | 7.. | S7 | protocol id `0x32`, job type, header, parameters, data |
//!
//! During the connection request the COTP part is longer and carries the
//! Transport Service Access Points ([`Tsap`]) that select the CPU rack and slot.
//!
//! # TSAP derivation
//!
//! The remote TSAP is computed from the connection type, rack and slot:
//!
//! ```text
//! remote = (connection_type << 8) + rack * 0x20 + slot
//! local  = 0x0100
//! ```
//!
//! # Example
//!
//! ```
//! use s7_client::{ConnectionType, Tsap};
//!
//! let remote = Tsap::from_rack_slot(ConnectionType::Pg, 0, 2);
//! assert_eq!(remote.value(), 0x0102);
//! assert_eq!(remote.to_bytes(), [0x01, 0x02]);
//! ```

use crate::error::{Result, S7Error};

/// TPKT + COTP header size in bytes.
pub const ISO_HEADER_SIZE: usize = 7;

/// Default ISO-on-TCP port.
pub const DEFAULT_S7_PORT: u16 = 102;

/// Smallest telegram length accepted by the receiver (other than an empty 7 byte frame).
pub const MIN_PDU_SIZE: usize = 16;

/// Smallest PDU size that may be requested during negotiation.
pub const MIN_PDU_SIZE_TO_REQUEST: u16 = 240;

/// Largest PDU size that may be requested during negotiation.
pub const MAX_PDU_SIZE_TO_REQUEST: u16 = 960;

/// Default requested PDU size.
pub const DEFAULT_PDU_SIZE: u16 = 480;

/// RFC 1006 version byte.
pub(crate) const TPKT_VERSION: u8 = 0x03;

/// COTP PDU type of a connection request.
pub(crate) const COTP_CONNECTION_REQUEST: u8 = 0xE0;

/// COTP PDU type of a connection confirm.
pub(crate) const COTP_CONNECTION_CONFIRM: u8 = 0xD0;

/// COTP PDU type of a data telegram.
pub(crate) const COTP_DATA: u8 = 0xF0;

/// S7 protocol identifier.
pub(crate) const S7_PROTOCOL_ID: u8 = 0x32;

/// TPKT + COTP DT prefix used by every data telegram (length patched later).
pub(crate) const TPKT_ISO: [u8; ISO_HEADER_SIZE] =
    [TPKT_VERSION, 0x00, 0x00, 0x1F, 0x02, COTP_DATA, 0x80];

/// Connection resource type requested from the CPU.
///
/// The value is placed in the high byte of the remote TSAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionType {
    /// Programming device connection.
    #[default]
    Pg,
    /// Operator panel connection.
    Op,
    /// Basic S7 connection.
    Basic,
}

impl ConnectionType {
    /// Returns the numeric connection type (PG = 1, OP = 2, basic = 3).
    pub fn code(self) -> u16 {
        match self {
            ConnectionType::Pg => 0x01,
            ConnectionType::Op => 0x02,
            ConnectionType::Basic => 0x03,
        }
    }
}

impl TryFrom<u16> for ConnectionType {
    type Error = S7Error;

    fn try_from(code: u16) -> Result<Self> {
        match code {
            0x01 => Ok(ConnectionType::Pg),
            0x02 => Ok(ConnectionType::Op),
            0x03 => Ok(ConnectionType::Basic),
            _ => Err(S7Error::InvalidParams),
        }
    }
}

/// Transport Service Access Point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tsap(u16);

impl Tsap {
    /// The local TSAP used by rack/slot connections.
    pub const LOCAL: Tsap = Tsap(0x0100);

    /// Creates a TSAP from its raw value.
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Computes the remote TSAP for a CPU at `rack`/`slot`.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::{ConnectionType, Tsap};
    ///
    /// // S7-400 CPU in rack 0, slot 3, as operator panel
    /// let tsap = Tsap::from_rack_slot(ConnectionType::Op, 0, 3);
    /// assert_eq!(tsap.value(), 0x0203);
    /// ```
    pub fn from_rack_slot(connection_type: ConnectionType, rack: u16, slot: u16) -> Self {
        let value = (connection_type.code() << 8)
            .wrapping_add(rack.wrapping_mul(0x20))
            .wrapping_add(slot);
        Self(value)
    }

    /// Returns the raw TSAP value.
    pub fn value(self) -> u16 {
        self.0
    }

    /// Returns the TSAP as big-endian bytes.
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl std::fmt::Display for Tsap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}.{:02X}", self.0 >> 8, self.0 & 0xFF)
    }
}

/// How the client selects its peer CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Addressing {
    /// Derive the TSAPs from the connection type, rack and slot.
    RackSlot {
        /// Rack number.
        rack: u16,
        /// Slot number.
        slot: u16,
    },
    /// Use explicit TSAPs.
    Tsap {
        /// Local TSAP.
        local: Tsap,
        /// Remote TSAP.
        remote: Tsap,
    },
}

impl Addressing {
    /// Resolves the (local, remote) TSAP pair.
    pub fn resolve(self, connection_type: ConnectionType) -> (Tsap, Tsap) {
        match self {
            Addressing::RackSlot { rack, slot } => (
                Tsap::LOCAL,
                Tsap::from_rack_slot(connection_type, rack, slot),
            ),
            Addressing::Tsap { local, remote } => (local, remote),
        }
    }
}

impl Default for Addressing {
    fn default() -> Self {
        Addressing::RackSlot { rack: 0, slot: 2 }
    }
}

/// Clamps a requested PDU size to the negotiable range.
///
/// # Example
///
/// ```
/// use s7_client::clamp_pdu_size;
///
/// assert_eq!(clamp_pdu_size(100), 240);
/// assert_eq!(clamp_pdu_size(480), 480);
/// assert_eq!(clamp_pdu_size(4096), 960);
/// ```
pub fn clamp_pdu_size(requested: u16) -> u16 {
    requested.clamp(MIN_PDU_SIZE_TO_REQUEST, MAX_PDU_SIZE_TO_REQUEST)
}
