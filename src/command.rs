//! S7 request telegrams and their serialization.
//!
//! Every request starts from a byte-exact template which is copied into a
//! [`Telegram`] and patched at fixed offsets. Each command handles its own
//! serialization to bytes for transmission.
//!
//! # Command Types
//!
//! ## Connection
//! - [`ConnectionRequest`] - ISO connection request carrying the TSAPs
//! - [`NegotiatePduCommand`] - S7 PDU size negotiation
//!
//! ## Memory Operations
//! - [`ReadAreaCommand`] - Read one chunk of a memory area
//! - [`WriteAreaCommand`] - Write one chunk of a memory area
//! - [`MultiReadCommand`] - Read up to 20 variables in one request
//! - [`MultiWriteCommand`] - Write up to 20 variables in one request
//!
//! ## System Status List
//! - [`SzlFirstCommand`] / [`SzlNextCommand`] - Sequence numbered SZL exchange
//!
//! ## PLC Control and Info
//! - [`ControlCommand`] - Hot start, cold start and stop
//! - [`UserDataCommand`] - Date/time, CPU status and password clearing
//! - [`SetDateTimeCommand`] - Set the PLC clock
//! - [`SetPasswordCommand`] - Open a protected session
//! - [`BlockInfoCommand`] - Query block metadata
//!
//! # Example
//!
//! ```
//! use s7_client::{Area, ReadAreaCommand, WordLength};
//!
//! // Read 4 bytes from DB1.DBB10
//! let cmd = ReadAreaCommand::new(Area::DB, 1, WordLength::Byte, 10, 4);
//! let bytes = cmd.to_bytes()?;
//! assert_eq!(bytes.len(), 31);
//! assert_eq!(&bytes[28..31], &[0x00, 0x00, 0x50]); // 10 << 3
//! # Ok::<(), s7_client::S7Error>(())
//! ```

use chrono::{Datelike, NaiveDateTime};

use crate::error::{Result, S7Error};
use crate::header::{
    Tsap, COTP_CONNECTION_REQUEST, ISO_HEADER_SIZE, S7_PROTOCOL_ID, TPKT_ISO, TPKT_VERSION,
};
use crate::memory::{length_in_bytes, Area, WordLength};
use crate::telegram::Telegram;
use crate::utils::{byte_to_bcd, set_date_time_at};

/// Maximum number of variables in one multi read/write request.
pub const MAX_VARS: usize = 20;

/// Header size of a read request.
pub const READ_HEADER_SIZE: usize = 31;

/// Header size of a write request (data follows).
pub const WRITE_HEADER_SIZE: usize = 35;

/// Size of one multi-read item / multi-write parameter.
pub(crate) const VAR_SPEC_SIZE: usize = 12;

/// Function code of a read request.
pub(crate) const FN_READ_VAR: u8 = 0x04;

/// Function code of a write request.
pub(crate) const FN_WRITE_VAR: u8 = 0x05;

const ISO_CR: [u8; 22] = [
    TPKT_VERSION, 0x00, 0x00, 0x16, // TPKT, length 22
    0x11, COTP_CONNECTION_REQUEST, // COTP length, CR
    0x00, 0x00, 0x00, 0x01, 0x00, // dst ref, src ref, class
    0xC0, 0x01, 0x0A, // PDU max length
    0xC1, 0x02, 0x01, 0x00, // local TSAP (16, 17)
    0xC2, 0x02, 0x01, 0x02, // remote TSAP (20, 21)
];

const S7_PN: [u8; 25] = [
    0x03, 0x00, 0x00, 0x19, 0x02, 0xF0, 0x80, // TPKT + COTP
    S7_PROTOCOL_ID, 0x01, 0x00, 0x00, 0x04, 0x00, 0x00, 0x08,
    0x00, 0x00, 0xF0, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x1E, // requested size (23)
];

const S7_RW: [u8; WRITE_HEADER_SIZE] = [
    0x03, 0x00, 0x00, 0x1F, // TPKT, length patched for writes
    0x02, 0xF0, 0x80, // COTP
    0x32, 0x01, 0x00, 0x00, 0x05, 0x00, // S7 header, job, PDU ref
    0x00, 0x0E, // parameter length
    0x00, 0x00, // data length (15)
    FN_READ_VAR, 0x01, // function (17), item count
    0x12, 0x0A, 0x10, // var spec
    0x02, // transport size (22)
    0x00, 0x00, // element count (23)
    0x00, 0x00, // DB number (25)
    0x84, // area (27)
    0x00, 0x00, 0x00, // address (28..31)
    0x00, 0x04, // reserved, data transport size (32)
    0x00, 0x00, // data length (33)
];

const S7_MRD_HEADER: [u8; 19] = [
    0x03, 0x00, 0x00, 0x1F, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x05, 0x00, 0x00, 0x0E,
    0x00, 0x00, 0x04, 0x01,
];

const S7_MWR_HEADER: [u8; 19] = [
    0x03, 0x00, 0x00, 0x1F, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x05, 0x00, 0x00, 0x0E,
    0x00, 0x00, 0x05, 0x01,
];

const S7_VAR_SPEC: [u8; VAR_SPEC_SIZE] = [
    0x12, 0x0A, 0x10, 0x02, 0x00, 0x00, 0x00, 0x00, 0x84, 0x00, 0x00, 0x00,
];

const S7_SZL_FIRST: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x05, 0x00, 0x00, 0x08,
    0x00, 0x08, 0x00, 0x01, 0x12, 0x04, 0x11, 0x44, 0x01, 0x00, 0xFF, 0x09, 0x00, 0x04, 0x00,
    0x00, // ID (29)
    0x00, 0x00, // index (31)
];

const S7_SZL_NEXT: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x06, 0x00, 0x00, 0x0C,
    0x00, 0x04, 0x00, 0x01, 0x12, 0x08, 0x12, 0x44, 0x01, 0x01, // sequence in (24)
    0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00,
];

const S7_GET_DT: [u8; 29] = [
    0x03, 0x00, 0x00, 0x1D, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x38, 0x00, 0x00, 0x08,
    0x00, 0x04, 0x00, 0x01, 0x12, 0x04, 0x11, 0x47, 0x01, 0x00, 0x0A, 0x00, 0x00, 0x00,
];

const S7_SET_DT: [u8; 39] = [
    0x03, 0x00, 0x00, 0x27, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x89, 0x03, 0x00, 0x08,
    0x00, 0x0E, 0x00, 0x01, 0x12, 0x04, 0x11, 0x47, 0x02, 0x00, 0xFF, 0x09, 0x00, 0x0A, 0x00,
    0x19, // century (30)
    0x13, 0x12, 0x06, 0x17, 0x37, 0x13, 0x00, 0x01, // date and time (31..39)
];

const S7_SET_PWD: [u8; 37] = [
    0x03, 0x00, 0x00, 0x25, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x27, 0x00, 0x00, 0x08,
    0x00, 0x0C, 0x00, 0x01, 0x12, 0x04, 0x11, 0x45, 0x01, 0x00, 0xFF, 0x09, 0x00, 0x08,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // encoded password (29..37)
];

const S7_CLR_PWD: [u8; 29] = [
    0x03, 0x00, 0x00, 0x1D, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x29, 0x00, 0x00, 0x08,
    0x00, 0x04, 0x00, 0x01, 0x12, 0x04, 0x11, 0x45, 0x02, 0x00, 0x0A, 0x00, 0x00, 0x00,
];

const S7_STOP: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x0E, 0x00, 0x00, 0x10,
    0x00, 0x00, 0x29, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x50, 0x5F, 0x50, 0x52, 0x4F, 0x47,
    0x52, 0x41, 0x4D,
];

const S7_HOT_START: [u8; 37] = [
    0x03, 0x00, 0x00, 0x25, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x0C, 0x00, 0x00, 0x14,
    0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x00, 0x00, 0x09, 0x50, 0x5F,
    0x50, 0x52, 0x4F, 0x47, 0x52, 0x41, 0x4D,
];

const S7_COLD_START: [u8; 39] = [
    0x03, 0x00, 0x00, 0x27, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x0F, 0x00, 0x00, 0x16,
    0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x00, 0x02, 0x43, 0x20, 0x09,
    0x50, 0x5F, 0x50, 0x52, 0x4F, 0x47, 0x52, 0x41, 0x4D,
];

const S7_GET_STAT: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x08,
    0x00, 0x08, 0x00, 0x01, 0x12, 0x04, 0x11, 0x44, 0x01, 0x00, 0xFF, 0x09, 0x00, 0x04, 0x04,
    0x24, 0x00, 0x00,
];

const S7_BI: [u8; 37] = [
    0x03, 0x00, 0x00, 0x25, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x05, 0x00, 0x00, 0x08,
    0x00, 0x0C, 0x00, 0x01, 0x12, 0x04, 0x11, 0x43, 0x03, 0x00, 0xFF, 0x09, 0x00, 0x08, 0x30,
    0x41, // block type (30)
    0x30, 0x30, 0x30, 0x30, 0x30, // ASCII block number (31..36)
    0x41,
];

/// ISO connection request carrying the local and remote TSAPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRequest {
    local: Tsap,
    remote: Tsap,
}

impl ConnectionRequest {
    /// Creates a connection request.
    pub fn new(local: Tsap, remote: Tsap) -> Self {
        Self { local, remote }
    }

    /// Serializes the request (22 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&ISO_CR);
        t.write_slice(16, &self.local.to_bytes())?;
        t.write_slice(20, &self.remote.to_bytes())?;
        Ok(t.into_bytes())
    }
}

/// S7 communication setup requesting a PDU size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatePduCommand {
    pdu_size: u16,
}

impl NegotiatePduCommand {
    /// Creates a negotiation request for `pdu_size` bytes.
    pub fn new(pdu_size: u16) -> Self {
        Self { pdu_size }
    }

    /// Serializes the request (25 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&S7_PN);
        t.set_word(23, self.pdu_size)?;
        Ok(t.into_bytes())
    }
}

/// Returns the on-wire address of `start` for the given word length.
///
/// Bit, counter and timer transfers address elements directly; every other
/// word length is addressed in bits.
pub fn wire_address(word_length: WordLength, start: u32) -> u32 {
    if word_length.is_direct() {
        start
    } else {
        start << 3
    }
}

/// Patches the shared read/write variable specification.
fn patch_area_spec(
    t: &mut Telegram,
    area: Area,
    db_number: u16,
    word_length: WordLength,
    start: u32,
    elements: u16,
) -> Result<()> {
    t.set_byte(27, area.code())?;
    if area == Area::DB {
        t.set_word(25, db_number)?;
    }
    if word_length.is_direct() {
        t.set_byte(22, word_length.code())?;
    }
    t.set_word(23, elements)?;
    t.set_address(28, wire_address(word_length, start))
}

/// Request for one chunk of an area read.
///
/// The word length must already be normalized: byte-flattened transfers use
/// [`WordLength::Byte`] with `elements` counted in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadAreaCommand {
    area: Area,
    db_number: u16,
    word_length: WordLength,
    start: u32,
    elements: u16,
}

impl ReadAreaCommand {
    /// Creates a read request.
    ///
    /// # Arguments
    ///
    /// * `area` - Memory area to read from
    /// * `db_number` - Data block number (ignored for other areas)
    /// * `word_length` - Normalized element type
    /// * `start` - Start element (byte offset for byte transfers)
    /// * `elements` - Number of elements in this chunk
    pub fn new(
        area: Area,
        db_number: u16,
        word_length: WordLength,
        start: u32,
        elements: u16,
    ) -> Self {
        Self {
            area,
            db_number,
            word_length,
            start,
            elements,
        }
    }

    /// Serializes the request (31 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&S7_RW[..READ_HEADER_SIZE]);
        patch_area_spec(
            &mut t,
            self.area,
            self.db_number,
            self.word_length,
            self.start,
            self.elements,
        )?;
        Ok(t.into_bytes())
    }
}

/// Request for one chunk of an area write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAreaCommand<'a> {
    area: Area,
    db_number: u16,
    word_length: WordLength,
    start: u32,
    elements: u16,
    data: &'a [u8],
}

impl<'a> WriteAreaCommand<'a> {
    /// Creates a write request carrying `data`.
    ///
    /// `elements * word_length.size()` must equal `data.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidParams`] if the data length does not match
    /// the element count.
    pub fn new(
        area: Area,
        db_number: u16,
        word_length: WordLength,
        start: u32,
        elements: u16,
        data: &'a [u8],
    ) -> Result<Self> {
        if usize::from(elements) * word_length.size() != data.len() {
            return Err(S7Error::InvalidParams);
        }
        Ok(Self {
            area,
            db_number,
            word_length,
            start,
            elements,
            data,
        })
    }

    /// Serializes the request (35 bytes + data).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let data_size = self.data.len();
        let iso_size = u16::try_from(WRITE_HEADER_SIZE + data_size).map_err(|_| S7Error::SizeOverPdu)?;
        // data_size fits: it is smaller than iso_size
        let data_len = data_size as u16;

        let mut t = Telegram::from_template(&S7_RW);
        t.set_word(2, iso_size)?;
        t.set_word(15, data_len + 4)?;
        t.set_byte(17, FN_WRITE_VAR)?;
        patch_area_spec(
            &mut t,
            self.area,
            self.db_number,
            self.word_length,
            self.start,
            self.elements,
        )?;
        t.set_byte(32, self.word_length.data_transport_size())?;
        let bit_len = if self.word_length.is_direct() {
            data_len
        } else {
            data_len.wrapping_shl(3)
        };
        t.set_word(33, bit_len)?;
        t.extend_from_slice(self.data);
        Ok(t.into_bytes())
    }
}

/// A normalized variable specification inside a multi read/write request.
///
/// `start` is carried to the wire unchanged, so byte-flattened items must
/// already hold a bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarSpec {
    /// Memory area.
    pub area: Area,
    /// Normalized word length.
    pub word_length: WordLength,
    /// Data block number.
    pub db_number: u16,
    /// Wire address.
    pub start: u32,
    /// Element count.
    pub amount: u16,
}

impl VarSpec {
    /// Returns the number of payload bytes this item transfers.
    pub fn byte_size(&self) -> usize {
        match self.word_length {
            WordLength::Counter | WordLength::Timer => usize::from(self.amount) * 2,
            _ => usize::from(self.amount),
        }
    }

    fn encode(&self, always_db: bool) -> Result<[u8; VAR_SPEC_SIZE]> {
        let mut t = Telegram::from_template(&S7_VAR_SPEC);
        t.set_byte(3, self.word_length.code())?;
        t.set_word(4, self.amount)?;
        if always_db || self.area == Area::DB {
            t.set_word(6, self.db_number)?;
        }
        t.set_byte(8, self.area.code())?;
        t.set_address(9, self.start)?;
        let mut out = [0u8; VAR_SPEC_SIZE];
        out.copy_from_slice(t.as_bytes());
        Ok(out)
    }
}

fn multi_header(template: &[u8; 19], count: usize) -> Result<Telegram> {
    if count > MAX_VARS {
        return Err(S7Error::TooManyItems);
    }
    let mut t = Telegram::from_template(template);
    // count <= 20 so both values fit
    t.set_word(13, (count * VAR_SPEC_SIZE + 2) as u16)?;
    t.set_byte(18, count as u8)?;
    Ok(t)
}

fn finish_length(t: &mut Telegram) -> Result<()> {
    let len = u16::try_from(t.len()).map_err(|_| S7Error::SizeOverPdu)?;
    t.set_word(2, len)
}

/// Reads up to [`MAX_VARS`] variables in a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiReadCommand {
    items: Vec<VarSpec>,
}

impl MultiReadCommand {
    /// Creates a multi-read request.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::TooManyItems`] for more than [`MAX_VARS`] items.
    pub fn new(items: Vec<VarSpec>) -> Result<Self> {
        if items.len() > MAX_VARS {
            return Err(S7Error::TooManyItems);
        }
        Ok(Self { items })
    }

    /// Serializes the request (19 + 12 per item bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = multi_header(&S7_MRD_HEADER, self.items.len())?;
        for item in &self.items {
            t.extend_from_slice(&item.encode(false)?);
        }
        finish_length(&mut t)?;
        Ok(t.into_bytes())
    }
}

/// Writes up to [`MAX_VARS`] variables in a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiWriteCommand<'a> {
    items: Vec<(VarSpec, &'a [u8])>,
}

impl<'a> MultiWriteCommand<'a> {
    /// Creates a multi-write request.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::TooManyItems`] for more than [`MAX_VARS`] items and
    /// [`S7Error::BufferTooSmall`] if an item carries less data than it
    /// declares.
    pub fn new(items: Vec<(VarSpec, &'a [u8])>) -> Result<Self> {
        if items.len() > MAX_VARS {
            return Err(S7Error::TooManyItems);
        }
        if items.iter().any(|(spec, data)| data.len() < spec.byte_size()) {
            return Err(S7Error::BufferTooSmall);
        }
        Ok(Self { items })
    }

    /// Serializes the request.
    ///
    /// Parameters come first, then one data item per variable:
    /// `[0x00, transport size, length, data, pad]`. Odd data sizes are padded
    /// to an even length.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = multi_header(&S7_MWR_HEADER, self.items.len())?;
        for (spec, _) in &self.items {
            t.extend_from_slice(&spec.encode(true)?);
        }

        let mut data_length = 0usize;
        for (spec, data) in &self.items {
            let size = spec.byte_size();
            let ts = spec.word_length.data_transport_size();
            let len = if length_in_bytes(ts) {
                size
            } else {
                size * 8
            };
            let len = u16::try_from(len).map_err(|_| S7Error::SizeOverPdu)?;
            t.extend_from_slice(&[0x00, ts]);
            t.extend_from_slice(&len.to_be_bytes());
            t.extend_from_slice(&data[..size]);
            let mut item_size = size;
            if size % 2 != 0 {
                t.extend_from_slice(&[0x00]);
                item_size += 1;
            }
            data_length += item_size + 4;
        }

        let data_length = u16::try_from(data_length).map_err(|_| S7Error::SizeOverPdu)?;
        t.set_word(15, data_length)?;
        finish_length(&mut t)?;
        Ok(t.into_bytes())
    }
}

/// First request of a system status list read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SzlFirstCommand {
    id: u16,
    index: u16,
    sequence: u16,
}

impl SzlFirstCommand {
    /// Creates the first SZL request.
    pub fn new(id: u16, index: u16, sequence: u16) -> Self {
        Self {
            id,
            index,
            sequence,
        }
    }

    /// Serializes the request (33 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&S7_SZL_FIRST);
        t.set_word(11, self.sequence)?;
        t.set_word(29, self.id)?;
        t.set_word(31, self.index)?;
        Ok(t.into_bytes())
    }
}

/// Follow-up request of a multi-segment system status list read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SzlNextCommand {
    sequence: u16,
    sequence_in: u8,
}

impl SzlNextCommand {
    /// Creates a follow-up request echoing the controller's sequence number.
    pub fn new(sequence: u16, sequence_in: u8) -> Self {
        Self {
            sequence,
            sequence_in,
        }
    }

    /// Serializes the request (33 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&S7_SZL_NEXT);
        t.set_word(11, self.sequence)?;
        t.set_byte(24, self.sequence_in)?;
        Ok(t.into_bytes())
    }
}

/// Requests that carry no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDataCommand {
    /// Read the PLC clock.
    GetDateTime,
    /// Read the CPU run/stop status.
    GetCpuStatus,
    /// Clear the session password.
    ClearPassword,
}

impl UserDataCommand {
    /// Serializes the request.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            UserDataCommand::GetDateTime => S7_GET_DT.to_vec(),
            UserDataCommand::GetCpuStatus => S7_GET_STAT.to_vec(),
            UserDataCommand::ClearPassword => S7_CLR_PWD.to_vec(),
        }
    }
}

/// CPU run mode control requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlCommand {
    /// Warm restart.
    HotStart,
    /// Cold restart.
    ColdStart,
    /// Stop the CPU.
    Stop,
}

impl ControlCommand {
    /// Serializes the request.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            ControlCommand::HotStart => S7_HOT_START.to_vec(),
            ControlCommand::ColdStart => S7_COLD_START.to_vec(),
            ControlCommand::Stop => S7_STOP.to_vec(),
        }
    }

    /// Function code echoed by the CPU in a positive reply.
    pub(crate) fn function_code(self) -> u8 {
        match self {
            ControlCommand::HotStart | ControlCommand::ColdStart => 0x28,
            ControlCommand::Stop => 0x29,
        }
    }
}

/// Sets the PLC clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDateTimeCommand {
    date_time: NaiveDateTime,
}

impl SetDateTimeCommand {
    /// Creates a clock update request.
    pub fn new(date_time: NaiveDateTime) -> Self {
        Self { date_time }
    }

    /// Serializes the request (39 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&S7_SET_DT);
        let mut bytes = t.slice(31, 8)?.to_vec();
        set_date_time_at(&mut bytes, 0, self.date_time)?;
        t.write_slice(31, &bytes)?;
        // set_date_time_at has checked the year range
        let century = (self.date_time.year() / 100) as u8;
        t.set_byte(30, byte_to_bcd(century))?;
        Ok(t.into_bytes())
    }
}

/// Opens a password protected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPasswordCommand {
    encoded: [u8; 8],
}

impl SetPasswordCommand {
    /// Creates the request, encoding `password`.
    ///
    /// Only the first 8 characters are significant.
    pub fn new(password: &str) -> Self {
        Self {
            encoded: encode_password(password),
        }
    }

    /// Serializes the request (37 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&S7_SET_PWD);
        t.write_slice(29, &self.encoded)?;
        Ok(t.into_bytes())
    }
}

/// Obfuscates a session password the way S7 CPUs expect it.
///
/// The password is space padded to 8 bytes; the first two bytes are XORed
/// with `0x55` and every following byte with `0x55` and the encoded byte two
/// positions earlier.
///
/// # Example
///
/// ```
/// use s7_client::encode_password;
///
/// let encoded = encode_password("");
/// assert_eq!(encoded[0], 0x20 ^ 0x55);
/// assert_eq!(encoded[2], 0x20 ^ 0x55 ^ encoded[0]);
/// ```
pub fn encode_password(password: &str) -> [u8; 8] {
    let mut pwd = [0x20u8; 8];
    for (slot, b) in pwd.iter_mut().zip(password.bytes()) {
        *slot = b;
    }
    pwd[0] ^= 0x55;
    pwd[1] ^= 0x55;
    for c in 2..8 {
        pwd[c] = pwd[c] ^ 0x55 ^ pwd[c - 2];
    }
    pwd
}

/// Program block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockType {
    /// Organization block.
    OB,
    /// Data block.
    DB,
    /// System data block.
    SDB,
    /// Function.
    FC,
    /// System function.
    SFC,
    /// Function block.
    FB,
    /// System function block.
    SFB,
}

impl BlockType {
    /// Returns the ASCII code of the block type.
    pub fn code(self) -> u8 {
        match self {
            BlockType::OB => 0x38,
            BlockType::DB => 0x41,
            BlockType::SDB => 0x42,
            BlockType::FC => 0x43,
            BlockType::SFC => 0x44,
            BlockType::FB => 0x45,
            BlockType::SFB => 0x46,
        }
    }
}

impl TryFrom<u8> for BlockType {
    type Error = S7Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0x38 => Ok(BlockType::OB),
            0x41 => Ok(BlockType::DB),
            0x42 => Ok(BlockType::SDB),
            0x43 => Ok(BlockType::FC),
            0x44 => Ok(BlockType::SFC),
            0x45 => Ok(BlockType::FB),
            0x46 => Ok(BlockType::SFB),
            _ => Err(S7Error::InvalidBlockType),
        }
    }
}

/// Queries the metadata of a block stored in the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfoCommand {
    block_type: BlockType,
    number: u16,
}

impl BlockInfoCommand {
    /// Creates a block info request.
    pub fn new(block_type: BlockType, number: u16) -> Self {
        Self { block_type, number }
    }

    /// Serializes the request (37 bytes). The block number travels as five
    /// ASCII digits.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut t = Telegram::from_template(&S7_BI);
        t.set_byte(30, self.block_type.code())?;
        let digits = format!("{:05}", self.number);
        t.write_slice(31, digits.as_bytes())?;
        Ok(t.into_bytes())
    }
}

/// Wraps a raw S7 payload in a TPKT + COTP data header.
///
/// # Errors
///
/// Returns [`S7Error::InvalidPdu`] if the framed telegram would not fit the
/// 16-bit TPKT length.
pub fn wrap_payload(payload: &[u8]) -> Result<Vec<u8>> {
    let total =
        u16::try_from(payload.len() + ISO_HEADER_SIZE).map_err(|_| S7Error::InvalidPdu)?;
    let mut t = Telegram::from_template(&TPKT_ISO);
    t.set_word(2, total)?;
    t.extend_from_slice(payload);
    Ok(t.into_bytes())
}
