//! S7 reply parsing and validation.
//!
//! This module handles parsing and validation of the telegrams received from
//! the CPU. A reply is kept whole (ISO header included) so every field is read
//! at the same absolute offset the request templates use.
//!
//! # Reply Structure
//!
//! | Offset | Size | Description |
//! |--------|------|-------------|
//! | 0 | 4 | TPKT header, big-endian total length at 2 |
//! | 4 | 3 | COTP header, PDU type at 5 |
//! | 7 | 10/12 | S7 header (job replies carry error class/code at 17/18) |
//! | 17.. | | Parameters and data, layout depends on the request |
//!
//! # Status Bytes
//!
//! Data items carry a return code where `0xFF` means success. User data
//! replies (SZL, clock, password, block info) carry a 16-bit error word at 27.
//! Anything else is translated with [`cpu_error`].
//!
//! # Example
//!
//! ```
//! use s7_client::S7Response;
//!
//! // Connection confirm from the CPU
//! let mut bytes = vec![0u8; 22];
//! bytes[..6].copy_from_slice(&[0x03, 0x00, 0x00, 0x16, 0x11, 0xD0]);
//! let reply = S7Response::from_bytes(bytes);
//! assert!(reply.check_iso_confirm().is_ok());
//! ```

use chrono::{NaiveDate, NaiveDateTime};

use crate::command::ControlCommand;
use crate::error::{cpu_error, Result, S7Error};
use crate::header::{COTP_CONNECTION_CONFIRM, ISO_HEADER_SIZE};
use crate::memory::length_in_bytes;
use crate::szl::SzlHeader;
use crate::telegram::Telegram;
use crate::utils::{get_chars_at, get_date_time_at, siemens_date};

/// Length of a connection confirm telegram.
pub const ISO_CONFIRM_SIZE: usize = 22;

/// Length of a PDU negotiation reply.
pub const NEGOTIATE_REPLY_SIZE: usize = 27;

/// Offset of the payload in a read reply.
pub const READ_DATA_OFFSET: usize = 25;

/// Length of a write acknowledge.
pub const WRITE_ACK_SIZE: usize = 22;

/// Data item return code for success.
pub(crate) const RC_SUCCESS: u8 = 0xFF;

/// Translates an item return code into an error.
///
/// A zero code is not a valid failure report and becomes
/// [`S7Error::FunctionRefused`].
pub(crate) fn item_error(status: u16) -> S7Error {
    match cpu_error(status) {
        Err(e) => e,
        Ok(()) => S7Error::FunctionRefused,
    }
}

/// One segment of a system status list reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SzlSegment<'a> {
    /// Record bytes carried by this segment.
    pub data: &'a [u8],
    /// `true` while the CPU has more segments to send.
    pub more: bool,
    /// Sequence number to echo in the next request.
    pub sequence_in: u8,
    /// List header, present on the first segment only.
    pub header: Option<SzlHeader>,
}

/// Metadata of a block stored in the CPU.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockInfo {
    /// Block type code (ASCII).
    pub block_type: u8,
    /// Block number.
    pub number: u16,
    /// Programming language.
    pub language: u8,
    /// Block flags.
    pub flags: u8,
    /// Size of the MC7 code, the usable size of a DB.
    pub mc7_size: u16,
    /// Load memory size.
    pub load_size: i32,
    /// Local data size.
    pub local_data: u16,
    /// SBB length.
    pub sbb_length: u16,
    /// Block checksum.
    pub checksum: u16,
    /// Block version.
    pub version: u8,
    /// Code timestamp.
    pub code_date: Option<NaiveDate>,
    /// Interface timestamp.
    pub interface_date: Option<NaiveDate>,
    /// Author.
    pub author: String,
    /// Family.
    pub family: String,
    /// Header name.
    pub header: String,
}

/// CPU operating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CpuStatus {
    /// The CPU did not report a state.
    Unknown,
    /// The CPU is running.
    Run,
    /// The CPU is stopped.
    Stop,
}

impl CpuStatus {
    /// Returns the status code reported by the CPU.
    pub fn code(self) -> u8 {
        match self {
            CpuStatus::Unknown => 0x00,
            CpuStatus::Run => 0x08,
            CpuStatus::Stop => 0x04,
        }
    }

    /// Decodes a status byte. Unrecognized values (older CPUs report STOP
    /// as `0x03`) decode as [`CpuStatus::Stop`].
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => CpuStatus::Unknown,
            0x08 => CpuStatus::Run,
            _ => CpuStatus::Stop,
        }
    }
}

impl std::fmt::Display for CpuStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuStatus::Unknown => write!(f, "UNKNOWN"),
            CpuStatus::Run => write!(f, "RUN"),
            CpuStatus::Stop => write!(f, "STOP"),
        }
    }
}

/// A complete reply telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S7Response {
    telegram: Telegram,
}

impl S7Response {
    /// Wraps a received telegram.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            telegram: Telegram::from(bytes),
        }
    }

    /// Returns the telegram length.
    pub fn len(&self) -> usize {
        self.telegram.len()
    }

    /// Returns `true` for an empty telegram.
    pub fn is_empty(&self) -> bool {
        self.telegram.is_empty()
    }

    /// Returns the raw bytes, ISO header included.
    pub fn as_bytes(&self) -> &[u8] {
        self.telegram.as_bytes()
    }

    /// Releases the underlying buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.telegram.into_bytes()
    }

    /// Returns the S7 payload following the ISO header.
    pub fn payload(&self) -> &[u8] {
        self.as_bytes().get(ISO_HEADER_SIZE..).unwrap_or(&[])
    }

    /// Returns the COTP PDU type.
    pub fn pdu_type(&self) -> Result<u8> {
        self.telegram.byte_at(5)
    }

    /// Checks that a user data reply is long enough and carries no error
    /// word.
    fn check_user_data(&self, min_len: usize) -> Result<()> {
        if self.len() <= min_len {
            return Err(S7Error::InvalidPdu);
        }
        match self.telegram.word_at(27)? {
            0 => Ok(()),
            status => cpu_error(status),
        }
    }

    /// Like [`check_user_data`](Self::check_user_data) but also requires a
    /// success return code at 29.
    fn check_user_data_item(&self, min_len: usize) -> Result<()> {
        if self.len() <= min_len {
            return Err(S7Error::InvalidPdu);
        }
        if self.telegram.word_at(27)? != 0 || self.telegram.byte_at(29)? != RC_SUCCESS {
            return Err(S7Error::InvalidPlcAnswer);
        }
        Ok(())
    }

    /// Validates the connection confirm.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a wrong length and
    /// [`S7Error::IsoConnect`] if the CPU did not confirm.
    pub fn check_iso_confirm(&self) -> Result<()> {
        if self.len() != ISO_CONFIRM_SIZE {
            return Err(S7Error::InvalidPdu);
        }
        if self.pdu_type()? != COTP_CONNECTION_CONFIRM {
            return Err(S7Error::IsoConnect);
        }
        Ok(())
    }

    /// Returns the PDU size granted by the CPU.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::NegotiatingPdu`] if the reply is malformed, carries
    /// an error class/code, or grants a zero size.
    pub fn negotiated_pdu(&self) -> Result<u16> {
        if self.len() != NEGOTIATE_REPLY_SIZE {
            return Err(S7Error::NegotiatingPdu);
        }
        let error_class = self.telegram.byte_at(17)?;
        let error_code = self.telegram.byte_at(18)?;
        let size = self.telegram.word_at(25)?;
        if error_class != 0 || error_code != 0 || size == 0 {
            return Err(S7Error::NegotiatingPdu);
        }
        Ok(size)
    }

    /// Copies the payload of a read reply into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidDataSize`] if the reply is shorter than
    /// expected, or the translated item return code.
    pub fn read_data(&self, out: &mut [u8]) -> Result<()> {
        if self.len() < READ_DATA_OFFSET {
            return Err(S7Error::InvalidDataSize);
        }
        let status = self.telegram.byte_at(21)?;
        if status != RC_SUCCESS {
            return Err(item_error(u16::from(status)));
        }
        let data = self
            .telegram
            .slice(READ_DATA_OFFSET, out.len())
            .map_err(|_| S7Error::InvalidDataSize)?;
        out.copy_from_slice(data);
        Ok(())
    }

    /// Validates a write acknowledge.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a wrong length, or the translated
    /// item return code.
    pub fn check_write_ack(&self) -> Result<()> {
        if self.len() != WRITE_ACK_SIZE {
            return Err(S7Error::InvalidPdu);
        }
        let status = self.telegram.byte_at(21)?;
        if status != RC_SUCCESS {
            return Err(item_error(u16::from(status)));
        }
        Ok(())
    }

    fn check_multi_header(&self, count: usize) -> Result<()> {
        match self.telegram.word_at(17)? {
            0 => {}
            status => cpu_error(status)?,
        }
        if usize::from(self.telegram.byte_at(20)?) != count {
            return Err(S7Error::InvalidPlcAnswer);
        }
        Ok(())
    }

    /// Splits a multi-read reply into per-item payloads.
    ///
    /// Each entry is either the item's data or its translated error.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a truncated reply, the translated
    /// global status, or [`S7Error::InvalidPlcAnswer`] if the item count
    /// differs from `count`.
    pub fn multi_read_items(&self, count: usize) -> Result<Vec<std::result::Result<&[u8], S7Error>>> {
        if self.len() < 22 {
            return Err(S7Error::InvalidPdu);
        }
        self.check_multi_header(count)?;

        let mut items = Vec::with_capacity(count);
        let mut offset = 21;
        for _ in 0..count {
            let status = self.telegram.byte_at(offset)?;
            if status == RC_SUCCESS {
                let transport_size = self.telegram.byte_at(offset + 1)?;
                let mut size = usize::from(self.telegram.word_at(offset + 2)?);
                if !length_in_bytes(transport_size) {
                    size >>= 3;
                }
                items.push(Ok(self.telegram.slice(offset + 4, size)?));
                if size % 2 != 0 {
                    size += 1;
                }
                offset += size + 4;
            } else {
                items.push(Err(item_error(u16::from(status))));
                offset += 4;
            }
        }
        Ok(items)
    }

    /// Returns the per-item outcome of a multi-write reply.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a truncated reply, the translated
    /// global status, or [`S7Error::InvalidPlcAnswer`] if the item count
    /// differs from `count`.
    pub fn multi_write_results(&self, count: usize) -> Result<Vec<Result<()>>> {
        self.check_multi_header(count)?;
        (0..count)
            .map(|c| {
                let status = self.telegram.byte_at(21 + c)?;
                Ok(if status == RC_SUCCESS {
                    Ok(())
                } else {
                    Err(item_error(u16::from(status)))
                })
            })
            .collect()
    }

    /// Parses one segment of a system status list reply.
    ///
    /// The first segment carries the list header and its record bytes start
    /// at 41; later segments carry raw record bytes at 37.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a short reply and
    /// [`S7Error::InvalidPlcAnswer`] if the CPU rejected the request.
    pub fn szl_segment(&self, first: bool) -> Result<SzlSegment<'_>> {
        self.check_user_data_item(32)?;
        let more = self.telegram.byte_at(26)? != 0;
        let sequence_in = self.telegram.byte_at(24)?;
        let declared = usize::from(self.telegram.word_at(31)?);

        if first {
            // The data length includes the 8 byte list header
            let data_len = declared.checked_sub(8).ok_or(S7Error::InvalidPlcAnswer)?;
            let header = SzlHeader {
                length: self.telegram.word_at(37)?,
                record_count: self.telegram.word_at(39)?,
            };
            Ok(SzlSegment {
                data: self.telegram.slice(41, data_len)?,
                more,
                sequence_in,
                header: Some(header),
            })
        } else {
            Ok(SzlSegment {
                data: self.telegram.slice(37, declared)?,
                more,
                sequence_in,
                header: None,
            })
        }
    }

    /// Parses a block info reply.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a short reply, or the translated
    /// error word.
    pub fn block_info(&self) -> Result<BlockInfo> {
        self.check_user_data(32)?;
        let t = &self.telegram;
        let text = |pos: usize| -> Result<String> {
            let raw = get_chars_at(t.as_bytes(), pos, 8).map_err(|_| S7Error::InvalidPdu)?;
            Ok(raw.trim_matches('\0').to_string())
        };
        Ok(BlockInfo {
            flags: t.byte_at(42)?,
            language: t.byte_at(43)?,
            block_type: t.byte_at(44)?,
            number: t.word_at(45)?,
            load_size: t.dint_at(47)?,
            code_date: siemens_date(t.word_at(59)?),
            interface_date: siemens_date(t.word_at(65)?),
            sbb_length: t.word_at(67)?,
            local_data: t.word_at(71)?,
            mc7_size: t.word_at(73)?,
            author: text(75)?,
            family: text(83)?,
            header: text(91)?,
            version: t.byte_at(99)?,
            checksum: t.word_at(101)?,
        })
    }

    /// Returns the CPU state from a status reply.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a short reply, or the translated
    /// error word.
    pub fn cpu_status(&self) -> Result<CpuStatus> {
        self.check_user_data(30)?;
        Ok(CpuStatus::from_code(self.telegram.byte_at(44)?))
    }

    /// Validates the reply to a run mode change.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a short reply,
    /// [`S7Error::CannotStartPlc`] / [`S7Error::CannotStopPlc`] if the CPU
    /// refused, and [`S7Error::AlreadyRun`] / [`S7Error::AlreadyStop`] if it
    /// was already in the requested state.
    pub fn check_control(&self, command: ControlCommand) -> Result<()> {
        if self.len() <= 18 {
            return Err(S7Error::InvalidPdu);
        }
        let (refused, already, already_code) = match command {
            ControlCommand::HotStart | ControlCommand::ColdStart => {
                (S7Error::CannotStartPlc, S7Error::AlreadyRun, 0x02)
            }
            ControlCommand::Stop => (S7Error::CannotStopPlc, S7Error::AlreadyStop, 0x07),
        };
        if self.telegram.byte_at(19)? != command.function_code() {
            return Err(refused);
        }
        if self.telegram.byte_at(20)? == already_code {
            return Err(already);
        }
        Ok(())
    }

    /// Returns the PLC clock from a date/time reply.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a short reply and
    /// [`S7Error::InvalidPlcAnswer`] if the CPU rejected the request.
    pub fn plc_date_time(&self) -> Result<NaiveDateTime> {
        self.check_user_data_item(30)?;
        let raw = self.telegram.slice(35, 8)?;
        get_date_time_at(raw, 0)
    }

    /// Validates the reply to a clock update.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidPdu`] for a short reply and
    /// [`S7Error::InvalidPlcAnswer`] if the CPU rejected the new time.
    pub fn check_set_date_time(&self) -> Result<()> {
        if self.len() <= 30 {
            return Err(S7Error::InvalidPdu);
        }
        if self.telegram.word_at(27)? != 0 {
            return Err(S7Error::InvalidPlcAnswer);
        }
        Ok(())
    }

    /// Validates the reply to a session password request.
    pub fn check_set_password(&self) -> Result<()> {
        self.check_user_data(32)
    }

    /// Validates the reply to a password clear request.
    pub fn check_clear_password(&self) -> Result<()> {
        self.check_user_data(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a user data reply of `len` bytes with the given error word and
    /// return code.
    fn user_data(len: usize, error: u16, rc: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[..7].copy_from_slice(&[0x03, 0x00, 0x00, len as u8, 0x02, 0xF0, 0x80]);
        bytes[27..29].copy_from_slice(&error.to_be_bytes());
        bytes[29] = rc;
        bytes
    }

    #[test]
    fn test_iso_confirm() {
        let mut bytes = vec![0u8; 22];
        bytes[5] = 0xD0;
        assert!(S7Response::from_bytes(bytes.clone()).check_iso_confirm().is_ok());

        bytes[5] = 0xE0;
        assert_eq!(
            S7Response::from_bytes(bytes).check_iso_confirm(),
            Err(S7Error::IsoConnect)
        );
        assert_eq!(
            S7Response::from_bytes(vec![0u8; 21]).check_iso_confirm(),
            Err(S7Error::InvalidPdu)
        );
    }

    #[test]
    fn test_negotiated_pdu() {
        let mut bytes = vec![0u8; 27];
        bytes[25..27].copy_from_slice(&240u16.to_be_bytes());
        assert_eq!(S7Response::from_bytes(bytes.clone()).negotiated_pdu(), Ok(240));

        let mut refused = bytes.clone();
        refused[17] = 0x81;
        assert_eq!(
            S7Response::from_bytes(refused).negotiated_pdu(),
            Err(S7Error::NegotiatingPdu)
        );

        let mut zero = bytes.clone();
        zero[25..27].copy_from_slice(&[0, 0]);
        assert_eq!(S7Response::from_bytes(zero).negotiated_pdu(), Err(S7Error::NegotiatingPdu));

        bytes.push(0);
        assert_eq!(S7Response::from_bytes(bytes).negotiated_pdu(), Err(S7Error::NegotiatingPdu));
    }

    #[test]
    fn test_read_data() {
        let mut bytes = vec![0u8; 25];
        bytes[21] = 0xFF;
        bytes.extend_from_slice(&[7, 8, 9]);
        let reply = S7Response::from_bytes(bytes);
        let mut out = [0u8; 3];
        reply.read_data(&mut out).unwrap();
        assert_eq!(out, [7, 8, 9]);

        let mut too_much = [0u8; 4];
        assert_eq!(reply.read_data(&mut too_much), Err(S7Error::InvalidDataSize));
    }

    #[test]
    fn test_read_data_errors() {
        assert_eq!(
            S7Response::from_bytes(vec![0u8; 24]).read_data(&mut []),
            Err(S7Error::InvalidDataSize)
        );
        let mut bytes = vec![0u8; 25];
        bytes[21] = 0x05;
        assert_eq!(
            S7Response::from_bytes(bytes).read_data(&mut []),
            Err(S7Error::AddressOutOfRange)
        );
    }

    #[test]
    fn test_write_ack() {
        let mut bytes = vec![0u8; 22];
        bytes[21] = 0xFF;
        assert!(S7Response::from_bytes(bytes.clone()).check_write_ack().is_ok());
        bytes[21] = 0x0A;
        assert_eq!(
            S7Response::from_bytes(bytes.clone()).check_write_ack(),
            Err(S7Error::ItemNotAvailable)
        );
        bytes.push(0);
        assert_eq!(
            S7Response::from_bytes(bytes).check_write_ack(),
            Err(S7Error::InvalidPdu)
        );
    }

    #[test]
    fn test_item_error_zero_is_refused() {
        assert_eq!(item_error(0), S7Error::FunctionRefused);
        assert_eq!(item_error(0x06), S7Error::InvalidTransportSize);
    }

    #[test]
    fn test_multi_read_items() {
        let mut bytes = vec![0u8; 21];
        bytes[20] = 3;
        // byte item, 3 bytes (24 bits), padded
        bytes.extend_from_slice(&[0xFF, 0x04, 0x00, 24, 1, 2, 3, 0]);
        // failed item
        bytes.extend_from_slice(&[0x0A, 0x00, 0x00, 0x00]);
        // counter item, length in bytes
        bytes.extend_from_slice(&[0xFF, 0x09, 0x00, 2, 0xAB, 0xCD]);
        let reply = S7Response::from_bytes(bytes);
        let items = reply.multi_read_items(3).unwrap();
        assert_eq!(items[0], Ok(&[1u8, 2, 3][..]));
        assert_eq!(items[1], Err(S7Error::ItemNotAvailable));
        assert_eq!(items[2], Ok(&[0xABu8, 0xCD][..]));
    }

    #[test]
    fn test_multi_read_global_errors() {
        assert_eq!(
            S7Response::from_bytes(vec![0u8; 21]).multi_read_items(1).unwrap_err(),
            S7Error::InvalidPdu
        );

        let mut bytes = vec![0u8; 26];
        bytes[20] = 2;
        assert_eq!(
            S7Response::from_bytes(bytes.clone()).multi_read_items(1).unwrap_err(),
            S7Error::InvalidPlcAnswer
        );

        bytes[17..19].copy_from_slice(&0x8500u16.to_be_bytes());
        assert_eq!(
            S7Response::from_bytes(bytes).multi_read_items(2).unwrap_err(),
            S7Error::SizeOverPdu
        );
    }

    #[test]
    fn test_multi_write_results() {
        let mut bytes = vec![0u8; 23];
        bytes[20] = 2;
        bytes[21] = 0xFF;
        bytes[22] = 0x07;
        let results = S7Response::from_bytes(bytes).multi_write_results(2).unwrap();
        assert_eq!(results, vec![Ok(()), Err(S7Error::WriteDataSizeMismatch)]);
    }

    #[test]
    fn test_szl_first_segment() {
        let mut bytes = user_data(41, 0, 0xFF);
        bytes[24] = 0x42;
        bytes[26] = 0x01;
        bytes[31..33].copy_from_slice(&12u16.to_be_bytes());
        bytes[37..39].copy_from_slice(&28u16.to_be_bytes());
        bytes[39..41].copy_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let reply = S7Response::from_bytes(bytes);
        let segment = reply.szl_segment(true).unwrap();
        assert_eq!(segment.data, &[1, 2, 3, 4]);
        assert!(segment.more);
        assert_eq!(segment.sequence_in, 0x42);
        assert_eq!(
            segment.header,
            Some(SzlHeader {
                length: 28,
                record_count: 1
            })
        );
    }

    #[test]
    fn test_szl_next_segment() {
        let mut bytes = user_data(37, 0, 0xFF);
        bytes[31..33].copy_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&[5, 6]);
        let reply = S7Response::from_bytes(bytes);
        let segment = reply.szl_segment(false).unwrap();
        assert_eq!(segment.data, &[5, 6]);
        assert!(!segment.more);
        assert!(segment.header.is_none());
    }

    #[test]
    fn test_szl_rejected() {
        assert_eq!(
            S7Response::from_bytes(user_data(32, 0, 0xFF)).szl_segment(true),
            Err(S7Error::InvalidPdu)
        );
        assert_eq!(
            S7Response::from_bytes(user_data(40, 0xD401, 0xFF)).szl_segment(true),
            Err(S7Error::InvalidPlcAnswer)
        );
        assert_eq!(
            S7Response::from_bytes(user_data(40, 0, 0x0A)).szl_segment(false),
            Err(S7Error::InvalidPlcAnswer)
        );
    }

    #[test]
    fn test_block_info() {
        let mut bytes = user_data(103, 0, 0xFF);
        bytes[42] = 0x01;
        bytes[43] = 0x05;
        bytes[44] = 0x0A;
        bytes[45..47].copy_from_slice(&7u16.to_be_bytes());
        bytes[47..51].copy_from_slice(&200i32.to_be_bytes());
        bytes[59..61].copy_from_slice(&1u16.to_be_bytes());
        bytes[73..75].copy_from_slice(&64u16.to_be_bytes());
        bytes[75..79].copy_from_slice(b"JOHN");
        bytes[83..87].copy_from_slice(b"FAM1");
        bytes[99] = 0x11;
        bytes[101..103].copy_from_slice(&0xBEEFu16.to_be_bytes());
        let info = S7Response::from_bytes(bytes).block_info().unwrap();
        assert_eq!(info.flags, 0x01);
        assert_eq!(info.language, 0x05);
        assert_eq!(info.number, 7);
        assert_eq!(info.load_size, 200);
        assert_eq!(info.mc7_size, 64);
        assert_eq!(info.code_date, NaiveDate::from_ymd_opt(1984, 1, 2));
        assert_eq!(info.author, "JOHN");
        assert_eq!(info.family, "FAM1");
        assert_eq!(info.header, "");
        assert_eq!(info.version, 0x11);
        assert_eq!(info.checksum, 0xBEEF);
    }

    #[test]
    fn test_block_info_errors() {
        assert_eq!(
            S7Response::from_bytes(user_data(32, 0, 0xFF)).block_info(),
            Err(S7Error::InvalidPdu)
        );
        assert_eq!(
            S7Response::from_bytes(user_data(103, 0xD209, 0xFF)).block_info(),
            Err(S7Error::ItemNotAvailable)
        );
    }

    #[test]
    fn test_cpu_status() {
        let mut bytes = user_data(45, 0, 0xFF);
        bytes[44] = 0x08;
        assert_eq!(S7Response::from_bytes(bytes.clone()).cpu_status(), Ok(CpuStatus::Run));
        bytes[44] = 0x03;
        assert_eq!(S7Response::from_bytes(bytes.clone()).cpu_status(), Ok(CpuStatus::Stop));
        bytes[44] = 0x00;
        assert_eq!(S7Response::from_bytes(bytes).cpu_status(), Ok(CpuStatus::Unknown));
        assert_eq!(CpuStatus::Run.to_string(), "RUN");
        assert_eq!(CpuStatus::from_code(CpuStatus::Stop.code()), CpuStatus::Stop);
    }

    #[test]
    fn test_check_control() {
        let mut bytes = vec![0u8; 20 + 1];
        bytes[19] = 0x28;
        assert!(S7Response::from_bytes(bytes.clone()).check_control(ControlCommand::HotStart).is_ok());
        assert_eq!(
            S7Response::from_bytes(bytes.clone()).check_control(ControlCommand::Stop),
            Err(S7Error::CannotStopPlc)
        );
        bytes[20] = 0x02;
        assert_eq!(
            S7Response::from_bytes(bytes.clone()).check_control(ControlCommand::ColdStart),
            Err(S7Error::AlreadyRun)
        );
        bytes[19] = 0x29;
        bytes[20] = 0x07;
        assert_eq!(
            S7Response::from_bytes(bytes).check_control(ControlCommand::Stop),
            Err(S7Error::AlreadyStop)
        );
        assert_eq!(
            S7Response::from_bytes(vec![0u8; 18]).check_control(ControlCommand::Stop),
            Err(S7Error::InvalidPdu)
        );
    }

    #[test]
    fn test_plc_date_time() {
        let mut bytes = user_data(35, 0, 0xFF);
        bytes.extend_from_slice(&[0x24, 0x03, 0x15, 0x13, 0x45, 0x30, 0x12, 0x06]);
        let dt = S7Response::from_bytes(bytes).plc_date_time().unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_milli_opt(13, 45, 30, 120)
            .unwrap();
        assert_eq!(dt, expected);

        assert_eq!(
            S7Response::from_bytes(user_data(43, 0, 0x0A)).plc_date_time(),
            Err(S7Error::InvalidPlcAnswer)
        );
    }

    #[test]
    fn test_passwords_and_set_clock() {
        assert!(S7Response::from_bytes(user_data(33, 0, 0)).check_set_password().is_ok());
        assert_eq!(
            S7Response::from_bytes(user_data(33, 0xD602, 0)).check_set_password(),
            Err(S7Error::InvalidPassword)
        );
        assert_eq!(
            S7Response::from_bytes(user_data(32, 0, 0)).check_set_password(),
            Err(S7Error::InvalidPdu)
        );
        assert!(S7Response::from_bytes(user_data(31, 0, 0)).check_clear_password().is_ok());
        assert!(S7Response::from_bytes(user_data(31, 0, 0)).check_set_date_time().is_ok());
        assert_eq!(
            S7Response::from_bytes(user_data(31, 1, 0)).check_set_date_time(),
            Err(S7Error::InvalidPlcAnswer)
        );
    }

    #[test]
    fn test_payload() {
        let reply = S7Response::from_bytes(vec![3, 0, 0, 9, 2, 0xF0, 0x80, 0x32, 0x03]);
        assert_eq!(reply.payload(), &[0x32, 0x03]);
        assert_eq!(reply.len(), 9);
        assert!(!reply.is_empty());
    }
}
