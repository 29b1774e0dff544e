//! Error types for the S7 protocol.
//!
//! Every failure maps to exactly one [`S7Error`] variant. Each variant carries a
//! stable numeric code (the values used by the classic Snap7 family of clients)
//! and a fixed human readable text, so applications that log or persist codes
//! stay compatible across client implementations.
//!
//! | Range | Layer |
//! |-------|-------|
//! | `0x0000_0001..=0x0000_FFFF` | TCP transport |
//! | `0x0001_0000..=0x000F_0000` | ISO (TPKT/COTP) framing |
//! | `0x0010_0000..` | Client and CPU level |
//!
//! # Example
//!
//! ```
//! use s7_client::{error_text, S7Error};
//!
//! let err = S7Error::AddressOutOfRange;
//! assert_eq!(err.code(), 0x0090_0000);
//! assert_eq!(err.to_string(), "CPU: Address out of range");
//! assert_eq!(error_text(0), "OK");
//! assert_eq!(S7Error::from_code(0x0090_0000), Some(S7Error::AddressOutOfRange));
//! ```

use thiserror::Error;

/// Result type alias for S7 operations.
pub type Result<T> = std::result::Result<T, S7Error>;

/// Errors that can occur during S7 communication.
///
/// The enum is `Copy` so it can be stored per item in batched requests.
/// Underlying I/O errors are logged when they happen and collapsed into the
/// transport variants.
///
/// Some variants, such as [`S7Error::JobPending`] or
/// [`S7Error::SocketCreation`], are never returned by this client. They
/// exist so every historical code resolves in [`S7Error::from_code`] and
/// [`error_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum S7Error {
    /// The TCP socket could not be created.
    #[error("SYS: Error creating the Socket")]
    SocketCreation,
    /// The TCP connect did not complete in time.
    #[error("TCP: Connection Timeout")]
    ConnectionTimeout,
    /// The TCP connect (or the reachability probe) failed.
    #[error("TCP: Connection Error")]
    ConnectionFailed,
    /// No data arrived within the read timeout.
    #[error("TCP: Data receive Timeout")]
    ReceiveTimeout,
    /// Receiving failed, timed out or the peer closed the stream.
    #[error("TCP: Error receiving Data")]
    DataReceive,
    /// The send did not complete in time.
    #[error("TCP: Data send Timeout")]
    SendTimeout,
    /// Sending failed.
    #[error("TCP: Error sending Data")]
    DataSend,
    /// The peer reset the connection.
    #[error("TCP: Connection reset by the Peer")]
    ConnectionReset,
    /// An operation was attempted without a live transport.
    #[error("CLI: Client not connected")]
    NotConnected,
    /// The host could not be reached.
    #[error("TCP: Unreachable host")]
    UnreachableHost,

    /// The ISO connection request was not confirmed.
    #[error("ISO: Connection Error")]
    IsoConnect,
    /// A telegram with an unexpected length or layout was received.
    #[error("ISO: Invalid PDU received")]
    InvalidPdu,
    /// A read reply was too short to carry the requested data.
    #[error("ISO: Invalid Buffer passed to Send/Receive")]
    InvalidDataSize,

    /// PDU size negotiation failed.
    #[error("CLI: Error in PDU negotiation")]
    NegotiatingPdu,
    /// Invalid parameters were supplied.
    #[error("CLI: Invalid param(s) supplied")]
    InvalidParams,
    /// Another job is still pending.
    #[error("CLI: Job pending")]
    JobPending,
    /// More than 20 items in a multi read/write.
    #[error("CLI: Too many items (>20) in multi read/write")]
    TooManyItems,
    /// Unknown word length code.
    #[error("CLI: Invalid WordLength")]
    InvalidWordLen,
    /// Only part of the data was written.
    #[error("CLI: Partial data written")]
    PartialDataWritten,
    /// The request does not fit in the negotiated PDU.
    #[error("CPU: Total data exceeds the PDU size")]
    SizeOverPdu,
    /// The CPU reply does not match the request.
    #[error("CLI: Invalid CPU answer")]
    InvalidPlcAnswer,
    /// Address out of range.
    #[error("CPU: Address out of range")]
    AddressOutOfRange,
    /// Transport size not supported by the CPU.
    #[error("CPU: Invalid Transport size")]
    InvalidTransportSize,
    /// Written data size does not match the item.
    #[error("CPU: Data size mismatch")]
    WriteDataSizeMismatch,
    /// The requested item does not exist.
    #[error("CPU: Item not available")]
    ItemNotAvailable,
    /// The CPU rejected a value.
    #[error("CPU: Invalid value supplied")]
    InvalidValue,
    /// The CPU refused to start.
    #[error("CPU: Cannot start PLC")]
    CannotStartPlc,
    /// The CPU is already in RUN.
    #[error("CPU: PLC already RUN")]
    AlreadyRun,
    /// The CPU refused to stop.
    #[error("CPU: Cannot stop PLC")]
    CannotStopPlc,
    /// RAM to ROM copy failed.
    #[error("CPU: Cannot copy RAM to ROM")]
    CannotCopyRamToRom,
    /// Memory compress failed.
    #[error("CPU: Cannot compress")]
    CannotCompress,
    /// The CPU is already in STOP.
    #[error("CPU: PLC already STOP")]
    AlreadyStop,
    /// The function is not available on this CPU.
    #[error("CPU: Function not available")]
    FunNotAvailable,
    /// Block upload sequence failed.
    #[error("CPU: Upload sequence failed")]
    UploadSequenceFailed,
    /// A reply carried less data than announced.
    #[error("CLI: Invalid data size received")]
    InvalidDataSizeRecvd,
    /// Unknown block type.
    #[error("CLI: Invalid block type")]
    InvalidBlockType,
    /// Invalid block number.
    #[error("CLI: Invalid block number")]
    InvalidBlockNumber,
    /// Invalid block size.
    #[error("CLI: Invalid block size")]
    InvalidBlockSize,
    /// The current protection level does not allow the function.
    #[error("CPU: Function not authorized for current protection level")]
    NeedPassword,
    /// Wrong password.
    #[error("CPU: Invalid password")]
    InvalidPassword,
    /// There is no password to set or clear.
    #[error("CPU: No password to set or clear")]
    NoPasswordToSetOrClear,
    /// A job did not complete in time.
    #[error("CLI: Job Timeout")]
    JobTimeout,
    /// Only part of the data was read.
    #[error("CLI: Partial data read")]
    PartialDataRead,
    /// The caller buffer cannot hold the result.
    #[error("CLI: The buffer supplied is too small to accomplish the operation")]
    BufferTooSmall,
    /// The CPU refused the function with a status code that has no mapping.
    #[error("CLI: Function refused by CPU (Unknown error)")]
    FunctionRefused,
    /// The client is being destroyed.
    #[error("CLI: Cannot perform (destroying)")]
    Destroying,
    /// Unknown parameter number.
    #[error("CLI: Invalid Param Number")]
    InvalidParamNumber,
    /// The parameter cannot be changed now.
    #[error("CLI: Cannot change this param now")]
    CannotChangeParam,
    /// The function is not implemented by this client.
    #[error("CLI: Function not implemented")]
    FunctionNotImplemented,
}

/// Every variant, used for code lookups.
const ALL: [S7Error; 49] = [
    S7Error::SocketCreation,
    S7Error::ConnectionTimeout,
    S7Error::ConnectionFailed,
    S7Error::ReceiveTimeout,
    S7Error::DataReceive,
    S7Error::SendTimeout,
    S7Error::DataSend,
    S7Error::ConnectionReset,
    S7Error::NotConnected,
    S7Error::UnreachableHost,
    S7Error::IsoConnect,
    S7Error::InvalidPdu,
    S7Error::InvalidDataSize,
    S7Error::NegotiatingPdu,
    S7Error::InvalidParams,
    S7Error::JobPending,
    S7Error::TooManyItems,
    S7Error::InvalidWordLen,
    S7Error::PartialDataWritten,
    S7Error::SizeOverPdu,
    S7Error::InvalidPlcAnswer,
    S7Error::AddressOutOfRange,
    S7Error::InvalidTransportSize,
    S7Error::WriteDataSizeMismatch,
    S7Error::ItemNotAvailable,
    S7Error::InvalidValue,
    S7Error::CannotStartPlc,
    S7Error::AlreadyRun,
    S7Error::CannotStopPlc,
    S7Error::CannotCopyRamToRom,
    S7Error::CannotCompress,
    S7Error::AlreadyStop,
    S7Error::FunNotAvailable,
    S7Error::UploadSequenceFailed,
    S7Error::InvalidDataSizeRecvd,
    S7Error::InvalidBlockType,
    S7Error::InvalidBlockNumber,
    S7Error::InvalidBlockSize,
    S7Error::NeedPassword,
    S7Error::InvalidPassword,
    S7Error::NoPasswordToSetOrClear,
    S7Error::JobTimeout,
    S7Error::PartialDataRead,
    S7Error::BufferTooSmall,
    S7Error::FunctionRefused,
    S7Error::Destroying,
    S7Error::InvalidParamNumber,
    S7Error::CannotChangeParam,
    S7Error::FunctionNotImplemented,
];

impl S7Error {
    /// Returns the stable numeric code of this error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::S7Error;
    ///
    /// assert_eq!(S7Error::ConnectionFailed.code(), 0x0003);
    /// assert_eq!(S7Error::InvalidPdu.code(), 0x0003_0000);
    /// ```
    pub fn code(self) -> u32 {
        match self {
            S7Error::SocketCreation => 0x0000_0001,
            S7Error::ConnectionTimeout => 0x0000_0002,
            S7Error::ConnectionFailed => 0x0000_0003,
            S7Error::ReceiveTimeout => 0x0000_0004,
            S7Error::DataReceive => 0x0000_0005,
            S7Error::SendTimeout => 0x0000_0006,
            S7Error::DataSend => 0x0000_0007,
            S7Error::ConnectionReset => 0x0000_0008,
            S7Error::NotConnected => 0x0000_0009,
            S7Error::UnreachableHost => 0x0000_2751,
            S7Error::IsoConnect => 0x0001_0000,
            S7Error::InvalidPdu => 0x0003_0000,
            S7Error::InvalidDataSize => 0x0004_0000,
            S7Error::NegotiatingPdu => 0x0010_0000,
            S7Error::InvalidParams => 0x0020_0000,
            S7Error::JobPending => 0x0030_0000,
            S7Error::TooManyItems => 0x0040_0000,
            S7Error::InvalidWordLen => 0x0050_0000,
            S7Error::PartialDataWritten => 0x0060_0000,
            S7Error::SizeOverPdu => 0x0070_0000,
            S7Error::InvalidPlcAnswer => 0x0080_0000,
            S7Error::AddressOutOfRange => 0x0090_0000,
            S7Error::InvalidTransportSize => 0x00A0_0000,
            S7Error::WriteDataSizeMismatch => 0x00B0_0000,
            S7Error::ItemNotAvailable => 0x00C0_0000,
            S7Error::InvalidValue => 0x00D0_0000,
            S7Error::CannotStartPlc => 0x00E0_0000,
            S7Error::AlreadyRun => 0x00F0_0000,
            S7Error::CannotStopPlc => 0x0100_0000,
            S7Error::CannotCopyRamToRom => 0x0110_0000,
            S7Error::CannotCompress => 0x0120_0000,
            S7Error::AlreadyStop => 0x0130_0000,
            S7Error::FunNotAvailable => 0x0140_0000,
            S7Error::UploadSequenceFailed => 0x0150_0000,
            S7Error::InvalidDataSizeRecvd => 0x0160_0000,
            S7Error::InvalidBlockType => 0x0170_0000,
            S7Error::InvalidBlockNumber => 0x0180_0000,
            S7Error::InvalidBlockSize => 0x0190_0000,
            S7Error::NeedPassword => 0x01D0_0000,
            S7Error::InvalidPassword => 0x01E0_0000,
            S7Error::NoPasswordToSetOrClear => 0x01F0_0000,
            S7Error::JobTimeout => 0x0200_0000,
            S7Error::PartialDataRead => 0x0210_0000,
            S7Error::BufferTooSmall => 0x0220_0000,
            S7Error::FunctionRefused => 0x0230_0000,
            S7Error::Destroying => 0x0240_0000,
            S7Error::InvalidParamNumber => 0x0250_0000,
            S7Error::CannotChangeParam => 0x0260_0000,
            S7Error::FunctionNotImplemented => 0x0270_0000,
        }
    }

    /// Looks up the error with the given numeric code.
    ///
    /// Returns `None` for `0` (success) and for unknown codes.
    pub fn from_code(code: u32) -> Option<Self> {
        ALL.iter().copied().find(|err| err.code() == code)
    }

    /// Returns `true` for errors raised by the transport layer.
    ///
    /// After one of these the connection should be treated as suspect and
    /// re-established.
    pub fn is_transport(self) -> bool {
        self.code() < 0x0001_0000
    }
}

/// Returns the text for a numeric error code.
///
/// `0` renders as `"OK"`; unknown codes render as
/// `"CLI: Unknown error (0x<hex>)"`.
///
/// # Example
///
/// ```
/// use s7_client::error_text;
///
/// assert_eq!(error_text(0x0001_0000), "ISO: Connection Error");
/// assert_eq!(error_text(0xdead), "CLI: Unknown error (0xdead)");
/// ```
pub fn error_text(code: u32) -> String {
    if code == 0 {
        return "OK".to_string();
    }
    match S7Error::from_code(code) {
        Some(err) => err.to_string(),
        None => format!("CLI: Unknown error (0x{code:x})"),
    }
}

/// Translates a CPU status code into a result.
///
/// `0` is success, known codes map to their specific error and anything else
/// becomes [`S7Error::FunctionRefused`].
///
/// # Example
///
/// ```
/// use s7_client::{cpu_error, S7Error};
///
/// assert!(cpu_error(0).is_ok());
/// assert_eq!(cpu_error(0x000A), Err(S7Error::ItemNotAvailable));
/// assert_eq!(cpu_error(0x1234), Err(S7Error::FunctionRefused));
/// ```
pub fn cpu_error(status: u16) -> Result<()> {
    let err = match status {
        0x0000 => return Ok(()),
        0x0005 => S7Error::AddressOutOfRange,
        0x0006 => S7Error::InvalidTransportSize,
        0x0007 => S7Error::WriteDataSizeMismatch,
        0x000A | 0xD209 => S7Error::ItemNotAvailable,
        0x8500 => S7Error::SizeOverPdu,
        0xDC01 => S7Error::InvalidValue,
        0x8104 => S7Error::FunNotAvailable,
        0xD241 => S7Error::NeedPassword,
        0xD602 => S7Error::InvalidPassword,
        0xD604 | 0xD605 => S7Error::NoPasswordToSetOrClear,
        _ => S7Error::FunctionRefused,
    };
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in ALL.iter().skip(i + 1) {
                assert_ne!(a.code(), b.code(), "{a:?} and {b:?} share a code");
            }
        }
    }

    #[test]
    fn test_from_code_round_trips_every_variant() {
        for err in ALL {
            assert_eq!(S7Error::from_code(err.code()), Some(err));
        }
        assert_eq!(S7Error::from_code(0), None);
        assert_eq!(S7Error::from_code(0x0280_0000), None);
    }

    #[test]
    fn test_compatibility_codes_resolve() {
        for err in [
            S7Error::SocketCreation,
            S7Error::ConnectionTimeout,
            S7Error::JobPending,
            S7Error::CannotCompress,
            S7Error::Destroying,
            S7Error::FunctionNotImplemented,
        ] {
            assert_eq!(S7Error::from_code(err.code()), Some(err));
            assert_eq!(error_text(err.code()), err.to_string());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(S7Error::ConnectionFailed.to_string(), "TCP: Connection Error");
        assert_eq!(S7Error::InvalidPdu.to_string(), "ISO: Invalid PDU received");
        assert_eq!(
            S7Error::TooManyItems.to_string(),
            "CLI: Too many items (>20) in multi read/write"
        );
        assert_eq!(
            S7Error::FunctionRefused.to_string(),
            "CLI: Function refused by CPU (Unknown error)"
        );
    }

    #[test]
    fn test_error_text() {
        assert_eq!(error_text(0), "OK");
        assert_eq!(error_text(0x0000_0009), "CLI: Client not connected");
        assert_eq!(error_text(0x0090_0000), "CPU: Address out of range");
        assert_eq!(error_text(0x1234_5678), "CLI: Unknown error (0x12345678)");
    }

    #[test]
    fn test_cpu_error_mapping() {
        assert_eq!(cpu_error(0x0000), Ok(()));
        assert_eq!(cpu_error(0x0005), Err(S7Error::AddressOutOfRange));
        assert_eq!(cpu_error(0x0006), Err(S7Error::InvalidTransportSize));
        assert_eq!(cpu_error(0x0007), Err(S7Error::WriteDataSizeMismatch));
        assert_eq!(cpu_error(0x000A), Err(S7Error::ItemNotAvailable));
        assert_eq!(cpu_error(0xD209), Err(S7Error::ItemNotAvailable));
        assert_eq!(cpu_error(0x8500), Err(S7Error::SizeOverPdu));
        assert_eq!(cpu_error(0xDC01), Err(S7Error::InvalidValue));
        assert_eq!(cpu_error(0x8104), Err(S7Error::FunNotAvailable));
        assert_eq!(cpu_error(0xD241), Err(S7Error::NeedPassword));
        assert_eq!(cpu_error(0xD602), Err(S7Error::InvalidPassword));
        assert_eq!(cpu_error(0xD604), Err(S7Error::NoPasswordToSetOrClear));
        assert_eq!(cpu_error(0xD605), Err(S7Error::NoPasswordToSetOrClear));
        assert_eq!(cpu_error(0x0001), Err(S7Error::FunctionRefused));
        assert_eq!(cpu_error(0xFFFF), Err(S7Error::FunctionRefused));
    }

    #[test]
    fn test_is_transport() {
        assert!(S7Error::DataReceive.is_transport());
        assert!(S7Error::UnreachableHost.is_transport());
        assert!(!S7Error::IsoConnect.is_transport());
        assert!(!S7Error::ItemNotAvailable.is_transport());
    }
}
