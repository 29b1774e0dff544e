//! Memory area and word length definitions for the S7 protocol.
//!
//! This module defines the [`Area`] enum, which selects the controller memory
//! region a request targets, and the [`WordLength`] enum, which selects the
//! element type of a transfer.
//!
//! # Memory Areas Overview
//!
//! | Area | Code | Description | Needs block number |
//! |------|:----:|-------------|:------------------:|
//! | PE | 0x81 | Process inputs (I / E) | ✗ |
//! | PA | 0x82 | Process outputs (Q / A) | ✗ |
//! | MK | 0x83 | Flags / merkers (M) | ✗ |
//! | DB | 0x84 | Data blocks | ✓ |
//! | CT | 0x1C | Counters | ✗ |
//! | TM | 0x1D | Timers | ✗ |
//!
//! # Addressing
//!
//! Bit, counter and timer transfers address elements directly. Every other
//! word length is flattened to bytes and addressed in bits (`start << 3`).
//!
//! # Example
//!
//! ```
//! use s7_client::{Area, WordLength};
//!
//! assert_eq!(Area::DB.code(), 0x84);
//! assert_eq!(WordLength::Real.size(), 4);
//!
//! // Counter and timer areas force their own word length
//! assert_eq!(Area::CT.forced_word_length(WordLength::Byte), WordLength::Counter);
//! assert_eq!(Area::DB.forced_word_length(WordLength::Word), WordLength::Word);
//! ```

use crate::error::{Result, S7Error};

/// Result transport size for bit data.
pub(crate) const TS_RES_BIT: u8 = 0x03;
/// Result transport size for byte/word/dword data (length in bits).
pub(crate) const TS_RES_BYTE: u8 = 0x04;
/// Result transport size for reals (length in bytes).
pub(crate) const TS_RES_REAL: u8 = 0x07;
/// Result transport size for octet strings such as counters and timers.
pub(crate) const TS_RES_OCTET: u8 = 0x09;

/// Memory areas available in S7 controllers.
///
/// # Example
///
/// ```
/// use s7_client::Area;
///
/// for area in [Area::PE, Area::PA, Area::MK, Area::DB, Area::CT, Area::TM] {
///     println!("{} = 0x{:02X}", area, area.code());
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Area {
    /// Process inputs.
    PE,
    /// Process outputs.
    PA,
    /// Flags (merkers).
    MK,
    /// Data blocks.
    DB,
    /// Counters.
    CT,
    /// Timers.
    TM,
}

impl Area {
    /// Returns the wire code of this area.
    pub fn code(self) -> u8 {
        match self {
            Area::PE => 0x81,
            Area::PA => 0x82,
            Area::MK => 0x83,
            Area::DB => 0x84,
            Area::CT => 0x1C,
            Area::TM => 0x1D,
        }
    }

    /// Returns the word length actually used for this area.
    ///
    /// Counter and timer areas always transfer [`WordLength::Counter`] and
    /// [`WordLength::Timer`] elements; every other area keeps `requested`.
    pub fn forced_word_length(self, requested: WordLength) -> WordLength {
        match self {
            Area::CT => WordLength::Counter,
            Area::TM => WordLength::Timer,
            _ => requested,
        }
    }
}

impl TryFrom<u8> for Area {
    type Error = S7Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0x81 => Ok(Area::PE),
            0x82 => Ok(Area::PA),
            0x83 => Ok(Area::MK),
            0x84 => Ok(Area::DB),
            0x1C => Ok(Area::CT),
            0x1D => Ok(Area::TM),
            _ => Err(S7Error::InvalidParams),
        }
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Area::PE => write!(f, "PE"),
            Area::PA => write!(f, "PA"),
            Area::MK => write!(f, "MK"),
            Area::DB => write!(f, "DB"),
            Area::CT => write!(f, "CT"),
            Area::TM => write!(f, "TM"),
        }
    }
}

/// Element type of a transfer.
///
/// | Word length | Code | Size (bytes) |
/// |-------------|:----:|:------------:|
/// | Bit | 0x01 | 1 |
/// | Byte | 0x02 | 1 |
/// | Char | 0x03 | 1 |
/// | Word | 0x04 | 2 |
/// | Int | 0x05 | 2 |
/// | DWord | 0x06 | 4 |
/// | DInt | 0x07 | 4 |
/// | Real | 0x08 | 4 |
/// | Counter | 0x1C | 2 |
/// | Timer | 0x1D | 2 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WordLength {
    /// Single bit.
    Bit,
    /// 8-bit byte.
    Byte,
    /// 8-bit character.
    Char,
    /// 16-bit unsigned word.
    Word,
    /// 16-bit signed integer.
    Int,
    /// 32-bit unsigned double word.
    DWord,
    /// 32-bit signed integer.
    DInt,
    /// 32-bit IEEE 754 float.
    Real,
    /// S7 counter.
    Counter,
    /// S7 timer.
    Timer,
}

impl WordLength {
    /// Returns the wire code of this word length.
    pub fn code(self) -> u8 {
        match self {
            WordLength::Bit => 0x01,
            WordLength::Byte => 0x02,
            WordLength::Char => 0x03,
            WordLength::Word => 0x04,
            WordLength::Int => 0x05,
            WordLength::DWord => 0x06,
            WordLength::DInt => 0x07,
            WordLength::Real => 0x08,
            WordLength::Counter => 0x1C,
            WordLength::Timer => 0x1D,
        }
    }

    /// Returns the size in bytes of one element.
    pub fn size(self) -> usize {
        match self {
            WordLength::Bit | WordLength::Byte | WordLength::Char => 1,
            WordLength::Word | WordLength::Int => 2,
            WordLength::DWord | WordLength::DInt | WordLength::Real => 4,
            WordLength::Counter | WordLength::Timer => 2,
        }
    }

    /// Returns `true` when elements are addressed directly rather than in bits.
    ///
    /// This holds for bit, counter and timer transfers.
    pub fn is_direct(self) -> bool {
        matches!(
            self,
            WordLength::Bit | WordLength::Counter | WordLength::Timer
        )
    }

    /// Returns the transport size used in the data part of write requests.
    pub(crate) fn data_transport_size(self) -> u8 {
        match self {
            WordLength::Bit => TS_RES_BIT,
            WordLength::Counter | WordLength::Timer => TS_RES_OCTET,
            _ => TS_RES_BYTE,
        }
    }
}

impl TryFrom<u8> for WordLength {
    type Error = S7Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0x01 => Ok(WordLength::Bit),
            0x02 => Ok(WordLength::Byte),
            0x03 => Ok(WordLength::Char),
            0x04 => Ok(WordLength::Word),
            0x05 => Ok(WordLength::Int),
            0x06 => Ok(WordLength::DWord),
            0x07 => Ok(WordLength::DInt),
            0x08 => Ok(WordLength::Real),
            0x1C => Ok(WordLength::Counter),
            0x1D => Ok(WordLength::Timer),
            _ => Err(S7Error::InvalidWordLen),
        }
    }
}

/// Returns `true` when a reply item length is expressed in bytes.
///
/// Octet, real and bit transport sizes carry byte lengths; every other
/// transport size carries a length in bits.
pub(crate) fn length_in_bytes(transport_size: u8) -> bool {
    matches!(transport_size, TS_RES_OCTET | TS_RES_REAL | TS_RES_BIT)
}
