//! System status list (SZL) results and the system info records decoded
//! from them.
//!
//! The CPU publishes its identity and state as lists addressed by an ID and
//! an index. [`Client::read_szl`](crate::Client::read_szl) returns the raw
//! list as an [`Szl`]; the records below decode the well-known ones.
//!
//! | ID | Index | Record |
//! |----|-------|--------|
//! | 0x0011 | 0x0000 | [`OrderCode`] |
//! | 0x001C | 0x0000 | [`CpuInfo`] |
//! | 0x0131 | 0x0001 | [`CpInfo`] |
//! | 0x0232 | 0x0004 | [`Protection`] |

use crate::error::{Result, S7Error};
use crate::utils::{get_chars_at, get_dint_at, get_int_at, get_word_at};

/// Module identification list.
pub const SZL_ORDER_CODE: u16 = 0x0011;
/// Component identification list.
pub const SZL_CPU_INFO: u16 = 0x001C;
/// Communication capability list.
pub const SZL_CP_INFO: u16 = 0x0131;
/// Protection level list.
pub const SZL_PROTECTION: u16 = 0x0232;

/// Header of a system status list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SzlHeader {
    /// Length declared by the first segment. The list data has exactly
    /// this many bytes.
    pub length: u16,
    /// Number of records.
    pub record_count: u16,
}

/// A complete system status list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Szl {
    /// List header from the first segment.
    pub header: SzlHeader,
    /// List data, exactly `header.length` bytes.
    pub data: Vec<u8>,
}

impl Szl {
    /// Returns the list data length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for an empty list.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn short(_: S7Error) -> S7Error {
    S7Error::InvalidDataSizeRecvd
}

/// Order code and firmware version of the CPU.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderCode {
    /// Order number, e.g. `6ES7 315-2EH14-0AB0`.
    pub code: String,
    /// Major version.
    pub v1: u8,
    /// Minor version.
    pub v2: u8,
    /// Patch version.
    pub v3: u8,
}

impl OrderCode {
    /// Decodes list 0x0011.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidDataSizeRecvd`] if the list is too short.
    pub fn from_szl(szl: &Szl) -> Result<Self> {
        let data = &szl.data;
        let code = get_chars_at(data, 2, 20).map_err(short)?;
        let n = data.len();
        if n < 3 {
            return Err(S7Error::InvalidDataSizeRecvd);
        }
        Ok(Self {
            code,
            v1: data[n - 3],
            v2: data[n - 2],
            v3: data[n - 1],
        })
    }

    /// Returns the firmware version as `V1.V2.V3`.
    pub fn version(&self) -> String {
        format!("{}.{}.{}", self.v1, self.v2, self.v3)
    }
}

/// Identification strings of the CPU module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuInfo {
    /// Module type name.
    pub module_type_name: String,
    /// Serial number.
    pub serial_number: String,
    /// Automation system name.
    pub as_name: String,
    /// Copyright notice.
    pub copyright: String,
    /// Module name.
    pub module_name: String,
}

impl CpuInfo {
    /// Decodes list 0x001C.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidDataSizeRecvd`] if the list is too short.
    pub fn from_szl(szl: &Szl) -> Result<Self> {
        let text = |pos, len| get_chars_at(&szl.data, pos, len).map_err(short);
        Ok(Self {
            module_type_name: text(172, 32)?,
            serial_number: text(138, 24)?,
            as_name: text(2, 24)?,
            copyright: text(104, 26)?,
            module_name: text(36, 24)?,
        })
    }
}

/// Communication limits of the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpInfo {
    /// Maximum PDU length.
    pub max_pdu_length: i16,
    /// Maximum number of connections.
    pub max_connections: i16,
    /// MPI rate.
    pub max_mpi_rate: i32,
    /// Bus rate.
    pub max_bus_rate: i32,
}

impl CpInfo {
    /// Decodes list 0x0131 index 1.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidDataSizeRecvd`] if the list is too short.
    pub fn from_szl(szl: &Szl) -> Result<Self> {
        let data = &szl.data;
        Ok(Self {
            max_pdu_length: get_int_at(data, 2).map_err(short)?,
            max_connections: get_int_at(data, 4).map_err(short)?,
            max_mpi_rate: get_dint_at(data, 6).map_err(short)?,
            max_bus_rate: get_dint_at(data, 10).map_err(short)?,
        })
    }
}

/// Protection levels and mode selector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Protection {
    /// Protection level set with the mode selector.
    pub sch_schal: u16,
    /// Password level set in the parameters.
    pub sch_par: u16,
    /// Valid protection level of the CPU.
    pub sch_rel: u16,
    /// Mode selector position.
    pub bart_sch: u16,
    /// Startup switch setting.
    pub anl_sch: u16,
}

impl Protection {
    /// Decodes list 0x0232 index 4.
    ///
    /// # Errors
    ///
    /// Returns [`S7Error::InvalidDataSizeRecvd`] if the list is too short.
    pub fn from_szl(szl: &Szl) -> Result<Self> {
        let word = |pos| get_word_at(&szl.data, pos).map_err(short);
        Ok(Self {
            sch_schal: word(2)?,
            sch_par: word(4)?,
            sch_rel: word(6)?,
            bart_sch: word(8)?,
            anl_sch: word(10)?,
        })
    }
}
