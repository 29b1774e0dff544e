//! Utility functions for S7 data conversion.
//!
//! S7 controllers store every multi-byte value big-endian. The helpers in this
//! module read and write typed values at a byte offset inside a raw buffer, as
//! returned by [`Client::read_area`](crate::Client::read_area) and friends.
//! Out-of-range offsets return [`S7Error::BufferTooSmall`] instead of panicking.
//!
//! | S7 type | Reader | Writer |
//! |---------|--------|--------|
//! | BOOL | [`get_bit_at`] | [`set_bit_at`] |
//! | WORD / INT | [`get_word_at`] / [`get_int_at`] | [`set_word_at`] / [`set_int_at`] |
//! | DWORD / DINT | [`get_dword_at`] / [`get_dint_at`] | [`set_dword_at`] / [`set_dint_at`] |
//! | REAL / LREAL | [`get_real_at`] / [`get_lreal_at`] | [`set_real_at`] / [`set_lreal_at`] |
//! | CHAR[n] | [`get_chars_at`] | [`set_chars_at`] |
//! | STRING | [`get_string_at`] | [`set_string_at`] |
//! | DATE_AND_TIME | [`get_date_time_at`] | [`set_date_time_at`] |
//!
//! # Example
//!
//! ```
//! use s7_client::utils::{get_bit_at, get_real_at, set_real_at, set_bit_at};
//!
//! let mut db = [0u8; 8];
//! set_real_at(&mut db, 0, 21.5)?;
//! set_bit_at(&mut db, 4, 3, true)?;
//!
//! assert_eq!(get_real_at(&db, 0)?, 21.5);
//! assert!(get_bit_at(&db, 4, 3)?);
//! assert_eq!(db[4], 0b0000_1000);
//! # Ok::<(), s7_client::S7Error>(())
//! ```

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::error::{Result, S7Error};

fn slice(buffer: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    let end = pos.checked_add(len).ok_or(S7Error::BufferTooSmall)?;
    buffer.get(pos..end).ok_or(S7Error::BufferTooSmall)
}

fn slice_mut(buffer: &mut [u8], pos: usize, len: usize) -> Result<&mut [u8]> {
    let end = pos.checked_add(len).ok_or(S7Error::BufferTooSmall)?;
    buffer.get_mut(pos..end).ok_or(S7Error::BufferTooSmall)
}

fn array<const N: usize>(buffer: &[u8], pos: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(slice(buffer, pos, N)?);
    Ok(out)
}

/// Gets bit `bit` (0-7) of the byte at `pos`.
///
/// # Example
///
/// ```
/// use s7_client::utils::get_bit_at;
///
/// let data = [0b0000_0101];
/// assert!(get_bit_at(&data, 0, 0)?);
/// assert!(!get_bit_at(&data, 0, 1)?);
/// # Ok::<(), s7_client::S7Error>(())
/// ```
pub fn get_bit_at(buffer: &[u8], pos: usize, bit: u8) -> Result<bool> {
    let byte = slice(buffer, pos, 1)?[0];
    Ok(byte & (1 << (bit & 0x07)) != 0)
}

/// Sets or clears bit `bit` (0-7) of the byte at `pos`.
pub fn set_bit_at(buffer: &mut [u8], pos: usize, bit: u8, value: bool) -> Result<()> {
    let byte = &mut slice_mut(buffer, pos, 1)?[0];
    let mask = 1 << (bit & 0x07);
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
    Ok(())
}

/// Reads a WORD (u16).
pub fn get_word_at(buffer: &[u8], pos: usize) -> Result<u16> {
    Ok(u16::from_be_bytes(array(buffer, pos)?))
}

/// Writes a WORD (u16).
pub fn set_word_at(buffer: &mut [u8], pos: usize, value: u16) -> Result<()> {
    slice_mut(buffer, pos, 2)?.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Reads an INT (i16).
pub fn get_int_at(buffer: &[u8], pos: usize) -> Result<i16> {
    Ok(i16::from_be_bytes(array(buffer, pos)?))
}

/// Writes an INT (i16).
pub fn set_int_at(buffer: &mut [u8], pos: usize, value: i16) -> Result<()> {
    slice_mut(buffer, pos, 2)?.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Reads a DWORD (u32).
pub fn get_dword_at(buffer: &[u8], pos: usize) -> Result<u32> {
    Ok(u32::from_be_bytes(array(buffer, pos)?))
}

/// Writes a DWORD (u32).
pub fn set_dword_at(buffer: &mut [u8], pos: usize, value: u32) -> Result<()> {
    slice_mut(buffer, pos, 4)?.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Reads a DINT (i32).
pub fn get_dint_at(buffer: &[u8], pos: usize) -> Result<i32> {
    Ok(i32::from_be_bytes(array(buffer, pos)?))
}

/// Writes a DINT (i32).
pub fn set_dint_at(buffer: &mut [u8], pos: usize, value: i32) -> Result<()> {
    slice_mut(buffer, pos, 4)?.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Reads a REAL (f32).
pub fn get_real_at(buffer: &[u8], pos: usize) -> Result<f32> {
    Ok(f32::from_be_bytes(array(buffer, pos)?))
}

/// Writes a REAL (f32).
pub fn set_real_at(buffer: &mut [u8], pos: usize, value: f32) -> Result<()> {
    slice_mut(buffer, pos, 4)?.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Reads an LREAL (f64).
pub fn get_lreal_at(buffer: &[u8], pos: usize) -> Result<f64> {
    Ok(f64::from_be_bytes(array(buffer, pos)?))
}

/// Writes an LREAL (f64).
pub fn set_lreal_at(buffer: &mut [u8], pos: usize, value: f64) -> Result<()> {
    slice_mut(buffer, pos, 8)?.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Reads `len` characters as text. Invalid UTF-8 is replaced.
pub fn get_chars_at(buffer: &[u8], pos: usize, len: usize) -> Result<String> {
    Ok(String::from_utf8_lossy(slice(buffer, pos, len)?).into_owned())
}

/// Writes the bytes of `value`, truncated to the end of `buffer`.
///
/// Returns the number of bytes written.
pub fn set_chars_at(buffer: &mut [u8], pos: usize, value: &str) -> Result<usize> {
    let room = buffer.len().checked_sub(pos).ok_or(S7Error::BufferTooSmall)?;
    let len = value.len().min(room);
    slice_mut(buffer, pos, len)?.copy_from_slice(&value.as_bytes()[..len]);
    Ok(len)
}

/// Reads an S7 STRING (`[max len, actual len, chars...]`).
///
/// # Example
///
/// ```
/// use s7_client::utils::get_string_at;
///
/// let data = [10, 2, b'o', b'k', 0, 0];
/// assert_eq!(get_string_at(&data, 0)?, "ok");
/// # Ok::<(), s7_client::S7Error>(())
/// ```
pub fn get_string_at(buffer: &[u8], pos: usize) -> Result<String> {
    let len = usize::from(slice(buffer, pos + 1, 1)?[0]);
    get_chars_at(buffer, pos + 2, len)
}

/// Writes an S7 STRING with capacity `max_len`, truncating `value` to fit.
pub fn set_string_at(buffer: &mut [u8], pos: usize, max_len: u8, value: &str) -> Result<()> {
    let len = value.len().min(usize::from(max_len));
    let target = slice_mut(buffer, pos, 2 + len)?;
    target[0] = max_len;
    // len <= max_len
    target[1] = len as u8;
    target[2..].copy_from_slice(&value.as_bytes()[..len]);
    Ok(())
}

/// Converts a BCD byte to its value.
#[inline]
pub fn bcd_to_byte(b: u8) -> u8 {
    (b >> 4) * 10 + (b & 0x0F)
}

/// Converts a value (0-99) to BCD.
#[inline]
pub fn byte_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Reads an 8-byte DATE_AND_TIME value.
///
/// Two-digit years below 90 belong to the 21st century.
///
/// # Errors
///
/// Returns [`S7Error::InvalidValue`] if the bytes do not form a valid date.
pub fn get_date_time_at(buffer: &[u8], pos: usize) -> Result<NaiveDateTime> {
    let b: [u8; 8] = array(buffer, pos)?;
    let year = i32::from(bcd_to_byte(b[0]));
    let year = if year < 90 { year + 2000 } else { year + 1900 };
    let millis = u32::from(bcd_to_byte(b[6])) * 10 + u32::from(bcd_to_byte(b[7])) / 10;
    NaiveDate::from_ymd_opt(year, bcd_to_byte(b[1]).into(), bcd_to_byte(b[2]).into())
        .and_then(|date| {
            date.and_hms_milli_opt(
                bcd_to_byte(b[3]).into(),
                bcd_to_byte(b[4]).into(),
                bcd_to_byte(b[5]).into(),
                millis,
            )
        })
        .ok_or(S7Error::InvalidValue)
}

/// Writes an 8-byte DATE_AND_TIME value.
///
/// # Errors
///
/// Returns [`S7Error::InvalidValue`] for years outside 1990..=2089, which the
/// format cannot represent.
pub fn set_date_time_at(buffer: &mut [u8], pos: usize, value: NaiveDateTime) -> Result<()> {
    let year = value.year();
    if !(1990..=2089).contains(&year) {
        return Err(S7Error::InvalidValue);
    }
    let millis = (value.nanosecond() / 1_000_000).min(999);
    let day_of_week = value.weekday().number_from_sunday();
    let target = slice_mut(buffer, pos, 8)?;
    // every field below is < 100
    target[0] = byte_to_bcd((year % 100) as u8);
    target[1] = byte_to_bcd(value.month() as u8);
    target[2] = byte_to_bcd(value.day() as u8);
    target[3] = byte_to_bcd(value.hour() as u8);
    target[4] = byte_to_bcd(value.minute() as u8);
    target[5] = byte_to_bcd(value.second().min(59) as u8);
    target[6] = byte_to_bcd((millis / 10) as u8);
    target[7] = byte_to_bcd(((millis % 10) * 10 + day_of_week) as u8);
    Ok(())
}

/// Converts a block timestamp (days since 1984-01-01) to a date.
pub fn siemens_date(days: u16) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1984, 1, 1)?.checked_add_days(Days::new(days.into()))
}

/// Formats bytes as space separated hex, for logging.
///
/// # Example
///
/// ```
/// use s7_client::utils::format_hex;
///
/// assert_eq!(format_hex(&[0x03, 0x00, 0x16]), "03 00 16");
/// ```
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// IEC timer instance data (TON / TOF / TP), 12 bytes.
///
/// | Bytes | Field |
/// |-------|-------|
/// | 0..4 | PT, preset time in ms |
/// | 4..8 | ET, elapsed time in ms |
/// | 8 | bit 0 = IN, bit 1 = Q |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IecTimer {
    /// Preset time.
    pub pt: TimeDelta,
    /// Elapsed time.
    pub et: TimeDelta,
    /// Input.
    pub input: bool,
    /// Output.
    pub q: bool,
}

impl IecTimer {
    /// Size of the instance data in bytes.
    pub const SIZE: usize = 12;

    /// Decodes the timer stored at `pos`.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::utils::IecTimer;
    ///
    /// let raw = [0, 0, 0x03, 0xE8, 0, 0, 0x01, 0xF4, 0x03, 0, 0, 0];
    /// let timer = IecTimer::from_bytes(&raw, 0)?;
    /// assert_eq!(timer.pt.num_milliseconds(), 1000);
    /// assert_eq!(timer.et.num_milliseconds(), 500);
    /// assert!(timer.input && timer.q);
    /// # Ok::<(), s7_client::S7Error>(())
    /// ```
    pub fn from_bytes(buffer: &[u8], pos: usize) -> Result<Self> {
        let raw = slice(buffer, pos, Self::SIZE)?;
        let pt = i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let et = i32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        Ok(Self {
            pt: TimeDelta::milliseconds(pt.into()),
            et: TimeDelta::milliseconds(et.into()),
            input: raw[8] & 0x01 != 0,
            q: raw[8] & 0x02 != 0,
        })
    }
}
