//! Owned telegram buffer with offset-checked big-endian accessors.
//!
//! S7 telegrams are patched and parsed at fixed byte offsets. [`Telegram`]
//! wraps a `Vec<u8>` so every access is bounds checked: reading or writing
//! outside the buffer yields [`S7Error::InvalidPdu`] instead of panicking.
//!
//! # Example
//!
//! ```
//! use s7_client::Telegram;
//!
//! let mut t = Telegram::zeroed(8);
//! t.set_word(2, 0x1234)?;
//! t.set_address(5, 0x01_02_03)?;
//! assert_eq!(t.as_bytes(), &[0, 0, 0x12, 0x34, 0, 0x01, 0x02, 0x03]);
//! assert_eq!(t.word_at(2)?, 0x1234);
//! assert!(t.word_at(7).is_err());
//! # Ok::<(), s7_client::S7Error>(())
//! ```

use crate::error::{Result, S7Error};

/// A mutable telegram buffer.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Telegram {
    bytes: Vec<u8>,
}

impl Telegram {
    /// Creates a telegram from a template.
    pub fn from_template(template: &[u8]) -> Self {
        Self {
            bytes: template.to_vec(),
        }
    }

    /// Creates a zero-filled telegram of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    /// Returns the telegram length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the telegram holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the telegram and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Resizes the telegram, zero-filling any new bytes.
    pub fn resize(&mut self, len: usize) {
        self.bytes.resize(len, 0);
    }

    /// Appends raw bytes.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Reads the byte at `offset`.
    pub fn byte_at(&self, offset: usize) -> Result<u8> {
        self.bytes.get(offset).copied().ok_or(S7Error::InvalidPdu)
    }

    /// Reads the big-endian word at `offset`.
    pub fn word_at(&self, offset: usize) -> Result<u16> {
        let b = self.slice(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Reads the big-endian signed double word at `offset`.
    pub fn dint_at(&self, offset: usize) -> Result<i32> {
        let b = self.slice(offset, 4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Returns `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset.checked_add(len).ok_or(S7Error::InvalidPdu)?;
        self.bytes.get(offset..end).ok_or(S7Error::InvalidPdu)
    }

    /// Writes the byte at `offset`.
    pub fn set_byte(&mut self, offset: usize, value: u8) -> Result<()> {
        let slot = self.bytes.get_mut(offset).ok_or(S7Error::InvalidPdu)?;
        *slot = value;
        Ok(())
    }

    /// Writes a big-endian word at `offset`.
    pub fn set_word(&mut self, offset: usize, value: u16) -> Result<()> {
        self.write_slice(offset, &value.to_be_bytes())
    }

    /// Writes the 3-byte big-endian area address at `offset`.
    ///
    /// Only the low 24 bits of `address` are kept.
    pub fn set_address(&mut self, offset: usize, address: u32) -> Result<()> {
        let [_, hi, mid, lo] = address.to_be_bytes();
        self.write_slice(offset, &[hi, mid, lo])
    }

    /// Copies `data` into the telegram at `offset`.
    pub fn write_slice(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len()).ok_or(S7Error::InvalidPdu)?;
        let target = self.bytes.get_mut(offset..end).ok_or(S7Error::InvalidPdu)?;
        target.copy_from_slice(data);
        Ok(())
    }
}

impl AsRef<[u8]> for Telegram {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Telegram {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl std::fmt::Debug for Telegram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Telegram[{}](", self.bytes.len())?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02X}")?;
        }
        write!(f, ")")
    }
}
