//! Batched access to up to 20 variables in one request.
//!
//! A [`MultiVar`] collects [`S7Tag`]s, each paired with the caller's buffer,
//! and sends them as a single multi-read or multi-write telegram. Every item
//! gets its own outcome; a failing item does not fail its neighbours.
//!
//! # Example
//!
//! ```no_run
//! use s7_client::{Area, Client, MultiVar, S7Tag, WordLength};
//!
//! let mut client = Client::connect_to("192.168.0.10", 0, 2)?;
//! let mut speed = [0u8; 4];
//! let mut flags = [0u8; 2];
//!
//! let mut batch = MultiVar::new(&mut client);
//! batch.add(S7Tag::new(Area::DB, 1, 0, 1, WordLength::Real), &mut speed)?;
//! batch.add(S7Tag::new(Area::MK, 0, 10, 2, WordLength::Byte), &mut flags)?;
//! for (n, result) in batch.read()?.iter().enumerate() {
//!     if let Err(e) = result {
//!         eprintln!("item {n}: {e}");
//!     }
//! }
//! # Ok::<(), s7_client::S7Error>(())
//! ```

use crate::client::Client;
use crate::command::{VarSpec, MAX_VARS};
use crate::error::{Result, S7Error};
use crate::memory::{Area, WordLength};
use crate::transport::{TcpTransport, Transport};

/// Largest 3-byte area address.
const MAX_ADDRESS: u32 = 0x00FF_FFFF;

/// Address of a variable in PLC memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct S7Tag {
    /// Memory area.
    pub area: Area,
    /// Data block number, only used for [`Area::DB`].
    pub db_number: u16,
    /// Start byte, bit address (`byte * 8 + bit`) for bits, element for
    /// counters and timers.
    pub start: u32,
    /// Number of elements.
    pub amount: usize,
    /// Element type.
    pub word_length: WordLength,
}

impl S7Tag {
    /// Creates a tag.
    pub fn new(area: Area, db_number: u16, start: u32, amount: usize, word_length: WordLength) -> Self {
        Self {
            area,
            db_number,
            start,
            amount,
            word_length,
        }
    }

    /// Returns the number of bytes the tag transfers.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_client::{Area, S7Tag, WordLength};
    ///
    /// assert_eq!(S7Tag::new(Area::DB, 1, 0, 3, WordLength::Real).byte_size(), 12);
    /// assert_eq!(S7Tag::new(Area::MK, 0, 0, 8, WordLength::Bit).byte_size(), 1);
    /// assert_eq!(S7Tag::new(Area::CT, 0, 0, 4, WordLength::Byte).byte_size(), 8);
    /// ```
    pub fn byte_size(&self) -> usize {
        match self.area.forced_word_length(self.word_length) {
            WordLength::Bit => 1,
            wl => self.amount.saturating_mul(wl.size()),
        }
    }

    /// Builds the wire specification of the tag.
    fn to_spec(self) -> Result<VarSpec> {
        let word_length = self.area.forced_word_length(self.word_length);
        let (word_length, start, amount) = match word_length {
            WordLength::Bit => (WordLength::Bit, self.start, 1),
            WordLength::Counter | WordLength::Timer => (word_length, self.start, self.amount),
            _ => {
                let start = self.start.checked_mul(8).ok_or(S7Error::InvalidParams)?;
                let amount = self
                    .amount
                    .checked_mul(word_length.size())
                    .ok_or(S7Error::InvalidParams)?;
                (WordLength::Byte, start, amount)
            }
        };
        if start > MAX_ADDRESS {
            return Err(S7Error::InvalidParams);
        }
        Ok(VarSpec {
            area: self.area,
            word_length,
            db_number: self.db_number,
            start,
            amount: u16::try_from(amount).map_err(|_| S7Error::InvalidParams)?,
        })
    }
}

/// A tag bound to the caller's buffer, with its outcome.
///
/// Items start out as [`S7Error::ItemNotAvailable`] until a request reports
/// on them.
#[derive(Debug)]
pub struct DataItem<'a> {
    spec: VarSpec,
    buffer: &'a mut [u8],
    result: Result<()>,
}

impl<'a> DataItem<'a> {
    /// Binds `tag` to `buffer`.
    ///
    /// # Errors
    ///
    /// - [`S7Error::BufferTooSmall`] if `buffer` is shorter than the tag
    /// - [`S7Error::InvalidParams`] if the address or size cannot be encoded
    pub fn new(tag: S7Tag, buffer: &'a mut [u8]) -> Result<Self> {
        let spec = tag.to_spec()?;
        let buffer = buffer
            .get_mut(..spec.byte_size())
            .ok_or(S7Error::BufferTooSmall)?;
        Ok(Self {
            spec,
            buffer,
            result: Err(S7Error::ItemNotAvailable),
        })
    }

    /// Returns the wire specification.
    pub fn spec(&self) -> &VarSpec {
        &self.spec
    }

    /// Returns the outcome of the last request.
    pub fn result(&self) -> Result<()> {
        self.result
    }

    /// Returns the bound buffer.
    pub fn data(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub(crate) fn set_result(&mut self, result: Result<()>) {
        self.result = result;
    }

    /// Copies received bytes into the buffer and marks the item as read.
    pub(crate) fn fill(&mut self, data: &[u8]) {
        let n = data.len().min(self.buffer.len());
        self.buffer[..n].copy_from_slice(&data[..n]);
        self.result = Ok(());
    }
}

/// Builder for one multi-variable request.
///
/// Holds the client and every registered buffer until
/// [`read`](Self::read) or [`write`](Self::write) consumes it.
pub struct MultiVar<'a, T: Transport = TcpTransport> {
    client: &'a mut Client<T>,
    items: Vec<DataItem<'a>>,
}

impl<'a, T: Transport> MultiVar<'a, T> {
    /// Starts an empty batch on `client`.
    pub fn new(client: &'a mut Client<T>) -> Self {
        Self {
            client,
            items: Vec::with_capacity(MAX_VARS),
        }
    }

    /// Registers a variable.
    ///
    /// For reads `buffer` receives the data; for writes it supplies it.
    ///
    /// # Errors
    ///
    /// - [`S7Error::TooManyItems`] once 20 variables are registered
    /// - the errors of [`DataItem::new`]
    pub fn add(&mut self, tag: S7Tag, buffer: &'a mut [u8]) -> Result<()> {
        if self.items.len() >= MAX_VARS {
            return Err(S7Error::TooManyItems);
        }
        self.items.push(DataItem::new(tag, buffer)?);
        Ok(())
    }

    /// Returns the number of registered variables.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every registered variable.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Reads every registered variable into its buffer.
    ///
    /// # Returns
    ///
    /// One outcome per variable, in registration order.
    ///
    /// # Errors
    ///
    /// Fails as a whole when the request cannot be sent or the CPU rejects
    /// it, and with [`S7Error::FunctionRefused`] for an empty batch.
    pub fn read(mut self) -> Result<Vec<Result<()>>> {
        self.client.read_multi_vars(&mut self.items)?;
        Ok(self.results())
    }

    /// Writes every registered buffer to its variable.
    ///
    /// See [`read`](Self::read) for the returned outcomes.
    pub fn write(mut self) -> Result<Vec<Result<()>>> {
        self.client.write_multi_vars(&mut self.items)?;
        Ok(self.results())
    }

    fn results(&self) -> Vec<Result<()>> {
        self.items.iter().map(DataItem::result).collect()
    }
}
