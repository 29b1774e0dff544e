//! In-memory S7 CPU for unit tests.
//!
//! [`MockPlc`] implements [`Transport`] and answers every request the client
//! sends from a small memory model, so the protocol engine can be exercised
//! without a socket.

use std::collections::{HashMap, VecDeque};

use chrono::{NaiveDate, NaiveDateTime};

use crate::command::{encode_password, FN_READ_VAR, FN_WRITE_VAR, VAR_SPEC_SIZE};
use crate::error::{Result, S7Error};
use crate::header::{COTP_CONNECTION_CONFIRM, COTP_CONNECTION_REQUEST, S7_PROTOCOL_ID};
use crate::memory::Area;
use crate::transport::{CloseObserver, Timeouts, Transport};
use crate::utils::{get_date_time_at, set_date_time_at};

/// Empty keep-alive telegram.
const KEEP_ALIVE: [u8; 7] = [0x03, 0x00, 0x00, 0x07, 0x02, 0xF0, 0x80];

/// Status list holding the run/stop state.
const SZL_CPU_STATUS: u16 = 0x0424;

/// Misbehaviour injected into the simulated CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// TCP connect fails.
    RefuseConnect,
    /// Connection request answered with a wrong PDU type.
    RejectIso,
    /// PDU negotiation answered with an error class.
    RejectNegotiation,
    /// Read/write jobs answered with this header error.
    GlobalStatus(u16),
    /// Every reply is preceded by an empty telegram.
    KeepAlive,
    /// Replies declare a length far above the PDU.
    OversizedReply,
    /// Requests are swallowed.
    Silent,
    /// Sending fails as on a reset socket.
    BrokenPipe,
}

struct SzlList {
    declared: u16,
    record_count: u16,
    data: Vec<u8>,
}

/// Simulated S7 CPU.
pub(crate) struct MockPlc {
    memory: HashMap<(Area, u16), Vec<u8>>,
    lists: HashMap<(u16, u16), SzlList>,
    szl_chunk: usize,
    szl_cursor: Option<(u16, u16, usize, usize)>,
    max_pdu: u16,
    running: bool,
    clock: NaiveDateTime,
    password: Option<[u8; 8]>,
    fault: Option<Fault>,
    connected: bool,
    connects: usize,
    requests: Vec<Vec<u8>>,
    pending: VecDeque<u8>,
    timeouts: Timeouts,
    on_close: Option<CloseObserver>,
}

impl MockPlc {
    pub(crate) fn new() -> Self {
        let clock = NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            memory: HashMap::new(),
            lists: HashMap::new(),
            szl_chunk: 150,
            szl_cursor: None,
            max_pdu: 480,
            running: true,
            clock,
            password: None,
            fault: None,
            connected: false,
            connects: 0,
            requests: Vec::new(),
            pending: VecDeque::new(),
            timeouts: Timeouts::default(),
            on_close: None,
        }
    }

    /// Largest PDU the CPU grants.
    pub(crate) fn with_pdu(mut self, pdu: u16) -> Self {
        self.max_pdu = pdu;
        self
    }

    /// Adds a memory area. Counters and timers use 2 bytes per element.
    pub(crate) fn with_area(mut self, area: Area, db_number: u16, data: Vec<u8>) -> Self {
        let db = if area == Area::DB { db_number } else { 0 };
        self.memory.insert((area, db), data);
        self
    }

    /// Adds a status list declaring its full data length.
    pub(crate) fn with_szl(mut self, id: u16, index: u16, record_count: u16, data: Vec<u8>) -> Self {
        let declared = data.len() as u16;
        self.lists.insert((id, index), SzlList { declared, record_count, data });
        self
    }

    /// Overrides the length a list declares in its first segment.
    pub(crate) fn with_szl_declared(mut self, id: u16, index: u16, declared: u16) -> Self {
        if let Some(list) = self.lists.get_mut(&(id, index)) {
            list.declared = declared;
        }
        self
    }

    /// Caps the list bytes carried by one reply.
    pub(crate) fn with_szl_chunk(mut self, chunk: usize) -> Self {
        self.szl_chunk = chunk;
        self
    }

    pub(crate) fn with_password(mut self, password: &str) -> Self {
        self.password = Some(encode_password(password));
        self
    }

    pub(crate) fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub(crate) fn set_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    pub(crate) fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Returns the memory of an area.
    pub(crate) fn area(&self, area: Area, db_number: u16) -> &[u8] {
        let db = if area == Area::DB { db_number } else { 0 };
        self.memory.get(&(area, db)).map_or(&[], Vec::as_slice)
    }

    /// Every telegram received, handshake included.
    pub(crate) fn requests(&self) -> &[Vec<u8>] {
        &self.requests
    }

    /// Number of successful connects.
    pub(crate) fn connects(&self) -> usize {
        self.connects
    }

    /// Sequence number sent with list segment `segment`.
    pub(crate) fn szl_sequence(segment: usize) -> u8 {
        0x40u8.wrapping_add(segment as u8)
    }

    fn respond(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        if self.fault == Some(Fault::Silent) {
            return None;
        }
        if self.fault == Some(Fault::OversizedReply) {
            return Some(vec![0x03, 0x00, 0x07, 0xD0]);
        }
        let reply = if request.get(5) == Some(&COTP_CONNECTION_REQUEST) {
            self.connection_confirm()
        } else {
            match (request.get(7), request.get(8)) {
                (Some(&S7_PROTOCOL_ID), Some(&0x01)) => self.job(request),
                (Some(&S7_PROTOCOL_ID), Some(&0x07)) => self.user_data(request),
                _ => None,
            }
            .unwrap_or_else(|| echo(request))
        };
        let reply = finish(reply);
        if self.fault == Some(Fault::KeepAlive) {
            let mut framed = KEEP_ALIVE.to_vec();
            framed.extend_from_slice(&reply);
            return Some(framed);
        }
        Some(reply)
    }

    fn connection_confirm(&self) -> Vec<u8> {
        let mut reply = vec![0u8; 22];
        reply[4] = 0x11;
        reply[5] = if self.fault == Some(Fault::RejectIso) {
            0x00
        } else {
            COTP_CONNECTION_CONFIRM
        };
        reply
    }

    fn job(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        let function = *request.get(17)?;
        match function {
            0xF0 => {
                let requested = word(request, 23);
                let mut reply = ack_header(function, 0);
                reply.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
                reply.extend_from_slice(&requested.min(self.max_pdu).to_be_bytes());
                if self.fault == Some(Fault::RejectNegotiation) {
                    reply[17] = 0x81;
                    reply[18] = 0x04;
                }
                Some(reply)
            }
            FN_READ_VAR | FN_WRITE_VAR => {
                if let Some(Fault::GlobalStatus(status)) = self.fault {
                    let mut reply = ack_header(function, 0);
                    reply[17..19].copy_from_slice(&status.to_be_bytes());
                    reply.push(0);
                    return Some(reply);
                }
                if function == FN_READ_VAR {
                    Some(self.read_items(request))
                } else {
                    Some(self.write_items(request))
                }
            }
            0x28 | 0x29 => {
                let start = function == 0x28;
                let mut reply = ack_header(function, 0);
                if start && self.running {
                    reply[20] = 0x02;
                } else if !start && !self.running {
                    reply[20] = 0x07;
                }
                self.running = start;
                Some(reply)
            }
            _ => None,
        }
    }

    /// Resolves an item to its memory key, byte offset and length.
    fn locate(spec: &[u8]) -> Option<((Area, u16), usize, usize, u8)> {
        let ts = spec[3];
        let amount = usize::from(word(spec, 4));
        let area = Area::try_from(spec[8]).ok()?;
        let db = if area == Area::DB { word(spec, 6) } else { 0 };
        let address = (usize::from(spec[9]) << 16) | (usize::from(spec[10]) << 8) | usize::from(spec[11]);
        Some(match ts {
            0x01 => ((area, db), address >> 3, 1, 0x03),
            0x1C | 0x1D => ((area, db), address * 2, amount * 2, 0x09),
            _ => ((area, db), address >> 3, amount, 0x04),
        })
    }

    fn read_items(&self, request: &[u8]) -> Vec<u8> {
        let count = usize::from(request[18]);
        let mut reply = ack_header(FN_READ_VAR, count as u8);
        for i in 0..count {
            let spec = &request[19 + i * VAR_SPEC_SIZE..19 + (i + 1) * VAR_SPEC_SIZE];
            let bit = (usize::from(spec[11])) & 0x07;
            let found = Self::locate(spec).map(|(key, offset, len, ts)| {
                let memory = self.memory.get(&key);
                (memory, offset, len, ts)
            });
            match found {
                Some((Some(memory), offset, len, ts)) if offset + len <= memory.len() => {
                    let data: Vec<u8> = if ts == 0x03 {
                        vec![(memory[offset] >> bit) & 0x01]
                    } else {
                        memory[offset..offset + len].to_vec()
                    };
                    let declared = if ts == 0x04 { len * 8 } else { len };
                    reply.extend_from_slice(&[0xFF, ts]);
                    reply.extend_from_slice(&(declared as u16).to_be_bytes());
                    reply.extend_from_slice(&data);
                    if len % 2 != 0 && i + 1 < count {
                        reply.push(0);
                    }
                }
                Some((Some(_), ..)) => reply.extend_from_slice(&[0x05, 0, 0, 0]),
                _ => reply.extend_from_slice(&[0x0A, 0, 0, 0]),
            }
        }
        reply
    }

    fn write_items(&mut self, request: &[u8]) -> Vec<u8> {
        let count = usize::from(request[18]);
        let mut reply = ack_header(FN_WRITE_VAR, count as u8);
        let mut cursor = 19 + count * VAR_SPEC_SIZE;
        for i in 0..count {
            let spec = &request[19 + i * VAR_SPEC_SIZE..19 + (i + 1) * VAR_SPEC_SIZE];
            let bit = (usize::from(spec[11])) & 0x07;
            let ts = request[cursor + 1];
            let declared = usize::from(word(request, cursor + 2));
            let len = if ts == 0x04 { declared / 8 } else { declared };
            let data = &request[cursor + 4..cursor + 4 + len];
            cursor += 4 + len + (len & 1);

            let status = match Self::locate(spec) {
                Some((key, offset, size, kind)) => match self.memory.get_mut(&key) {
                    Some(memory) if offset + size <= memory.len() => {
                        if kind == 0x03 {
                            if data[0] & 0x01 != 0 {
                                memory[offset] |= 1 << bit;
                            } else {
                                memory[offset] &= !(1 << bit);
                            }
                        } else {
                            memory[offset..offset + size].copy_from_slice(&data[..size]);
                        }
                        0xFF
                    }
                    Some(_) => 0x05,
                    None => 0x0A,
                },
                None => 0x0A,
            };
            reply.push(status);
        }
        reply
    }

    fn user_data(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        match (*request.get(22)?, *request.get(23)?) {
            (0x44, 0x01) if request[20] == 0x04 => Some(self.szl_first(word(request, 29), word(request, 31))),
            (0x44, 0x01) => Some(self.szl_next(request[24])),
            (0x47, 0x01) => {
                let mut body = vec![0x00, 0x0A, 0x00, 0x19];
                let mut stamp = [0u8; 8];
                set_date_time_at(&mut stamp, 0, self.clock).ok()?;
                body.extend_from_slice(&stamp);
                Some(user_data_reply(0, 0xFF, &body))
            }
            (0x47, 0x02) => match get_date_time_at(request, 31) {
                Ok(clock) => {
                    self.clock = clock;
                    Some(user_data_reply(0, 0x0A, &[0x00]))
                }
                Err(_) => Some(user_data_reply(0xDC01, 0x0A, &[0x00])),
            },
            (0x45, 0x01) => {
                let accepted = match self.password {
                    Some(expected) => request.get(29..37) == Some(&expected[..]),
                    None => true,
                };
                let error = if accepted { 0 } else { 0xD602 };
                Some(user_data_reply(error, 0x0A, &[0x00, 0x00, 0x00]))
            }
            (0x45, 0x02) => Some(user_data_reply(0, 0x0A, &[0x00])),
            (0x43, 0x03) => Some(self.block_info(request)),
            _ => None,
        }
    }

    fn szl_first(&mut self, id: u16, index: u16) -> Vec<u8> {
        if id == SZL_CPU_STATUS {
            let mut record = vec![0u8; 28];
            record[3] = if self.running { 0x08 } else { 0x04 };
            let mut body = vec![0x00, 0x00];
            body.extend_from_slice(&id.to_be_bytes());
            body.extend_from_slice(&index.to_be_bytes());
            body.extend_from_slice(&28u16.to_be_bytes());
            body.extend_from_slice(&1u16.to_be_bytes());
            body.extend_from_slice(&record);
            let len = (record.len() + 8) as u16;
            body[..2].copy_from_slice(&len.to_be_bytes());
            return user_data_reply(0, 0xFF, &body);
        }
        self.szl_cursor = Some((id, index, 0, 0));
        self.szl_segment(true)
    }

    fn szl_next(&mut self, sequence_in: u8) -> Vec<u8> {
        let expected = self
            .szl_cursor
            .and_then(|(_, _, _, segment)| segment.checked_sub(1))
            .map(Self::szl_sequence);
        if expected == Some(sequence_in) {
            self.szl_segment(false)
        } else {
            user_data_reply(0xD0A1, 0x0A, &[0x00, 0x00, 0x00, 0x00])
        }
    }

    fn szl_segment(&mut self, first: bool) -> Vec<u8> {
        let Some((id, index, offset, segment)) = self.szl_cursor else {
            return user_data_reply(0xD401, 0x0A, &[0x00, 0x00, 0x00, 0x00]);
        };
        let Some(list) = self.lists.get(&(id, index)) else {
            self.szl_cursor = None;
            return user_data_reply(0xD401, 0x0A, &[0x00, 0x00, 0x00, 0x00]);
        };
        let end = (offset + self.szl_chunk).min(list.data.len());
        let chunk = &list.data[offset..end];
        let more = end < list.data.len();

        let mut body = Vec::new();
        if first {
            body.extend_from_slice(&((chunk.len() + 8) as u16).to_be_bytes());
            body.extend_from_slice(&id.to_be_bytes());
            body.extend_from_slice(&index.to_be_bytes());
            body.extend_from_slice(&list.declared.to_be_bytes());
            body.extend_from_slice(&list.record_count.to_be_bytes());
        } else {
            body.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
            body.extend_from_slice(&id.to_be_bytes());
            body.extend_from_slice(&index.to_be_bytes());
        }
        body.extend_from_slice(chunk);

        let mut reply = user_data_reply(0, 0xFF, &body);
        reply[24] = Self::szl_sequence(segment);
        reply[26] = u8::from(more);
        self.szl_cursor = more.then_some((id, index, end, segment + 1));
        reply
    }

    fn block_info(&self, request: &[u8]) -> Vec<u8> {
        let number = std::str::from_utf8(&request[31..36])
            .ok()
            .and_then(|digits| digits.parse::<u16>().ok());
        let size = match (request[30], number) {
            (0x41, Some(n)) => self.memory.get(&(Area::DB, n)).map(|m| (n, m.len())),
            _ => None,
        };
        let Some((number, size)) = size else {
            return user_data_reply(0xD209, 0x0A, &[0x00, 0x00, 0x00]);
        };
        let mut reply = user_data_reply(0, 0xFF, &[0u8; 103 - 30]);
        reply[42] = 0x01;
        reply[43] = 0x05;
        reply[44] = 0x41;
        reply[45..47].copy_from_slice(&number.to_be_bytes());
        reply[47..51].copy_from_slice(&((size + 92) as i32).to_be_bytes());
        reply[73..75].copy_from_slice(&(size as u16).to_be_bytes());
        reply[75..79].copy_from_slice(b"TEST");
        reply
    }
}

impl Transport for MockPlc {
    fn connect(&mut self, _host: &str, _port: u16) -> Result<()> {
        if self.fault == Some(Fault::RefuseConnect) {
            return Err(S7Error::ConnectionFailed);
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(S7Error::NotConnected);
        }
        if self.fault == Some(Fault::BrokenPipe) {
            self.close();
            return Err(S7Error::DataSend);
        }
        self.requests.push(data.to_vec());
        if let Some(reply) = self.respond(data) {
            self.pending.extend(reply);
        }
        Ok(())
    }

    fn recv_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        if self.pending.len() < buffer.len() {
            self.pending.clear();
            return Err(S7Error::DataReceive);
        }
        let n = buffer.len();
        for (slot, byte) in buffer.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.pending.clear();
        if self.connected {
            self.connected = false;
            if let Some(observer) = self.on_close.as_mut() {
                observer();
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    fn set_close_observer(&mut self, observer: Option<CloseObserver>) {
        self.on_close = observer;
    }
}

fn word(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

/// Ack-data header up to the item count at 20.
fn ack_header(function: u8, count: u8) -> Vec<u8> {
    let mut reply = vec![0u8; 21];
    reply[4..7].copy_from_slice(&[0x02, 0xF0, 0x80]);
    reply[7] = S7_PROTOCOL_ID;
    reply[8] = 0x03;
    reply[19] = function;
    reply[20] = count;
    reply
}

/// User data reply: error word at 27, return code at 29, `body` from 31 on.
fn user_data_reply(error: u16, rc: u8, body: &[u8]) -> Vec<u8> {
    let mut reply = vec![0u8; 29];
    reply[4..7].copy_from_slice(&[0x02, 0xF0, 0x80]);
    reply[7] = S7_PROTOCOL_ID;
    reply[8] = 0x07;
    reply[27..29].copy_from_slice(&error.to_be_bytes());
    reply.push(rc);
    reply.push(0x09);
    reply.extend_from_slice(body);
    reply
}

fn echo(request: &[u8]) -> Vec<u8> {
    let mut reply = request.to_vec();
    if reply.len() > 8 {
        reply[8] = 0x03;
    }
    reply
}

/// Stamps the TPKT header.
fn finish(mut reply: Vec<u8>) -> Vec<u8> {
    let len = reply.len() as u16;
    reply[0] = 0x03;
    reply[2..4].copy_from_slice(&len.to_be_bytes());
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_requires_connect() {
        let mut plc = MockPlc::new();
        assert_eq!(plc.send(&[0; 7]), Err(S7Error::NotConnected));
        plc.connect("plc", 102).unwrap();
        assert!(plc.is_connected());
        let mut buf = [0u8; 1];
        assert_eq!(plc.recv_exact(&mut buf), Err(S7Error::DataReceive));
    }

    #[test]
    fn test_mock_reply_read_in_parts() {
        let mut plc = MockPlc::new();
        plc.connect("plc", 102).unwrap();
        let mut request = vec![0u8; 22];
        request[5] = COTP_CONNECTION_REQUEST;
        plc.send(&request).unwrap();

        let mut head = [0u8; 4];
        plc.recv_exact(&mut head).unwrap();
        assert_eq!(head, [0x03, 0x00, 0x00, 22]);
        let mut rest = [0u8; 18];
        plc.recv_exact(&mut rest).unwrap();
        assert_eq!(rest[1], COTP_CONNECTION_CONFIRM);
        assert_eq!(plc.recv_exact(&mut head), Err(S7Error::DataReceive));
    }

    #[test]
    fn test_mock_close_notifies_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let closed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&closed);
        let mut plc = MockPlc::new();
        plc.set_close_observer(Some(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })));
        plc.connect("plc", 102).unwrap();
        plc.close();
        plc.close();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
