/*
 * input_stream.rs
 * Copyright (C) 2026 The Spindrift authors
 *
 * This file is part of Spindrift, a SPDY/3.1 client protocol engine.
 *
 * Spindrift is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Spindrift is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Spindrift.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Pull adapter over the push callback. The callback half keeps every byte
//! the session delivers but acknowledges at most its free capacity in
//! `on_response_data`, throttling the peer through the consumed-length
//! contract; the buffer therefore never grows past the capacity plus one
//! flow-control window. The reader half exposes a non-blocking `read` that
//! returns the withheld credit to the session as it drains, plus an
//! out-of-band error slot.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::callback::{RequestCallback, RequestIdentifier};
use crate::error::SpdyError;
use crate::response::SpdyResponse;

struct Shared {
    buf: VecDeque<u8>,
    capacity: usize,
    /// Bytes buffered past capacity, not yet acknowledged to the session.
    withheld: usize,
    identifier: Option<RequestIdentifier>,
    response: Option<SpdyResponse>,
    closed: bool,
    error: Option<SpdyError>,
}

/// Reader half. `read` never blocks; an empty return with `is_finished()`
/// false simply means no data has arrived yet.
pub struct SpdyInputStream {
    shared: Arc<Mutex<Shared>>,
}

/// Callback half; pass to `fetch`.
pub struct InputStreamCallback {
    shared: Arc<Mutex<Shared>>,
}

impl SpdyInputStream {
    /// Create a reader/callback pair with the given buffer capacity.
    pub fn pair(capacity: usize) -> (SpdyInputStream, InputStreamCallback) {
        assert!(capacity > 0, "capacity must be non-zero");
        let shared = Arc::new(Mutex::new(Shared {
            buf: VecDeque::with_capacity(capacity),
            capacity,
            withheld: 0,
            identifier: None,
            response: None,
            closed: false,
            error: None,
        }));
        (
            SpdyInputStream {
                shared: shared.clone(),
            },
            InputStreamCallback { shared },
        )
    }

    /// Non-blocking read; returns the number of bytes copied into `out`.
    /// Draining withheld bytes reopens the stream's flow-control window.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let mut shared = self.shared.lock().unwrap();
        let mut n = 0;
        while n < out.len() {
            match shared.buf.pop_front() {
                Some(b) => {
                    out[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        let credit = n.min(shared.withheld);
        if credit > 0 {
            shared.withheld -= credit;
            if let Some(identifier) = &shared.identifier {
                identifier.replenish(credit);
            }
        }
        n
    }

    /// Response headers, once they have arrived.
    pub fn response(&self) -> Option<SpdyResponse> {
        self.shared.lock().unwrap().response.clone()
    }

    /// True once the stream closed and the buffer is drained.
    pub fn is_finished(&self) -> bool {
        let shared = self.shared.lock().unwrap();
        shared.closed && shared.buf.is_empty()
    }

    /// Out-of-band error slot; set when the request terminated abnormally.
    pub fn error(&self) -> Option<SpdyError> {
        self.shared.lock().unwrap().error.clone()
    }
}

impl RequestCallback for InputStreamCallback {
    fn on_connect(&mut self, identifier: &RequestIdentifier) {
        self.shared.lock().unwrap().identifier = Some(identifier.clone());
    }

    fn on_response_headers(&mut self, response: &SpdyResponse) {
        self.shared.lock().unwrap().response = Some(response.clone());
    }

    fn on_response_data(&mut self, data: &[u8]) -> usize {
        let mut shared = self.shared.lock().unwrap();
        // every byte is kept; only the acknowledged length throttles the peer
        let free = shared.capacity.saturating_sub(shared.buf.len());
        let accepted = free.min(data.len());
        shared.buf.extend(data);
        shared.withheld += data.len() - accepted;
        accepted
    }

    fn on_stream_close(&mut self) {
        self.shared.lock().unwrap().closed = true;
    }

    fn on_not_spdy_error(&mut self, _identifier: &RequestIdentifier) {
        let mut shared = self.shared.lock().unwrap();
        shared.error = Some(SpdyError::NotSpdy);
        shared.closed = true;
    }

    fn on_error(&mut self, error: &SpdyError) {
        let mut shared = self.shared.lock().unwrap();
        shared.error = Some(error.clone());
        shared.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_buffered_bytes_in_order() {
        let (reader, mut cb) = SpdyInputStream::pair(64);
        assert_eq!(cb.on_response_data(b"hello "), 6);
        assert_eq!(cb.on_response_data(b"world"), 5);
        let mut out = [0u8; 64];
        let n = reader.read(&mut out);
        assert_eq!(&out[..n], b"hello world");
        assert_eq!(reader.read(&mut out), 0);
    }

    #[test]
    fn full_buffer_withholds_credit_but_keeps_the_bytes() {
        let (reader, mut cb) = SpdyInputStream::pair(8);
        // consumed-length contract: 8 of 10 bytes acknowledged, none dropped
        assert_eq!(cb.on_response_data(b"0123456789"), 8);
        let mut out = [0u8; 4];
        assert_eq!(reader.read(&mut out), 4);
        assert_eq!(&out, b"0123");
        // 4 drained from a 10-byte backlog leaves 2 bytes of free capacity
        assert_eq!(cb.on_response_data(b"ab"), 2);
        let mut rest = [0u8; 16];
        let n = reader.read(&mut rest);
        assert_eq!(&rest[..n], b"456789ab");
    }

    #[test]
    fn draining_the_buffer_returns_withheld_credit() {
        use crate::session::SessionCommand;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let identifier = RequestIdentifier::new("https://example.com/".into(), 7, tx);
        let (reader, mut cb) = SpdyInputStream::pair(4);
        cb.on_connect(&identifier);
        assert_eq!(cb.on_response_data(b"0123456789"), 4);

        let mut out = [0u8; 16];
        assert_eq!(reader.read(&mut out), 10);
        match rx.try_recv().unwrap() {
            SessionCommand::Consumed { token, count } => assert_eq!((token, count), (7, 6)),
            _ => panic!("expected a flow-control credit command"),
        }

        // fully acknowledged data leaves nothing to return
        assert_eq!(cb.on_response_data(b"ab"), 2);
        reader.read(&mut out);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn error_slot_and_finish() {
        let (reader, mut cb) = SpdyInputStream::pair(8);
        assert!(!reader.is_finished());
        cb.on_error(&SpdyError::RequestCancelled);
        assert!(reader.is_finished());
        assert!(matches!(reader.error(), Some(SpdyError::RequestCancelled)));
    }

    #[test]
    fn close_after_drain() {
        let (reader, mut cb) = SpdyInputStream::pair(8);
        cb.on_response_data(b"xy");
        cb.on_stream_close();
        assert!(!reader.is_finished());
        let mut out = [0u8; 8];
        reader.read(&mut out);
        assert!(reader.is_finished());
        assert!(reader.error().is_none());
    }
}
