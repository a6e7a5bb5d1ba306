/*
 * writer.rs
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

//! SPDY frame writer: serializes frames into a buffer. Caller is responsible
//! for sending the buffer to the transport.

use bytes::{BufMut, Bytes, BytesMut};

use super::*;

pub struct SpdyWriter {
    buf: BytesMut,
}

impl SpdyWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(8192),
        }
    }

    fn write_control_header(&mut self, frame_type: u16, flags: u8, length: usize) {
        debug_assert!(length <= MAX_FRAME_LENGTH);
        self.buf.put_u16(0x8000 | SPDY_VERSION);
        self.buf.put_u16(frame_type);
        self.buf.put_u8(flags);
        self.buf.put_u8((length >> 16) as u8);
        self.buf.put_u8((length >> 8) as u8);
        self.buf.put_u8(length as u8);
    }

    /// SYN_STREAM with a pre-compressed header block. `fin` marks the local
    /// half closed (request without body).
    pub fn write_syn_stream(
        &mut self,
        stream_id: u32,
        associated_stream_id: u32,
        priority: u8,
        fin: bool,
        header_block: &[u8],
    ) {
        let flags = if fin { FLAG_FIN } else { 0 };
        self.write_control_header(TYPE_SYN_STREAM, flags, 10 + header_block.len());
        self.buf.put_u32(stream_id & 0x7fff_ffff);
        self.buf.put_u32(associated_stream_id & 0x7fff_ffff);
        self.buf.put_u8((priority & 0x07) << 5);
        self.buf.put_u8(0); // credential slot, unused by this client
        self.buf.extend_from_slice(header_block);
    }

    /// SYN_REPLY with a pre-compressed header block. Only ever sent by
    /// servers; the engine uses it when acting as a scripted test peer.
    pub fn write_syn_reply(&mut self, stream_id: u32, fin: bool, header_block: &[u8]) {
        let flags = if fin { FLAG_FIN } else { 0 };
        self.write_control_header(TYPE_SYN_REPLY, flags, 4 + header_block.len());
        self.buf.put_u32(stream_id & 0x7fff_ffff);
        self.buf.extend_from_slice(header_block);
    }

    pub fn write_rst_stream(&mut self, stream_id: u32, status: u32) {
        self.write_control_header(TYPE_RST_STREAM, 0, 8);
        self.buf.put_u32(stream_id & 0x7fff_ffff);
        self.buf.put_u32(status);
    }

    /// SETTINGS with (id, entry flags, value) entries.
    pub fn write_settings(&mut self, settings: &[(u32, u8, u32)]) {
        self.write_control_header(TYPE_SETTINGS, 0, 4 + settings.len() * 8);
        self.buf.put_u32(settings.len() as u32);
        for (id, flags, value) in settings {
            self.buf.put_u8(*flags);
            self.buf.put_u8((id >> 16) as u8);
            self.buf.put_u8((id >> 8) as u8);
            self.buf.put_u8(*id as u8);
            self.buf.put_u32(*value);
        }
    }

    pub fn write_ping(&mut self, id: u32) {
        self.write_control_header(TYPE_PING, 0, 4);
        self.buf.put_u32(id);
    }

    pub fn write_goaway(&mut self, last_good_stream_id: u32, status: u32) {
        self.write_control_header(TYPE_GOAWAY, 0, 8);
        self.buf.put_u32(last_good_stream_id & 0x7fff_ffff);
        self.buf.put_u32(status);
    }

    /// HEADERS with a pre-compressed header block (trailing headers).
    pub fn write_headers(&mut self, stream_id: u32, fin: bool, header_block: &[u8]) {
        let flags = if fin { FLAG_FIN } else { 0 };
        self.write_control_header(TYPE_HEADERS, flags, 4 + header_block.len());
        self.buf.put_u32(stream_id & 0x7fff_ffff);
        self.buf.extend_from_slice(header_block);
    }

    /// WINDOW_UPDATE; stream id 0 replenishes the session-level window.
    pub fn write_window_update(&mut self, stream_id: u32, delta: u32) {
        self.write_control_header(TYPE_WINDOW_UPDATE, 0, 8);
        self.buf.put_u32(stream_id & 0x7fff_ffff);
        self.buf.put_u32(delta & 0x7fff_ffff);
    }

    pub fn write_data(&mut self, stream_id: u32, data: &[u8], fin: bool) {
        debug_assert!(data.len() <= MAX_FRAME_LENGTH);
        debug_assert!(stream_id != 0);
        self.buf.put_u32(stream_id & 0x7fff_ffff);
        self.buf.put_u8(if fin { FLAG_FIN } else { 0 });
        self.buf.put_u8((data.len() >> 16) as u8);
        self.buf.put_u8((data.len() >> 8) as u8);
        self.buf.put_u8(data.len() as u8);
        self.buf.extend_from_slice(data);
    }

    /// Take the accumulated buffer. Writer remains usable.
    pub fn take_buffer(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for SpdyWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_header_layout() {
        let mut w = SpdyWriter::new();
        w.write_ping(0x01020304);
        let bytes = w.take_buffer();
        assert_eq!(
            &bytes[..],
            &[0x80, 0x03, 0x00, 0x06, 0x00, 0x00, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn data_header_layout() {
        let mut w = SpdyWriter::new();
        w.write_data(1, b"hi", true);
        let bytes = w.take_buffer();
        assert_eq!(
            &bytes[..],
            &[0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn syn_stream_priority_bits() {
        let mut w = SpdyWriter::new();
        w.write_syn_stream(1, 0, 7, true, &[]);
        let bytes = w.take_buffer();
        assert_eq!(bytes[4], FLAG_FIN);
        assert_eq!(bytes[16], 0b1110_0000);
    }
}
