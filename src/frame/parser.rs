/*
 * parser.rs
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

//! SPDY frame push parser: consumes complete frames from a buffer and
//! dispatches them to a SpdyFrameHandler. Partial frames are left in the
//! buffer; feed more bytes and call `receive` again.

use bytes::{Buf, Bytes, BytesMut};

use super::handler::SpdyFrameHandler;
use super::*;

/// Push parser for SPDY frames. Holds no session state, only the size cap.
#[derive(Debug, Clone, Copy)]
pub struct SpdyParser {
    max_frame_size: usize,
}

impl SpdyParser {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn set_max_frame_size(&mut self, size: usize) {
        assert!(size <= MAX_FRAME_LENGTH, "max frame size out of range");
        self.max_frame_size = size;
    }

    /// Consume as many complete frames as possible from `buf`. Partial frame
    /// data stays in `buf` for the next call.
    pub fn receive<H: SpdyFrameHandler>(&self, buf: &mut BytesMut, handler: &mut H) {
        while buf.len() >= FRAME_HEADER_LENGTH {
            let length = (buf[5] as usize) << 16 | (buf[6] as usize) << 8 | (buf[7] as usize);
            if length > self.max_frame_size {
                handler.frame_error(
                    RST_FRAME_TOO_LARGE,
                    0,
                    format!("frame size {} exceeds max {}", length, self.max_frame_size),
                );
                return;
            }
            if buf.len() < FRAME_HEADER_LENGTH + length {
                return;
            }
            let control = (buf[0] & 0x80) != 0;
            let word = ((buf[0] as u32) << 24
                | (buf[1] as u32) << 16
                | (buf[2] as u32) << 8
                | (buf[3] as u32))
                & 0x7fff_ffff;
            let flags = buf[4];
            buf.advance(FRAME_HEADER_LENGTH);
            let payload = buf.split_to(length).freeze();

            if control {
                let version = (word >> 16) as u16;
                let frame_type = (word & 0xffff) as u16;
                if version != SPDY_VERSION {
                    handler.frame_error(
                        RST_UNSUPPORTED_VERSION,
                        0,
                        format!("control frame with version {}", version),
                    );
                    return;
                }
                dispatch_control(frame_type, flags, payload, handler);
            } else {
                let stream_id = word;
                let fin = (flags & FLAG_FIN) != 0;
                handler.data_frame_received(stream_id, fin, payload);
            }
        }
    }
}

impl Default for SpdyParser {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch_control<H: SpdyFrameHandler>(
    frame_type: u16,
    flags: u8,
    payload: Bytes,
    handler: &mut H,
) {
    match frame_type {
        TYPE_SYN_STREAM => parse_syn_stream(flags, payload, handler),
        TYPE_SYN_REPLY => parse_syn_reply(flags, payload, handler),
        TYPE_RST_STREAM => parse_rst_stream(payload, handler),
        TYPE_SETTINGS => parse_settings(flags, payload, handler),
        TYPE_PING => parse_ping(payload, handler),
        TYPE_GOAWAY => parse_goaway(payload, handler),
        TYPE_HEADERS => parse_headers(flags, payload, handler),
        TYPE_WINDOW_UPDATE => parse_window_update(payload, handler),
        other => handler.frame_error(
            RST_PROTOCOL_ERROR,
            0,
            format!("unknown control frame type {}", other),
        ),
    }
}

fn get_u31(payload: &mut Bytes) -> u32 {
    payload.get_u32() & 0x7fff_ffff
}

fn parse_syn_stream<H: SpdyFrameHandler>(flags: u8, mut payload: Bytes, handler: &mut H) {
    if payload.len() < 10 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "SYN_STREAM too short".into());
        return;
    }
    let stream_id = get_u31(&mut payload);
    let associated_stream_id = get_u31(&mut payload);
    let priority = payload.get_u8() >> 5;
    let _slot = payload.get_u8();
    if stream_id == 0 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "SYN_STREAM with stream id 0".into());
        return;
    }
    handler.syn_stream_frame_received(
        stream_id,
        associated_stream_id,
        priority,
        (flags & FLAG_FIN) != 0,
        (flags & FLAG_UNIDIRECTIONAL) != 0,
        payload,
    );
}

fn parse_syn_reply<H: SpdyFrameHandler>(flags: u8, mut payload: Bytes, handler: &mut H) {
    if payload.len() < 4 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "SYN_REPLY too short".into());
        return;
    }
    let stream_id = get_u31(&mut payload);
    if stream_id == 0 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "SYN_REPLY with stream id 0".into());
        return;
    }
    handler.syn_reply_frame_received(stream_id, (flags & FLAG_FIN) != 0, payload);
}

fn parse_rst_stream<H: SpdyFrameHandler>(mut payload: Bytes, handler: &mut H) {
    if payload.len() != 8 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "RST_STREAM must be 8 bytes".into());
        return;
    }
    let stream_id = get_u31(&mut payload);
    let status = payload.get_u32();
    handler.rst_stream_frame_received(stream_id, status);
}

fn parse_settings<H: SpdyFrameHandler>(flags: u8, mut payload: Bytes, handler: &mut H) {
    if payload.len() < 4 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "SETTINGS too short".into());
        return;
    }
    let count = payload.get_u32() as usize;
    if payload.len() != count * 8 {
        handler.frame_error(
            RST_PROTOCOL_ERROR,
            0,
            format!("SETTINGS count {} does not match payload", count),
        );
        return;
    }
    let mut settings = Vec::with_capacity(count);
    for _ in 0..count {
        let entry_flags = payload.get_u8();
        let id = (payload.get_u8() as u32) << 16
            | (payload.get_u8() as u32) << 8
            | (payload.get_u8() as u32);
        let value = payload.get_u32();
        settings.push((id, entry_flags, value));
    }
    handler.settings_frame_received((flags & FLAG_SETTINGS_CLEAR_SETTINGS) != 0, settings);
}

fn parse_ping<H: SpdyFrameHandler>(mut payload: Bytes, handler: &mut H) {
    if payload.len() != 4 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "PING must be 4 bytes".into());
        return;
    }
    handler.ping_frame_received(payload.get_u32());
}

fn parse_goaway<H: SpdyFrameHandler>(mut payload: Bytes, handler: &mut H) {
    if payload.len() != 8 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "GOAWAY must be 8 bytes".into());
        return;
    }
    let last_good_stream_id = get_u31(&mut payload);
    let status = payload.get_u32();
    handler.goaway_frame_received(last_good_stream_id, status);
}

fn parse_headers<H: SpdyFrameHandler>(flags: u8, mut payload: Bytes, handler: &mut H) {
    if payload.len() < 4 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "HEADERS too short".into());
        return;
    }
    let stream_id = get_u31(&mut payload);
    if stream_id == 0 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "HEADERS with stream id 0".into());
        return;
    }
    handler.headers_frame_received(stream_id, (flags & FLAG_FIN) != 0, payload);
}

fn parse_window_update<H: SpdyFrameHandler>(mut payload: Bytes, handler: &mut H) {
    if payload.len() != 8 {
        handler.frame_error(RST_PROTOCOL_ERROR, 0, "WINDOW_UPDATE must be 8 bytes".into());
        return;
    }
    let stream_id = get_u31(&mut payload);
    let delta = get_u31(&mut payload);
    if delta == 0 {
        handler.frame_error(
            RST_PROTOCOL_ERROR,
            stream_id,
            "WINDOW_UPDATE increment must be non-zero".into(),
        );
        return;
    }
    handler.window_update_frame_received(stream_id, delta);
}

#[cfg(test)]
mod tests {
    use super::super::SpdyWriter;
    use super::*;

    #[derive(Default)]
    struct RecordingHandler {
        syn_streams: Vec<(u32, u32, u8, bool, bool, Bytes)>,
        syn_replies: Vec<(u32, bool, Bytes)>,
        rst_streams: Vec<(u32, u32)>,
        settings: Vec<(bool, Vec<(u32, u8, u32)>)>,
        pings: Vec<u32>,
        goaways: Vec<(u32, u32)>,
        headers: Vec<(u32, bool, Bytes)>,
        window_updates: Vec<(u32, u32)>,
        data: Vec<(u32, bool, Bytes)>,
        errors: Vec<(u32, u32, String)>,
    }

    impl SpdyFrameHandler for RecordingHandler {
        fn syn_stream_frame_received(
            &mut self,
            stream_id: u32,
            associated_stream_id: u32,
            priority: u8,
            fin: bool,
            unidirectional: bool,
            header_block: Bytes,
        ) {
            self.syn_streams.push((
                stream_id,
                associated_stream_id,
                priority,
                fin,
                unidirectional,
                header_block,
            ));
        }
        fn syn_reply_frame_received(&mut self, stream_id: u32, fin: bool, header_block: Bytes) {
            self.syn_replies.push((stream_id, fin, header_block));
        }
        fn rst_stream_frame_received(&mut self, stream_id: u32, status: u32) {
            self.rst_streams.push((stream_id, status));
        }
        fn settings_frame_received(&mut self, clear: bool, settings: Vec<(u32, u8, u32)>) {
            self.settings.push((clear, settings));
        }
        fn ping_frame_received(&mut self, id: u32) {
            self.pings.push(id);
        }
        fn goaway_frame_received(&mut self, last_good_stream_id: u32, status: u32) {
            self.goaways.push((last_good_stream_id, status));
        }
        fn headers_frame_received(&mut self, stream_id: u32, fin: bool, header_block: Bytes) {
            self.headers.push((stream_id, fin, header_block));
        }
        fn window_update_frame_received(&mut self, stream_id: u32, delta: u32) {
            self.window_updates.push((stream_id, delta));
        }
        fn data_frame_received(&mut self, stream_id: u32, fin: bool, data: Bytes) {
            self.data.push((stream_id, fin, data));
        }
        fn frame_error(&mut self, status: u32, stream_id: u32, message: String) {
            self.errors.push((status, stream_id, message));
        }
    }

    fn parse(bytes: Bytes) -> RecordingHandler {
        let mut buf = BytesMut::from(&bytes[..]);
        let mut handler = RecordingHandler::default();
        SpdyParser::new().receive(&mut buf, &mut handler);
        assert!(buf.is_empty(), "parser left complete frames unconsumed");
        handler
    }

    #[test]
    fn syn_stream_round_trip() {
        let mut w = SpdyWriter::new();
        w.write_syn_stream(1, 0, 3, false, b"block");
        let h = parse(w.take_buffer());
        assert_eq!(h.syn_streams.len(), 1);
        let (id, assoc, pri, fin, uni, block) = &h.syn_streams[0];
        assert_eq!((*id, *assoc, *pri, *fin, *uni), (1, 0, 3, false, false));
        assert_eq!(&block[..], b"block");
    }

    #[test]
    fn syn_reply_and_data_round_trip() {
        let mut w = SpdyWriter::new();
        w.write_syn_reply(3, false, b"hdrs");
        w.write_data(3, b"payload", true);
        let h = parse(w.take_buffer());
        assert_eq!(h.syn_replies, vec![(3, false, Bytes::from_static(b"hdrs"))]);
        assert_eq!(h.data, vec![(3, true, Bytes::from_static(b"payload"))]);
    }

    #[test]
    fn control_frames_round_trip() {
        let mut w = SpdyWriter::new();
        w.write_rst_stream(5, RST_CANCEL);
        w.write_settings(&[(SETTINGS_INITIAL_WINDOW_SIZE, 0, 131_072)]);
        w.write_ping(7);
        w.write_goaway(9, GOAWAY_OK);
        w.write_window_update(5, 4096);
        w.write_headers(5, false, b"more");
        let h = parse(w.take_buffer());
        assert_eq!(h.rst_streams, vec![(5, RST_CANCEL)]);
        assert_eq!(
            h.settings,
            vec![(false, vec![(SETTINGS_INITIAL_WINDOW_SIZE, 0, 131_072)])]
        );
        assert_eq!(h.pings, vec![7]);
        assert_eq!(h.goaways, vec![(9, GOAWAY_OK)]);
        assert_eq!(h.window_updates, vec![(5, 4096)]);
        assert_eq!(h.headers, vec![(5, false, Bytes::from_static(b"more"))]);
        assert!(h.errors.is_empty());
    }

    #[test]
    fn truncated_frame_is_left_in_buffer() {
        let mut w = SpdyWriter::new();
        w.write_ping(1);
        let bytes = w.take_buffer();
        let mut buf = BytesMut::from(&bytes[..bytes.len() - 1]);
        let mut handler = RecordingHandler::default();
        let parser = SpdyParser::new();
        parser.receive(&mut buf, &mut handler);
        assert!(handler.pings.is_empty());
        assert_eq!(buf.len(), bytes.len() - 1);

        // decoding resumes once the missing byte arrives
        buf.extend_from_slice(&bytes[bytes.len() - 1..]);
        parser.receive(&mut buf, &mut handler);
        assert_eq!(handler.pings, vec![1]);
    }

    #[test]
    fn unknown_control_type_is_an_error() {
        let mut buf = BytesMut::new();
        // control bit + version 3, type 99, no flags, empty payload
        buf.extend_from_slice(&[0x80, 0x03, 0x00, 99, 0x00, 0x00, 0x00, 0x00]);
        let mut handler = RecordingHandler::default();
        SpdyParser::new().receive(&mut buf, &mut handler);
        assert_eq!(handler.errors.len(), 1);
        assert_eq!(handler.errors[0].0, RST_PROTOCOL_ERROR);
    }

    #[test]
    fn wrong_version_is_an_error() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x80, 0x02, 0x00, 0x06, 0x00, 0x00, 0x00, 0x04, 0, 0, 0, 1]);
        let mut handler = RecordingHandler::default();
        SpdyParser::new().receive(&mut buf, &mut handler);
        assert_eq!(handler.errors.len(), 1);
        assert_eq!(handler.errors[0].0, RST_UNSUPPORTED_VERSION);
    }

    #[test]
    fn oversize_frame_is_an_error() {
        let mut parser = SpdyParser::new();
        parser.set_max_frame_size(16);
        let mut w = SpdyWriter::new();
        w.write_data(1, &[0u8; 64], false);
        let mut buf = BytesMut::from(&w.take_buffer()[..]);
        let mut handler = RecordingHandler::default();
        parser.receive(&mut buf, &mut handler);
        assert_eq!(handler.errors.len(), 1);
        assert_eq!(handler.errors[0].0, RST_FRAME_TOO_LARGE);
    }

    #[test]
    fn zero_window_update_is_an_error() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x80, 0x03, 0x00, 0x09, 0x00, 0x00, 0x00, 0x08]);
        buf.extend_from_slice(&[0, 0, 0, 5, 0, 0, 0, 0]);
        let mut handler = RecordingHandler::default();
        SpdyParser::new().receive(&mut buf, &mut handler);
        assert_eq!(handler.errors.len(), 1);
        assert!(handler.window_updates.is_empty());
    }
}
