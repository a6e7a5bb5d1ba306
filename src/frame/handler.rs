/*
 * handler.rs
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

//! Frame handler trait: one method per frame shape the parser can produce.
//! Header blocks are delivered compressed; decompression is the session's
//! job because the zlib context is session state.

use bytes::Bytes;

/// Receiver for parsed SPDY frames. The session implements this; the parser
/// drives it as complete frames become available.
pub trait SpdyFrameHandler {
    fn syn_stream_frame_received(
        &mut self,
        stream_id: u32,
        associated_stream_id: u32,
        priority: u8,
        fin: bool,
        unidirectional: bool,
        header_block: Bytes,
    );

    fn syn_reply_frame_received(&mut self, stream_id: u32, fin: bool, header_block: Bytes);

    fn rst_stream_frame_received(&mut self, stream_id: u32, status: u32);

    /// `settings` is a list of (id, entry flags, value).
    fn settings_frame_received(&mut self, clear_persisted: bool, settings: Vec<(u32, u8, u32)>);

    fn ping_frame_received(&mut self, id: u32);

    fn goaway_frame_received(&mut self, last_good_stream_id: u32, status: u32);

    fn headers_frame_received(&mut self, stream_id: u32, fin: bool, header_block: Bytes);

    /// `delta` is the window increment; stream id 0 replenishes the
    /// session-level window.
    fn window_update_frame_received(&mut self, stream_id: u32, delta: u32);

    fn data_frame_received(&mut self, stream_id: u32, fin: bool, data: Bytes);

    /// A frame-level violation: oversize length, unknown control type,
    /// malformed payload, or wrong protocol version. `status` is the
    /// RST_STREAM status code that best describes the violation.
    fn frame_error(&mut self, status: u32, stream_id: u32, message: String);
}
