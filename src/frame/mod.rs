/*
 * mod.rs
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

//! SPDY/3 frame type, flag, and status constants.
//!
//! Control frame header: 1 control bit + 15-bit version + 16-bit type, then
//! 8-bit flags + 24-bit length. Data frame header: 1 clear bit + 31-bit
//! stream id, then 8-bit flags + 24-bit length. All integers big-endian.

mod handler;
mod parser;
mod writer;

pub use handler::SpdyFrameHandler;
pub use parser::SpdyParser;
pub use writer::SpdyWriter;

/// Protocol version carried in every control frame.
pub const SPDY_VERSION: u16 = 3;

// Control frame types
pub const TYPE_SYN_STREAM: u16 = 1;
pub const TYPE_SYN_REPLY: u16 = 2;
pub const TYPE_RST_STREAM: u16 = 3;
pub const TYPE_SETTINGS: u16 = 4;
pub const TYPE_PING: u16 = 6;
pub const TYPE_GOAWAY: u16 = 7;
pub const TYPE_HEADERS: u16 = 8;
pub const TYPE_WINDOW_UPDATE: u16 = 9;

// Frame flags
pub const FLAG_FIN: u8 = 0x01;
pub const FLAG_UNIDIRECTIONAL: u8 = 0x02;
pub const FLAG_SETTINGS_CLEAR_SETTINGS: u8 = 0x01;

// SETTINGS entry flags
pub const FLAG_SETTINGS_PERSIST_VALUE: u8 = 0x01;
pub const FLAG_SETTINGS_PERSISTED: u8 = 0x02;

// RST_STREAM status codes
pub const RST_PROTOCOL_ERROR: u32 = 1;
pub const RST_INVALID_STREAM: u32 = 2;
pub const RST_REFUSED_STREAM: u32 = 3;
pub const RST_UNSUPPORTED_VERSION: u32 = 4;
pub const RST_CANCEL: u32 = 5;
pub const RST_INTERNAL_ERROR: u32 = 6;
pub const RST_FLOW_CONTROL_ERROR: u32 = 7;
pub const RST_STREAM_IN_USE: u32 = 8;
pub const RST_STREAM_ALREADY_CLOSED: u32 = 9;
pub const RST_INVALID_CREDENTIALS: u32 = 10;
pub const RST_FRAME_TOO_LARGE: u32 = 11;

// GOAWAY status codes
pub const GOAWAY_OK: u32 = 0;
pub const GOAWAY_PROTOCOL_ERROR: u32 = 1;
pub const GOAWAY_INTERNAL_ERROR: u32 = 2;

// SETTINGS identifiers
pub const SETTINGS_UPLOAD_BANDWIDTH: u32 = 1;
pub const SETTINGS_DOWNLOAD_BANDWIDTH: u32 = 2;
pub const SETTINGS_ROUND_TRIP_TIME: u32 = 3;
pub const SETTINGS_MAX_CONCURRENT_STREAMS: u32 = 4;
pub const SETTINGS_CURRENT_CWND: u32 = 5;
pub const SETTINGS_DOWNLOAD_RETRANS_RATE: u32 = 6;
pub const SETTINGS_INITIAL_WINDOW_SIZE: u32 = 7;
pub const SETTINGS_CLIENT_CERTIFICATE_VECTOR_SIZE: u32 = 8;

pub const FRAME_HEADER_LENGTH: usize = 8;

/// Largest length the 24-bit field can express.
pub const MAX_FRAME_LENGTH: usize = (1 << 24) - 1;

/// Default cap on accepted frame payloads. Anything larger is a protocol
/// violation from our peer; SPDY has no mechanism to negotiate it up.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 20;

/// Initial per-stream and session flow-control window (SPDY/3.1 default,
/// adjustable via SETTINGS_INITIAL_WINDOW_SIZE for per-stream windows).
pub const DEFAULT_WINDOW_SIZE: i64 = 65_536;

/// Stream id carried by session-level WINDOW_UPDATE frames.
pub const SESSION_FLOW_CONTROL_STREAM_ID: u32 = 0;
