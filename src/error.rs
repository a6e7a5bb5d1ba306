/*
 * error.rs
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

//! Error kinds delivered to request callbacks and returned from the engine API.
//!
//! Per-stream errors (RST_STREAM, cancellation, bad response headers for one
//! stream) tear down only the affected stream. Session-fatal errors
//! (decompression corruption, frame violations, transport loss) tear down
//! every open stream, each of which gets exactly one terminal callback.

use thiserror::Error;

use crate::frame;

#[derive(Error, Debug, Clone)]
pub enum SpdyError {
    /// TCP connect or TLS handshake failure, or the connection dropped
    /// underneath open streams.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request was cancelled, either by its caller or because the whole
    /// session was shut down.
    #[error("request cancelled")]
    RequestCancelled,

    /// Protocol negotiation did not select SPDY. Not an engine failure: the
    /// caller is expected to retry over a conventional transport.
    #[error("server does not speak SPDY")]
    NotSpdy,

    /// Response header block could not be decompressed or parsed.
    #[error("invalid response headers: {0}")]
    InvalidResponseHeaders(String),

    /// Malformed or out-of-sequence frame. Fatal to the session.
    #[error("frame protocol error: {0}")]
    FrameProtocolError(String),

    /// A flow-control window would have gone negative.
    #[error("flow control violation on stream {stream_id}")]
    FlowControlViolation { stream_id: u32 },

    /// The peer refused the stream (RST_STREAM with REFUSED_STREAM).
    #[error("stream refused by server")]
    StreamRefused,

    /// The peer reset the stream with the given status.
    #[error("stream reset by server: {0}")]
    StreamReset(RstStatus),

    /// The fetch target could not be parsed as a URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl SpdyError {
    /// Map a peer-reported RST_STREAM status code to the error delivered to
    /// the stream's callback. CANCEL and REFUSED_STREAM get their own kinds;
    /// the rest are reported verbatim.
    pub(crate) fn from_rst_status(code: u32) -> SpdyError {
        match code {
            frame::RST_CANCEL => SpdyError::RequestCancelled,
            frame::RST_REFUSED_STREAM => SpdyError::StreamRefused,
            _ => SpdyError::StreamReset(RstStatus::from_code(code)),
        }
    }
}

/// RST_STREAM status codes (SPDY/3 section 2.6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RstStatus {
    ProtocolError,
    InvalidStream,
    RefusedStream,
    UnsupportedVersion,
    Cancel,
    InternalError,
    FlowControlError,
    StreamInUse,
    StreamAlreadyClosed,
    InvalidCredentials,
    FrameTooLarge,
    Unknown(u32),
}

impl RstStatus {
    pub fn from_code(code: u32) -> RstStatus {
        match code {
            frame::RST_PROTOCOL_ERROR => RstStatus::ProtocolError,
            frame::RST_INVALID_STREAM => RstStatus::InvalidStream,
            frame::RST_REFUSED_STREAM => RstStatus::RefusedStream,
            frame::RST_UNSUPPORTED_VERSION => RstStatus::UnsupportedVersion,
            frame::RST_CANCEL => RstStatus::Cancel,
            frame::RST_INTERNAL_ERROR => RstStatus::InternalError,
            frame::RST_FLOW_CONTROL_ERROR => RstStatus::FlowControlError,
            frame::RST_STREAM_IN_USE => RstStatus::StreamInUse,
            frame::RST_STREAM_ALREADY_CLOSED => RstStatus::StreamAlreadyClosed,
            frame::RST_INVALID_CREDENTIALS => RstStatus::InvalidCredentials,
            frame::RST_FRAME_TOO_LARGE => RstStatus::FrameTooLarge,
            other => RstStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            RstStatus::ProtocolError => frame::RST_PROTOCOL_ERROR,
            RstStatus::InvalidStream => frame::RST_INVALID_STREAM,
            RstStatus::RefusedStream => frame::RST_REFUSED_STREAM,
            RstStatus::UnsupportedVersion => frame::RST_UNSUPPORTED_VERSION,
            RstStatus::Cancel => frame::RST_CANCEL,
            RstStatus::InternalError => frame::RST_INTERNAL_ERROR,
            RstStatus::FlowControlError => frame::RST_FLOW_CONTROL_ERROR,
            RstStatus::StreamInUse => frame::RST_STREAM_IN_USE,
            RstStatus::StreamAlreadyClosed => frame::RST_STREAM_ALREADY_CLOSED,
            RstStatus::InvalidCredentials => frame::RST_INVALID_CREDENTIALS,
            RstStatus::FrameTooLarge => frame::RST_FRAME_TOO_LARGE,
            RstStatus::Unknown(code) => *code,
        }
    }
}

impl std::fmt::Display for RstStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RstStatus::ProtocolError => "PROTOCOL_ERROR",
            RstStatus::InvalidStream => "INVALID_STREAM",
            RstStatus::RefusedStream => "REFUSED_STREAM",
            RstStatus::UnsupportedVersion => "UNSUPPORTED_VERSION",
            RstStatus::Cancel => "CANCEL",
            RstStatus::InternalError => "INTERNAL_ERROR",
            RstStatus::FlowControlError => "FLOW_CONTROL_ERROR",
            RstStatus::StreamInUse => "STREAM_IN_USE",
            RstStatus::StreamAlreadyClosed => "STREAM_ALREADY_CLOSED",
            RstStatus::InvalidCredentials => "INVALID_CREDENTIALS",
            RstStatus::FrameTooLarge => "FRAME_TOO_LARGE",
            RstStatus::Unknown(code) => return write!(f, "UNKNOWN({})", code),
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rst_status_round_trip() {
        for code in 1..=11u32 {
            assert_eq!(RstStatus::from_code(code).code(), code);
        }
        assert_eq!(RstStatus::from_code(42), RstStatus::Unknown(42));
    }

    #[test]
    fn cancel_and_refused_map_to_dedicated_kinds() {
        assert!(matches!(
            SpdyError::from_rst_status(frame::RST_CANCEL),
            SpdyError::RequestCancelled
        ));
        assert!(matches!(
            SpdyError::from_rst_status(frame::RST_REFUSED_STREAM),
            SpdyError::StreamRefused
        ));
        assert!(matches!(
            SpdyError::from_rst_status(frame::RST_PROTOCOL_ERROR),
            SpdyError::StreamReset(RstStatus::ProtocolError)
        ));
    }
}
