/*
 * stream.rs
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

//! Per-request stream state machine. A stream is owned exclusively by its
//! session and removed from the session's map on reaching a terminal state.

use bytes::Bytes;

use crate::callback::{RequestCallback, RequestIdentifier};

/// Stream lifecycle. `Cancelled` and `Errored` are terminal and reachable
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, SYN_STREAM not yet sent.
    Idle,
    /// SYN_STREAM sent, awaiting SYN_REPLY.
    OpenLocal,
    /// SYN_REPLY received, both directions active.
    Open,
    /// Local half finished (FIN sent), remote still active.
    HalfClosedLocal,
    /// Remote half finished (FIN received), local still active.
    HalfClosedRemote,
    /// Both halves finished.
    Closed,
    Cancelled,
    Errored,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Closed | StreamState::Cancelled | StreamState::Errored
        )
    }
}

pub(crate) struct SpdyStream {
    pub id: u32,
    pub token: u64,
    pub state: StreamState,
    pub callback: Box<dyn RequestCallback>,
    /// Remaining request body and send offset; body bytes past the offset are
    /// deferred when a flow-control window is exhausted.
    pub body: Option<Bytes>,
    pub body_offset: usize,
    pub headers_delivered: bool,
    /// Outbound flow-control window; may go to zero, never negative.
    pub send_window: i64,
    /// Inbound flow-control window, replenished by the consumed-length the
    /// callback reports.
    pub recv_window: i64,
    local_closed: bool,
    remote_closed: bool,
}

impl SpdyStream {
    pub fn new(
        id: u32,
        token: u64,
        callback: Box<dyn RequestCallback>,
        body: Option<Bytes>,
        send_window: i64,
        recv_window: i64,
    ) -> Self {
        Self {
            id,
            token,
            state: StreamState::Idle,
            callback,
            body,
            body_offset: 0,
            headers_delivered: false,
            send_window,
            recv_window,
            local_closed: false,
            remote_closed: false,
        }
    }

    /// SYN_STREAM written; `fin` when the request carries no body.
    pub fn on_syn_sent(&mut self, fin: bool) {
        debug_assert_eq!(self.state, StreamState::Idle);
        self.local_closed = fin;
        self.state = StreamState::OpenLocal;
    }

    /// SYN_REPLY arrived. Both-directions state is recomputed from the
    /// half-closed flags.
    pub fn on_reply(&mut self, fin: bool) {
        self.remote_closed = self.remote_closed || fin;
        self.recompute_open_state();
    }

    /// FIN received on an inbound DATA or HEADERS frame.
    pub fn on_remote_fin(&mut self) {
        self.remote_closed = true;
        self.recompute_open_state();
    }

    /// FIN written on the final outbound body chunk.
    pub fn on_local_fin(&mut self) {
        self.local_closed = true;
        self.recompute_open_state();
    }

    pub fn cancel(&mut self) {
        self.state = StreamState::Cancelled;
    }

    pub fn error(&mut self) {
        self.state = StreamState::Errored;
    }

    pub fn remote_closed(&self) -> bool {
        self.remote_closed
    }

    pub fn body_remaining(&self) -> usize {
        self.body
            .as_ref()
            .map(|b| b.len() - self.body_offset)
            .unwrap_or(0)
    }

    fn recompute_open_state(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = match (self.local_closed, self.remote_closed) {
            (true, true) => StreamState::Closed,
            (true, false) => StreamState::HalfClosedLocal,
            (false, true) => StreamState::HalfClosedRemote,
            (false, false) => StreamState::Open,
        };
    }
}
