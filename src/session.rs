/*
 * session.rs
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

//! One SPDY session: a multiplexed connection to a single origin.
//!
//! All mutable session state lives in [`SessionCore`], which is owned by a
//! single tokio task. Callers never touch the core directly; the pool and
//! request identifiers marshal work onto the task through an unbounded
//! [`SessionCommand`] channel, so callbacks for one stream are always invoked
//! sequentially and without locks.
//!
//! `SessionCore` itself performs no I/O. It consumes inbound bytes through
//! [`SessionCore::receive`] and accumulates outbound frames in a
//! [`SpdyWriter`]; the task flushes the writer to the transport after every
//! event. That split keeps the whole protocol engine testable without a
//! socket.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::callback::{RequestCallback, RequestIdentifier};
use crate::error::SpdyError;
use crate::frame::{self, SpdyFrameHandler, SpdyParser, SpdyWriter};
use crate::net::{self, SpdyTransport};
use crate::pool::{self, PoolInner};
use crate::request::RequestBuilder;
use crate::response::SpdyResponse;
use crate::session_key::SessionKey;
use crate::stream::SpdyStream;
use crate::zlib::{HeaderCompressor, HeaderDecompressor};

/// Body bytes per outbound DATA frame.
const MAX_DATA_CHUNK: i64 = 8192;

/// Flow-control windows are 31-bit quantities.
const MAX_WINDOW: i64 = 0x7fff_ffff;

/// Connection lifecycle of a session. `NotSpdy`, `Closed` and `Error` are
/// terminal; the pool evicts the session once its task observes one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectState {
    NotConnected,
    Connecting,
    TlsHandshake,
    Connected,
    /// The transport came up but the peer did not negotiate SPDY.
    NotSpdy,
    /// Orderly shutdown, all streams done.
    Closed,
    Error,
}

impl ConnectState {
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectState::NotSpdy | ConnectState::Closed | ConnectState::Error
        )
    }
}

/// A fetch accepted by the pool, waiting for its SYN_STREAM.
pub(crate) struct PendingFetch {
    pub token: u64,
    pub request: RequestBuilder,
    pub identifier: RequestIdentifier,
    pub callback: Box<dyn RequestCallback>,
}

/// Work marshaled onto the session task.
pub(crate) enum SessionCommand {
    Fetch(PendingFetch),
    Cancel { token: u64 },
    /// Flow-control credit a callback withheld in `on_response_data`,
    /// returned once the consumer caught up.
    Consumed { token: u64, count: usize },
    /// Reset every stream, send GOAWAY and report how many requests were
    /// aborted.
    Shutdown { reply: oneshot::Sender<usize> },
}

/// The protocol engine for one session. Single-owner, no interior locking.
pub(crate) struct SessionCore {
    key: SessionKey,
    state: ConnectState,
    parser: SpdyParser,
    writer: SpdyWriter,
    compressor: HeaderCompressor,
    decompressor: HeaderDecompressor,
    streams: HashMap<u32, SpdyStream>,
    /// Fetches deferred by SETTINGS_MAX_CONCURRENT_STREAMS, in arrival order.
    pending: VecDeque<PendingFetch>,
    /// Next locally initiated stream id; client streams are odd.
    next_stream_id: u32,
    /// Highest peer-initiated stream id seen, echoed in GOAWAY.
    last_peer_stream_id: u32,
    /// Session-level outbound window.
    send_window: i64,
    /// Session-level inbound window.
    recv_window: i64,
    /// Send window granted to streams opened from now on; updated by
    /// SETTINGS_INITIAL_WINDOW_SIZE without touching existing streams.
    initial_send_window: i64,
    max_concurrent: Option<u32>,
    /// Last-good stream id from a received GOAWAY, once one has arrived.
    goaway_received: Option<u32>,
    /// Session-fatal error raised inside a frame handler; acted on after the
    /// parser returns control.
    fatal: Option<SpdyError>,
}

impl SessionCore {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: ConnectState::NotConnected,
            parser: SpdyParser::new(),
            writer: SpdyWriter::new(),
            compressor: HeaderCompressor::new(),
            decompressor: HeaderDecompressor::new(),
            streams: HashMap::new(),
            pending: VecDeque::new(),
            next_stream_id: 1,
            last_peer_stream_id: 0,
            send_window: frame::DEFAULT_WINDOW_SIZE,
            recv_window: frame::DEFAULT_WINDOW_SIZE,
            initial_send_window: frame::DEFAULT_WINDOW_SIZE,
            max_concurrent: None,
            goaway_received: None,
            fatal: None,
        }
    }

    pub fn set_state(&mut self, state: ConnectState) {
        self.state = state;
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn has_output(&self) -> bool {
        !self.writer.is_empty()
    }

    pub fn take_output(&mut self) -> Bytes {
        self.writer.take_buffer()
    }

    pub fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Fetch(fetch) => self.fetch(fetch),
            SessionCommand::Cancel { token } => self.cancel(token),
            SessionCommand::Consumed { token, count } => self.replenish_stream(token, count),
            SessionCommand::Shutdown { reply } => {
                let aborted = self.reset_streams_and_goaway();
                let _ = reply.send(aborted);
            }
        }
    }

    /// Feed inbound transport bytes through the frame parser. Partial frames
    /// stay in `buf` for the next read.
    pub fn receive(&mut self, buf: &mut BytesMut) {
        let parser = self.parser;
        parser.receive(buf, self);
        if let Some(error) = self.fatal.take() {
            self.fail_session(error, true);
        }
    }

    /// The transport dropped underneath us. No GOAWAY; there is nowhere to
    /// send it.
    pub fn connection_lost(&mut self) {
        self.fail_session(
            SpdyError::ConnectionFailed("connection closed by peer".into()),
            false,
        );
    }

    fn fetch(&mut self, mut fetch: PendingFetch) {
        if self.state.is_terminal() || self.goaway_received.is_some() {
            fetch
                .callback
                .on_error(&SpdyError::ConnectionFailed("session is going away".into()));
            return;
        }
        if let Some(max) = self.max_concurrent {
            if self.streams.len() as u32 >= max {
                self.pending.push_back(fetch);
                return;
            }
        }
        self.start_stream(fetch);
    }

    fn start_stream(&mut self, mut fetch: PendingFetch) {
        let block = match self.compressor.compress(&fetch.request.name_values()) {
            Ok(block) => block,
            Err(error) => {
                fetch.callback.on_error(&error);
                return;
            }
        };
        let stream_id = self.next_stream_id;
        self.next_stream_id += 2;
        // an empty body is the same as no body: FIN rides the SYN_STREAM
        let body = fetch.request.body.clone().filter(|b| !b.is_empty());
        let fin = body.is_none();
        self.writer.write_syn_stream(stream_id, 0, 0, fin, &block);
        let identifier = fetch.identifier;
        debug!(key = %self.key, stream_id, url = %identifier.url(), "stream opened");

        let mut stream = SpdyStream::new(
            stream_id,
            fetch.token,
            fetch.callback,
            body,
            self.initial_send_window,
            frame::DEFAULT_WINDOW_SIZE,
        );
        stream.on_syn_sent(fin);
        stream.callback.on_connect(&identifier);
        self.streams.insert(stream_id, stream);
        self.pump_stream(stream_id);
    }

    /// Send as much deferred body as the stream and session windows allow.
    fn pump_stream(&mut self, stream_id: u32) {
        let Some(mut stream) = self.streams.remove(&stream_id) else {
            return;
        };
        while stream.body_remaining() > 0 {
            let quota = stream
                .send_window
                .min(self.send_window)
                .min(MAX_DATA_CHUNK);
            if quota <= 0 {
                break;
            }
            let take = (stream.body_remaining() as i64).min(quota) as usize;
            let body = match stream.body.clone() {
                Some(body) => body,
                None => break,
            };
            let fin = stream.body_offset + take == body.len();
            self.writer
                .write_data(stream_id, &body[stream.body_offset..stream.body_offset + take], fin);
            stream.body_offset += take;
            stream.send_window -= take as i64;
            self.send_window -= take as i64;
            stream.callback.on_request_bytes_sent(take);
            if fin {
                stream.on_local_fin();
            }
        }
        self.finish_or_insert(stream);
    }

    /// Reinsert a live stream, or finalize one whose both halves closed.
    /// `on_stream_close` fires exactly once, here.
    fn finish_or_insert(&mut self, mut stream: SpdyStream) {
        if stream.state == crate::stream::StreamState::Closed {
            debug!(key = %self.key, stream_id = stream.id, "stream closed");
            stream.callback.on_stream_close();
            self.on_stream_removed();
        } else if stream.state.is_terminal() {
            self.on_stream_removed();
        } else {
            self.streams.insert(stream.id, stream);
        }
    }

    fn on_stream_removed(&mut self) {
        self.try_start_pending();
        if self.goaway_received.is_some()
            && self.streams.is_empty()
            && self.pending.is_empty()
            && !self.state.is_terminal()
        {
            self.state = ConnectState::Closed;
        }
    }

    fn try_start_pending(&mut self) {
        loop {
            if let Some(max) = self.max_concurrent {
                if self.streams.len() as u32 >= max {
                    return;
                }
            }
            let Some(fetch) = self.pending.pop_front() else {
                return;
            };
            self.start_stream(fetch);
        }
    }

    fn cancel(&mut self, token: u64) {
        let by_token = self
            .streams
            .iter()
            .find(|(_, s)| s.token == token)
            .map(|(id, _)| *id);
        if let Some(stream_id) = by_token {
            if let Some(mut stream) = self.streams.remove(&stream_id) {
                self.writer.write_rst_stream(stream_id, frame::RST_CANCEL);
                stream.cancel();
                stream.callback.on_error(&SpdyError::RequestCancelled);
                self.on_stream_removed();
            }
        } else if let Some(pos) = self.pending.iter().position(|f| f.token == token) {
            if let Some(mut fetch) = self.pending.remove(pos) {
                fetch.callback.on_error(&SpdyError::RequestCancelled);
            }
        }
        // a token that matches nothing already reached a terminal state
    }

    /// Reopen the inbound window a callback held back earlier. Arrives from
    /// the reader half of a pull adapter as its buffer drains.
    fn replenish_stream(&mut self, token: u64, count: usize) {
        if count == 0 {
            return;
        }
        let by_token = self
            .streams
            .iter()
            .find(|(_, s)| s.token == token)
            .map(|(id, _)| *id);
        // a missing or remote-closed stream needs no more credit
        let Some(stream_id) = by_token else {
            return;
        };
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            return;
        };
        if stream.remote_closed() {
            return;
        }
        let credit = (count as i64).min(MAX_WINDOW - stream.recv_window);
        if credit <= 0 {
            return;
        }
        stream.recv_window += credit;
        self.writer.write_window_update(stream_id, credit as u32);
    }

    /// Orderly local shutdown: GOAWAY, then cancel every stream and queued
    /// fetch. Returns the number of requests aborted.
    pub fn reset_streams_and_goaway(&mut self) -> usize {
        self.writer
            .write_goaway(self.last_peer_stream_id, frame::GOAWAY_OK);
        let mut aborted = 0;
        let ids: Vec<u32> = self.streams.keys().copied().collect();
        for id in ids {
            if let Some(mut stream) = self.streams.remove(&id) {
                stream.cancel();
                stream.callback.on_error(&SpdyError::RequestCancelled);
                aborted += 1;
            }
        }
        for mut fetch in self.pending.drain(..) {
            fetch.callback.on_error(&SpdyError::RequestCancelled);
            aborted += 1;
        }
        self.state = ConnectState::Closed;
        aborted
    }

    fn fail_session(&mut self, error: SpdyError, send_goaway: bool) {
        if self.state.is_terminal() {
            return;
        }
        warn!(key = %self.key, %error, "session failed");
        if send_goaway {
            let status = match &error {
                SpdyError::FrameProtocolError(_)
                | SpdyError::FlowControlViolation { .. }
                | SpdyError::InvalidResponseHeaders(_) => frame::GOAWAY_PROTOCOL_ERROR,
                _ => frame::GOAWAY_INTERNAL_ERROR,
            };
            self.writer.write_goaway(self.last_peer_stream_id, status);
        }
        let ids: Vec<u32> = self.streams.keys().copied().collect();
        for id in ids {
            if let Some(mut stream) = self.streams.remove(&id) {
                stream.error();
                stream.callback.on_error(&error);
            }
        }
        for mut fetch in self.pending.drain(..) {
            fetch.callback.on_error(&error);
        }
        self.state = ConnectState::Error;
    }

    /// Inbound bytes were accepted at session level; hand the window back so
    /// the session window stays at its resting size. Per-stream throttling is
    /// the consumed-length contract, session throttling is not.
    fn replenish_session_window(&mut self, len: usize) {
        if len > 0 {
            self.recv_window += len as i64;
            self.writer
                .write_window_update(frame::SESSION_FLOW_CONTROL_STREAM_ID, len as u32);
        }
    }

    #[cfg(test)]
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    #[cfg(test)]
    pub fn state(&self) -> ConnectState {
        self.state
    }
}

impl SpdyFrameHandler for SessionCore {
    fn syn_stream_frame_received(
        &mut self,
        stream_id: u32,
        _associated_stream_id: u32,
        _priority: u8,
        _fin: bool,
        _unidirectional: bool,
        header_block: Bytes,
    ) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        // The block must pass through the decompressor even though the push
        // is refused, or the shared context falls out of step with the peer.
        if let Err(error) = self.decompressor.decompress(&header_block) {
            self.fatal = Some(error);
            return;
        }
        if stream_id > self.last_peer_stream_id {
            self.last_peer_stream_id = stream_id;
        }
        debug!(key = %self.key, stream_id, "refusing server push");
        self.writer
            .write_rst_stream(stream_id, frame::RST_REFUSED_STREAM);
    }

    fn syn_reply_frame_received(&mut self, stream_id: u32, fin: bool, header_block: Bytes) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        // Decompress before any stream lookup, for the same context reason.
        let pairs = match self.decompressor.decompress(&header_block) {
            Ok(pairs) => pairs,
            Err(error) => {
                self.fatal = Some(error);
                return;
            }
        };
        let Some(mut stream) = self.streams.remove(&stream_id) else {
            self.writer
                .write_rst_stream(stream_id, frame::RST_INVALID_STREAM);
            return;
        };
        if stream.headers_delivered {
            self.writer
                .write_rst_stream(stream_id, frame::RST_STREAM_IN_USE);
            stream.error();
            stream
                .callback
                .on_error(&SpdyError::FrameProtocolError("duplicate SYN_REPLY".into()));
            self.on_stream_removed();
            return;
        }
        match SpdyResponse::from_name_values(pairs) {
            Ok(response) => {
                stream.headers_delivered = true;
                stream.callback.on_response_headers(&response);
                stream.on_reply(fin);
                self.finish_or_insert(stream);
            }
            Err(error) => {
                self.writer
                    .write_rst_stream(stream_id, frame::RST_PROTOCOL_ERROR);
                stream.error();
                stream.callback.on_error(&error);
                self.on_stream_removed();
            }
        }
    }

    fn rst_stream_frame_received(&mut self, stream_id: u32, status: u32) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        let Some(mut stream) = self.streams.remove(&stream_id) else {
            // resets may race the stream's own completion
            return;
        };
        debug!(key = %self.key, stream_id, status, "stream reset by peer");
        stream.error();
        stream.callback.on_error(&SpdyError::from_rst_status(status));
        self.on_stream_removed();
    }

    fn settings_frame_received(&mut self, _clear_persisted: bool, settings: Vec<(u32, u8, u32)>) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        for (id, _flags, value) in settings {
            match id {
                frame::SETTINGS_INITIAL_WINDOW_SIZE => {
                    // applies to streams opened after this frame
                    self.initial_send_window = (value as i64).min(MAX_WINDOW);
                }
                frame::SETTINGS_MAX_CONCURRENT_STREAMS => {
                    self.max_concurrent = Some(value);
                }
                _ => {}
            }
        }
        self.try_start_pending();
    }

    fn ping_frame_received(&mut self, id: u32) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        // Server pings carry even ids and are echoed back verbatim. An odd
        // id would be an echo of a ping of ours, and we send none.
        if id % 2 == 0 {
            self.writer.write_ping(id);
        }
    }

    fn goaway_frame_received(&mut self, last_good_stream_id: u32, status: u32) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        debug!(key = %self.key, last_good_stream_id, status, "goaway received");
        self.goaway_received = Some(last_good_stream_id);
        let doomed: Vec<u32> = self
            .streams
            .keys()
            .copied()
            .filter(|id| *id > last_good_stream_id)
            .collect();
        for id in doomed {
            if let Some(mut stream) = self.streams.remove(&id) {
                stream.error();
                stream
                    .callback
                    .on_error(&SpdyError::ConnectionFailed("session is going away".into()));
            }
        }
        for mut fetch in self.pending.drain(..) {
            fetch
                .callback
                .on_error(&SpdyError::ConnectionFailed("session is going away".into()));
        }
        if self.streams.is_empty() {
            self.state = ConnectState::Closed;
        }
    }

    fn headers_frame_received(&mut self, stream_id: u32, fin: bool, header_block: Bytes) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        // Parsed for context continuity; trailing headers are not surfaced.
        if let Err(error) = self.decompressor.decompress(&header_block) {
            self.fatal = Some(error);
            return;
        }
        let Some(mut stream) = self.streams.remove(&stream_id) else {
            self.writer
                .write_rst_stream(stream_id, frame::RST_INVALID_STREAM);
            return;
        };
        if !stream.headers_delivered {
            self.writer
                .write_rst_stream(stream_id, frame::RST_PROTOCOL_ERROR);
            stream.error();
            stream
                .callback
                .on_error(&SpdyError::FrameProtocolError("HEADERS before SYN_REPLY".into()));
            self.on_stream_removed();
            return;
        }
        if fin {
            stream.on_remote_fin();
        }
        self.finish_or_insert(stream);
    }

    fn window_update_frame_received(&mut self, stream_id: u32, delta: u32) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        if stream_id == frame::SESSION_FLOW_CONTROL_STREAM_ID {
            if self.send_window + delta as i64 > MAX_WINDOW {
                self.fatal = Some(SpdyError::FlowControlViolation { stream_id: 0 });
                return;
            }
            self.send_window += delta as i64;
            let mut waiting: Vec<u32> = self
                .streams
                .iter()
                .filter(|(_, s)| s.body_remaining() > 0)
                .map(|(id, _)| *id)
                .collect();
            waiting.sort_unstable();
            for id in waiting {
                if self.send_window <= 0 {
                    break;
                }
                self.pump_stream(id);
            }
            return;
        }
        let Some(mut stream) = self.streams.remove(&stream_id) else {
            // stale update for a stream that already finished
            return;
        };
        if stream.send_window + delta as i64 > MAX_WINDOW {
            self.writer
                .write_rst_stream(stream_id, frame::RST_FLOW_CONTROL_ERROR);
            stream.error();
            stream
                .callback
                .on_error(&SpdyError::FlowControlViolation { stream_id });
            self.on_stream_removed();
            return;
        }
        stream.send_window += delta as i64;
        self.streams.insert(stream_id, stream);
        self.pump_stream(stream_id);
    }

    fn data_frame_received(&mut self, stream_id: u32, fin: bool, data: Bytes) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        let len = data.len();
        // Session-level accounting first; a violation here is fatal.
        if len as i64 > self.recv_window {
            self.fatal = Some(SpdyError::FlowControlViolation {
                stream_id: frame::SESSION_FLOW_CONTROL_STREAM_ID,
            });
            return;
        }
        self.recv_window -= len as i64;

        let Some(mut stream) = self.streams.remove(&stream_id) else {
            self.writer
                .write_rst_stream(stream_id, frame::RST_INVALID_STREAM);
            self.replenish_session_window(len);
            return;
        };
        if len as i64 > stream.recv_window {
            // stream-scoped violation, the session survives
            self.writer
                .write_rst_stream(stream_id, frame::RST_FLOW_CONTROL_ERROR);
            stream.error();
            stream
                .callback
                .on_error(&SpdyError::FlowControlViolation { stream_id });
            self.replenish_session_window(len);
            self.on_stream_removed();
            return;
        }
        if !stream.headers_delivered {
            self.writer
                .write_rst_stream(stream_id, frame::RST_PROTOCOL_ERROR);
            stream.error();
            stream
                .callback
                .on_error(&SpdyError::FrameProtocolError("DATA before SYN_REPLY".into()));
            self.replenish_session_window(len);
            self.on_stream_removed();
            return;
        }

        stream.recv_window -= len as i64;
        if len > 0 {
            let consumed = stream.callback.on_response_data(&data).min(len);
            stream.recv_window += consumed as i64;
            if consumed > 0 && !fin && !stream.remote_closed() {
                self.writer.write_window_update(stream_id, consumed as u32);
            }
        }
        self.replenish_session_window(len);
        if fin {
            stream.on_remote_fin();
        }
        self.finish_or_insert(stream);
    }

    fn frame_error(&mut self, _status: u32, _stream_id: u32, message: String) {
        if self.fatal.is_some() || self.state.is_terminal() {
            return;
        }
        self.fatal = Some(SpdyError::FrameProtocolError(message));
    }
}

/// The session task: connect, then shuttle bytes between the transport and
/// the core until a terminal state. Evicts itself from the pool on exit.
pub(crate) async fn run_session(
    pool: Arc<PoolInner>,
    key: SessionKey,
    generation: u64,
    secure: bool,
    mut rx: UnboundedReceiver<SessionCommand>,
) {
    let mut core = SessionCore::new(key.clone());
    core.set_state(ConnectState::Connecting);
    debug!(%key, "session connecting");

    let tcp = match net::connect_tcp(&key).await {
        Ok(tcp) => tcp,
        Err(error) => {
            core.set_state(ConnectState::Error);
            fail_queued(&mut rx, &error);
            pool::evict(&pool, &key, generation);
            return;
        }
    };
    if secure {
        core.set_state(ConnectState::TlsHandshake);
    }
    let (mut transport, negotiated) = match net::negotiate(tcp, &key, secure).await {
        Ok(established) => established,
        Err(error) => {
            core.set_state(ConnectState::Error);
            fail_queued(&mut rx, &error);
            pool::evict(&pool, &key, generation);
            return;
        }
    };
    if !negotiated {
        core.set_state(ConnectState::NotSpdy);
        debug!(%key, "peer did not negotiate spdy/3.1");
        not_spdy_queued(&mut rx);
        pool::evict(&pool, &key, generation);
        return;
    }
    core.set_state(ConnectState::Connected);
    debug!(%key, secure, "session established");

    drive(&mut core, &mut transport, &mut rx).await;

    fail_queued(
        &mut rx,
        &SpdyError::ConnectionFailed("session is closed".into()),
    );
    pool::evict(&pool, &key, generation);
}

async fn drive(
    core: &mut SessionCore,
    transport: &mut SpdyTransport,
    rx: &mut UnboundedReceiver<SessionCommand>,
) {
    let mut read_buf = BytesMut::with_capacity(16 * 1024);
    loop {
        while core.has_output() {
            let out = core.take_output();
            if transport.write_all(&out).await.is_err() || transport.flush().await.is_err() {
                core.connection_lost();
                return;
            }
        }
        if core.is_terminal() {
            return;
        }
        tokio::select! {
            command = rx.recv() => match command {
                Some(command) => core.handle_command(command),
                // every handle dropped: nothing can reach this session again
                None => {
                    core.reset_streams_and_goaway();
                }
            },
            read = transport.read_buf(&mut read_buf) => match read {
                Ok(0) | Err(_) => {
                    core.connection_lost();
                    return;
                }
                Ok(_) => core.receive(&mut read_buf),
            },
        }
    }
}

/// Drain queued commands after the session stopped accepting work.
fn fail_queued(rx: &mut UnboundedReceiver<SessionCommand>, error: &SpdyError) {
    rx.close();
    while let Ok(command) = rx.try_recv() {
        match command {
            SessionCommand::Fetch(mut fetch) => fetch.callback.on_error(error),
            SessionCommand::Cancel { .. } | SessionCommand::Consumed { .. } => {}
            SessionCommand::Shutdown { reply } => {
                let _ = reply.send(0);
            }
        }
    }
}

fn not_spdy_queued(rx: &mut UnboundedReceiver<SessionCommand>) {
    rx.close();
    while let Ok(command) = rx.try_recv() {
        match command {
            SessionCommand::Fetch(mut fetch) => {
                let identifier = fetch.identifier.clone();
                fetch.callback.on_not_spdy_error(&identifier);
            }
            SessionCommand::Cancel { .. } | SessionCommand::Consumed { .. } => {}
            SessionCommand::Shutdown { reply } => {
                let _ = reply.send(0);
            }
        }
    }
}
