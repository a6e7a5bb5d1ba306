/*
 * callback.rs
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

//! Request callback interface (push model) and the request identifier
//! returned by `fetch`.
//!
//! Events for one stream arrive in order and never concurrently:
//! `on_connect` → optional `on_request_bytes_sent` (×n) →
//! `on_response_headers` → `on_response_data` (×n) → `on_stream_close`,
//! or exactly one of `on_not_spdy_error` / `on_error` as the terminal event.
//! After a terminal event no further callbacks fire for that stream.

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::SpdyError;
use crate::response::SpdyResponse;
use crate::session::SessionCommand;

/// Handle for one in-flight request. Cheap to clone; `close` cancels the
/// request from any thread by marshaling onto the owning session's task.
#[derive(Clone)]
pub struct RequestIdentifier {
    url: std::sync::Arc<str>,
    token: u64,
    commands: UnboundedSender<SessionCommand>,
}

impl RequestIdentifier {
    pub(crate) fn new(url: String, token: u64, commands: UnboundedSender<SessionCommand>) -> Self {
        Self {
            url: url.into(),
            token,
            commands,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cancel the request. Cooperative: a request already in a terminal state
    /// ignores this; an in-flight request gets exactly one
    /// `on_error(RequestCancelled)` and nothing after it.
    pub fn close(&self) {
        let _ = self.commands.send(SessionCommand::Cancel { token: self.token });
    }

    /// Return flow-control credit withheld in `on_response_data`. Safe from
    /// any thread; credit for a finished stream is dropped by the session.
    pub(crate) fn replenish(&self, count: usize) {
        let _ = self.commands.send(SessionCommand::Consumed {
            token: self.token,
            count,
        });
    }
}

impl std::fmt::Debug for RequestIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestIdentifier")
            .field("url", &self.url)
            .field("token", &self.token)
            .finish()
    }
}

/// Handler for request events (push model). The session drives this as
/// frames arrive; implementations run on the session task and should not
/// block.
pub trait RequestCallback: Send {
    /// The stream was accepted into an established session and its
    /// SYN_STREAM has been sent.
    fn on_connect(&mut self, identifier: &RequestIdentifier);

    /// Upload progress: `count` body bytes were written to the transport.
    fn on_request_bytes_sent(&mut self, count: usize) {
        let _ = count;
    }

    /// Response status and header set. Invoked exactly once per stream.
    fn on_response_headers(&mut self, response: &SpdyResponse);

    /// One inbound body chunk. The returned consumed length drives inbound
    /// flow-control replenishment: report fewer bytes than delivered and the
    /// peer is throttled accordingly.
    fn on_response_data(&mut self, data: &[u8]) -> usize;

    /// Terminal success: both stream halves closed.
    fn on_stream_close(&mut self);

    /// Protocol negotiation did not select SPDY; retry over a conventional
    /// transport.
    fn on_not_spdy_error(&mut self, identifier: &RequestIdentifier) {
        let _ = identifier;
    }

    /// Terminal failure.
    fn on_error(&mut self, error: &SpdyError);
}

/// Consumer of a fully buffered response.
pub trait BufferedResponseHandler: Send {
    fn on_response(&mut self, response: SpdyResponse, body: Bytes);
    fn on_error(&mut self, error: &SpdyError);
    fn on_not_spdy(&mut self) {}
}

/// Buffers the whole response and delivers it in one call. Composes over
/// `RequestCallback` rather than replacing it: wrap any
/// `BufferedResponseHandler` and pass the result to `fetch`.
pub struct BufferedCallback<H: BufferedResponseHandler> {
    handler: H,
    response: Option<SpdyResponse>,
    body: BytesMut,
}

impl<H: BufferedResponseHandler> BufferedCallback<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            response: None,
            body: BytesMut::new(),
        }
    }
}

impl<H: BufferedResponseHandler> RequestCallback for BufferedCallback<H> {
    fn on_connect(&mut self, _identifier: &RequestIdentifier) {}

    fn on_response_headers(&mut self, response: &SpdyResponse) {
        self.response = Some(response.clone());
    }

    fn on_response_data(&mut self, data: &[u8]) -> usize {
        self.body.extend_from_slice(data);
        data.len()
    }

    fn on_stream_close(&mut self) {
        if let Some(response) = self.response.take() {
            let body = self.body.split().freeze();
            self.handler.on_response(response, body);
        }
    }

    fn on_not_spdy_error(&mut self, _identifier: &RequestIdentifier) {
        self.handler.on_not_spdy();
    }

    fn on_error(&mut self, error: &SpdyError) {
        self.handler.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        responses: Vec<(SpdyResponse, Bytes)>,
        errors: Vec<SpdyError>,
    }

    struct RecordingHandler(Arc<Mutex<Recorded>>);

    impl BufferedResponseHandler for RecordingHandler {
        fn on_response(&mut self, response: SpdyResponse, body: Bytes) {
            self.0.lock().unwrap().responses.push((response, body));
        }
        fn on_error(&mut self, error: &SpdyError) {
            self.0.lock().unwrap().errors.push(error.clone());
        }
    }

    fn response() -> SpdyResponse {
        SpdyResponse {
            status: 200,
            version: "HTTP/1.1".into(),
            headers: vec![("content-type".into(), "text/plain".into())],
        }
    }

    #[test]
    fn buffers_chunks_until_close() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let mut cb = BufferedCallback::new(RecordingHandler(recorded.clone()));
        cb.on_response_headers(&response());
        assert_eq!(cb.on_response_data(b"hello "), 6);
        assert_eq!(cb.on_response_data(b"world"), 5);
        cb.on_stream_close();

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.responses.len(), 1);
        assert_eq!(&recorded.responses[0].1[..], b"hello world");
        assert_eq!(recorded.responses[0].0.status, 200);
    }

    #[test]
    fn error_is_forwarded_without_response() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let mut cb = BufferedCallback::new(RecordingHandler(recorded.clone()));
        cb.on_error(&SpdyError::RequestCancelled);
        let recorded = recorded.lock().unwrap();
        assert!(recorded.responses.is_empty());
        assert_eq!(recorded.errors.len(), 1);
    }
}
