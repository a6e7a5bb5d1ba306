/*
 * lib.rs
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

//! Client-side SPDY/3.1 protocol engine.
//!
//! A [`SessionPool`] multiplexes requests to the same origin over one
//! connection. Callers hand a [`RequestCallback`] to [`SessionPool::fetch`]
//! and receive events in order on the owning session's task: `on_connect`,
//! `on_response_headers`, `on_response_data` chunks, and finally exactly one
//! of `on_stream_close`, `on_not_spdy_error`, or `on_error`.
//!
//! ```no_run
//! use spindrift::{BufferedCallback, BufferedResponseHandler, SessionPool, SpdyError, SpdyResponse};
//!
//! struct Print;
//! impl BufferedResponseHandler for Print {
//!     fn on_response(&mut self, response: SpdyResponse, body: bytes::Bytes) {
//!         println!("{} ({} bytes)", response.status, body.len());
//!     }
//!     fn on_error(&mut self, error: &SpdyError) {
//!         eprintln!("{error}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), SpdyError> {
//! let pool = SessionPool::new();
//! pool.fetch("https://example.com/", Box::new(BufferedCallback::new(Print)))?;
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod error;
pub mod frame;
pub mod input_stream;
pub mod net;
pub mod pool;
pub mod request;
pub mod response;
mod session;
pub mod session_key;
pub mod stream;
pub mod zlib;

pub use callback::{BufferedCallback, BufferedResponseHandler, RequestCallback, RequestIdentifier};
pub use error::{RstStatus, SpdyError};
pub use input_stream::{InputStreamCallback, SpdyInputStream};
pub use pool::SessionPool;
pub use request::{Method, RequestBuilder};
pub use response::SpdyResponse;
pub use session_key::SessionKey;
pub use stream::StreamState;
