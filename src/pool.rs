/*
 * pool.rs
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

//! Session pool: one session per (host, port), created on first use.
//!
//! The pool holds only command senders; each session's state lives in its
//! own task. A session that reaches a terminal state evicts itself, guarded
//! by a generation counter so a replacement spawned in the meantime is never
//! removed by its predecessor's eviction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::oneshot;
use tracing::debug;

use crate::callback::{RequestCallback, RequestIdentifier};
use crate::error::SpdyError;
use crate::request::RequestBuilder;
use crate::session::{self, PendingFetch, SessionCommand};
use crate::session_key::SessionKey;

struct SessionHandle {
    generation: u64,
    commands: UnboundedSender<SessionCommand>,
}

pub(crate) struct PoolInner {
    sessions: Mutex<HashMap<SessionKey, SessionHandle>>,
    next_token: AtomicU64,
    next_generation: AtomicU64,
}

/// Entry point of the engine. Cheap to clone; all clones share the same
/// sessions. Requests to the same origin multiplex over one connection.
///
/// `fetch` is synchronous and must be called within a tokio runtime, since
/// a missing session is spawned on the spot.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PoolInner {
                sessions: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(1),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// GET the given URL, reporting progress to `callback`. Returns a handle
    /// that identifies the request and can cancel it.
    pub fn fetch(
        &self,
        url: &str,
        callback: Box<dyn RequestCallback>,
    ) -> Result<RequestIdentifier, SpdyError> {
        self.fetch_request(RequestBuilder::get(url)?, callback)
    }

    /// Issue an arbitrary request. The session is keyed on the request's
    /// host and port and created if none exists.
    pub fn fetch_request(
        &self,
        request: RequestBuilder,
        callback: Box<dyn RequestCallback>,
    ) -> Result<RequestIdentifier, SpdyError> {
        let key = SessionKey::new(&request.host, Some(request.port));
        let secure = request.scheme != "http";
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let url = request.url_string();

        let sender = self.sender_for(&key, secure);
        let identifier = RequestIdentifier::new(url.clone(), token, sender.clone());
        let fetch = PendingFetch {
            token,
            request,
            identifier: identifier.clone(),
            callback,
        };
        let rejected = match sender.send(SessionCommand::Fetch(fetch)) {
            Ok(()) => return Ok(identifier),
            Err(error) => error.0,
        };

        // The session task exited between lookup and send. Its self-eviction
        // may not have landed yet, so force a replacement and retry once.
        debug!(%key, "session task gone, respawning");
        let sender = self.sender_for(&key, secure);
        let identifier = RequestIdentifier::new(url, token, sender.clone());
        let rejected = match rejected {
            SessionCommand::Fetch(mut fetch) => {
                fetch.identifier = identifier.clone();
                SessionCommand::Fetch(fetch)
            }
            other => other,
        };
        sender
            .send(rejected)
            .map_err(|_| SpdyError::ConnectionFailed("session task unavailable".into()))?;
        Ok(identifier)
    }

    /// Shut down every pooled session: each sends GOAWAY and cancels its
    /// streams. Returns the total number of requests aborted.
    pub async fn close_all_sessions(&self) -> usize {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.inner.sessions.lock().unwrap();
            sessions.drain().map(|(_, handle)| handle).collect()
        };
        let mut aborted = 0;
        for handle in handles {
            let (tx, rx) = oneshot::channel();
            if handle
                .commands
                .send(SessionCommand::Shutdown { reply: tx })
                .is_ok()
            {
                if let Ok(count) = rx.await {
                    aborted += count;
                }
            }
        }
        aborted
    }

    /// Live session handle for the key, spawning a session if the slot is
    /// empty or its task has exited.
    fn sender_for(&self, key: &SessionKey, secure: bool) -> UnboundedSender<SessionCommand> {
        let mut sessions = self.inner.sessions.lock().unwrap();
        if let Some(handle) = sessions.get(key) {
            if !handle.commands.is_closed() {
                return handle.commands.clone();
            }
        }
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        sessions.insert(
            key.clone(),
            SessionHandle {
                generation,
                commands: tx.clone(),
            },
        );
        debug!(%key, generation, "spawning session");
        tokio::spawn(session::run_session(
            self.inner.clone(),
            key.clone(),
            generation,
            secure,
            rx,
        ));
        tx
    }

    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.inner.sessions.lock().unwrap().len()
    }
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove the session's own pool entry. The generation guard keeps a dead
/// session from evicting the replacement that already took its slot.
pub(crate) fn evict(inner: &PoolInner, key: &SessionKey, generation: u64) {
    let mut sessions = inner.sessions.lock().unwrap();
    if sessions.get(key).map(|h| h.generation) == Some(generation) {
        debug!(%key, generation, "session evicted");
        sessions.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_handle(pool: &SessionPool, key: &SessionKey, generation: u64) -> UnboundedSender<SessionCommand> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::mem::forget(rx); // keep the sender open without a task
        pool.inner.sessions.lock().unwrap().insert(
            key.clone(),
            SessionHandle {
                generation,
                commands: tx.clone(),
            },
        );
        tx
    }

    #[test]
    fn eviction_respects_generations() {
        let pool = SessionPool::new();
        let key = SessionKey::new("example.com", None);
        insert_handle(&pool, &key, 2);

        // a stale predecessor must not remove its replacement
        evict(&pool.inner, &key, 1);
        assert_eq!(pool.session_count(), 1);

        evict(&pool.inner, &key, 2);
        assert_eq!(pool.session_count(), 0);
    }

    #[test]
    fn fetch_rejects_bad_urls_without_creating_sessions() {
        let pool = SessionPool::new();
        struct Never;
        impl RequestCallback for Never {
            fn on_connect(&mut self, _: &RequestIdentifier) {}
            fn on_response_headers(&mut self, _: &crate::response::SpdyResponse) {}
            fn on_response_data(&mut self, data: &[u8]) -> usize {
                data.len()
            }
            fn on_stream_close(&mut self) {}
            fn on_error(&mut self, _: &SpdyError) {}
        }
        let result = pool.fetch("not a url", Box::new(Never));
        assert!(matches!(result, Err(SpdyError::InvalidUrl(_))));
        assert_eq!(pool.session_count(), 0);
    }

    #[tokio::test]
    async fn close_all_sessions_sums_aborted_requests() {
        let pool = SessionPool::new();
        for (host, count) in [("a.example", 2usize), ("b.example", 3usize)] {
            let key = SessionKey::new(host, None);
            let (tx, mut rx) = mpsc::unbounded_channel();
            pool.inner.sessions.lock().unwrap().insert(
                key,
                SessionHandle {
                    generation: 0,
                    commands: tx,
                },
            );
            // stand-in for a session task answering the shutdown
            tokio::spawn(async move {
                while let Some(command) = rx.recv().await {
                    if let SessionCommand::Shutdown { reply } = command {
                        let _ = reply.send(count);
                    }
                }
            });
        }
        assert_eq!(pool.close_all_sessions().await, 5);
        assert_eq!(pool.session_count(), 0);
    }
}
