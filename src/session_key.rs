/*
 * session_key.rs
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

//! Session key: normalized (host, port) identifying one pooled session.

/// Identifies one origin and thus one pooled session. Host is normalized to
/// lowercase; an absent port resolves to 443. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    host: String,
    port: u16,
}

impl SessionKey {
    pub fn new(host: &str, port: Option<u16>) -> Self {
        Self {
            host: host.to_ascii_lowercase(),
            port: port.unwrap_or(443),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
