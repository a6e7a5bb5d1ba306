/*
 * response.rs
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

//! Response status and header set, parsed from a decompressed SYN_REPLY
//! name/value block.

use crate::error::SpdyError;

/// Response delivered by `on_response_headers`: status code plus the ordered
/// header list (the `:status` and `:version` magic headers are consumed into
/// `status` and `version`, the rest are kept verbatim).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpdyResponse {
    pub status: u16,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl SpdyResponse {
    /// Build from a decompressed name/value list. A missing or malformed
    /// `:status` is a per-stream header parse failure.
    pub(crate) fn from_name_values(
        pairs: Vec<(String, String)>,
    ) -> Result<SpdyResponse, SpdyError> {
        let mut status = None;
        let mut version = String::new();
        let mut headers = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            match name.as_str() {
                ":status" => {
                    // ":status" is "200" or "200 OK"; the code is the leading token
                    let code = value
                        .split(' ')
                        .next()
                        .and_then(|t| t.parse::<u16>().ok())
                        .ok_or_else(|| {
                            SpdyError::InvalidResponseHeaders(format!("bad :status {:?}", value))
                        })?;
                    status = Some(code);
                }
                ":version" => version = value,
                _ => headers.push((name, value)),
            }
        }
        let status = status
            .ok_or_else(|| SpdyError::InvalidResponseHeaders("missing :status".into()))?;
        Ok(SpdyResponse {
            status,
            version,
            headers,
        })
    }

    /// First value for a header name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nv(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_status_with_reason() {
        let r = SpdyResponse::from_name_values(nv(&[
            (":status", "200 OK"),
            (":version", "HTTP/1.1"),
            ("content-type", "text/html"),
        ]))
        .unwrap();
        assert_eq!(r.status, 200);
        assert_eq!(r.version, "HTTP/1.1");
        assert_eq!(r.header("Content-Type"), Some("text/html"));
    }

    #[test]
    fn missing_status_is_invalid() {
        let err = SpdyResponse::from_name_values(nv(&[(":version", "HTTP/1.1")])).unwrap_err();
        assert!(matches!(err, SpdyError::InvalidResponseHeaders(_)));
    }

    #[test]
    fn non_numeric_status_is_invalid() {
        assert!(SpdyResponse::from_name_values(nv(&[(":status", "abc")])).is_err());
    }
}
