/*
 * request.rs
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

//! Request: method, target, ordered headers, optional body.
//!
//! Built via RequestBuilder; sending is done by the session the pool routes
//! the request to. Header order is preserved on the wire.

use bytes::Bytes;

use crate::error::SpdyError;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Other(&'static str),
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Other(s) => s,
        }
    }
}

/// Mutable request builder: method, target, headers, body.
///
/// Obtain from `RequestBuilder::get(url)` or `RequestBuilder::new(method,
/// url)`, add headers, optionally set a body, then hand it to
/// `SessionPool::fetch_request`.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub method: Method,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Ordered name/value pairs; names are lowercased when sent.
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl RequestBuilder {
    pub fn new(method: Method, url: &str) -> Result<Self, SpdyError> {
        let (scheme, host, port, path) = split_url(url)?;
        Ok(Self {
            method,
            scheme,
            host,
            port,
            path,
            headers: Vec::new(),
            body: None,
        })
    }

    /// GET with synthesized default headers.
    pub fn get(url: &str) -> Result<Self, SpdyError> {
        Self::new(Method::Get, url)
    }

    /// Append a header. Repeated names are allowed and order is preserved.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body. The final body chunk carries the FIN flag.
    pub fn body(&mut self, data: impl Into<Bytes>) -> &mut Self {
        self.body = Some(data.into());
        self
    }

    pub(crate) fn url_string(&self) -> String {
        let default_port = if self.scheme == "http" { 80 } else { 443 };
        if self.port == default_port {
            format!("{}://{}{}", self.scheme, self.host, self.path)
        } else {
            format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
        }
    }

    /// The ordered name/value list sent in SYN_STREAM: the five magic
    /// SPDY/3 headers first, then user headers with lowercased names.
    pub(crate) fn name_values(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(5 + self.headers.len());
        pairs.push((":method".into(), self.method.as_str().to_string()));
        pairs.push((":path".into(), self.path.clone()));
        pairs.push((":version".into(), "HTTP/1.1".into()));
        pairs.push((":host".into(), host_header(&self.scheme, &self.host, self.port)));
        pairs.push((":scheme".into(), self.scheme.clone()));
        for (name, value) in &self.headers {
            pairs.push((name.to_ascii_lowercase(), value.clone()));
        }
        pairs
    }
}

fn host_header(scheme: &str, host: &str, port: u16) -> String {
    let default_port = if scheme == "http" { 80 } else { 443 };
    if port == default_port {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    }
}

/// Split an absolute URL into (scheme, host, port, path-with-query).
fn split_url(url: &str) -> Result<(String, String, u16, String), SpdyError> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| SpdyError::InvalidUrl(format!("missing scheme: {}", url)))?;
    let scheme = scheme.to_ascii_lowercase();
    if scheme != "https" && scheme != "http" {
        return Err(SpdyError::InvalidUrl(format!("unsupported scheme: {}", scheme)));
    }
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], rest[i..].to_string()),
        None => (rest, "/".to_string()),
    };
    if authority.is_empty() {
        return Err(SpdyError::InvalidUrl(format!("missing host: {}", url)));
    }
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => {
            let port = p
                .parse::<u16>()
                .map_err(|_| SpdyError::InvalidUrl(format!("bad port: {}", p)))?;
            (h.to_string(), port)
        }
        None => {
            let default = if scheme == "http" { 80 } else { 443 };
            (authority.to_string(), default)
        }
    };
    if host.is_empty() {
        return Err(SpdyError::InvalidUrl(format!("missing host: {}", url)));
    }
    Ok((scheme, host, port, path))
}
