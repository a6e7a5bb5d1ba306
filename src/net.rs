/*
 * net.rs
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

//! Transport plumbing: TCP connect, TLS handshake with ALPN, and the unified
//! stream the session reads and writes. Plaintext exists only as the
//! prior-knowledge path (no negotiation happens without TLS).

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::TlsConnector;

use crate::error::SpdyError;
use crate::session_key::SessionKey;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

pub const ALPN_SPDY: &[u8] = b"spdy/3.1";

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum SpdyTransport {
    Plain(TcpStream),
    Tls(Box<TokioTlsStream<TcpStream>>),
}

impl AsyncRead for SpdyTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            SpdyTransport::Plain(s) => Pin::new(s).poll_read(cx, buf),
            SpdyTransport::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SpdyTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            SpdyTransport::Plain(s) => Pin::new(s).poll_write(cx, buf),
            SpdyTransport::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            SpdyTransport::Plain(s) => Pin::new(s).poll_flush(cx),
            SpdyTransport::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            SpdyTransport::Plain(s) => Pin::new(s).poll_shutdown(cx),
            SpdyTransport::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Root certificate store: platform native certs first, webpki-roots as
/// fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// TLS client config advertising only spdy/3.1 via ALPN.
fn spdy_client_config() -> Arc<ClientConfig> {
    let mut config = ClientConfig::builder()
        .with_root_certificates(build_root_store())
        .with_no_client_auth();
    config.alpn_protocols = vec![ALPN_SPDY.to_vec()];
    Arc::new(config)
}

/// Open the TCP connection for a session.
pub(crate) async fn connect_tcp(key: &SessionKey) -> Result<TcpStream, SpdyError> {
    let addr = format!("{}:{}", key.host(), key.port());
    timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
        .await
        .map_err(|_| SpdyError::ConnectionFailed(format!("connect to {} timed out", addr)))?
        .map_err(|e| SpdyError::ConnectionFailed(format!("connect to {}: {}", addr, e)))
}

/// Upgrade the TCP stream to the session transport. Returns the stream and
/// whether SPDY was negotiated: over TLS that means ALPN selected spdy/3.1;
/// over plaintext SPDY is assumed by prior knowledge.
pub(crate) async fn negotiate(
    tcp: TcpStream,
    key: &SessionKey,
    secure: bool,
) -> Result<(SpdyTransport, bool), SpdyError> {
    if !secure {
        return Ok((SpdyTransport::Plain(tcp), true));
    }

    let addr = format!("{}:{}", key.host(), key.port());
    let server_name: ServerName<'static> = ServerName::try_from(key.host().to_string())
        .map_err(|_| SpdyError::ConnectionFailed(format!("invalid host name {}", key.host())))?;
    let connector = TlsConnector::from(spdy_client_config());
    let tls = timeout(CONNECT_TIMEOUT, connector.connect(server_name, tcp))
        .await
        .map_err(|_| SpdyError::ConnectionFailed(format!("TLS handshake with {} timed out", addr)))?
        .map_err(|e| SpdyError::ConnectionFailed(format!("TLS handshake with {}: {}", addr, e)))?;

    let negotiated = tls
        .get_ref()
        .1
        .alpn_protocol()
        .map(|p| p == ALPN_SPDY)
        .unwrap_or(false);
    Ok((SpdyTransport::Tls(Box::new(tls)), negotiated))
}
