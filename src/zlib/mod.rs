/*
 * mod.rs
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

//! Shared-dictionary header compression (SPDY/3 section 2.6.10).
//!
//! A session owns two independent deflate contexts, one per direction, each
//! seeded with the fixed dictionary. The contexts are stateful and strictly
//! ordered: the dictionary window evolves across calls, so blocks must be
//! compressed in exactly the order they are transmitted and decompressed in
//! exactly the order they arrive. Both contexts live on the session task and
//! are never touched concurrently.
//!
//! Uncompressed block layout: u32 pair count, then per pair a u32-length-
//! prefixed name and a u32-length-prefixed value, big-endian.

mod dictionary;

pub use dictionary::DICTIONARY;

use bytes::{Buf, BufMut, BytesMut};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::SpdyError;

/// Send-side deflate context, dictionary-seeded. Each `compress` call emits a
/// sync-flushed block so the peer can decode it without waiting for stream
/// end.
pub struct HeaderCompressor {
    ctx: Compress,
}

impl HeaderCompressor {
    pub fn new() -> Self {
        let mut ctx = Compress::new(Compression::default(), true);
        // set_dictionary on a fresh zlib stream cannot fail
        ctx.set_dictionary(DICTIONARY)
            .expect("seeding deflate dictionary");
        Self { ctx }
    }

    /// Serialize and compress one name/value block. Names are sent lowercase
    /// per protocol convention; the caller is responsible for ordering.
    pub fn compress(&mut self, pairs: &[(String, String)]) -> Result<Vec<u8>, SpdyError> {
        let mut plain = BytesMut::new();
        encode_name_values(pairs, &mut plain);

        let mut out = Vec::with_capacity(plain.len() / 2 + 64);
        let mut pos = 0usize;
        loop {
            let before = self.ctx.total_in();
            self.ctx
                .compress_vec(&plain[pos..], &mut out, FlushCompress::Sync)
                .map_err(|e| SpdyError::FrameProtocolError(format!("deflate: {}", e)))?;
            pos += (self.ctx.total_in() - before) as usize;
            // spare output capacity after a sync flush means the flush completed
            if pos == plain.len() && out.len() < out.capacity() {
                break;
            }
            out.reserve((plain.len() - pos).max(256));
        }
        Ok(out)
    }
}

impl Default for HeaderCompressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive-side inflate context. Any failure here is fatal to the whole
/// session: the context cannot be resynchronized mid-stream.
pub struct HeaderDecompressor {
    ctx: Decompress,
}

impl HeaderDecompressor {
    pub fn new() -> Self {
        Self {
            ctx: Decompress::new(true),
        }
    }

    /// Decompress and parse one header block, in arrival order.
    pub fn decompress(&mut self, block: &[u8]) -> Result<Vec<(String, String)>, SpdyError> {
        let mut out = Vec::with_capacity(block.len() * 4 + 64);
        let mut pos = 0usize;
        loop {
            let before = self.ctx.total_in();
            let produced = out.len();
            match self
                .ctx
                .decompress_vec(&block[pos..], &mut out, FlushDecompress::Sync)
            {
                Ok(status) => {
                    let consumed = (self.ctx.total_in() - before) as usize;
                    pos += consumed;
                    if matches!(status, Status::StreamEnd) {
                        // a finished stream must cover the whole block; SPDY
                        // contexts are sync-flushed and never end mid-session
                        if pos < block.len() {
                            return Err(SpdyError::InvalidResponseHeaders(
                                "bytes after end of header stream".into(),
                            ));
                        }
                        break;
                    }
                    if pos == block.len() && out.len() < out.capacity() {
                        break;
                    }
                    // input left but neither side moved: the block is stuck
                    if pos < block.len()
                        && consumed == 0
                        && out.len() == produced
                        && out.len() < out.capacity()
                    {
                        return Err(SpdyError::InvalidResponseHeaders(
                            "header block makes no inflate progress".into(),
                        ));
                    }
                }
                Err(e) if e.needs_dictionary().is_some() => {
                    self.ctx.set_dictionary(DICTIONARY).map_err(|e| {
                        SpdyError::InvalidResponseHeaders(format!("inflate dictionary: {}", e))
                    })?;
                }
                Err(e) => {
                    return Err(SpdyError::InvalidResponseHeaders(format!("inflate: {}", e)))
                }
            }
            out.reserve(out.len().max(4096));
        }
        parse_name_values(&out)
    }
}

impl Default for HeaderDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize name/value pairs into the uncompressed block layout.
pub fn encode_name_values(pairs: &[(String, String)], out: &mut BytesMut) {
    out.put_u32(pairs.len() as u32);
    for (name, value) in pairs {
        out.put_u32(name.len() as u32);
        out.extend_from_slice(name.as_bytes());
        out.put_u32(value.len() as u32);
        out.extend_from_slice(value.as_bytes());
    }
}

/// Parse the uncompressed block layout back into ordered pairs.
pub fn parse_name_values(mut block: &[u8]) -> Result<Vec<(String, String)>, SpdyError> {
    fn get_string(block: &mut &[u8]) -> Result<String, SpdyError> {
        if block.len() < 4 {
            return Err(SpdyError::InvalidResponseHeaders(
                "truncated name/value block".into(),
            ));
        }
        let len = block.get_u32() as usize;
        if block.len() < len {
            return Err(SpdyError::InvalidResponseHeaders(
                "name/value length exceeds block".into(),
            ));
        }
        let s = String::from_utf8(block[..len].to_vec())
            .map_err(|_| SpdyError::InvalidResponseHeaders("non-utf8 header".into()))?;
        block.advance(len);
        Ok(s)
    }

    if block.len() < 4 {
        return Err(SpdyError::InvalidResponseHeaders(
            "truncated name/value block".into(),
        ));
    }
    let count = block.get_u32() as usize;
    let mut pairs = Vec::with_capacity(count.min(128));
    for _ in 0..count {
        let name = get_string(&mut block)?;
        let value = get_string(&mut block)?;
        pairs.push((name, value));
    }
    if !block.is_empty() {
        return Err(SpdyError::InvalidResponseHeaders(
            "trailing bytes after name/value pairs".into(),
        ));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn round_trip_preserves_order() {
        let headers = pairs(&[
            (":method", "GET"),
            (":path", "/index.html"),
            (":host", "example.com"),
            (":scheme", "https"),
            (":version", "HTTP/1.1"),
            ("accept", "text/html"),
            ("accept", "application/xml"),
        ]);
        let mut compressor = HeaderCompressor::new();
        let mut decompressor = HeaderDecompressor::new();
        let block = compressor.compress(&headers).unwrap();
        assert_eq!(decompressor.decompress(&block).unwrap(), headers);
    }

    #[test]
    fn contexts_are_stateful_across_blocks() {
        // matching contexts must round-trip a sequence of blocks in call order
        let mut compressor = HeaderCompressor::new();
        let mut decompressor = HeaderDecompressor::new();
        for i in 0..5 {
            let headers = pairs(&[
                (":status", "200 OK"),
                (":version", "HTTP/1.1"),
                ("x-request", &format!("{}", i)),
            ]);
            let block = compressor.compress(&headers).unwrap();
            assert_eq!(decompressor.decompress(&block).unwrap(), headers);
        }
    }

    #[test]
    fn dictionary_helps_first_block() {
        // common header text should deflate below its plain encoding even on
        // the very first block, which is the point of the shared dictionary
        let headers = pairs(&[
            ("accept-encoding", "gzip,deflate,sdch"),
            ("content-type", "text/html"),
            ("user-agent", "spindrift"),
        ]);
        let mut plain = BytesMut::new();
        encode_name_values(&headers, &mut plain);
        let block = HeaderCompressor::new().compress(&headers).unwrap();
        assert!(block.len() < plain.len());
    }

    #[test]
    fn finished_stream_with_trailing_bytes_is_rejected() {
        // a hostile block must fail fast rather than spin the session task
        let headers = pairs(&[(":status", "200 OK")]);
        let mut plain = BytesMut::new();
        encode_name_values(&headers, &mut plain);
        let mut ctx = Compress::new(Compression::default(), true);
        ctx.set_dictionary(DICTIONARY).unwrap();
        let mut block = Vec::with_capacity(plain.len() + 128);
        ctx.compress_vec(&plain, &mut block, FlushCompress::Finish)
            .unwrap();
        block.extend_from_slice(b"tail");
        let err = HeaderDecompressor::new().decompress(&block).unwrap_err();
        assert!(matches!(err, SpdyError::InvalidResponseHeaders(_)));
    }

    #[test]
    fn finished_stream_covering_the_block_still_decodes() {
        let headers = pairs(&[(":status", "200 OK"), (":version", "HTTP/1.1")]);
        let mut plain = BytesMut::new();
        encode_name_values(&headers, &mut plain);
        let mut ctx = Compress::new(Compression::default(), true);
        ctx.set_dictionary(DICTIONARY).unwrap();
        let mut block = Vec::with_capacity(plain.len() + 128);
        ctx.compress_vec(&plain, &mut block, FlushCompress::Finish)
            .unwrap();
        let decoded = HeaderDecompressor::new().decompress(&block).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn garbage_block_is_invalid_response_headers() {
        let mut decompressor = HeaderDecompressor::new();
        let err = decompressor.decompress(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(matches!(err, SpdyError::InvalidResponseHeaders(_)));
    }

    #[test]
    fn truncated_pair_is_rejected() {
        let mut block = BytesMut::new();
        block.put_u32(2);
        block.put_u32(4);
        block.extend_from_slice(b"name");
        // second pair missing entirely
        block.put_u32(5);
        block.extend_from_slice(b"value");
        assert!(parse_name_values(&block).is_err());
    }

    #[test]
    fn large_header_set_round_trips() {
        let headers: Vec<(String, String)> = (0..200)
            .map(|i| (format!("x-header-{}", i), "v".repeat(i % 97)))
            .collect();
        let mut compressor = HeaderCompressor::new();
        let mut decompressor = HeaderDecompressor::new();
        let block = compressor.compress(&headers).unwrap();
        assert_eq!(decompressor.decompress(&block).unwrap(), headers);
    }
}
