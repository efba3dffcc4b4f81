//! Content codecs (identity, gzip, deflate, brotli).
//!
//! # Design Decisions
//! - Closed set of encodings selected from the `Content-Encoding` label
//! - Unknown labels fall back to identity instead of failing the response
//! - Decode and encode work on whole in-memory buffers; no codec state
//!   survives a call

use std::fmt;
use std::io::{self, Read, Write};

use axum::http::{header, HeaderMap};
use bytes::Bytes;
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use thiserror::Error;

/// Brotli quality used when re-encoding (0-11).
const BROTLI_QUALITY: i32 = 6;
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Error raised by a codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The body is not a valid stream for its declared encoding.
    #[error("failed to decode {encoding} body: {source}")]
    Decode {
        encoding: ContentEncoding,
        #[source]
        source: io::Error,
    },

    /// Compressing the rewritten body failed.
    #[error("failed to encode {encoding} body: {source}")]
    Encode {
        encoding: ContentEncoding,
        #[source]
        source: io::Error,
    },
}

/// Transfer encoding of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
    Deflate,
    Brotli,
}

impl ContentEncoding {
    /// Map a `Content-Encoding` label (case-insensitive).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => ContentEncoding::Gzip,
            "deflate" => ContentEncoding::Deflate,
            "br" => ContentEncoding::Brotli,
            _ => ContentEncoding::Identity,
        }
    }

    /// Read the encoding from response headers. Missing or non-ASCII
    /// values are identity.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_label)
            .unwrap_or_default()
    }

    /// The `Content-Encoding` label for this encoding.
    pub fn label(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Brotli => "br",
        }
    }

    /// Fully decode `data` into a plain buffer.
    pub fn decode(&self, data: Bytes) -> Result<Bytes, CodecError> {
        let decoded = match self {
            ContentEncoding::Identity => return Ok(data),
            ContentEncoding::Gzip => read_all(MultiGzDecoder::new(&data[..])),
            ContentEncoding::Deflate => read_all(ZlibDecoder::new(&data[..])),
            ContentEncoding::Brotli => {
                read_all(brotli::Decompressor::new(&data[..], BROTLI_BUFFER_SIZE))
            }
        };
        decoded.map(Bytes::from).map_err(|source| CodecError::Decode {
            encoding: *self,
            source,
        })
    }

    /// Fully encode `data`. The returned buffer's length is the exact
    /// encoded byte length.
    pub fn encode(&self, data: Vec<u8>) -> Result<Bytes, CodecError> {
        let encoded = match self {
            ContentEncoding::Identity => return Ok(Bytes::from(data)),
            ContentEncoding::Gzip => compress_gzip(&data),
            ContentEncoding::Deflate => compress_zlib(&data),
            ContentEncoding::Brotli => compress_brotli(&data),
        };
        encoded.map(Bytes::from).map_err(|source| CodecError::Encode {
            encoding: *self,
            source,
        })
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn read_all<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

fn compress_gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn compress_zlib(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn compress_brotli(data: &[u8]) -> io::Result<Vec<u8>> {
    let params = brotli::enc::BrotliEncoderParams {
        quality: BROTLI_QUALITY,
        ..Default::default()
    };
    let mut writer =
        brotli::CompressorWriter::with_params(Vec::new(), BROTLI_BUFFER_SIZE, &params);
    writer.write_all(data)?;
    writer.flush()?;
    // into_inner finishes the stream but drops any error from that final
    // write; writing into a Vec cannot fail.
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const ALL: [ContentEncoding; 4] = [
        ContentEncoding::Identity,
        ContentEncoding::Gzip,
        ContentEncoding::Deflate,
        ContentEncoding::Brotli,
    ];

    #[test]
    fn test_labels_are_case_insensitive() {
        assert_eq!(ContentEncoding::from_label("GZIP"), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_label("x-gzip"), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_label("Deflate"), ContentEncoding::Deflate);
        assert_eq!(ContentEncoding::from_label("BR"), ContentEncoding::Brotli);
        assert_eq!(ContentEncoding::from_label("identity"), ContentEncoding::Identity);
    }

    #[test]
    fn test_unknown_label_is_identity() {
        assert_eq!(ContentEncoding::from_label("zstd"), ContentEncoding::Identity);
        assert_eq!(ContentEncoding::from_label(""), ContentEncoding::Identity);

        let mut headers = HeaderMap::new();
        assert_eq!(ContentEncoding::from_headers(&headers), ContentEncoding::Identity);
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("compress"));
        assert_eq!(ContentEncoding::from_headers(&headers), ContentEncoding::Identity);
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("Gzip"));
        assert_eq!(ContentEncoding::from_headers(&headers), ContentEncoding::Gzip);
    }

    #[test]
    fn test_round_trip() {
        let long = "これは 1234 円です\n".repeat(500);
        let samples: [&[u8]; 4] = [
            b"",
            b"This is 1234 YEN",
            &[0u8, 1, 2, 255, 254, 253],
            long.as_bytes(),
        ];
        for encoding in ALL {
            for sample in samples {
                let encoded = encoding.encode(sample.to_vec()).unwrap();
                let decoded = encoding.decode(encoded).unwrap();
                assert_eq!(&decoded[..], sample, "round trip failed for {encoding}");
            }
        }
    }

    #[test]
    fn test_identity_is_pass_through() {
        let data = Bytes::from_static(b"plain");
        assert_eq!(ContentEncoding::Identity.decode(data.clone()).unwrap(), data);
        assert_eq!(
            ContentEncoding::Identity.encode(b"plain".to_vec()).unwrap(),
            data
        );
    }

    #[test]
    fn test_compressed_output_differs_from_input() {
        let body = "abcabcabc".repeat(100).into_bytes();
        for encoding in [ContentEncoding::Gzip, ContentEncoding::Deflate, ContentEncoding::Brotli] {
            let encoded = encoding.encode(body.clone()).unwrap();
            assert!(encoded.len() < body.len(), "{encoding} did not compress");
        }
    }

    #[test]
    fn test_gzip_magic_bytes() {
        let encoded = ContentEncoding::Gzip.encode(b"hello".to_vec()).unwrap();
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_decode_rejects_wrong_magic() {
        let garbage = Bytes::from_static(b"definitely not compressed");
        for encoding in [ContentEncoding::Gzip, ContentEncoding::Deflate, ContentEncoding::Brotli] {
            let err = encoding.decode(garbage.clone()).unwrap_err();
            assert!(matches!(err, CodecError::Decode { encoding: e, .. } if e == encoding));
        }
    }

    #[test]
    fn test_decode_rejects_truncated_stream() {
        let body = "This is 1234 YEN\n".repeat(200).into_bytes();
        for encoding in [ContentEncoding::Gzip, ContentEncoding::Deflate, ContentEncoding::Brotli] {
            let encoded = encoding.encode(body.clone()).unwrap();
            for cut in [encoded.len() / 2, encoded.len() - 1] {
                let err = encoding.decode(encoded.slice(..cut)).unwrap_err();
                assert!(
                    matches!(err, CodecError::Decode { encoding: e, .. } if e == encoding),
                    "{encoding} accepted a stream cut at {cut}"
                );
            }
        }
    }
}
