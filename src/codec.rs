use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::errors::Result;

/// Hadoop class names the built-in registry understands.
pub mod names {
    pub const GZIP: &str = "org.apache.hadoop.io.compress.GzipCodec";
    pub const DEFAULT: &str = "org.apache.hadoop.io.compress.DefaultCodec";
    pub const SNAPPY: &str = "org.apache.hadoop.io.compress.SnappyCodec";
    pub const LZ4: &str = "org.apache.hadoop.io.compress.Lz4Codec";
    pub const ZSTD: &str = "org.apache.hadoop.io.compress.ZStandardCodec";
}

/// Decompresses one serialized buffer section of a row group.
///
/// `uncompressed_len` is the expected output size, or 0 when unknown
/// (key buffers carry no uncompressed-length tag); implementations may
/// use it as a capacity hint, the caller validates exact sizes.
pub trait Codec: Send + Sync {
    fn name(&self) -> &str;
    fn decompress(&self, src: &[u8], uncompressed_len: usize) -> Result<Vec<u8>>;
}

/// Maps codec class names from file headers to implementations,
/// replacing the class-name reflection the Java implementation uses.
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(names::GZIP, Arc::new(GzipCodec));
        registry.register(names::DEFAULT, Arc::new(DeflateCodec));
        registry.register(names::SNAPPY, Arc::new(SnappyCodec));
        registry.register(names::LZ4, Arc::new(Lz4Codec));
        registry.register(names::ZSTD, Arc::new(ZstdCodec));
        registry
    }
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    pub fn register(&mut self, class_name: impl Into<String>, codec: Arc<dyn Codec>) {
        self.codecs.insert(class_name.into(), codec);
    }

    pub fn resolve(&self, class_name: &str) -> Result<Arc<dyn Codec>> {
        self.codecs
            .get(class_name)
            .cloned()
            .ok_or_else(|| codec_err!("unknown compression codec {}", class_name))
    }
}

/// `GzipCodec` writes plain gzip streams.
struct GzipCodec;

impl Codec for GzipCodec {
    fn name(&self) -> &str {
        names::GZIP
    }

    fn decompress(&self, src: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(uncompressed_len);
        flate2::read::MultiGzDecoder::new(src)
            .read_to_end(&mut out)
            .map_err(|e| codec_err!("gzip decompression failed: {}", e))?;
        Ok(out)
    }
}

/// `DefaultCodec` writes zlib streams.
struct DeflateCodec;

impl Codec for DeflateCodec {
    fn name(&self) -> &str {
        names::DEFAULT
    }

    fn decompress(&self, src: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(uncompressed_len);
        flate2::read::ZlibDecoder::new(src)
            .read_to_end(&mut out)
            .map_err(|e| codec_err!("zlib decompression failed: {}", e))?;
        Ok(out)
    }
}

struct ZstdCodec;

impl Codec for ZstdCodec {
    fn name(&self) -> &str {
        names::ZSTD
    }

    fn decompress(&self, src: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>> {
        zstd::stream::decode_all(src).map_err(|e| codec_err!("zstd decompression failed: {}", e))
    }
}

/// `SnappyCodec` and `Lz4Codec` wrap their block formats in Hadoop's
/// `BlockCompressorStream` framing: a big-endian uncompressed block
/// length followed by length-prefixed compressed chunks until the
/// block is reproduced.
struct SnappyCodec;

impl Codec for SnappyCodec {
    fn name(&self) -> &str {
        names::SNAPPY
    }

    fn decompress(&self, src: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        decode_block_stream(self.name(), src, uncompressed_len, |chunk, _remaining| {
            snap::raw::Decoder::new()
                .decompress_vec(chunk)
                .map_err(|e| codec_err!("snappy decompression failed: {}", e))
        })
    }
}

struct Lz4Codec;

impl Codec for Lz4Codec {
    fn name(&self) -> &str {
        names::LZ4
    }

    fn decompress(&self, src: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        decode_block_stream(self.name(), src, uncompressed_len, |chunk, remaining| {
            lz4::block::decompress(chunk, Some(remaining as i32))
                .map_err(|e| codec_err!("lz4 decompression failed: {}", e))
        })
    }
}

fn decode_block_stream(
    name: &str,
    src: &[u8],
    uncompressed_len: usize,
    decompress_chunk: impl Fn(&[u8], usize) -> Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(uncompressed_len);
    let mut pos = 0;
    while pos < src.len() {
        let block_len = read_be_u32(name, src, &mut pos)? as usize;
        let mut remaining = block_len;
        while remaining > 0 {
            let chunk_len = read_be_u32(name, src, &mut pos)? as usize;
            let chunk = src
                .get(pos..pos + chunk_len)
                .ok_or_else(|| codec_err!("{} chunk runs past end of input", name))?;
            pos += chunk_len;
            let decoded = decompress_chunk(chunk, remaining)?;
            if decoded.len() > remaining {
                return Err(codec_err!(
                    "{} chunk decoded to {} bytes, block had {} left",
                    name,
                    decoded.len(),
                    remaining
                ));
            }
            remaining -= decoded.len();
            out.extend_from_slice(&decoded);
        }
    }
    Ok(out)
}

fn read_be_u32(name: &str, src: &[u8], pos: &mut usize) -> Result<u32> {
    let bytes = src
        .get(*pos..*pos + 4)
        .ok_or_else(|| codec_err!("{} framing runs past end of input", name))?;
    *pos += 4;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
