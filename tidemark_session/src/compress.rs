//! Pooled zlib compression for oversized cookie payloads.
//!
//! Compressor and decompressor stream state is expensive to set up, so both
//! are kept in process-wide pools and reset between uses rather than
//! reallocated per request.
use std::io::{self, Write};

use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use object_pool::Pool;
use once_cell::sync::Lazy;

static COMPRESSORS: Lazy<Pool<ZlibEncoder<Vec<u8>>>> = Lazy::new(|| Pool::new(8, new_compressor));

static DECOMPRESSORS: Lazy<Pool<ZlibDecoder<Vec<u8>>>> =
    Lazy::new(|| Pool::new(8, new_decompressor));

fn new_compressor() -> ZlibEncoder<Vec<u8>> {
    ZlibEncoder::new(Vec::new(), Compression::default())
}

fn new_decompressor() -> ZlibDecoder<Vec<u8>> {
    ZlibDecoder::new(Vec::new())
}

/// Compress `data` as a zlib stream, reusing pooled compressor state.
pub(crate) fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = COMPRESSORS.pull(new_compressor);
    // Reset discards whatever the previous checkout left behind.
    encoder.reset(Vec::with_capacity(data.len() / 2))?;
    encoder.write_all(data)?;
    encoder.try_finish()?;
    Ok(std::mem::take(encoder.get_mut()))
}

/// Decompress a zlib stream produced by [`compress`].
pub(crate) fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = DECOMPRESSORS.pull(new_decompressor);
    decoder.reset(Vec::with_capacity(data.len() * 2))?;
    decoder.write_all(data)?;
    decoder.try_finish()?;
    Ok(std::mem::take(decoder.get_mut()))
}
