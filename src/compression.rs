//! Payload decompression for danmu segments served zlib-compressed.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::debug;

use crate::error::Result;

/// Inflate a zlib stream into raw bytes
pub fn inflate_zlib(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder.read_to_end(&mut out)?;

    debug!(
        compressed = data.len(),
        inflated = out.len(),
        "Inflated zlib payload"
    );

    Ok(out)
}
