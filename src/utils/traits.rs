use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Fixed-width little-endian encoding for on-disk metadata structures.
///
/// The legacy bincode config writes every integer fixed-width little-endian
/// and arrays without length prefixes, so the encoded bytes match the
/// documented layout exactly, independent of host alignment or padding.
pub trait DiskEncode: Serialize + DeserializeOwned {
    /// Encode `self` into the front of `buf`.
    /// # Returns
    /// The number of bytes written if successful.
    fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        let config = bincode::config::legacy();
        Ok(bincode::serde::encode_into_slice(self, buf, config)?)
    }

    /// Decode a value from the front of `buf`.
    fn decode_from(buf: &[u8]) -> Result<Self> {
        let config = bincode::config::legacy();
        let (value, _bytes_read) = bincode::serde::decode_from_slice(buf, config)?;
        Ok(value)
    }
}
