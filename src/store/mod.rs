//! Key/value storage primitives the ledger persists into.
use crate::Result;

mod bufstore;
mod iter;
mod mapstore;

pub use bufstore::{BufStore, Map};
pub use iter::Iter;
pub use mapstore::MapStore;

/// A key/value entry.
pub type KV = (Vec<u8>, Vec<u8>);

/// Trait for read access to key/value stores.
pub trait Read {
    /// Gets the value for the given key, or `None` if the key has no value.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Gets the first entry whose key is strictly greater than `key`.
    fn get_next(&self, key: &[u8]) -> Result<Option<KV>>;

    /// Iterates over all entries whose key extends `prefix`, in ascending key
    /// order.
    #[inline]
    fn iter_prefix(&self, prefix: &[u8]) -> Iter<'_, Self>
    where
        Self: Sized,
    {
        Iter::new(self, prefix.to_vec())
    }
}

/// Trait for write access to key/value stores.
pub trait Write {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    fn delete(&mut self, key: &[u8]) -> Result<()>;
}

/// A store which can be both read from and written to.
pub trait Store: Read + Write {}

impl<S: Read + Write> Store for S {}

/// A store which buffers writes and can apply or drop them as a unit.
pub trait Flush {
    fn flush(&mut self) -> Result<()>;
}

impl<S: Read> Read for &S {
    #[inline]
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    #[inline]
    fn get_next(&self, key: &[u8]) -> Result<Option<KV>> {
        (**self).get_next(key)
    }
}

impl<S: Read> Read for &mut S {
    #[inline]
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    #[inline]
    fn get_next(&self, key: &[u8]) -> Result<Option<KV>> {
        (**self).get_next(key)
    }
}

impl<S: Write> Write for &mut S {
    #[inline]
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        (**self).put(key, value)
    }

    #[inline]
    fn delete(&mut self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }
}
