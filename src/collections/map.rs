use std::marker::PhantomData;

use super::Key;
use crate::encoding::{Decode, Encode};
use crate::store::{self, Read, Write};
use crate::{Error, Result};

/// A typed map over the entries of a store under a single prefix byte.
///
/// A `Map` holds no data itself. Keys are encoded with [Key] after the
/// prefix and values with [Encode], and every read or write goes to the
/// store passed in, so a map over a buffered store sees the buffered writes.
pub struct Map<K, V> {
    prefix: u8,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Map<K, V> {}

impl<K, V> std::fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map").field("prefix", &self.prefix).finish()
    }
}

impl<K, V> Map<K, V> {
    pub const fn new(prefix: u8) -> Self {
        Map {
            prefix,
            marker: PhantomData,
        }
    }
}

impl<K: Key, V: Encode + Decode> Map<K, V> {
    fn store_key<P: Key>(&self, key: &P) -> Vec<u8> {
        let mut bytes = vec![self.prefix];
        key.append_key(&mut bytes);
        bytes
    }

    /// Gets the value for the given key, or `None` if the key has no value.
    pub fn get<S: Read>(&self, store: &S, key: &K) -> Result<Option<V>> {
        store
            .get(&self.store_key(key))?
            .map(|bytes| V::decode(bytes.as_slice()))
            .transpose()
    }

    pub fn contains_key<S: Read>(&self, store: &S, key: &K) -> Result<bool> {
        Ok(store.get(&self.store_key(key))?.is_some())
    }

    pub fn insert<S: Write>(&self, store: &mut S, key: &K, value: &V) -> Result<()> {
        store.put(self.store_key(key), value.encode()?)
    }

    pub fn remove<S: Write>(&self, store: &mut S, key: &K) -> Result<()> {
        store.delete(&self.store_key(key))
    }

    /// Iterates over every entry in key order.
    pub fn iter<'a, S: Read>(&self, store: &'a S) -> Iter<'a, S, K, V> {
        Iter {
            inner: store.iter_prefix(&[self.prefix]),
            marker: PhantomData,
        }
    }

    /// Iterates over the entries whose keys start with `prefix`, in key
    /// order. `prefix` is usually the leading components of a tuple key.
    pub fn iter_prefix<'a, S: Read, P: Key>(&self, store: &'a S, prefix: &P) -> Iter<'a, S, K, V> {
        Iter {
            inner: store.iter_prefix(&self.store_key(prefix)),
            marker: PhantomData,
        }
    }

    /// Counts the entries without decoding them.
    pub fn len<S: Read>(&self, store: &S) -> Result<u64> {
        let mut len = 0;
        for entry in store.iter_prefix(&[self.prefix]) {
            entry?;
            len += 1;
        }
        Ok(len)
    }
}

/// An iterator over the decoded entries of a [Map].
pub struct Iter<'a, S: Read, K, V> {
    inner: store::Iter<'a, S>,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<'a, S: Read, K: Key, V: Decode> Iterator for Iter<'a, S, K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(entry.and_then(|(key, value)| {
            // skip the prefix byte
            let (key, rest) = K::read_key(&key[1..])?;
            if !rest.is_empty() {
                return Err(Error::Store("Unexpected trailing key bytes".into()));
            }
            Ok((key, V::decode(value.as_slice())?))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::Address;
    use crate::store::MapStore;

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    #[test]
    fn insert_get_remove() -> Result<()> {
        let mut store = MapStore::new();
        let map: Map<Address, u64> = Map::new(7);

        assert!(map.get(&store, &addr(1))?.is_none());
        map.insert(&mut store, &addr(1), &5)?;
        assert_eq!(map.get(&store, &addr(1))?, Some(5));
        assert!(map.contains_key(&store, &addr(1))?);
        let mut raw_key = vec![7u8];
        raw_key.extend_from_slice(&[1; 20]);
        assert_eq!(store.get(&raw_key)?, Some(5u64.encode()?));

        map.remove(&mut store, &addr(1))?;
        assert!(!map.contains_key(&store, &addr(1))?);
        Ok(())
    }

    #[test]
    fn iter_stays_within_prefix() -> Result<()> {
        let mut store = MapStore::new();
        let map: Map<(Address, Address), u64> = Map::new(7);
        let other: Map<Address, u64> = Map::new(8);
        map.insert(&mut store, &(addr(2), addr(1)), &21)?;
        map.insert(&mut store, &(addr(1), addr(3)), &13)?;
        map.insert(&mut store, &(addr(1), addr(2)), &12)?;
        other.insert(&mut store, &addr(1), &1)?;

        let all: Vec<_> = map.iter(&store).collect::<Result<_>>()?;
        assert_eq!(
            all,
            vec![
                ((addr(1), addr(2)), 12),
                ((addr(1), addr(3)), 13),
                ((addr(2), addr(1)), 21),
            ]
        );

        let first: Vec<_> = map.iter_prefix(&store, &addr(1)).collect::<Result<_>>()?;
        assert_eq!(first.len(), 2);
        assert_eq!(map.len(&store)?, 3);
        assert_eq!(other.len(&store)?, 1);
        Ok(())
    }
}
