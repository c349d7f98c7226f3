use std::collections::BTreeMap;
use std::ops::Bound;

use super::*;

/// An in-memory map containing values modified by writes to a `BufStore`.
pub type Map = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Wraps a `Store` and records mutations in an in-memory map, so that
/// modifications do not affect the underlying `Store` until `flush` is called.
///
/// Calling `discard` drops every buffered mutation, leaving the underlying
/// store exactly as it was before the first buffered write.
pub struct BufStore<S> {
    map: Map,
    store: S,
}

impl<S: Default> Default for BufStore<S> {
    fn default() -> Self {
        Self {
            map: Default::default(),
            store: Default::default(),
        }
    }
}

impl<S> BufStore<S> {
    /// Constructs a `BufStore` by wrapping the given store.
    ///
    /// Calls to get will first check the `BufStore` map, and if no entry is
    /// found will be passed to the underlying store.
    pub fn wrap(store: S) -> Self {
        BufStore {
            store,
            map: Default::default(),
        }
    }

    /// Drops all buffered writes.
    pub fn discard(&mut self) {
        self.map.clear();
    }

    /// Returns true if there are writes which have not been flushed.
    pub fn is_dirty(&self) -> bool {
        !self.map.is_empty()
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Consumes the `BufStore`, dropping unflushed writes, and returns the
    /// wrapped store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: Read> Read for BufStore<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.map.get(key) {
            Some(Some(value)) => Ok(Some(value.clone())),
            Some(None) => Ok(None),
            None => self.store.get(key),
        }
    }

    fn get_next(&self, key: &[u8]) -> Result<Option<KV>> {
        let mut cursor = key.to_vec();
        loop {
            let map_next = self
                .map
                .range::<[u8], _>((Bound::Excluded(cursor.as_slice()), Bound::Unbounded))
                .next();
            let backing_next = self.store.get_next(cursor.as_slice())?;

            let (map_key, map_value) = match map_next {
                // consumed map entries, emit backing entry (if any)
                None => return Ok(backing_next),
                Some(entry) => entry,
            };

            // map key > backing key, emit backing entry
            if let Some((backing_key, _)) = &backing_next {
                if backing_key < map_key {
                    return Ok(backing_next);
                }
            }

            // map key <= backing key, map entry shadows backing entry
            match map_value {
                Some(value) => return Ok(Some((map_key.clone(), value.clone()))),
                // map value is a delete, go to next entry
                None => cursor = map_key.clone(),
            }
        }
    }
}

impl<S> Write for BufStore<S> {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.map.insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.map.insert(key.to_vec(), None);
        Ok(())
    }
}

impl<S: Write> Flush for BufStore<S> {
    /// Consumes the `BufStore`'s in-memory buffer and writes all of its values
    /// to the underlying store.
    ///
    /// After calling `flush`, the `BufStore` will still be valid and wrap the
    /// underlying store, but its in-memory buffer will be empty.
    fn flush(&mut self) -> Result<()> {
        while let Some((key, value)) = self.map.pop_first() {
            match value {
                Some(value) => self.store.put(key, value)?,
                None => self.store.delete(key.as_slice())?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfies_store_trait() {
        // (this is a compile-time assertion)
        fn assert_store<S: Store>(_: S) {}
        assert_store(BufStore::wrap(MapStore::new()));
    }

    #[test]
    fn get_shadows_backing() -> Result<()> {
        let mut store = MapStore::new();
        store.put(vec![1, 2, 3], vec![4, 5, 6])?;

        let mut buf = BufStore::wrap(store);
        assert_eq!(buf.get(&[1, 2, 3])?, Some(vec![4, 5, 6]));
        buf.delete(&[1, 2, 3])?;
        assert_eq!(buf.get(&[1, 2, 3])?, None);
        assert_eq!(buf.inner().get(&[1, 2, 3])?, Some(vec![4, 5, 6]));

        Ok(())
    }

    #[test]
    fn iter() -> Result<()> {
        let mut store = MapStore::new();
        store.put(vec![0], vec![0])?;
        store.put(vec![1], vec![0])?;
        store.put(vec![2], vec![0])?;
        store.put(vec![4], vec![0])?;

        let mut buf = BufStore::wrap(store);
        buf.put(vec![1], vec![1])?;
        buf.delete(&[2])?;
        buf.put(vec![3], vec![1])?;

        let entries: Vec<KV> = buf.iter_prefix(&[]).collect::<Result<_>>()?;
        assert_eq!(
            entries,
            vec![
                (vec![0], vec![0]),
                (vec![1], vec![1]),
                (vec![3], vec![1]),
                (vec![4], vec![0]),
            ]
        );

        Ok(())
    }

    #[test]
    fn flush_and_discard() -> Result<()> {
        let mut buf = BufStore::wrap(MapStore::new());
        buf.put(vec![1], vec![1])?;
        buf.flush()?;
        assert_eq!(buf.inner().get(&[1])?, Some(vec![1]));

        buf.put(vec![2], vec![2])?;
        buf.delete(&[1])?;
        assert!(buf.is_dirty());
        buf.discard();
        assert!(!buf.is_dirty());
        assert_eq!(buf.get(&[1])?, Some(vec![1]));
        assert_eq!(buf.get(&[2])?, None);

        Ok(())
    }
}
