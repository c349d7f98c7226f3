use std::collections::BTreeMap;
use std::ops::Bound;

use super::*;

/// A simple `Store` implementation which persists data in an in-memory map.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct MapStore(BTreeMap<Vec<u8>, Vec<u8>>);

impl MapStore {
    pub fn new() -> MapStore {
        MapStore(BTreeMap::default())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Read for MapStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.0.get(key).cloned())
    }

    fn get_next(&self, key: &[u8]) -> Result<Option<KV>> {
        Ok(self
            .0
            .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }
}

impl Write for MapStore {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.0.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.0.remove(key);
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
        assert_store(MapStore::new());
    }

    #[test]
    fn get_slice() {
        let mut store = MapStore::new();
        store.put(vec![1, 2, 3], vec![4, 5, 6]).unwrap();
        let value = store.get(&[1, 2, 3]).unwrap();
        assert_eq!(value, Some(vec![4, 5, 6]));
    }

    #[test]
    fn delete() {
        let mut store = MapStore::new();
        store.put(vec![1, 2, 3], vec![4, 5, 6]).unwrap();
        store.delete(&[1, 2, 3]).unwrap();
        assert_eq!(store.get(&[1, 2, 3]).unwrap(), None);
    }

    #[test]
    fn get_next() {
        let mut store = MapStore::new();
        store.put(vec![1], vec![10]).unwrap();
        store.put(vec![1, 0], vec![11]).unwrap();
        store.put(vec![3], vec![30]).unwrap();

        assert_eq!(store.get_next(&[]).unwrap(), Some((vec![1], vec![10])));
        assert_eq!(store.get_next(&[1]).unwrap(), Some((vec![1, 0], vec![11])));
        assert_eq!(store.get_next(&[1, 0]).unwrap(), Some((vec![3], vec![30])));
        assert_eq!(store.get_next(&[3]).unwrap(), None);
    }
}
