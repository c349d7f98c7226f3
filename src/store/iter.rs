use super::{Read, KV};
use crate::Result;

/// An iterator over the entries of a store sharing a common key prefix.
///
/// Each step issues a `get_next` against the store, so the iterator observes
/// the store as it was at the time of each step.
pub struct Iter<'a, S: Read> {
    store: &'a S,
    prefix: Vec<u8>,
    cursor: Vec<u8>,
    done: bool,
}

impl<'a, S: Read> Iter<'a, S> {
    pub fn new(store: &'a S, prefix: Vec<u8>) -> Self {
        Iter {
            store,
            cursor: prefix.clone(),
            prefix,
            done: false,
        }
    }
}

impl<'a, S: Read> Iterator for Iter<'a, S> {
    type Item = Result<KV>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.store.get_next(self.cursor.as_slice()) {
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Ok(Some((key, value))) => {
                if !key.starts_with(self.prefix.as_slice()) {
                    self.done = true;
                    return None;
                }
                self.cursor = key.clone();
                Some(Ok((key, value)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn iter_prefix() -> crate::Result<()> {
        let mut store = MapStore::new();
        store.put(vec![99], vec![123])?;
        store.put(vec![100, 1], vec![2])?;
        store.put(vec![100, 2], vec![3])?;
        store.put(vec![101, 1, 2, 3], vec![123])?;

        let entries: Vec<KV> = store.iter_prefix(&[100]).collect::<crate::Result<_>>()?;
        assert_eq!(entries, vec![(vec![100, 1], vec![2]), (vec![100, 2], vec![3])]);

        assert_eq!(store.iter_prefix(&[102]).count(), 0);

        Ok(())
    }
}
