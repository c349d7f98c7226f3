//! A maturity queue of items bucketed by timestamp.
use super::Map;
use crate::store::{Read, Store};
use crate::Result;
use borsh::{BorshDeserialize, BorshSerialize};

/// Items keyed by the time they mature at, backed by a [Map] from timestamp
/// to bucket.
///
/// A bucket holds its items in insertion order and holds each item at most
/// once. Buckets are read in time order and only as far as needed.
pub struct Queue<T> {
    buckets: Map<u64, Vec<T>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Queue<T> {}

impl<T> Queue<T> {
    pub const fn new(prefix: u8) -> Self {
        Queue {
            buckets: Map::new(prefix),
        }
    }
}

impl<T> Queue<T>
where
    T: BorshSerialize + BorshDeserialize + PartialEq,
{
    /// The items maturing at exactly `time`.
    pub fn bucket<S: Read>(&self, store: &S, time: u64) -> Result<Vec<T>> {
        Ok(self.buckets.get(store, &time)?.unwrap_or_default())
    }

    pub fn insert<S: Store>(&self, store: &mut S, time: u64, item: T) -> Result<()> {
        let mut bucket = self.bucket(&*store, time)?;
        if bucket.contains(&item) {
            return Ok(());
        }
        bucket.push(item);
        self.buckets.insert(store, &time, &bucket)
    }

    pub fn remove<S: Store>(&self, store: &mut S, time: u64, item: &T) -> Result<()> {
        let mut bucket = match self.buckets.get(&*store, &time)? {
            Some(bucket) => bucket,
            None => return Ok(()),
        };
        bucket.retain(|entry| entry != item);
        if bucket.is_empty() {
            self.buckets.remove(store, &time)
        } else {
            self.buckets.insert(store, &time, &bucket)
        }
    }

    /// Every bucket with a timestamp at or before `upto`, in time order.
    pub fn timeslices<S: Read>(&self, store: &S, upto: u64) -> Result<Vec<(u64, Vec<T>)>> {
        let mut slices = vec![];
        for entry in self.buckets.iter(store) {
            let (time, bucket) = entry?;
            if time > upto {
                break;
            }
            slices.push((time, bucket));
        }
        Ok(slices)
    }

    /// Every queued item matching `filter`, across all buckets regardless of
    /// maturity, in drain order and without duplicates.
    pub fn items<S: Read, F>(&self, store: &S, filter: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let mut items: Vec<T> = vec![];
        for (_, bucket) in self.timeslices(store, u64::MAX)? {
            for item in bucket {
                if filter(&item) && !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }

    /// Removes every bucket at or before `now` and returns their items in
    /// drain order, without duplicates.
    pub fn dequeue_matured<S: Store>(&self, store: &mut S, now: u64) -> Result<Vec<T>> {
        let mut items: Vec<T> = vec![];
        for (time, bucket) in self.timeslices(&*store, now)? {
            self.buckets.remove(store, &time)?;
            for item in bucket {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }
}
