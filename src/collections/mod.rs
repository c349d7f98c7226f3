//! Typed collections over a prefixed region of a key/value store.
mod key;
mod map;
mod queue;

pub use key::Key;
pub use map::{Iter, Map};
pub use queue::Queue;
