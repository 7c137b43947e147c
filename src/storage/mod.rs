// Local durable storage

pub mod kv;

pub use kv::{KvError, KvStore};
