#![deny(missing_docs)]

//! # kvgate
//! `kvgate` exposes a persistent key value store to local callers over plain
//! HTTP GET requests.

pub use error::{KvGateError, Result};
pub use gateway::{Gateway, Reply};
pub use network::{Key, Rejection, Req};

#[macro_use]
extern crate failure_derive;

/// Errors thrown by kvgate.
pub mod error;

/// Server configuration.
pub mod config;

/// Translation of requests into engine transactions.
pub mod gateway;

/// Request types parsed off the wire.
pub mod network;

/// HTTP front end.
pub mod server;

/// Worker pools requests are scheduled on.
pub mod thread_pool;

/// Bindings for sled database.
pub mod sled;

/// Volatile engine keeping the bucket in memory.
pub mod memory;

/// Lazy sequence of key value pairs produced by a read transaction.
pub type Pairs<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Read access to the bucket inside a read transaction.
///
/// Everything handed out is owned by the caller and stays valid after the
/// transaction ends.
pub trait ReadTxn {
    /// Returns the value of the given key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    /// Walks every pair of the bucket exactly once.
    fn iter(&self) -> Pairs<'_>;
}

/// Read and write access to the bucket inside a write transaction.
pub trait WriteTxn {
    /// Returns the value of the given key, including writes staged earlier in
    /// the same transaction.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    /// Sets the value for the given key.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Removes the given key.
    fn delete(&self, key: &[u8]) -> Result<()>;
}

/// KvsEngine represents the transactional storage used by the Gateway.
///
/// Write transactions are mutually exclusive with each other. Read
/// transactions observe a consistent snapshot and never a partially applied
/// write. A handle is cheap to clone and all clones share the same bucket.
pub trait KvsEngine: Clone + Send + Sync + 'static {
    /// Run `f` inside a read transaction.
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>;

    /// Run `f` inside a write transaction and commit it.
    ///
    /// `f` may be invoked more than once when the engine retries after a
    /// conflict. Its writes become visible only if it returns `Ok`.
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>;
}
