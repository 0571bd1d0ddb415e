use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::RwLock;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree, UnabortableTransactionError,
};
use sled::{Db, Tree};

use crate::error::{KvGateError, Result};
use crate::{KvsEngine, Pairs, ReadTxn, WriteTxn};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Adapter for sled database.
///
/// The bucket is a named sled tree. Writers are serialized through `gate`,
/// and readers hold it shared, so an iteration never interleaves with a
/// commit.
#[derive(Clone)]
pub struct SledKvsEngine {
    // Held so the database outlives every clone of the bucket.
    _db: Db,
    tree: Tree,
    gate: Arc<RwLock<()>>,
}

impl SledKvsEngine {
    /// Open the sled database at `path` and make sure `bucket` exists.
    ///
    /// Waits up to `lock_timeout` for another process to release the
    /// database lock before giving up.
    pub fn open(path: &Path, bucket: &str, lock_timeout: Duration) -> Result<SledKvsEngine> {
        let db = open_db(path, lock_timeout)?;

        // open_tree creates the tree if it does not exist yet.
        let tree = db.open_tree(bucket)?;
        db.flush()?;

        info!("Opened bucket '{}' in '{}'.", bucket, path.display());

        Ok(SledKvsEngine {
            _db: db,
            tree,
            gate: Arc::new(RwLock::new(())),
        })
    }
}

fn open_db(path: &Path, lock_timeout: Duration) -> Result<Db> {
    let start = Instant::now();

    loop {
        let err = match sled::Config::default().path(path).open() {
            Ok(db) => return Ok(db),
            Err(e) => e,
        };

        if !is_lock_contention(&err) {
            return Err(KvGateError::OpenFailure {
                c: err,
                name: path.display().to_string(),
            });
        }

        let waited = start.elapsed();
        if waited >= lock_timeout {
            return Err(KvGateError::LockTimeout {
                name: path.display().to_string(),
                waited_ms: waited.as_millis(),
            });
        }

        debug!("'{}' is locked, retrying.", path.display());
        thread::sleep(LOCK_RETRY_INTERVAL.min(lock_timeout - waited));
    }
}

// sled reports a held file lock as an io error mentioning the lock.
fn is_lock_contention(err: &sled::Error) -> bool {
    match err {
        sled::Error::Io(e) => {
            e.kind() == std::io::ErrorKind::WouldBlock
                || e.to_string().contains("could not acquire lock")
        }
        _ => false,
    }
}

impl KvsEngine for SledKvsEngine {
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        let _shared = self.gate.read();
        f(&SledReadTxn { tree: &self.tree })
    }

    /// The transaction is committed first and flushed afterwards. A failing
    /// flush is logged but does not fail the call: the write is already
    /// visible, and reporting it as failed would contradict what readers see.
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>,
    {
        let _exclusive = self.gate.write();

        let out = self
            .tree
            .transaction(|tx| -> ConflictableTransactionResult<T, KvGateError> {
                f(&SledWriteTxn { tx }).map_err(|e| match e {
                    KvGateError::Conflict => ConflictableTransactionError::Conflict,
                    e => ConflictableTransactionError::Abort(e),
                })
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(c) => KvGateError::Storage { c },
            })?;

        if let Err(e) = self.tree.flush() {
            warn!("committed write not flushed: {}", e);
        }

        Ok(out)
    }
}

struct SledReadTxn<'a> {
    tree: &'a Tree,
}

impl ReadTxn for SledReadTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn iter(&self) -> Pairs<'_> {
        Box::new(self.tree.iter().map(|pair| -> Result<(Vec<u8>, Vec<u8>)> {
            let (k, v) = pair?;
            Ok((k.to_vec(), v.to_vec()))
        }))
    }
}

struct SledWriteTxn<'a> {
    tx: &'a TransactionalTree,
}

impl WriteTxn for SledWriteTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.tx.get(key).map_err(unabortable)?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.tx.insert(key, value).map_err(unabortable)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.tx.remove(key).map_err(unabortable)?;
        Ok(())
    }
}

fn unabortable(e: UnabortableTransactionError) -> KvGateError {
    match e {
        UnabortableTransactionError::Conflict => KvGateError::Conflict,
        UnabortableTransactionError::Storage(c) => KvGateError::Storage { c },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[test]
    fn reopening_keeps_bucket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");

        {
            let engine = SledKvsEngine::open(&path, "kv", TIMEOUT).unwrap();
            engine.update(|tx| tx.put(b"a", b"1")).unwrap();
        }

        let engine = SledKvsEngine::open(&path, "kv", TIMEOUT).unwrap();
        let value = engine.view(|tx| tx.get(b"a")).unwrap();
        assert_eq!(value, Some(b"1".to_vec()));
    }

    #[test]
    fn committed_write_is_visible_and_durable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");

        {
            let engine = SledKvsEngine::open(&path, "kv", TIMEOUT).unwrap();
            let reader = engine.clone();

            engine.update(|tx| tx.put(b"a", b"1")).unwrap();
            assert_eq!(reader.view(|tx| tx.get(b"a")).unwrap(), Some(b"1".to_vec()));

            engine.update(|tx| tx.delete(b"a")).unwrap();
            engine.update(|tx| tx.put(b"b", b"")).unwrap();
        }

        let engine = SledKvsEngine::open(&path, "kv", TIMEOUT).unwrap();
        assert_eq!(engine.view(|tx| tx.get(b"a")).unwrap(), None);
        assert_eq!(engine.view(|tx| tx.get(b"b")).unwrap(), Some(vec![]));
    }

    #[test]
    fn buckets_are_disjoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");

        {
            let engine = SledKvsEngine::open(&path, "kv", TIMEOUT).unwrap();
            engine.update(|tx| tx.put(b"a", b"1")).unwrap();
        }

        let other = SledKvsEngine::open(&path, "sfs", TIMEOUT).unwrap();
        assert_eq!(other.view(|tx| tx.get(b"a")).unwrap(), None);
    }

    #[test]
    fn aborted_update_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let engine = SledKvsEngine::open(&dir.path().join("db"), "kv", TIMEOUT).unwrap();

        let res: Result<()> = engine.update(|tx| {
            tx.put(b"a", b"1")?;
            Err(KvGateError::InvalidConfig {
                name: "test",
                value: String::new(),
            })
        });
        assert!(res.is_err());

        assert_eq!(engine.view(|tx| tx.get(b"a")).unwrap(), None);
    }

    #[test]
    fn second_open_times_out_on_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");

        let _held = SledKvsEngine::open(&path, "kv", TIMEOUT).unwrap();

        let start = Instant::now();
        let res = SledKvsEngine::open(&path, "kv", TIMEOUT);
        assert!(res.is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
