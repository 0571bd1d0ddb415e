use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::{KvsEngine, Pairs, ReadTxn, WriteTxn};

type Bucket = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory engine. Nothing survives the process.
///
/// Write transactions stage their changes and apply them only once the
/// transaction closure succeeded.
#[derive(Clone, Default)]
pub struct MemoryKvsEngine {
    bucket: Arc<RwLock<Bucket>>,
}

impl MemoryKvsEngine {
    /// Return an empty engine.
    pub fn new() -> MemoryKvsEngine {
        MemoryKvsEngine::default()
    }
}

impl KvsEngine for MemoryKvsEngine {
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        let bucket = self.bucket.read();
        f(&MemoryReadTxn { bucket: &*bucket })
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>,
    {
        let mut bucket = self.bucket.write();

        let txn = MemoryWriteTxn {
            bucket: &*bucket,
            staged: RefCell::new(BTreeMap::new()),
        };
        let out = f(&txn)?;
        let staged = txn.staged.into_inner();

        for (k, v) in staged {
            match v {
                Some(v) => bucket.insert(k, v),
                None => bucket.remove(&k),
            };
        }

        Ok(out)
    }
}

struct MemoryReadTxn<'a> {
    bucket: &'a Bucket,
}

impl ReadTxn for MemoryReadTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.bucket.get(key).cloned())
    }

    fn iter(&self) -> Pairs<'_> {
        Box::new(
            self.bucket
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.clone()))),
        )
    }
}

struct MemoryWriteTxn<'a> {
    bucket: &'a Bucket,
    // None marks a removal.
    staged: RefCell<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.staged.borrow().get(key) {
            return Ok(staged.clone());
        }
        Ok(self.bucket.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.staged
            .borrow_mut()
            .insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.staged.borrow_mut().insert(key.to_vec(), None);
        Ok(())
    }
}
