use log::error;

use crate::network::{Key, Rejection, Req};
use crate::{KvsEngine, Result};

/// Response produced for a single request.
///
/// Engine failures map to fixed bodies, the engine's error text stays in the
/// server log.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    /// Health probe answered.
    Healthy,
    /// Value written.
    Stored,
    /// Value read, possibly empty.
    Value(Vec<u8>),
    /// Key removed.
    Deleted,
    /// Every pair, already rendered as `k1:v1,k2:v2`.
    Listing(Vec<u8>),
    /// Required `key` parameter missing or empty.
    MissingKey,
    /// Key does not exist.
    NotFound,
    /// Write transaction failed.
    WriteFailed,
    /// Read transaction failed.
    ReadFailed,
    /// Delete transaction failed.
    DeleteFailed,
    /// No such route.
    UnknownRoute,
    /// Route exists but not for this method.
    MethodNotAllowed,
}

impl Reply {
    /// HTTP status code.
    pub fn status(&self) -> u16 {
        match self {
            Reply::Healthy
            | Reply::Stored
            | Reply::Value(_)
            | Reply::Deleted
            | Reply::Listing(_) => 200,
            Reply::MissingKey => 400,
            Reply::NotFound | Reply::UnknownRoute => 404,
            Reply::MethodNotAllowed => 405,
            Reply::WriteFailed | Reply::ReadFailed | Reply::DeleteFailed => 500,
        }
    }

    /// Plain text body, always terminated by a single newline.
    pub fn body(&self) -> Vec<u8> {
        let mut body = match self {
            Reply::Healthy => b"ok".to_vec(),
            Reply::Stored => b"stored".to_vec(),
            Reply::Value(v) | Reply::Listing(v) => v.clone(),
            Reply::Deleted => b"deleted".to_vec(),
            Reply::MissingKey => b"missing key".to_vec(),
            Reply::NotFound => b"not found".to_vec(),
            Reply::WriteFailed => b"write failed".to_vec(),
            Reply::ReadFailed => b"read failed".to_vec(),
            Reply::DeleteFailed => b"delete failed".to_vec(),
            Reply::UnknownRoute => b"404 page not found".to_vec(),
            Reply::MethodNotAllowed => b"method not allowed".to_vec(),
        };
        body.push(b'\n');
        body
    }
}

impl From<Rejection> for Reply {
    fn from(r: Rejection) -> Reply {
        match r {
            Rejection::MissingKey => Reply::MissingKey,
            Rejection::UnknownRoute => Reply::UnknownRoute,
            Rejection::MethodNotAllowed => Reply::MethodNotAllowed,
        }
    }
}

/// Gateway opens exactly one transaction per request against the engine it
/// owns and turns the outcome into a `Reply`.
///
/// # Example
///
/// ``` rust
/// use kvgate::memory::MemoryKvsEngine;
/// use kvgate::{Gateway, Key, Reply};
///
/// let gateway = Gateway::new(MemoryKvsEngine::new());
/// let key = Key::new("key1").unwrap();
///
/// assert_eq!(gateway.store(&key, ""), Reply::Stored);
/// assert_eq!(gateway.retrieve(&key), Reply::Value(vec![]));
/// assert_eq!(gateway.delete(&key), Reply::Deleted);
/// assert_eq!(gateway.retrieve(&key), Reply::NotFound);
/// ```
#[derive(Clone)]
pub struct Gateway<E: KvsEngine> {
    engine: E,
}

impl<E: KvsEngine> Gateway<E> {
    /// Wrap the given engine.
    pub fn new(engine: E) -> Gateway<E> {
        Gateway { engine }
    }

    /// The engine requests are run against.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Parse and serve a raw request.
    pub fn handle(&self, method: &str, target: &str) -> Reply {
        match Req::parse(method, target) {
            Ok(req) => self.dispatch(req),
            Err(rejection) => rejection.into(),
        }
    }

    /// Serve an already validated request.
    pub fn dispatch(&self, req: Req) -> Reply {
        match req {
            Req::Health => self.health(),
            Req::Store(key, value) => self.store(&key, value),
            Req::Retrieve(key) => self.retrieve(&key),
            Req::Delete(key) => self.delete(&key),
            Req::AllKeys => self.list_all(),
        }
    }

    /// Liveness probe, never touches the engine.
    pub fn health(&self) -> Reply {
        Reply::Healthy
    }

    /// Overwrite whatever `key` held with `value`.
    pub fn store(&self, key: &Key, value: impl AsRef<[u8]>) -> Reply {
        let value = value.as_ref();
        let res = self.engine.update(|tx| tx.put(key.as_bytes(), value));

        match res {
            Ok(()) => Reply::Stored,
            Err(e) => {
                error!("failed to store key '{}': {}", key, e);
                Reply::WriteFailed
            }
        }
    }

    /// Look up `key`. An empty value is still a value.
    pub fn retrieve(&self, key: &Key) -> Reply {
        match self.engine.view(|tx| tx.get(key.as_bytes())) {
            Ok(Some(value)) => Reply::Value(value),
            Ok(None) => Reply::NotFound,
            Err(e) => {
                error!("failed to retrieve key '{}': {}", key, e);
                Reply::ReadFailed
            }
        }
    }

    /// Remove `key` if present. Presence check and removal share one write
    /// transaction.
    pub fn delete(&self, key: &Key) -> Reply {
        let res = self.engine.update(|tx| {
            if tx.get(key.as_bytes())?.is_none() {
                return Ok(false);
            }
            tx.delete(key.as_bytes())?;
            Ok(true)
        });

        match res {
            Ok(true) => Reply::Deleted,
            Ok(false) => Reply::NotFound,
            Err(e) => {
                error!("failed to delete key '{}': {}", key, e);
                Reply::DeleteFailed
            }
        }
    }

    /// Render every pair as `key:value`, joined by `,`.
    pub fn list_all(&self) -> Reply {
        match self.engine.view(|tx| render_pairs(tx.iter())) {
            Ok(listing) => Reply::Listing(listing),
            Err(e) => {
                error!("failed to list keys: {}", e);
                Reply::ReadFailed
            }
        }
    }
}

fn render_pairs(pairs: crate::Pairs<'_>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (i, pair) in pairs.enumerate() {
        let (k, v) = pair?;
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(&k);
        out.push(b':');
        out.extend_from_slice(&v);
    }
    Ok(out)
}
