/// Result type returned by the kvgate library.
pub type Result<T> = std::result::Result<T, KvGateError>;

/// Error returned by the kvgate library.
#[derive(Debug, Fail)]
pub enum KvGateError {
    /// Failure reported by the sled storage engine.
    #[fail(display = "storage engine failure")]
    Storage {
        /// Underlying sled error.
        #[cause]
        c: sled::Error,
    },

    /// A concurrent transaction touched the same keys. The engine retries
    /// the transaction, callers never see this.
    #[fail(display = "transaction conflict")]
    Conflict,

    /// Failure when opening the storage path.
    #[fail(display = "failed to open database {}", name)]
    OpenFailure {
        /// Underlying sled error.
        #[cause]
        c: sled::Error,
        /// Path of the database.
        name: String,
    },

    /// Another process kept the database locked past the startup deadline.
    #[fail(display = "database {} still locked after {}ms", name, waited_ms)]
    LockTimeout {
        /// Path of the database.
        name: String,
        /// How long we waited for the lock.
        waited_ms: u128,
    },

    /// Failure binding the http listener.
    #[fail(display = "failed to listen on {}: {}", addr, reason)]
    BindFailure {
        /// Address we tried to bind.
        addr: String,
        /// Reason reported by the http server.
        reason: String,
    },

    /// Failure building the rayon pool.
    #[fail(display = "failed to build thread pool")]
    ThreadPoolBuild {
        /// Underlying rayon error.
        #[cause]
        c: rayon::ThreadPoolBuildError,
    },

    /// Invalid configuration value.
    #[fail(display = "invalid value {:?} for {}", value, name)]
    InvalidConfig {
        /// Name of the setting.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// Io failure.
    #[fail(display = "io failure")]
    Io {
        /// Underlying io Error.
        #[cause]
        c: std::io::Error,
    },
}

impl From<sled::Error> for KvGateError {
    fn from(c: sled::Error) -> KvGateError {
        KvGateError::Storage { c }
    }
}

impl From<std::io::Error> for KvGateError {
    fn from(c: std::io::Error) -> KvGateError {
        KvGateError::Io { c }
    }
}
