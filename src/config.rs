use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{App, AppSettings, Arg, ArgMatches};

use crate::error::{KvGateError, Result};
use crate::thread_pool::PoolKind;

/// Engine backing the bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    /// Durable sled database.
    Sled,
    /// Volatile in-memory map.
    Memory,
}

impl FromStr for EngineKind {
    type Err = KvGateError;

    fn from_str(s: &str) -> Result<EngineKind> {
        match s {
            "sled" => Ok(EngineKind::Sled),
            "memory" => Ok(EngineKind::Memory),
            _ => Err(KvGateError::InvalidConfig {
                name: "engine",
                value: s.to_owned(),
            }),
        }
    }
}

/// Server configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Address the http listener binds to.
    pub addr: SocketAddr,
    /// Location of the database.
    pub db_path: PathBuf,
    /// Name of the bucket holding all pairs.
    pub bucket: String,
    /// Engine backing the bucket.
    pub engine: EngineKind,
    /// Pool requests are scheduled on.
    pub pool: PoolKind,
    /// Number of worker threads.
    pub threads: u32,
    /// How long to wait at startup for another process to release the
    /// database lock.
    pub lock_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 6060),
            db_path: PathBuf::from("reststore.db"),
            bucket: "kv".to_owned(),
            engine: EngineKind::Sled,
            pool: PoolKind::Shared,
            threads: default_threads(),
            lock_timeout: Duration::from_secs(1),
        }
    }
}

fn default_threads() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}

/// Command line definition of the server.
pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("kvgate-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg(
            Arg::with_name("PORT")
                .index(1)
                .help("port to listen on")
                .default_value("6060"),
        )
        .arg(
            Arg::with_name("DB_PATH")
                .index(2)
                .help("location of the database")
                .default_value("reststore.db"),
        )
        .arg(
            Arg::with_name("host")
                .long("host")
                .takes_value(true)
                .help("address to listen on")
                .default_value("127.0.0.1"),
        )
        .arg(
            Arg::with_name("bucket")
                .long("bucket")
                .takes_value(true)
                .help("name of the bucket holding all pairs")
                .default_value("kv"),
        )
        .arg(
            Arg::with_name("engine")
                .long("engine")
                .takes_value(true)
                .help("specify database engine")
                .possible_values(&["sled", "memory"])
                .default_value("sled"),
        )
        .arg(
            Arg::with_name("pool")
                .long("pool")
                .takes_value(true)
                .help("specify worker pool")
                .possible_values(&["shared", "rayon", "naive"])
                .default_value("shared"),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .takes_value(true)
                .help("number of worker threads [default: number of cpus]"),
        )
        .arg(
            Arg::with_name("lock-timeout-ms")
                .long("lock-timeout-ms")
                .takes_value(true)
                .help("how long to wait for the database lock at startup")
                .default_value("1000"),
        )
}

impl Config {
    /// Parse the configuration from command line arguments, the first one
    /// being the program name.
    pub fn from_args<I, T>(args: I) -> Result<Config>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app()
            .get_matches_from_safe(args)
            .map_err(|e| KvGateError::InvalidConfig {
                name: "arguments",
                value: e.message,
            })?;
        Config::from_matches(&matches)
    }

    /// Build the configuration out of parsed arguments.
    pub fn from_matches(matches: &ArgMatches) -> Result<Config> {
        let default = Config::default();

        let port: u16 = parse(matches, "PORT")?.unwrap_or(default.addr.port());
        let host: IpAddr = parse(matches, "host")?.unwrap_or(default.addr.ip());

        let threads = parse(matches, "threads")?.unwrap_or(default.threads);
        if threads == 0 {
            return Err(KvGateError::InvalidConfig {
                name: "threads",
                value: "0".to_owned(),
            });
        }

        let lock_timeout = parse(matches, "lock-timeout-ms")?
            .map(Duration::from_millis)
            .unwrap_or(default.lock_timeout);

        let bucket = matches
            .value_of("bucket")
            .map(str::to_owned)
            .unwrap_or(default.bucket);
        if bucket.is_empty() {
            return Err(KvGateError::InvalidConfig {
                name: "bucket",
                value: bucket,
            });
        }

        Ok(Config {
            addr: SocketAddr::new(host, port),
            db_path: matches
                .value_of_os("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.db_path),
            bucket,
            engine: parse(matches, "engine")?.unwrap_or(default.engine),
            pool: parse(matches, "pool")?.unwrap_or(default.pool),
            threads,
            lock_timeout,
        })
    }
}

fn parse<T: FromStr>(matches: &ArgMatches, name: &'static str) -> Result<Option<T>> {
    match matches.value_of(name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| KvGateError::InvalidConfig {
                name,
                value: value.to_owned(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_args(vec!["kvgate-server"]).unwrap();
        let default = Config::default();

        assert_eq!(config, default);
        assert_eq!(config.addr.to_string(), "127.0.0.1:6060");
        assert_eq!(config.db_path, PathBuf::from("reststore.db"));
        assert_eq!(config.bucket, "kv");
    }

    #[test]
    fn positional_port_and_path() {
        let config = Config::from_args(vec!["kvgate-server", "7070", "/tmp/other.db"]).unwrap();

        assert_eq!(config.addr.port(), 7070);
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn flags() {
        let config = Config::from_args(vec![
            "kvgate-server",
            "--bucket",
            "sfs",
            "--engine",
            "memory",
            "--pool",
            "rayon",
            "--threads",
            "3",
            "--lock-timeout-ms",
            "250",
            "--host",
            "::1",
        ])
        .unwrap();

        assert_eq!(config.bucket, "sfs");
        assert_eq!(config.engine, EngineKind::Memory);
        assert_eq!(config.pool, PoolKind::Rayon);
        assert_eq!(config.threads, 3);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.addr.to_string(), "[::1]:6060");
    }

    #[test]
    fn rejects_bad_values() {
        for args in &[
            vec!["kvgate-server", "notaport"],
            vec!["kvgate-server", "70000"],
            vec!["kvgate-server", "--threads", "0"],
            vec!["kvgate-server", "--engine", "kvs"],
            vec!["kvgate-server", "--bucket", ""],
        ] {
            assert!(Config::from_args(args.clone()).is_err(), "{:?}", args);
        }
    }
}
