use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info};
use tiny_http::{Header, Request, Response};

use crate::config::{Config, EngineKind};
use crate::error::{KvGateError, Result};
use crate::gateway::Gateway;
use crate::memory::MemoryKvsEngine;
use crate::sled::SledKvsEngine;
use crate::thread_pool::{
    NaiveThreadPool, PoolKind, RayonThreadPool, SharedQueueThreadPool, ThreadPool,
};
use crate::KvsEngine;

const CONTENT_TYPE: &[u8] = b"text/plain; charset=utf-8";

/// Represents a gateway server instance, wrapping a datastore, accepting
/// incoming http requests and handing each one to the worker pool.
pub struct Server<E, P>
where
    E: KvsEngine,
    P: ThreadPool,
{
    gateway: Gateway<E>,
    pool: P,
    http: Arc<tiny_http::Server>,
}

/// Stops a running `Server`.
#[derive(Clone)]
pub struct ShutdownHandle {
    http: Arc<tiny_http::Server>,
}

impl ShutdownHandle {
    /// Make `Server::run` return once the current accept finishes.
    pub fn shutdown(&self) {
        self.http.unblock();
    }
}

impl<E, P> Server<E, P>
where
    E: KvsEngine,
    P: ThreadPool,
{
    /// Bind the listener. Port 0 picks a free port, see `local_addr`.
    pub fn bind(addr: SocketAddr, engine: E, pool: P) -> Result<Server<E, P>> {
        let http = tiny_http::Server::http(addr).map_err(|e| KvGateError::BindFailure {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Server {
            gateway: Gateway::new(engine),
            pool,
            http: Arc::new(http),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.server_addr().to_ip()
    }

    /// Handle for stopping the accept loop from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            http: self.http.clone(),
        }
    }

    /// Accept requests until shut down.
    pub fn run(&self) -> Result<()> {
        if let Some(addr) = self.local_addr() {
            info!("Listening on '{}'.", addr);
        }

        for request in self.http.incoming_requests() {
            let gateway = self.gateway.clone();
            self.pool.spawn(move || {
                if let Err(e) = handle(request, &gateway) {
                    error!("failed to respond: {}", e);
                }
            })
        }

        info!("Listener shut down.");
        Ok(())
    }
}

/// Open the configured engine, build the pool and serve until the listener
/// is shut down. Any failure before the first accept is fatal.
pub fn run(config: &Config) -> Result<()> {
    info!(
        "Using engine '{:?}' with bucket '{}' at '{}'.",
        config.engine,
        config.bucket,
        config.db_path.display()
    );

    match config.engine {
        EngineKind::Sled => {
            let engine =
                SledKvsEngine::open(&config.db_path, &config.bucket, config.lock_timeout)?;
            run_on_pool(config, engine)
        }
        EngineKind::Memory => run_on_pool(config, MemoryKvsEngine::new()),
    }
}

fn run_on_pool<E: KvsEngine>(config: &Config, engine: E) -> Result<()> {
    info!(
        "Using pool '{:?}' with {} threads.",
        config.pool, config.threads
    );

    match config.pool {
        PoolKind::Shared => {
            let pool = SharedQueueThreadPool::new(config.threads)?;
            Server::bind(config.addr, engine, pool)?.run()
        }
        PoolKind::Rayon => {
            let pool = RayonThreadPool::new(config.threads)?;
            Server::bind(config.addr, engine, pool)?.run()
        }
        PoolKind::Naive => {
            let pool = NaiveThreadPool::new(config.threads)?;
            Server::bind(config.addr, engine, pool)?.run()
        }
    }
}

fn handle<E: KvsEngine>(request: Request, gateway: &Gateway<E>) -> Result<()> {
    let reply = gateway.handle(request.method().as_str(), request.url());

    debug!(
        "{} {} -> {}",
        request.method(),
        request.url(),
        reply.status()
    );

    let mut response = Response::from_data(reply.body()).with_status_code(reply.status());
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], CONTENT_TYPE) {
        response = response.with_header(header);
    }

    request.respond(response)?;

    Ok(())
}
