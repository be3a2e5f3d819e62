use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_network::network;

/// Shared stop signal. The accept loop and every session loop select on
/// [`ShutdownFlag::notified`] and exit at their next I/O boundary once
/// [`ShutdownFlag::trigger`] has been called.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Resolves once the flag has been triggered.
    pub async fn notified(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before re-checking the flag so a concurrent trigger
        // cannot slip between the check and the await.
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

/// A bound FTP server that has not started accepting yet. Splitting bind
/// from serve lets callers learn the actual port when binding to port 0.
pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    users: Arc<UserTable>,
    shutdown: ShutdownFlag,
}

impl Server {
    pub async fn bind(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.server.chroot_dir).with_context(|| {
            format!(
                "Failed to create virtual root {:?}",
                config.server.chroot_dir
            )
        })?;

        let addr = format!("{}:{}", config.server.bind_host, config.server.bind_port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind control listener on {}", addr))?;
        info!(
            "FTP server listening on {}, root {:?}",
            listener.local_addr()?,
            config.server.chroot_dir
        );

        let users = Arc::new(config.user_table());
        Ok(Server {
            listener,
            config: Arc::new(config),
            users,
            shutdown: ShutdownFlag::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Clone of the stop signal, to be triggered from outside `serve`.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    pub async fn serve(self) -> Result<()> {
        network::start_server(self.listener, self.config, self.users, self.shutdown).await
    }
}

/// Binds and serves until shut down; the daemon's whole runtime.
pub async fn run(config: Config) -> Result<()> {
    Server::bind(config).await?.serve().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_flag_wakes_waiters() {
        let flag = ShutdownFlag::new();
        let waiter = flag.clone();
        let handle = tokio::spawn(async move { waiter.notified().await });
        flag.trigger();
        handle.await.unwrap();
        assert!(flag.is_triggered());
    }

    #[tokio::test]
    async fn notified_returns_immediately_after_trigger() {
        let flag = ShutdownFlag::new();
        flag.trigger();
        // Must not hang.
        flag.notified().await;
    }
}
