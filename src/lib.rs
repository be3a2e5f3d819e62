//! ferroftp is a small passive-mode FTP implementation: a server daemon
//! with a chrooted virtual filesystem and per-user permissions, and an
//! async client library speaking the same command subset.
//!
//! The server is exposed through [`server::Server`] (or the
//! [`server::run`] convenience wrapper used by the `ferroftpd` binary);
//! the client through [`core_client::FtpClient`].

pub mod config;
pub mod constants;
pub mod core_auth;
pub mod core_client;
pub mod core_ftpcommand;
pub mod core_network;
pub mod core_proto;
pub mod server;
pub mod session;

pub use config::{Config, ServerConfig, UserConfig};
pub use core_auth::{Permission, User, UserTable};
pub use core_client::{FtpClient, FtpError};
pub use server::{run, Server, ShutdownFlag};
