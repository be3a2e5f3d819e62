use std::net::SocketAddr;

use crate::core_auth::User;
use crate::core_network::pasv::PasvListener;

pub use crate::core_proto::TransferType;

/// Login progression. USER restarts it from any stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    AwaitingUser,
    AwaitingPass(String),
    Authenticated(User),
}

/// State of one control connection.
#[derive(Debug)]
pub struct Session {
    pub peer_addr: SocketAddr,
    /// Address the control connection arrived on; the default PASV
    /// advertisement.
    pub local_addr: SocketAddr,
    pub login: LoginState,
    /// Virtual working directory, always absolute, starts at "/".
    pub current_dir: String,
    pub transfer_type: TransferType,
    /// At most one pending passive listener; every data command takes it,
    /// succeed or fail.
    pub pasv: Option<PasvListener>,
    /// Virtual path armed by RNFR, disarmed by whatever command follows.
    pub rename_from: Option<String>,
}

impl Session {
    pub fn new(peer_addr: SocketAddr, local_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            local_addr,
            login: LoginState::AwaitingUser,
            current_dir: String::from("/"),
            transfer_type: TransferType::Image,
            pasv: None,
            rename_from: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.login, LoginState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match &self.login {
            LoginState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Consumes the pending passive listener, if any.
    pub fn take_pasv(&mut self) -> Option<PasvListener> {
        self.pasv.take()
    }

    /// Installs a fresh passive listener, closing any previous one.
    pub fn set_pasv(&mut self, listener: PasvListener) {
        self.pasv = Some(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000)
    }

    fn local() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 2121)
    }

    #[test]
    fn fresh_session_is_unauthenticated_at_root() {
        let session = Session::new(peer(), local());
        assert!(!session.is_authenticated());
        assert_eq!(session.current_dir, "/");
        assert!(session.pasv.is_none());
        assert!(session.rename_from.is_none());
    }

    #[test]
    fn user_is_visible_once_authenticated() {
        use crate::core_auth::{Permission, User};
        let mut session = Session::new(peer(), local());
        session.login = LoginState::Authenticated(User {
            name: "user".into(),
            permission: Permission::ReadWrite,
        });
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().name, "user");
    }
}
