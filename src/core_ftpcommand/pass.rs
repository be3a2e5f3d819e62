use std::io;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::{LoginState, Session};

/// Handles the PASS command, completing the USER/PASS handshake.
///
/// Without a preceding USER the reply is 503; a failed match drops the
/// session back to the awaiting-USER stage and replies 530.
pub async fn handle_pass_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let pending = {
        let session = session.lock().await;
        match &session.login {
            LoginState::AwaitingPass(name) => Some(name.clone()),
            _ => None,
        }
    };

    let Some(name) = pending else {
        return send_reply(
            &writer,
            &Reply::new(codes::BAD_SEQUENCE, "Login with USER first."),
        )
        .await;
    };

    match users.authenticate(&name, &arg) {
        Some(user) => {
            info!("user {} logged in", user.name);
            session.lock().await.login = LoginState::Authenticated(user);
            send_reply(
                &writer,
                &Reply::new(codes::LOGGED_IN, "User logged in, proceed."),
            )
            .await
        }
        None => {
            warn!("failed login for user {}", name);
            session.lock().await.login = LoginState::AwaitingUser;
            send_reply(&writer, &Reply::new(codes::NOT_LOGGED_IN, "Login incorrect.")).await
        }
    }
}
