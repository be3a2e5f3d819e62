use std::io;
use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::{LoginState, Session};

/// Handles the USER command. Accepted in any stage; issuing it again
/// restarts the login handshake.
pub async fn handle_user_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let name = arg.trim().to_string();
    {
        let mut session = session.lock().await;
        session.login = LoginState::AwaitingPass(name.clone());
    }
    info!("USER {} awaiting password", name);
    send_reply(
        &writer,
        &Reply::new(codes::NEED_PASSWORD, "User name okay, need password."),
    )
    .await
}
