use std::io;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, quote_pwd_path, Reply};
use crate::session::Session;

/// Handles the PWD command: the current virtual directory, quoted.
pub async fn handle_pwd_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    _arg: String,
) -> io::Result<()> {
    let current_dir = session.lock().await.current_dir.clone();
    let text = format!("{} is the current directory", quote_pwd_path(&current_dir));
    send_reply(&writer, &Reply::new(codes::PATH_CREATED, text)).await
}
