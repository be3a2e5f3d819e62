use std::io;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::cwd::handle_cwd_command;
use crate::core_ftpcommand::utils::ControlWriter;
use crate::session::Session;

/// CDUP is CWD "..".
pub async fn handle_cdup_command(
    writer: ControlWriter,
    config: Arc<Config>,
    users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    _arg: String,
) -> io::Result<()> {
    handle_cwd_command(writer, config, users, session, String::from("..")).await
}
