use std::io;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the QUIT command. The control loop closes the connection
/// after this reply goes out.
pub async fn handle_quit_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    _users: Arc<UserTable>,
    _session: Arc<Mutex<Session>>,
    _arg: String,
) -> io::Result<()> {
    send_reply(&writer, &Reply::new(codes::CLOSING_CONTROL, "Goodbye.")).await
}
