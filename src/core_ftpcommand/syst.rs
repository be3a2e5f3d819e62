use std::io;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::constants::SYST_TYPE;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::Session;

pub async fn handle_syst_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    _users: Arc<UserTable>,
    _session: Arc<Mutex<Session>>,
    _arg: String,
) -> io::Result<()> {
    send_reply(&writer, &Reply::new(codes::SYSTEM_TYPE, SYST_TYPE)).await
}
