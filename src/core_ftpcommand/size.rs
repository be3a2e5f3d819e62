use std::io;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{resolve_path, send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the SIZE command: byte size of a regular file, as a 213 reply.
pub async fn handle_size_command(
    writer: ControlWriter,
    config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let current_dir = session.lock().await.current_dir.clone();

    let resolved = match resolve_path(&config.server.chroot_dir, &current_dir, &arg).await {
        Ok(resolved) => resolved,
        Err(_) => {
            return send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Could not get file size."),
            )
            .await;
        }
    };

    match fs::metadata(&resolved.real_path).await {
        Ok(meta) if meta.is_file() => {
            send_reply(&writer, &Reply::new(codes::FILE_STATUS, meta.len().to_string())).await
        }
        _ => {
            send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Could not get file size."),
            )
            .await
        }
    }
}
