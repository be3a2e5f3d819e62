use std::io;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{resolve_path, send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the CWD command.
///
/// The argument is resolved against the virtual root; only an existing
/// directory inside it becomes the new working directory.
pub async fn handle_cwd_command(
    writer: ControlWriter,
    config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let current_dir = session.lock().await.current_dir.clone();

    let resolved = match resolve_path(&config.server.chroot_dir, &current_dir, &arg).await {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("CWD {:?} rejected: {}", arg, e);
            return send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Failed to change directory."),
            )
            .await;
        }
    };

    match tokio::fs::metadata(&resolved.real_path).await {
        Ok(meta) if meta.is_dir() => {
            info!("CWD to {}", resolved.virtual_path);
            session.lock().await.current_dir = resolved.virtual_path;
            send_reply(
                &writer,
                &Reply::new(codes::FILE_ACTION_OKAY, "Directory successfully changed."),
            )
            .await
        }
        _ => {
            send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Failed to change directory."),
            )
            .await
        }
    }
}
