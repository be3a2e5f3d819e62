use std::io;
use std::sync::Arc;

use log::{info, warn};
use tokio::fs;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{resolve_path, send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the RMD (Remove Directory) command. Only empty directories
/// are removed; anything else is a 550.
pub async fn handle_rmd_command(
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
            warn!("RMD {:?} rejected: {}", arg, e);
            return send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Remove directory failed."),
            )
            .await;
        }
    };

    match fs::remove_dir(&resolved.real_path).await {
        Ok(()) => {
            info!("removed directory {}", resolved.virtual_path);
            send_reply(
                &writer,
                &Reply::new(
                    codes::FILE_ACTION_OKAY,
                    "Remove directory operation successful.",
                ),
            )
            .await
        }
        Err(e) => {
            warn!("RMD {} failed: {}", resolved.virtual_path, e);
            send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Remove directory failed."),
            )
            .await
        }
    }
}
