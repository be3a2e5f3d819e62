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

/// Handles the RNTO (Rename To) command, the second half of a rename.
/// Without a directly preceding RNFR the reply is 503.
pub async fn handle_rnto_command(
    writer: ControlWriter,
    config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let (rename_from, current_dir) = {
        let mut session = session.lock().await;
        (session.rename_from.take(), session.current_dir.clone())
    };

    let Some(source_virtual) = rename_from else {
        return send_reply(
            &writer,
            &Reply::new(codes::BAD_SEQUENCE, "Bad sequence of commands."),
        )
        .await;
    };

    // Re-resolve the parked source; it is a virtual path rooted at "/".
    let source = match resolve_path(&config.server.chroot_dir, "/", &source_virtual).await {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("RNTO source {:?} rejected: {}", source_virtual, e);
            return send_reply(&writer, &Reply::new(codes::FILE_UNAVAILABLE, "Rename failed."))
                .await;
        }
    };

    let dest = match resolve_path(&config.server.chroot_dir, &current_dir, &arg).await {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("RNTO {:?} rejected: {}", arg, e);
            return send_reply(&writer, &Reply::new(codes::FILE_UNAVAILABLE, "Rename failed."))
                .await;
        }
    };

    match fs::rename(&source.real_path, &dest.real_path).await {
        Ok(()) => {
            info!("renamed {} -> {}", source.virtual_path, dest.virtual_path);
            send_reply(&writer, &Reply::new(codes::FILE_ACTION_OKAY, "Rename successful."))
                .await
        }
        Err(e) => {
            warn!(
                "rename {} -> {} failed: {}",
                source.virtual_path, dest.virtual_path, e
            );
            send_reply(&writer, &Reply::new(codes::FILE_UNAVAILABLE, "Rename failed.")).await
        }
    }
}
