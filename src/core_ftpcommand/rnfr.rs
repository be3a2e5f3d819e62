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

/// Handles the RNFR (Rename From) command.
///
/// The source must exist inside the virtual root; its virtual path is
/// parked in the session for the RNTO that has to follow immediately.
pub async fn handle_rnfr_command(
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
            warn!("RNFR {:?} rejected: {}", arg, e);
            return send_reply(&writer, &Reply::new(codes::FILE_UNAVAILABLE, "File not found."))
                .await;
        }
    };

    if fs::metadata(&resolved.real_path).await.is_err() {
        return send_reply(&writer, &Reply::new(codes::FILE_UNAVAILABLE, "File not found."))
            .await;
    }

    info!("rename armed from {}", resolved.virtual_path);
    session.lock().await.rename_from = Some(resolved.virtual_path);
    send_reply(
        &writer,
        &Reply::new(
            codes::FILE_ACTION_PENDING,
            "File exists, ready for destination name.",
        ),
    )
    .await
}
