use std::io;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{resolve_path, send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the MDTM command: file modification time as `YYYYMMDDHHMMSS`
/// in UTC, per RFC 3659.
pub async fn handle_mdtm_command(
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
                &Reply::new(codes::FILE_UNAVAILABLE, "Could not get modification time."),
            )
            .await;
        }
    };

    let modified = match fs::metadata(&resolved.real_path).await {
        Ok(meta) if meta.is_file() => meta.modified().ok(),
        _ => None,
    };

    match modified {
        Some(mtime) => {
            let stamp = DateTime::<Utc>::from(mtime).format("%Y%m%d%H%M%S");
            send_reply(&writer, &Reply::new(codes::FILE_STATUS, stamp.to_string())).await
        }
        None => {
            send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Could not get modification time."),
            )
            .await
        }
    }
}
