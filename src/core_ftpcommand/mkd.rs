use std::io;
use std::sync::Arc;

use log::{info, warn};
use tokio::fs;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{resolve_path, send_reply, ControlWriter};
use crate::core_proto::{codes, quote_pwd_path, Reply};
use crate::session::Session;

/// Handles the MKD (Make Directory) command.
///
/// The new directory must resolve inside the virtual root and must not
/// exist yet; its parent has to exist already.
pub async fn handle_mkd_command(
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
            warn!("MKD {:?} rejected: {}", arg, e);
            return send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Create directory failed."),
            )
            .await;
        }
    };

    if fs::metadata(&resolved.real_path).await.is_ok() {
        return send_reply(
            &writer,
            &Reply::new(codes::FILE_UNAVAILABLE, "Directory already exists."),
        )
        .await;
    }

    match fs::create_dir(&resolved.real_path).await {
        Ok(()) => {
            info!("created directory {}", resolved.virtual_path);
            let text = format!(
                "{} directory created.",
                quote_pwd_path(&resolved.virtual_path)
            );
            send_reply(&writer, &Reply::new(codes::PATH_CREATED, text)).await
        }
        Err(e) => {
            warn!("MKD {} failed: {}", resolved.virtual_path, e);
            send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Create directory failed."),
            )
            .await
        }
    }
}
