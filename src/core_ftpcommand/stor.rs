use std::io;
use std::sync::Arc;

use log::{info, warn};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::constants::TRANSFER_BUFFER_SIZE;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{resolve_path, send_reply, ControlWriter, ResolvedPath};
use crate::core_network::pasv::open_data_connection;
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the STOR (Store File) command.
///
/// Receives the data connection's bytes into a newly created (truncated)
/// file. The target's parent directory must already exist; an upload of
/// zero bytes still creates the file and completes with 226.
///
/// # Arguments
///
/// * `writer` - Shared write half of the control connection.
/// * `config` - Shared server configuration.
/// * `session` - Shared session state holding the passive listener.
/// * `arg` - Path of the file to create or overwrite.
///
/// # Returns
///
/// `io::Result<()>` carrying only control-channel failures; command-level
/// errors are reported to the client as replies.
pub async fn handle_stor_command(
    writer: ControlWriter,
    config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let current_dir = session.lock().await.current_dir.clone();

    let resolved = match resolve_target(&config, &current_dir, &arg).await {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("STOR {:?} rejected: {}", arg, e);
            session.lock().await.take_pasv();
            return send_reply(
                &writer,
                &Reply::new(codes::FILE_UNAVAILABLE, "Failed to store file."),
            )
            .await;
        }
    };

    let Some(mut data) = open_data_connection(&writer, &config, &session).await? else {
        return Ok(());
    };

    let mut file = match File::create(&resolved.real_path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("STOR create {:?} failed: {}", resolved.real_path, e);
            drop(data);
            return send_reply(
                &writer,
                &Reply::new(codes::BAD_FILE_NAME, "Could not create file."),
            )
            .await;
        }
    };

    send_reply(
        &writer,
        &Reply::new(
            codes::FILE_STATUS_OKAY,
            "Opening binary mode data connection for file upload.",
        ),
    )
    .await?;

    let mut buffer = vec![0u8; TRANSFER_BUFFER_SIZE];
    loop {
        let bytes_read = match data.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("STOR data read error: {}", e);
                drop(data);
                return send_reply(
                    &writer,
                    &Reply::new(codes::TRANSFER_ABORTED, "Connection closed; transfer aborted."),
                )
                .await;
            }
        };
        if let Err(e) = file.write_all(&buffer[..bytes_read]).await {
            warn!("STOR file write error: {}", e);
            drop(data);
            return send_reply(
                &writer,
                &Reply::new(codes::FILE_ACTION_NOT_TAKEN, "Local error writing file."),
            )
            .await;
        }
    }

    file.flush().await?;
    drop(data);
    info!("stored file {}", resolved.virtual_path);
    send_reply(&writer, &Reply::new(codes::CLOSING_DATA, "Transfer complete.")).await
}

/// Resolves the upload target, requiring an existing parent directory.
async fn resolve_target(
    config: &Config,
    current_dir: &str,
    arg: &str,
) -> io::Result<ResolvedPath> {
    let resolved = resolve_path(&config.server.chroot_dir, current_dir, arg).await?;
    let parent = resolved
        .real_path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no parent directory"))?;
    let parent_meta = fs::metadata(parent).await?;
    if !parent_meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "parent is not a directory",
        ));
    }
    Ok(resolved)
}
