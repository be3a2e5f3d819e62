use std::io;
use std::sync::Arc;

use log::{info, warn};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::constants::TRANSFER_BUFFER_SIZE;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{resolve_path, send_reply, ControlWriter};
use crate::core_network::pasv::open_data_connection;
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the RETR (Retrieve) command.
///
/// Streams a regular file over the data connection. The 226 completion
/// reply is written only after the data socket has been shut down, so a
/// client that has read it can rely on the transfer being whole.
///
/// # Arguments
///
/// * `writer` - Shared write half of the control connection.
/// * `config` - Shared server configuration.
/// * `session` - Shared session state holding the passive listener.
/// * `arg` - Path of the file to send.
///
/// # Returns
///
/// `io::Result<()>` carrying only control-channel failures; command-level
/// errors are reported to the client as replies.
pub async fn handle_retr_command(
    writer: ControlWriter,
    config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let current_dir = session.lock().await.current_dir.clone();

    let opened = open_source_file(&config, &current_dir, &arg).await;
    let mut file = match opened {
        Ok(file) => file,
        Err(e) => {
            warn!("RETR {:?} failed: {}", arg, e);
            session.lock().await.take_pasv();
            return send_reply(&writer, &Reply::new(codes::FILE_UNAVAILABLE, "File not found."))
                .await;
        }
    };

    let Some(mut data) = open_data_connection(&writer, &config, &session).await? else {
        return Ok(());
    };

    send_reply(
        &writer,
        &Reply::new(codes::FILE_STATUS_OKAY, "Opening binary mode data connection."),
    )
    .await?;

    let mut buffer = vec![0u8; TRANSFER_BUFFER_SIZE];
    loop {
        let bytes_read = match file.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("RETR read error: {}", e);
                drop(data);
                return send_reply(
                    &writer,
                    &Reply::new(codes::TRANSFER_ABORTED, "Connection closed; transfer aborted."),
                )
                .await;
            }
        };
        if let Err(e) = data.write_all(&buffer[..bytes_read]).await {
            warn!("RETR data write error: {}", e);
            drop(data);
            return send_reply(
                &writer,
                &Reply::new(codes::TRANSFER_ABORTED, "Connection closed; transfer aborted."),
            )
            .await;
        }
    }

    data.shutdown().await.ok();
    drop(data);
    info!("sent file {}", arg);
    send_reply(&writer, &Reply::new(codes::CLOSING_DATA, "Transfer complete.")).await
}

async fn open_source_file(config: &Config, current_dir: &str, arg: &str) -> io::Result<File> {
    let resolved = resolve_path(&config.server.chroot_dir, current_dir, arg).await?;
    let metadata = fs::metadata(&resolved.real_path).await?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    File::open(&resolved.real_path).await
}
