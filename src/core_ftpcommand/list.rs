use std::io;
use std::sync::Arc;

use log::{info, warn};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{format_list_line, resolve_path, send_reply, ControlWriter};
use crate::core_network::pasv::open_data_connection;
use crate::core_proto::{codes, Reply};
use crate::session::Session;

/// Handles the LIST command.
///
/// Consumes the pending passive listener, streams one `ls`-style line per
/// directory entry over the data connection and reports completion on the
/// control channel only after the data socket is closed.
///
/// # Arguments
///
/// * `writer` - Shared write half of the control connection.
/// * `config` - Shared server configuration.
/// * `session` - Shared session state holding the passive listener.
/// * `arg` - Optional path to list; defaults to the current directory.
///
/// # Returns
///
/// `io::Result<()>` carrying only control-channel failures; command-level
/// errors are reported to the client as replies.
pub async fn handle_list_command(
    writer: ControlWriter,
    config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let current_dir = session.lock().await.current_dir.clone();
    let target = if arg.trim().is_empty() {
        current_dir.clone()
    } else {
        arg.clone()
    };

    // Build the listing before touching the data channel so a bad path
    // fails with 450 and still releases the listener.
    let lines = match read_listing(&config, &current_dir, &target).await {
        Ok(lines) => lines,
        Err(e) => {
            warn!("LIST {:?} failed: {}", target, e);
            session.lock().await.take_pasv();
            return send_reply(
                &writer,
                &Reply::new(codes::FILE_ACTION_NOT_TAKEN, "Failed to list directory."),
            )
            .await;
        }
    };

    let Some(mut data) = open_data_connection(&writer, &config, &session).await? else {
        return Ok(());
    };

    send_reply(
        &writer,
        &Reply::new(codes::FILE_STATUS_OKAY, "Here comes the directory listing."),
    )
    .await?;

    for line in &lines {
        if let Err(e) = data.write_all(format!("{}\r\n", line).as_bytes()).await {
            warn!("LIST data write failed: {}", e);
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
    info!("listed {} ({} entries)", target, lines.len());
    send_reply(&writer, &Reply::new(codes::CLOSING_DATA, "Directory send OK.")).await
}

async fn read_listing(config: &Config, current_dir: &str, target: &str) -> io::Result<Vec<String>> {
    let resolved = resolve_path(&config.server.chroot_dir, current_dir, target).await?;
    let mut entries = fs::read_dir(&resolved.real_path).await?;
    let mut listed = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        match entry.metadata().await {
            Ok(metadata) => listed.push((name, metadata)),
            Err(e) => warn!("skipping {:?} in listing: {}", name, e),
        }
    }
    listed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listed
        .iter()
        .map(|(name, metadata)| format_list_line(name, metadata))
        .collect())
}
