use std::io;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::handlers::{initialize_command_handlers, RequiredPerm};
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, read_control_line, split_command_line, ControlLine, Reply};
use crate::server::ShutdownFlag;
use crate::session::Session;

/// Accepts control connections until shut down, spawning one independent
/// task per session. Sessions share only the configuration and the user
/// table, both read-only.
pub async fn start_server(
    listener: TcpListener,
    config: Arc<Config>,
    users: Arc<UserTable>,
    shutdown: ShutdownFlag,
) -> Result<()> {
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            accepted = listener.accept() => accepted,
        };
        let (socket, addr) = accepted?;
        info!("new control connection from {}", addr);

        let config = Arc::clone(&config);
        let users = Arc::clone(&users);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, config, users, shutdown).await {
                warn!("session {} ended with error: {}", addr, e);
            }
            info!("connection closed for {}", addr);
        });
    }
    info!("listener shut down");
    Ok(())
}

fn greeting(config: &Config) -> Reply {
    match &config.server.banner {
        Some(banner) => {
            let mut lines: Vec<String> = banner.lines().map(str::to_string).collect();
            lines.push(String::from("Service ready."));
            Reply::multiline(codes::SERVICE_READY, lines)
        }
        None => Reply::new(codes::SERVICE_READY, "ferroftp server ready."),
    }
}

/// Runs one control session to completion: greeting, then a strictly
/// serial read-dispatch-reply loop until QUIT, EOF, shutdown or a fatal
/// control-channel error.
pub async fn handle_connection(
    socket: TcpStream,
    config: Arc<Config>,
    users: Arc<UserTable>,
    shutdown: ShutdownFlag,
) -> io::Result<()> {
    let peer_addr = socket.peer_addr()?;
    let local_addr = socket.local_addr()?;
    let (read_half, write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);
    let writer: ControlWriter = Arc::new(Mutex::new(write_half));

    send_reply(&writer, &greeting(&config)).await?;

    let handlers = initialize_command_handlers();
    let session = Arc::new(Mutex::new(Session::new(peer_addr, local_addr)));

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            line = read_control_line(&mut reader, config.server.max_line_bytes) => line?,
        };

        let line = match line {
            ControlLine::Eof => break,
            ControlLine::Oversized => {
                warn!("{} sent an oversized command line", peer_addr);
                session.lock().await.rename_from = None;
                send_reply(
                    &writer,
                    &Reply::new(codes::SYNTAX_ERROR, "Command line too long."),
                )
                .await?;
                continue;
            }
            ControlLine::Line(line) => line,
        };
        if line.is_empty() {
            continue;
        }

        let (verb, arg) = split_command_line(&line);
        if verb == "PASS" {
            debug!("{} -> PASS ****", peer_addr);
        } else {
            debug!("{} -> {}", peer_addr, line);
        }

        let command = FtpCommand::from_str(&verb);

        // A pending rename survives only into the very next command.
        if command != Some(FtpCommand::RNTO) {
            session.lock().await.rename_from = None;
        }

        let Some(command) = command else {
            send_reply(
                &writer,
                &Reply::new(codes::SYNTAX_ERROR, "Command not recognized."),
            )
            .await?;
            continue;
        };
        let entry = handlers
            .get(&command)
            .expect("every parsed verb has a table row");

        if entry.needs_arg && arg.trim().is_empty() {
            send_reply(
                &writer,
                &Reply::new(
                    codes::SYNTAX_ERROR_ARGS,
                    "Syntax error in parameters or arguments.",
                ),
            )
            .await?;
            continue;
        }

        let gate = {
            let session = session.lock().await;
            if entry.requires_auth && !session.is_authenticated() {
                Some(Reply::new(
                    codes::NOT_LOGGED_IN,
                    "Please login with USER and PASS.",
                ))
            } else if entry.required_perm == RequiredPerm::Write
                && !session
                    .user()
                    .map(|user| user.permission.can_write())
                    .unwrap_or(false)
            {
                Some(Reply::new(codes::FILE_UNAVAILABLE, "Permission denied."))
            } else {
                None
            }
        };
        if let Some(reply) = gate {
            // A rejected data command still consumes the pending listener.
            if matches!(
                command,
                FtpCommand::LIST | FtpCommand::RETR | FtpCommand::STOR
            ) {
                session.lock().await.take_pasv();
            }
            send_reply(&writer, &reply).await?;
            continue;
        }

        (entry.handler)(
            Arc::clone(&writer),
            Arc::clone(&config),
            Arc::clone(&users),
            Arc::clone(&session),
            arg,
        )
        .await?;

        if command == FtpCommand::QUIT {
            break;
        }
    }
    Ok(())
}
