use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, encode_pasv_addr, Reply};
use crate::session::Session;

/// A bound-but-not-yet-accepted passive listener, parked in the session
/// until the next data command consumes it.
#[derive(Debug)]
pub struct PasvListener {
    pub listener: TcpListener,
    pub advertised: SocketAddrV4,
}

/// Handles the PASV command.
///
/// Binds a fresh listener on an OS-chosen port, replaces any pending one
/// and advertises the address in the 227 reply. The advertised host is
/// the configured `pasv_address` override when set, otherwise the
/// address the control connection arrived on.
pub async fn handle_pasv_command(
    writer: ControlWriter,
    config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    _arg: String,
) -> io::Result<()> {
    // A second PASV discards the previous listener.
    let local_addr = {
        let mut session = session.lock().await;
        session.pasv = None;
        session.local_addr
    };

    let bind_ip = match local_addr.ip() {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(_) => {
            warn!("PASV refused on an IPv6 control connection");
            return send_reply(
                &writer,
                &Reply::new(codes::CANT_OPEN_DATA, "Passive mode requires IPv4."),
            )
            .await;
        }
    };

    let listener = match TcpListener::bind((bind_ip, 0)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("PASV bind on {} failed: {}", bind_ip, e);
            return send_reply(
                &writer,
                &Reply::new(codes::CANT_OPEN_DATA, "Cannot open passive listener."),
            )
            .await;
        }
    };
    let port = listener.local_addr()?.port();

    let advertised_ip: Ipv4Addr = match &config.server.pasv_address {
        Some(address) => address.parse().unwrap_or(bind_ip),
        None => bind_ip,
    };
    let advertised = SocketAddrV4::new(advertised_ip, port);
    debug!("PASV listener on {}:{}, advertising {}", bind_ip, port, advertised);

    session.lock().await.set_pasv(PasvListener { listener, advertised });

    let text = format!("Entering Passive Mode ({}).", encode_pasv_addr(advertised));
    send_reply(&writer, &Reply::new(codes::ENTERING_PASSIVE, text)).await
}

/// Consumes the session's pending passive listener and accepts the one
/// data connection, bounded by the configured timeout.
///
/// Replies 425 and returns `None` when no listener is pending, on accept
/// failure and on timeout. Either way the listener is gone afterwards.
pub async fn open_data_connection(
    writer: &ControlWriter,
    config: &Config,
    session: &Arc<Mutex<Session>>,
) -> io::Result<Option<TcpStream>> {
    let Some(pasv) = session.lock().await.take_pasv() else {
        send_reply(writer, &Reply::new(codes::CANT_OPEN_DATA, "Use PASV first.")).await?;
        return Ok(None);
    };

    let wait = Duration::from_secs(config.server.data_timeout_secs);
    match timeout(wait, pasv.listener.accept()).await {
        Ok(Ok((stream, peer))) => {
            debug!("data connection accepted from {}", peer);
            Ok(Some(stream))
        }
        Ok(Err(e)) => {
            error!("data connection accept failed: {}", e);
            send_reply(
                writer,
                &Reply::new(codes::CANT_OPEN_DATA, "Can't open data connection."),
            )
            .await?;
            Ok(None)
        }
        Err(_) => {
            warn!("timed out waiting for the data connection");
            send_reply(
                writer,
                &Reply::new(codes::CANT_OPEN_DATA, "Can't open data connection."),
            )
            .await?;
            Ok(None)
        }
    }
}
