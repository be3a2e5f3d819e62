//! The client side: a connection object driving one control channel and
//! opening a fresh passive data channel per LIST/RETR/STOR.

pub mod error;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::constants::TRANSFER_BUFFER_SIZE;
use crate::core_proto::{
    codes, parse_pasv_reply, parse_quoted_path, read_reply, TransferType,
};

pub use error::FtpError;

type Result<T> = std::result::Result<T, FtpError>;

/// A logged-in-or-not FTP control connection.
///
/// All operations serialize on the control channel; taking `&mut self`
/// everywhere makes overlapping commands impossible to express.
pub struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer_addr: SocketAddr,
    last_reply: (u16, String),
    transfer_type: TransferType,
}

/// Picks the host to dial for the data channel.
///
/// Servers behind NAT routinely advertise an address the client cannot
/// reach: 0.0.0.0, or a private/loopback address while the control
/// connection runs over a public one. In those cases the control peer's
/// address is the one that is known to route.
fn effective_pasv_host(advertised: Ipv4Addr, control_peer: IpAddr) -> IpAddr {
    if advertised.is_unspecified() {
        return control_peer;
    }
    let advertised_inner =
        advertised.is_loopback() || advertised.is_private() || advertised.is_link_local();
    let peer_inner = match control_peer {
        IpAddr::V4(peer) => peer.is_loopback() || peer.is_private() || peer.is_link_local(),
        IpAddr::V6(_) => false,
    };
    if advertised_inner && !peer_inner {
        return control_peer;
    }
    IpAddr::V4(advertised)
}

impl FtpClient {
    /// Opens the control connection and consumes the 220 greeting,
    /// multi-line or not.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        let mut client = FtpClient {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer_addr,
            last_reply: (0, String::new()),
            transfer_type: TransferType::Image,
        };

        let (code, text) = client.read_server_reply().await?;
        if code != codes::SERVICE_READY {
            return Err(FtpError::Protocol(format!(
                "unexpected welcome reply: {} {}",
                code, text
            )));
        }
        Ok(client)
    }

    async fn read_server_reply(&mut self) -> Result<(u16, String)> {
        let reply = read_reply(&mut self.reader).await?;
        self.last_reply = reply.clone();
        Ok(reply)
    }

    async fn send_command(&mut self, command: &str) -> Result<(u16, String)> {
        if command.starts_with("PASS ") {
            debug!("-> PASS ****");
        } else {
            debug!("-> {}", command);
        }
        self.writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await?;
        let reply = self.read_server_reply().await?;
        debug!("<- {} {}", reply.0, reply.1);
        Ok(reply)
    }

    /// Code and text of the most recent reply.
    pub fn last_reply(&self) -> (u16, &str) {
        (self.last_reply.0, &self.last_reply.1)
    }

    /// Runs the USER/PASS handshake. A server that accepts USER alone
    /// (230) skips the password.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let (code, text) = self.send_command(&format!("USER {}", user)).await?;
        match code {
            codes::LOGGED_IN => return Ok(()),
            codes::NEED_PASSWORD => {}
            _ => return Err(FtpError::Auth { code, text }),
        }
        let (code, text) = self.send_command(&format!("PASS {}", password)).await?;
        if code != codes::LOGGED_IN {
            return Err(FtpError::Auth { code, text });
        }
        Ok(())
    }

    /// Returns the current virtual directory from the quoted 257 reply.
    pub async fn pwd(&mut self) -> Result<String> {
        let (code, text) = self.send_command("PWD").await?;
        if code != codes::PATH_CREATED {
            return Err(FtpError::Command { code, text });
        }
        parse_quoted_path(&text)
            .ok_or_else(|| FtpError::Protocol(format!("no quoted path in reply: {}", text)))
    }

    pub async fn cwd(&mut self, path: &str) -> Result<()> {
        self.expect_simple(&format!("CWD {}", path), &[codes::FILE_ACTION_OKAY])
            .await
    }

    pub async fn cdup(&mut self) -> Result<()> {
        self.expect_simple("CDUP", &[codes::FILE_ACTION_OKAY]).await
    }

    pub async fn mkd(&mut self, path: &str) -> Result<()> {
        self.expect_simple(
            &format!("MKD {}", path),
            &[codes::PATH_CREATED, codes::FILE_ACTION_OKAY],
        )
        .await
    }

    pub async fn rmd(&mut self, path: &str) -> Result<()> {
        self.expect_simple(&format!("RMD {}", path), &[codes::FILE_ACTION_OKAY])
            .await
    }

    pub async fn dele(&mut self, path: &str) -> Result<()> {
        self.expect_simple(&format!("DELE {}", path), &[codes::FILE_ACTION_OKAY])
            .await
    }

    /// Renames via RNFR/RNTO. RNTO is not sent when RNFR is refused.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.expect_simple(&format!("RNFR {}", from), &[codes::FILE_ACTION_PENDING])
            .await?;
        self.expect_simple(&format!("RNTO {}", to), &[codes::FILE_ACTION_OKAY])
            .await
    }

    pub async fn type_binary(&mut self) -> Result<()> {
        self.expect_simple("TYPE I", &[codes::COMMAND_OKAY]).await?;
        self.transfer_type = TransferType::Image;
        Ok(())
    }

    pub async fn type_ascii(&mut self) -> Result<()> {
        self.expect_simple("TYPE A", &[codes::COMMAND_OKAY]).await?;
        self.transfer_type = TransferType::Ascii;
        Ok(())
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub async fn noop(&mut self) -> Result<()> {
        self.expect_simple("NOOP", &[codes::COMMAND_OKAY]).await
    }

    /// Returns the server's SYST banner text.
    pub async fn syst(&mut self) -> Result<String> {
        let (code, text) = self.send_command("SYST").await?;
        if code != codes::SYSTEM_TYPE {
            return Err(FtpError::Command { code, text });
        }
        Ok(text)
    }

    /// Byte size of a remote regular file.
    pub async fn size(&mut self, path: &str) -> Result<u64> {
        let (code, text) = self.send_command(&format!("SIZE {}", path)).await?;
        if code != codes::FILE_STATUS {
            return Err(FtpError::Command { code, text });
        }
        text.trim()
            .parse()
            .map_err(|_| FtpError::Protocol(format!("unparsable SIZE reply: {}", text)))
    }

    /// Directory listing as raw text lines; no structural parsing.
    pub async fn list(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        let command = match path {
            Some(path) => format!("LIST {}", path),
            None => String::from("LIST"),
        };
        let mut data = self.start_data_command(&command).await?;

        let mut raw = Vec::new();
        data.read_to_end(&mut raw).await.map_err(local_error)?;
        drop(data);

        self.finish_data_command().await?;
        Ok(String::from_utf8_lossy(&raw)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Downloads `path`, streaming every chunk into `sink`.
    pub async fn retrieve<W>(&mut self, path: &str, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut data = self.start_data_command(&format!("RETR {}", path)).await?;

        let mut buffer = vec![0u8; TRANSFER_BUFFER_SIZE];
        loop {
            let bytes_read = data.read(&mut buffer).await.map_err(local_error)?;
            if bytes_read == 0 {
                break;
            }
            sink.write_all(&buffer[..bytes_read])
                .await
                .map_err(local_error)?;
        }
        sink.flush().await.map_err(local_error)?;
        drop(data);

        self.finish_data_command().await
    }

    /// Uploads `source` to `path`, half-closing the data socket at EOF so
    /// the server sees the end of the file.
    pub async fn store<R>(&mut self, path: &str, source: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut data = self.start_data_command(&format!("STOR {}", path)).await?;

        let mut buffer = vec![0u8; TRANSFER_BUFFER_SIZE];
        loop {
            let bytes_read = source.read(&mut buffer).await.map_err(local_error)?;
            if bytes_read == 0 {
                break;
            }
            data.write_all(&buffer[..bytes_read])
                .await
                .map_err(local_error)?;
        }
        data.shutdown().await.map_err(local_error)?;
        drop(data);

        self.finish_data_command().await
    }

    /// Sends QUIT best-effort and closes the connection either way.
    pub async fn quit(mut self) -> Result<()> {
        match self.send_command("QUIT").await {
            Ok((code, _)) if code == codes::CLOSING_CONTROL => {}
            Ok((code, text)) => warn!("unexpected QUIT reply: {} {}", code, text),
            Err(e) => warn!("QUIT failed: {}", e),
        }
        Ok(())
    }

    async fn expect_simple(&mut self, command: &str, accepted: &[u16]) -> Result<()> {
        let (code, text) = self.send_command(command).await?;
        if accepted.contains(&code) {
            Ok(())
        } else {
            Err(FtpError::Command { code, text })
        }
    }

    /// PASV + dial + data verb: the first half of every data command.
    /// On a 1xx reply the returned socket is ready for the transfer.
    async fn start_data_command(&mut self, command: &str) -> Result<TcpStream> {
        let (code, text) = self.send_command("PASV").await?;
        if code != codes::ENTERING_PASSIVE {
            return Err(FtpError::Command { code, text });
        }
        let advertised = parse_pasv_reply(&text)
            .ok_or_else(|| FtpError::Protocol(format!("no PASV tuple in reply: {}", text)))?;
        let host = effective_pasv_host(*advertised.ip(), self.peer_addr.ip());
        debug!("dialing data channel at {}:{}", host, advertised.port());
        let data = TcpStream::connect((host, advertised.port())).await?;

        let (code, text) = self.send_command(command).await?;
        if (100..200).contains(&code) {
            Ok(data)
        } else if code >= 400 {
            drop(data);
            Err(FtpError::Command { code, text })
        } else {
            drop(data);
            Err(FtpError::Protocol(format!(
                "unexpected data command reply: {} {}",
                code, text
            )))
        }
    }

    /// Reads the post-transfer reply; anything but 2xx is a failure.
    async fn finish_data_command(&mut self) -> Result<()> {
        let (code, text) = self.read_server_reply().await?;
        if (200..300).contains(&code) {
            Ok(())
        } else {
            Err(FtpError::Transfer { code, text })
        }
    }
}

fn local_error(e: std::io::Error) -> FtpError {
    FtpError::Transfer {
        code: 0,
        text: format!("local I/O error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_pasv_host_falls_back_to_peer() {
        let peer = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
        assert_eq!(
            effective_pasv_host(Ipv4Addr::UNSPECIFIED, peer),
            peer
        );
    }

    #[test]
    fn inner_address_is_replaced_when_peer_is_public() {
        let peer = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
        assert_eq!(
            effective_pasv_host(Ipv4Addr::new(10, 0, 0, 5), peer),
            peer
        );
        assert_eq!(
            effective_pasv_host(Ipv4Addr::new(127, 0, 0, 1), peer),
            peer
        );
    }

    #[test]
    fn advertised_host_wins_when_routable() {
        let peer = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
        let advertised = Ipv4Addr::new(198, 51, 100, 4);
        assert_eq!(
            effective_pasv_host(advertised, peer),
            IpAddr::V4(advertised)
        );
    }

    #[test]
    fn loopback_peer_keeps_loopback_advertisement() {
        let peer = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert_eq!(
            effective_pasv_host(Ipv4Addr::LOCALHOST, peer),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }
}
