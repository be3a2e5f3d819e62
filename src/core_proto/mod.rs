//! The wire-level pieces shared by the server and the client: control
//! line framing, reply consumption, the PASV address encoding and the
//! 257 quoted-path form.

pub mod reply;

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

pub use reply::{codes, Reply};

/// Advertised transfer type, as negotiated by TYPE. Both sides treat it
/// as advisory; bytes always move verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Image,
}

/// Outcome of reading one command line from the control channel.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlLine {
    /// A complete line, CR/LF stripped, decoded with lossy UTF-8.
    Line(String),
    /// The line exceeded the configured ceiling; the remainder up to the
    /// next LF has already been discarded.
    Oversized,
    /// Peer closed the connection.
    Eof,
}

/// Reads one control line, accepting bare LF as well as CRLF.
///
/// At most `max_line_bytes` are buffered; longer input is drained through
/// the next LF and reported as [`ControlLine::Oversized`] so the session
/// can answer 500 and keep going.
pub async fn read_control_line<R>(reader: &mut R, max_line_bytes: usize) -> io::Result<ControlLine>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(128);
    let n = (&mut *reader)
        .take(max_line_bytes as u64)
        .read_until(b'\n', &mut buf)
        .await?;

    if n == 0 {
        return Ok(ControlLine::Eof);
    }

    if !buf.ends_with(b"\n") && buf.len() >= max_line_bytes {
        // Drain the rest of the oversized line in bounded chunks.
        loop {
            let mut chunk = Vec::with_capacity(1024);
            let m = (&mut *reader)
                .take(max_line_bytes as u64)
                .read_until(b'\n', &mut chunk)
                .await?;
            if m == 0 || chunk.ends_with(b"\n") {
                break;
            }
        }
        return Ok(ControlLine::Oversized);
    }

    if buf.ends_with(b"\n") {
        buf.pop();
    }
    if buf.ends_with(b"\r") {
        buf.pop();
    }
    Ok(ControlLine::Line(String::from_utf8_lossy(&buf).into_owned()))
}

/// Splits a command line into the uppercased verb and the raw argument.
pub fn split_command_line(line: &str) -> (String, String) {
    match line.split_once(' ') {
        Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.to_string()),
        None => (line.to_ascii_uppercase(), String::new()),
    }
}

/// Failure while consuming a server reply.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("connection closed by peer")]
    Closed,
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

async fn read_raw_line<R>(reader: &mut R) -> Result<String, ReplyError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(128);
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(ReplyError::Closed);
    }
    if buf.ends_with(b"\n") {
        buf.pop();
    }
    if buf.ends_with(b"\r") {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads one server reply, following multi-line continuations, and
/// returns the code together with the text of the closing line.
pub async fn read_reply<R>(reader: &mut R) -> Result<(u16, String), ReplyError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_raw_line(reader).await?;
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(|b| b.is_ascii_digit()) {
        return Err(ReplyError::Malformed(line));
    }
    let code: u16 = line[..3]
        .parse()
        .map_err(|_| ReplyError::Malformed(line.clone()))?;
    // Lossy decoding can leave a non-ASCII byte right after the code, so
    // slice checked.
    let text_of = |line: &str| line.get(4..).unwrap_or("").to_string();
    let mut text = text_of(&line);

    if line.as_bytes().get(3) == Some(&b'-') {
        // Multi-line: consume until the "{code} " terminator line.
        let terminator = format!("{} ", code);
        let bare = code.to_string();
        loop {
            let next = read_raw_line(reader).await?;
            if next.starts_with(&terminator) || next == bare {
                text = text_of(&next);
                break;
            }
        }
    }
    Ok((code, text))
}

/// Encodes an IPv4 socket address into the 227 six-tuple body.
pub fn encode_pasv_addr(addr: SocketAddrV4) -> String {
    let [h1, h2, h3, h4] = addr.ip().octets();
    format!(
        "{},{},{},{},{},{}",
        h1,
        h2,
        h3,
        h4,
        addr.port() / 256,
        addr.port() % 256
    )
}

fn parse_pasv_tuple(inner: &str) -> Option<SocketAddrV4> {
    let fields: Vec<&str> = inner.split(',').map(str::trim).collect();
    if fields.len() != 6 {
        return None;
    }
    let mut nums = [0u8; 6];
    for (slot, field) in nums.iter_mut().zip(&fields) {
        *slot = field.parse().ok()?;
    }
    let ip = Ipv4Addr::new(nums[0], nums[1], nums[2], nums[3]);
    let port = u16::from(nums[4]) * 256 + u16::from(nums[5]);
    Some(SocketAddrV4::new(ip, port))
}

/// Extracts the data-channel address from a 227 reply text.
///
/// Servers wrap the six-tuple in varying prose, so the last parenthesized
/// group that parses as a six-tuple wins.
pub fn parse_pasv_reply(text: &str) -> Option<SocketAddrV4> {
    let mut found = None;
    let mut rest = text;
    while let Some(start) = rest.find('(') {
        let tail = &rest[start + 1..];
        match tail.find(')') {
            Some(end) => {
                if let Some(addr) = parse_pasv_tuple(&tail[..end]) {
                    found = Some(addr);
                }
                rest = &tail[end + 1..];
            }
            None => break,
        }
    }
    found
}

/// Quotes a path for a 257 reply, doubling embedded quotes.
pub fn quote_pwd_path(path: &str) -> String {
    format!("\"{}\"", path.replace('"', "\"\""))
}

/// Extracts the first quoted group from a 257 reply text, folding doubled
/// quotes back into literal ones.
pub fn parse_quoted_path(text: &str) -> Option<String> {
    let start = text.find('"')?;
    let mut out = String::new();
    let mut chars = text[start + 1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                return Some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn reads_crlf_and_bare_lf_lines() {
        let mut reader = BufReader::new(Cursor::new(b"USER alice\r\nPASS hunter2\n".to_vec()));
        assert_eq!(
            read_control_line(&mut reader, 8192).await.unwrap(),
            ControlLine::Line("USER alice".into())
        );
        assert_eq!(
            read_control_line(&mut reader, 8192).await.unwrap(),
            ControlLine::Line("PASS hunter2".into())
        );
        assert_eq!(
            read_control_line(&mut reader, 8192).await.unwrap(),
            ControlLine::Eof
        );
    }

    #[tokio::test]
    async fn oversized_line_is_discarded_up_to_next_lf() {
        let mut input = vec![b'A'; 100];
        input.extend_from_slice(b"\r\nNOOP\r\n");
        let mut reader = BufReader::new(Cursor::new(input));
        assert_eq!(
            read_control_line(&mut reader, 16).await.unwrap(),
            ControlLine::Oversized
        );
        // The following command must still be readable.
        assert_eq!(
            read_control_line(&mut reader, 16).await.unwrap(),
            ControlLine::Line("NOOP".into())
        );
    }

    #[test]
    fn splits_verb_and_argument() {
        assert_eq!(
            split_command_line("stor some file.txt"),
            ("STOR".into(), "some file.txt".into())
        );
        assert_eq!(split_command_line("PWD"), ("PWD".into(), String::new()));
    }

    #[tokio::test]
    async fn reads_single_line_reply() {
        let mut reader = BufReader::new(Cursor::new(b"220 Ready\r\n".to_vec()));
        assert_eq!(read_reply(&mut reader).await.unwrap(), (220, "Ready".into()));
    }

    #[tokio::test]
    async fn reads_multi_line_reply_to_terminator() {
        let raw = b"220-Welcome\r\n some prose\r\n220 Done\r\nNEXT".to_vec();
        let mut reader = BufReader::new(Cursor::new(raw));
        assert_eq!(read_reply(&mut reader).await.unwrap(), (220, "Done".into()));
    }

    #[tokio::test]
    async fn rejects_non_numeric_reply() {
        let mut reader = BufReader::new(Cursor::new(b"oops\r\n".to_vec()));
        assert!(matches!(
            read_reply(&mut reader).await,
            Err(ReplyError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn eof_mid_reply_is_closed() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        assert!(matches!(
            read_reply(&mut reader).await,
            Err(ReplyError::Closed)
        ));
    }

    #[test]
    fn pasv_addr_round_trip() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 9), 50021);
        let body = encode_pasv_addr(addr);
        assert_eq!(body, "192,168,1,9,195,109");
        let text = format!("Entering Passive Mode ({}).", body);
        assert_eq!(parse_pasv_reply(&text), Some(addr));
    }

    #[test]
    fn pasv_parse_takes_last_tuple() {
        let text = "ok (1,2,3) then (10,0,0,1,4,0) and (127,0,0,1,19,137)";
        assert_eq!(
            parse_pasv_reply(text),
            Some(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 19 * 256 + 137))
        );
    }

    #[test]
    fn pasv_parse_rejects_prose_only() {
        assert_eq!(parse_pasv_reply("Entering Passive Mode"), None);
        assert_eq!(parse_pasv_reply("(not,a,tuple)"), None);
    }

    #[test]
    fn quoted_path_round_trip() {
        let quoted = quote_pwd_path(r#"/odd"name"#);
        assert_eq!(quoted, r#""/odd""name""#);
        let text = format!("{} is the current directory", quoted);
        assert_eq!(parse_quoted_path(&text).as_deref(), Some(r#"/odd"name"#));
    }

    #[test]
    fn quoted_path_missing_quotes() {
        assert_eq!(parse_quoted_path("257 no quotes here"), None);
    }
}
