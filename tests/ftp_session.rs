//! End-to-end tests: a real server over a temporary root, driven by the
//! client library, plus raw-socket checks for protocol misuse the client
//! is too polite to produce.

use std::net::SocketAddr;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use ferroftp::config::{Config, ServerConfig, UserConfig};
use ferroftp::core_auth::Permission;
use ferroftp::core_proto::read_reply;
use ferroftp::{FtpClient, FtpError, Server, ShutdownFlag};

struct TestServer {
    addr: SocketAddr,
    root: TempDir,
    shutdown: ShutdownFlag,
}

async fn spawn_server() -> TestServer {
    let root = tempfile::tempdir().unwrap();
    let config = Config {
        server: ServerConfig {
            bind_host: "127.0.0.1".into(),
            bind_port: 0,
            chroot_dir: root.path().to_path_buf(),
            pasv_address: None,
            data_timeout_secs: 2,
            max_line_bytes: 512,
            banner: Some("Welcome to the test instance".into()),
        },
        users: vec![
            UserConfig {
                name: "user".into(),
                password: "123456".into(),
                permission: Permission::ReadWrite,
            },
            UserConfig {
                name: "guest".into(),
                password: "guest".into(),
                permission: Permission::ReadOnly,
            },
        ],
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_flag();
    tokio::spawn(server.serve());
    TestServer {
        addr,
        root,
        shutdown,
    }
}

async fn client_as(server: &TestServer, user: &str, password: &str) -> FtpClient {
    let mut client = FtpClient::connect("127.0.0.1", server.addr.port())
        .await
        .unwrap();
    client.login(user, password).await.unwrap();
    client
}

type RawControl = (BufReader<OwnedReadHalf>, OwnedWriteHalf);

/// Raw control connection with the greeting already consumed.
async fn raw_connect(server: &TestServer) -> RawControl {
    let stream = TcpStream::connect(server.addr).await.unwrap();
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let (code, _) = read_reply(&mut reader).await.unwrap();
    assert_eq!(code, 220);
    (reader, write_half)
}

async fn raw_command(control: &mut RawControl, line: &str) -> (u16, String) {
    control
        .1
        .write_all(format!("{}\r\n", line).as_bytes())
        .await
        .unwrap();
    read_reply(&mut control.0).await.unwrap()
}

async fn raw_login(control: &mut RawControl, user: &str, password: &str) {
    let (code, _) = raw_command(control, &format!("USER {}", user)).await;
    assert_eq!(code, 331);
    let (code, _) = raw_command(control, &format!("PASS {}", password)).await;
    assert_eq!(code, 230);
}

#[tokio::test]
async fn login_handshake_and_pwd() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;
    assert_eq!(client.pwd().await.unwrap(), "/");
    assert_eq!(client.syst().await.unwrap(), "UNIX Type: L8");
    client.quit().await.unwrap();
}

#[tokio::test]
async fn wrong_password_is_an_auth_error() {
    let server = spawn_server().await;
    let mut client = FtpClient::connect("127.0.0.1", server.addr.port())
        .await
        .unwrap();
    match client.login("user", "nope").await {
        Err(FtpError::Auth { code, .. }) => assert_eq!(code, 530),
        other => panic!("expected auth rejection, got {:?}", other.err()),
    }
    // The session survives a failed login; a second attempt works.
    client.login("user", "123456").await.unwrap();
}

#[tokio::test]
async fn directory_lifecycle() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    client.mkd("/sub").await.unwrap();
    client.cwd("/sub").await.unwrap();
    assert_eq!(client.pwd().await.unwrap(), "/sub");
    client.cdup().await.unwrap();
    assert_eq!(client.pwd().await.unwrap(), "/");
    client.rmd("/sub").await.unwrap();

    match client.cwd("/sub").await {
        Err(FtpError::Command { code, .. }) => assert_eq!(code, 550),
        other => panic!("expected 550 on removed directory, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn cwd_dotdot_round_trip_leaves_directory_unchanged() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;
    client.mkd("a").await.unwrap();
    client.cwd("a").await.unwrap();
    let before = client.pwd().await.unwrap();
    client.mkd("b").await.unwrap();
    client.cwd("b").await.unwrap();
    client.cwd("..").await.unwrap();
    assert_eq!(client.pwd().await.unwrap(), before);
}

#[tokio::test]
async fn upload_download_round_trip() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;
    client.type_binary().await.unwrap();

    let payload = b"hello\n";
    let mut source: &[u8] = payload;
    client.store("hello.txt", &mut source).await.unwrap();

    // Bytes landed under the real root, verbatim.
    assert_eq!(
        std::fs::read(server.root.path().join("hello.txt")).unwrap(),
        payload
    );
    assert_eq!(client.size("hello.txt").await.unwrap(), payload.len() as u64);

    let mut sink: Vec<u8> = Vec::new();
    client.retrieve("hello.txt", &mut sink).await.unwrap();
    assert_eq!(sink, payload);
}

#[tokio::test]
async fn stor_truncates_an_existing_file() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    let mut first: &[u8] = b"a much longer first version";
    client.store("f.txt", &mut first).await.unwrap();
    let mut second: &[u8] = b"short";
    client.store("f.txt", &mut second).await.unwrap();

    assert_eq!(
        std::fs::read(server.root.path().join("f.txt")).unwrap(),
        b"short"
    );
}

#[tokio::test]
async fn zero_byte_upload_creates_an_empty_file() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    let mut source: &[u8] = b"";
    client.store("empty.bin", &mut source).await.unwrap();

    let on_disk = std::fs::read(server.root.path().join("empty.bin")).unwrap();
    assert!(on_disk.is_empty());

    let mut sink: Vec<u8> = Vec::new();
    client.retrieve("empty.bin", &mut sink).await.unwrap();
    assert!(sink.is_empty());
}

#[tokio::test]
async fn rename_moves_the_file() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    let mut source: &[u8] = b"x";
    client.store("a.txt", &mut source).await.unwrap();
    client.rename("a.txt", "b.txt").await.unwrap();

    let mut sink: Vec<u8> = Vec::new();
    client.retrieve("b.txt", &mut sink).await.unwrap();
    assert_eq!(sink, b"x");

    match client.retrieve("a.txt", &mut sink).await {
        Err(FtpError::Command { code, .. }) => assert_eq!(code, 550),
        other => panic!("expected 550 for the old name, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn delete_removes_the_file() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    let mut source: &[u8] = b"bye";
    client.store("doomed.txt", &mut source).await.unwrap();
    client.dele("doomed.txt").await.unwrap();
    assert!(!server.root.path().join("doomed.txt").exists());

    match client.dele("doomed.txt").await {
        Err(FtpError::Command { code, .. }) => assert_eq!(code, 550),
        other => panic!("expected 550 on double delete, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn listing_shows_files_and_directories() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    client.mkd("sub").await.unwrap();
    let mut source: &[u8] = b"data";
    client.store("file.txt", &mut source).await.unwrap();

    let lines = client.list(None).await.unwrap();
    assert_eq!(lines.len(), 2);

    let file_line = lines.iter().find(|l| l.ends_with("file.txt")).unwrap();
    assert!(file_line.starts_with("-rw-r--r-- 1 owner group 4 "));
    let dir_line = lines.iter().find(|l| l.ends_with("sub")).unwrap();
    assert!(dir_line.starts_with("drwxr-xr-x 1 owner group 0 "));

    // Listing a subdirectory by path.
    let empty = client.list(Some("sub")).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn read_only_user_cannot_mutate() {
    let server = spawn_server().await;
    let mut guest = client_as(&server, "guest", "guest").await;

    let mut source: &[u8] = b"nope";
    match guest.store("x", &mut source).await {
        Err(FtpError::Command { code, .. }) => assert_eq!(code, 550),
        other => panic!("expected 550 for guest STOR, got {:?}", other.err()),
    }
    assert!(!server.root.path().join("x").exists());

    for failure in [
        guest.mkd("d").await.err().unwrap(),
        guest.rmd("d").await.err().unwrap(),
        guest.dele("f").await.err().unwrap(),
        guest.rename("a", "b").await.err().unwrap(),
    ] {
        match failure {
            FtpError::Command { code, .. } => assert!(code >= 500, "got {}", code),
            other => panic!("expected command rejection, got {:?}", other),
        }
    }

    // Reading still works.
    guest.list(None).await.unwrap();
    assert_eq!(guest.pwd().await.unwrap(), "/");
}

#[tokio::test]
async fn path_escapes_stay_inside_the_root() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    match client.cwd("/../../etc").await {
        Err(FtpError::Command { code, .. }) => assert_eq!(code, 550),
        other => panic!("expected 550 on escape attempt, got {:?}", other.err()),
    }

    // Dot-dot prefixes collapse onto the virtual root: the upload lands
    // inside the sandbox, not beside it.
    let mut source: &[u8] = b"contained";
    client.store("/../escape.txt", &mut source).await.unwrap();
    assert!(server.root.path().join("escape.txt").exists());
    assert!(!server.root.path().parent().unwrap().join("escape.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escape_is_refused() {
    let server = spawn_server().await;
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), server.root.path().join("exit")).unwrap();

    let mut client = client_as(&server, "user", "123456").await;
    let mut sink: Vec<u8> = Vec::new();
    match client.retrieve("exit/secret.txt", &mut sink).await {
        Err(FtpError::Command { code, .. }) => assert_eq!(code, 550),
        other => panic!("expected 550 through the symlink, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn mkd_reply_quotes_odd_names() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    client.mkd("odd\"name").await.unwrap();
    client.cwd("odd\"name").await.unwrap();
    assert_eq!(client.pwd().await.unwrap(), "/odd\"name");
}

#[tokio::test]
async fn oversized_command_line_keeps_the_session_alive() {
    let server = spawn_server().await;
    let mut control = raw_connect(&server).await;

    let long_line = "A".repeat(600); // past the 512-byte test ceiling
    let (code, _) = raw_command(&mut control, &long_line).await;
    assert_eq!(code, 500);

    let (code, _) = raw_command(&mut control, "NOOP").await;
    assert_eq!(code, 200);
}

#[tokio::test]
async fn pre_dispatch_rejections() {
    let server = spawn_server().await;
    let mut control = raw_connect(&server).await;

    // Unknown verb, then required-argument and auth gates.
    let (code, _) = raw_command(&mut control, "FOOBAR").await;
    assert_eq!(code, 500);
    let (code, _) = raw_command(&mut control, "PWD").await;
    assert_eq!(code, 530);

    raw_login(&mut control, "user", "123456").await;
    let (code, _) = raw_command(&mut control, "RETR").await;
    assert_eq!(code, 501);
    let (code, _) = raw_command(&mut control, "TYPE X").await;
    assert_eq!(code, 504);
}

#[tokio::test]
async fn data_verb_without_pasv_is_refused() {
    let server = spawn_server().await;
    let mut control = raw_connect(&server).await;
    raw_login(&mut control, "user", "123456").await;

    let (code, _) = raw_command(&mut control, "LIST").await;
    assert_eq!(code, 425);
}

#[tokio::test]
async fn pasv_accept_times_out() {
    let server = spawn_server().await;
    let mut control = raw_connect(&server).await;
    raw_login(&mut control, "user", "123456").await;

    let (code, text) = raw_command(&mut control, "PASV").await;
    assert_eq!(code, 227);
    assert!(text.contains('('), "no tuple in {:?}", text);

    // Never dial the advertised port; the accept must give up on its own.
    let (code, _) = raw_command(&mut control, "LIST").await;
    assert_eq!(code, 425);

    // And the session is still usable.
    let (code, _) = raw_command(&mut control, "NOOP").await;
    assert_eq!(code, 200);
}

#[tokio::test]
async fn rnto_without_rnfr_is_a_sequence_error() {
    let server = spawn_server().await;
    let mut control = raw_connect(&server).await;
    raw_login(&mut control, "user", "123456").await;

    let (code, _) = raw_command(&mut control, "RNTO b.txt").await;
    assert_eq!(code, 503);
}

#[tokio::test]
async fn rename_source_does_not_survive_an_intervening_command() {
    let server = spawn_server().await;
    std::fs::write(server.root.path().join("a.txt"), b"x").unwrap();

    let mut control = raw_connect(&server).await;
    raw_login(&mut control, "user", "123456").await;

    let (code, _) = raw_command(&mut control, "RNFR a.txt").await;
    assert_eq!(code, 350);
    let (code, _) = raw_command(&mut control, "NOOP").await;
    assert_eq!(code, 200);
    let (code, _) = raw_command(&mut control, "RNTO b.txt").await;
    assert_eq!(code, 503);
    assert!(server.root.path().join("a.txt").exists());
}

#[tokio::test]
async fn mdtm_reports_a_timestamp() {
    let server = spawn_server().await;
    std::fs::write(server.root.path().join("stamped.txt"), b"t").unwrap();

    let mut control = raw_connect(&server).await;
    raw_login(&mut control, "user", "123456").await;

    let (code, text) = raw_command(&mut control, "MDTM stamped.txt").await;
    assert_eq!(code, 213);
    assert_eq!(text.len(), 14);
    assert!(text.bytes().all(|b| b.is_ascii_digit()), "got {:?}", text);

    let (code, _) = raw_command(&mut control, "MDTM missing.txt").await;
    assert_eq!(code, 550);
}

#[tokio::test]
async fn user_restarts_the_login_handshake() {
    let server = spawn_server().await;
    let mut control = raw_connect(&server).await;
    raw_login(&mut control, "user", "123456").await;

    // A fresh USER drops the session back to password stage.
    let (code, _) = raw_command(&mut control, "USER guest").await;
    assert_eq!(code, 331);
    let (code, _) = raw_command(&mut control, "PWD").await;
    assert_eq!(code, 530);
    let (code, _) = raw_command(&mut control, "PASS guest").await;
    assert_eq!(code, 230);
    let (code, _) = raw_command(&mut control, "PWD").await;
    assert_eq!(code, 257);
}

#[tokio::test]
async fn shutdown_stops_the_listener() {
    let server = spawn_server().await;
    let mut client = client_as(&server, "user", "123456").await;

    server.shutdown.trigger();

    // The running session exits at its next I/O boundary.
    let failed = client.noop().await.is_err() || client.noop().await.is_err();
    assert!(failed, "session survived shutdown");
}
