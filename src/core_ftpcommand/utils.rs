use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::core_proto::Reply;

/// Write side of a control connection, shared with the command handlers.
pub type ControlWriter = Arc<Mutex<OwnedWriteHalf>>;

/// Sends a reply to the client.
pub async fn send_reply(writer: &ControlWriter, reply: &Reply) -> io::Result<()> {
    let mut writer = writer.lock().await;
    writer.write_all(reply.to_string().as_bytes()).await
}

/// Normalizes a client-supplied path against the current virtual
/// directory. The result is always absolute; `.` and empty components
/// vanish and `..` pops, never climbing above "/".
pub fn resolve_virtual(current_dir: &str, arg: &str) -> String {
    let joined = if arg.starts_with('/') {
        arg.to_string()
    } else {
        format!("{}/{}", current_dir, arg)
    };
    let mut stack: Vec<&str> = Vec::new();
    for component in joined.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }
    if stack.is_empty() {
        String::from("/")
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Appends a normalized virtual path to the real root.
fn virtual_to_real(root: &Path, virtual_path: &str) -> PathBuf {
    let mut real = root.to_path_buf();
    for component in virtual_path.split('/').filter(|c| !c.is_empty()) {
        real.push(component);
    }
    real
}

/// A virtual path together with the real path it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub virtual_path: String,
    pub real_path: PathBuf,
}

fn escape_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        "path escapes the virtual root",
    )
}

/// Maps a client path onto the real filesystem and verifies containment.
///
/// The deepest existing ancestor of the candidate is canonicalized (so
/// symlinks cannot smuggle the path outside) and must still live under
/// the canonicalized root. The candidate itself may not exist yet, which
/// is what creating commands need.
pub async fn resolve_path(root: &Path, current_dir: &str, arg: &str) -> io::Result<ResolvedPath> {
    let virtual_path = resolve_virtual(current_dir, arg);
    let real_path = virtual_to_real(root, &virtual_path);

    let canonical_root = tokio::fs::canonicalize(root).await?;
    let mut probe = real_path.as_path();
    let resolved = loop {
        match tokio::fs::canonicalize(probe).await {
            Ok(resolved) => break resolved,
            Err(_) => probe = probe.parent().ok_or_else(escape_error)?,
        }
    };
    if !resolved.starts_with(&canonical_root) {
        return Err(escape_error());
    }
    Ok(ResolvedPath {
        virtual_path,
        real_path,
    })
}

/// Formats one LIST entry the way `ls -l` would, with placeholder
/// ownership. Recent files carry `Mon DD HH:MM`, older ones `Mon DD YYYY`.
pub fn format_list_line(name: &str, metadata: &Metadata) -> String {
    let (file_type, perms, size) = if metadata.is_dir() {
        ('d', "rwxr-xr-x", 0)
    } else {
        ('-', "rw-r--r--", metadata.len())
    };

    let mtime: DateTime<Local> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| DateTime::from(std::time::UNIX_EPOCH));
    let stamp = if Local::now().signed_duration_since(mtime) > Duration::days(180) {
        mtime.format("%b %d %Y")
    } else {
        mtime.format("%b %d %H:%M")
    };

    format!(
        "{}{} 1 owner group {} {} {}",
        file_type, perms, size, stamp, name
    )
}
