use std::io;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::utils::{send_reply, ControlWriter};
use crate::core_proto::{codes, Reply};
use crate::session::{Session, TransferType};

/// Handles the TYPE command. A and I are accepted and recorded; the
/// transfer itself always moves bytes verbatim.
pub async fn handle_type_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    _users: Arc<UserTable>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> io::Result<()> {
    let requested = match arg.trim().to_ascii_uppercase().as_str() {
        "A" => TransferType::Ascii,
        "I" => TransferType::Image,
        _ => {
            return send_reply(
                &writer,
                &Reply::new(
                    codes::NOT_IMPLEMENTED_PARAM,
                    "Only TYPE A and TYPE I are supported.",
                ),
            )
            .await;
        }
    };

    session.lock().await.transfer_type = requested;
    let label = match requested {
        TransferType::Ascii => "A",
        TransferType::Image => "I",
    };
    send_reply(
        &writer,
        &Reply::new(codes::COMMAND_OKAY, format!("Type set to {}.", label)),
    )
    .await
}
