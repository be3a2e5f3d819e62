use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex as TokioMutex;

use crate::config::Config;
use crate::core_auth::UserTable;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::utils::ControlWriter;
use crate::session::Session;

// The PASV handler lives with the rest of the data-channel plumbing
use crate::core_network::pasv;

pub type CommandHandler = Box<
    dyn Fn(
            ControlWriter,
            Arc<Config>,
            Arc<UserTable>,
            Arc<TokioMutex<Session>>,
            String, // Argument portion of the command line
        ) -> Pin<Box<dyn Future<Output = Result<(), io::Error>> + Send>>
        + Send
        + Sync,
>;

/// Permission a verb demands beyond being logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredPerm {
    None,
    Read,
    Write,
}

/// One dispatch-table row: the gate flags checked before the handler runs.
pub struct CommandSpec {
    pub requires_auth: bool,
    pub required_perm: RequiredPerm,
    pub needs_arg: bool,
    pub handler: CommandHandler,
}

fn entry(
    requires_auth: bool,
    required_perm: RequiredPerm,
    needs_arg: bool,
    handler: CommandHandler,
) -> CommandSpec {
    CommandSpec {
        requires_auth,
        required_perm,
        needs_arg,
        handler,
    }
}

pub fn initialize_command_handlers() -> HashMap<FtpCommand, CommandSpec> {
    let mut handlers: HashMap<FtpCommand, CommandSpec> = HashMap::new();

    handlers.insert(
        FtpCommand::USER,
        entry(
            false,
            RequiredPerm::None,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::user::handle_user_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::PASS,
        entry(
            false,
            RequiredPerm::None,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::pass::handle_pass_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::QUIT,
        entry(
            false,
            RequiredPerm::None,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::quit::handle_quit_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::NOOP,
        entry(
            false,
            RequiredPerm::None,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::noop::handle_noop_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::SYST,
        entry(
            false,
            RequiredPerm::None,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::syst::handle_syst_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::TYPE,
        entry(
            false,
            RequiredPerm::None,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::type_::handle_type_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::PWD,
        entry(
            true,
            RequiredPerm::Read,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::pwd::handle_pwd_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::CWD,
        entry(
            true,
            RequiredPerm::Read,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::cwd::handle_cwd_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::CDUP,
        entry(
            true,
            RequiredPerm::Read,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::cdup::handle_cdup_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::PASV,
        entry(
            true,
            RequiredPerm::Read,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(pasv::handle_pasv_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::LIST,
        entry(
            true,
            RequiredPerm::Read,
            false,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::list::handle_list_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::RETR,
        entry(
            true,
            RequiredPerm::Read,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::retr::handle_retr_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::SIZE,
        entry(
            true,
            RequiredPerm::Read,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::size::handle_size_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::MDTM,
        entry(
            true,
            RequiredPerm::Read,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::mdtm::handle_mdtm_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::STOR,
        entry(
            true,
            RequiredPerm::Write,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::stor::handle_stor_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::MKD,
        entry(
            true,
            RequiredPerm::Write,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::mkd::handle_mkd_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::RMD,
        entry(
            true,
            RequiredPerm::Write,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::rmd::handle_rmd_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::DELE,
        entry(
            true,
            RequiredPerm::Write,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::dele::handle_dele_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::RNFR,
        entry(
            true,
            RequiredPerm::Write,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::rnfr::handle_rnfr_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers.insert(
        FtpCommand::RNTO,
        entry(
            true,
            RequiredPerm::Write,
            true,
            Box::new(|writer, config, users, session, arg| {
                Box::pin(crate::core_ftpcommand::rnto::handle_rnto_command(
                    writer, config, users, session, arg,
                ))
            }),
        ),
    );

    handlers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verb_has_a_table_row() {
        let handlers = initialize_command_handlers();
        for verb in [
            "USER", "PASS", "QUIT", "PWD", "LIST", "CWD", "CDUP", "NOOP", "MKD", "RMD", "DELE",
            "RNFR", "RNTO", "RETR", "STOR", "PASV", "SYST", "TYPE", "SIZE", "MDTM",
        ] {
            let cmd = FtpCommand::from_str(verb).expect(verb);
            assert!(handlers.contains_key(&cmd), "missing row for {}", verb);
        }
    }

    #[test]
    fn mutating_verbs_require_write() {
        let handlers = initialize_command_handlers();
        for verb in ["STOR", "MKD", "RMD", "DELE", "RNFR", "RNTO"] {
            let cmd = FtpCommand::from_str(verb).unwrap();
            assert_eq!(
                handlers[&cmd].required_perm,
                RequiredPerm::Write,
                "{} must demand write permission",
                verb
            );
        }
    }

    #[test]
    fn login_verbs_skip_the_auth_gate() {
        let handlers = initialize_command_handlers();
        for verb in ["USER", "PASS", "QUIT", "NOOP", "SYST", "TYPE"] {
            let cmd = FtpCommand::from_str(verb).unwrap();
            assert!(!handlers[&cmd].requires_auth, "{} must not require auth", verb);
        }
    }
}
