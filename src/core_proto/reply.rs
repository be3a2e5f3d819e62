use std::fmt;

/// Reply codes used on the control channel.
///
/// RFC 959 defines many more; this is the subset the server sends and the
/// client understands. The first digit carries the class (1 preliminary,
/// 2 success, 3 intermediate, 4 transient failure, 5 permanent failure).
pub mod codes {
    pub const FILE_STATUS_OKAY: u16 = 150;
    pub const COMMAND_OKAY: u16 = 200;
    pub const FILE_STATUS: u16 = 213;
    pub const SYSTEM_TYPE: u16 = 215;
    pub const SERVICE_READY: u16 = 220;
    pub const CLOSING_CONTROL: u16 = 221;
    pub const CLOSING_DATA: u16 = 226;
    pub const ENTERING_PASSIVE: u16 = 227;
    pub const LOGGED_IN: u16 = 230;
    pub const FILE_ACTION_OKAY: u16 = 250;
    pub const PATH_CREATED: u16 = 257;
    pub const NEED_PASSWORD: u16 = 331;
    pub const FILE_ACTION_PENDING: u16 = 350;
    pub const CANT_OPEN_DATA: u16 = 425;
    pub const TRANSFER_ABORTED: u16 = 426;
    pub const FILE_ACTION_NOT_TAKEN: u16 = 450;
    pub const SYNTAX_ERROR: u16 = 500;
    pub const SYNTAX_ERROR_ARGS: u16 = 501;
    pub const BAD_SEQUENCE: u16 = 503;
    pub const NOT_IMPLEMENTED_PARAM: u16 = 504;
    pub const NOT_LOGGED_IN: u16 = 530;
    pub const FILE_UNAVAILABLE: u16 = 550;
    pub const BAD_FILE_NAME: u16 = 553;
}

/// A numeric reply, single- or multi-line.
///
/// Rendering follows RFC 959: a single line is `"{code} {text}\r\n"`;
/// a multi-line reply opens with `"{code}-{first}\r\n"`, continues with
/// space-indented lines and closes with `"{code} {last}\r\n"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Reply {
            code,
            lines: vec![text.into()],
        }
    }

    /// Builds a multi-line reply from any number of text lines.
    /// An empty iterator degenerates to a single empty line.
    pub fn multiline<I>(code: u16, lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        Reply { code, lines }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.len() == 1 {
            return write!(f, "{} {}\r\n", self.code, self.lines[0]);
        }
        let last = self.lines.len() - 1;
        for (i, line) in self.lines.iter().enumerate() {
            if i == 0 {
                write!(f, "{}-{}\r\n", self.code, line)?;
            } else if i == last {
                write!(f, "{} {}\r\n", self.code, line)?;
            } else {
                write!(f, " {}\r\n", line)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_single_line() {
        let reply = Reply::new(220, "Service ready.");
        assert_eq!(reply.to_string(), "220 Service ready.\r\n");
    }

    #[test]
    fn renders_multi_line_with_continuations() {
        let reply = Reply::multiline(220, ["Welcome", "second line", "Bye"]);
        assert_eq!(
            reply.to_string(),
            "220-Welcome\r\n second line\r\n220 Bye\r\n"
        );
    }

    #[test]
    fn two_lines_have_no_indented_middle() {
        let reply = Reply::multiline(230, ["Logged in", "Proceed"]);
        assert_eq!(reply.to_string(), "230-Logged in\r\n230 Proceed\r\n");
    }

    #[test]
    fn empty_multiline_degenerates() {
        let reply = Reply::multiline(200, Vec::<String>::new());
        assert_eq!(reply.to_string(), "200 \r\n");
    }
}
