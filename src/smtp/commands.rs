//! Parsing of SMTP command lines

use crate::smtp::error::{SmtpError, SmtpLimits};

/// A parsed SMTP command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Helo(String),
    Ehlo(String),
    /// Reverse-path; empty for the null sender `<>`
    Mail(String),
    Rcpt(String),
    Data,
    Rset,
    Noop,
    Quit,
}

impl Command {
    /// Parse one command line (without its line terminator).
    pub fn parse(line: &str) -> Result<Self, SmtpError> {
        if line.len() + 2 > SmtpLimits::COMMAND_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
            });
        }

        let line = line.trim();
        let (verb, args) = match line.split_once(char::is_whitespace) {
            Some((verb, args)) => (verb, args.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_uppercase().as_str() {
            "HELO" => Ok(Command::Helo(domain_argument("HELO", args)?)),
            "EHLO" => Ok(Command::Ehlo(domain_argument("EHLO", args)?)),
            "MAIL" => {
                let path = path_argument(args, "FROM:")?;
                Ok(Command::Mail(path))
            }
            "RCPT" => {
                let path = path_argument(args, "TO:")?;
                if path.is_empty() {
                    return Err(SmtpError::InvalidSyntax(
                        "TO address cannot be empty".to_string(),
                    ));
                }
                Ok(Command::Rcpt(path))
            }
            "DATA" => no_argument("DATA", args, Command::Data),
            "RSET" => no_argument("RSET", args, Command::Rset),
            // NOOP may carry a string that is ignored
            "NOOP" => Ok(Command::Noop),
            "QUIT" => no_argument("QUIT", args, Command::Quit),
            "STARTTLS" | "AUTH" | "VRFY" | "EXPN" | "TURN" | "BDAT" => {
                Err(SmtpError::NotImplemented(verb.to_ascii_uppercase()))
            }
            _ => Err(SmtpError::InvalidCommand),
        }
    }
}

fn domain_argument(verb: &str, args: &str) -> Result<String, SmtpError> {
    match args.split_whitespace().next() {
        Some(domain) => Ok(domain.to_string()),
        None => Err(SmtpError::InvalidSyntax(format!(
            "{verb} requires domain argument"
        ))),
    }
}

fn no_argument(verb: &str, args: &str, command: Command) -> Result<Command, SmtpError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(SmtpError::InvalidSyntax(format!(
            "{verb} command takes no arguments"
        )))
    }
}

/// Extract the address from `FROM:<addr> [params]` / `TO:<addr> [params]`.
///
/// ESMTP parameters after the path (`SIZE=`, `BODY=8BITMIME`) are accepted
/// and ignored.
fn path_argument(args: &str, keyword: &str) -> Result<String, SmtpError> {
    let prefix_ok = args
        .get(..keyword.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(keyword));
    if !prefix_ok {
        return Err(SmtpError::InvalidSyntax(format!(
            "expected '{keyword}<address>'"
        )));
    }

    let rest = args[keyword.len()..].trim_start();
    let Some(inner) = rest.strip_prefix('<') else {
        return Err(SmtpError::InvalidSyntax(
            "address must be enclosed in angle brackets".to_string(),
        ));
    };
    let Some(end) = inner.find('>') else {
        return Err(SmtpError::InvalidSyntax(
            "address must be enclosed in angle brackets".to_string(),
        ));
    };

    Ok(inner[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(
            Command::parse("HELO client.local").unwrap(),
            Command::Helo("client.local".into())
        );
        assert_eq!(
            Command::parse("ehlo client.local").unwrap(),
            Command::Ehlo("client.local".into())
        );
        assert_eq!(Command::parse("DATA").unwrap(), Command::Data);
        assert_eq!(Command::parse("rset").unwrap(), Command::Rset);
        assert_eq!(Command::parse("NOOP hello").unwrap(), Command::Noop);
        assert_eq!(Command::parse("QUIT").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_mail_with_params() {
        assert_eq!(
            Command::parse("MAIL FROM:<a@example.com> BODY=8BITMIME SIZE=120").unwrap(),
            Command::Mail("a@example.com".into())
        );
        assert_eq!(
            Command::parse("MAIL FROM: <a@example.com>").unwrap(),
            Command::Mail("a@example.com".into())
        );
    }

    #[test]
    fn test_parse_null_sender() {
        assert_eq!(Command::parse("MAIL FROM:<>").unwrap(), Command::Mail(String::new()));
    }

    #[test]
    fn test_parse_rcpt() {
        assert_eq!(
            Command::parse("RCPT TO:<b@example.com>").unwrap(),
            Command::Rcpt("b@example.com".into())
        );
        assert!(matches!(
            Command::parse("RCPT TO:<>"),
            Err(SmtpError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Command::parse("BOGUS"), Err(SmtpError::InvalidCommand)));
        assert!(matches!(Command::parse("HELO"), Err(SmtpError::InvalidSyntax(_))));
        assert!(matches!(
            Command::parse("MAIL a@example.com"),
            Err(SmtpError::InvalidSyntax(_))
        ));
        assert!(matches!(
            Command::parse("STARTTLS"),
            Err(SmtpError::NotImplemented(_))
        ));
        let long = format!("HELO {}", "x".repeat(600));
        assert!(matches!(Command::parse(&long), Err(SmtpError::LineTooLong { .. })));
    }
}
