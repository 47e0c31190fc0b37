//! SMTP session state management

use crate::ingest::Delivery;
use crate::smtp::commands::Command;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::response::SmtpResponse;

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// Waiting for HELO/EHLO
    Initial,
    /// Greeted - ready for MAIL
    Greeted,
    /// MAIL FROM received - ready for RCPT
    MailReceived,
    /// At least one RCPT TO received - ready for DATA or more RCPT
    RecipientsReceived,
    /// DATA accepted - collecting message lines
    Data,
}

/// What the connection loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send the reply and keep reading commands
    Reply(SmtpResponse),
    /// Send the reply and close the connection
    Close(SmtpResponse),
}

/// Result of feeding one line of message data
#[derive(Debug)]
pub enum DataLine {
    /// More data expected
    Continue,
    /// The terminating `.` was seen; the transaction is complete
    Complete(Result<Delivery, SmtpError>),
}

/// State and buffers for a single SMTP connection
#[derive(Debug)]
pub struct SmtpSession {
    hostname: String,
    max_message_size: usize,
    state: SmtpState,
    client_domain: Option<String>,
    mail_from: Option<String>,
    rcpt_to: Vec<String>,
    data: Vec<u8>,
    oversized: bool,
}

impl SmtpSession {
    pub fn new(hostname: &str, max_message_size: usize) -> Self {
        Self {
            hostname: hostname.to_owned(),
            max_message_size,
            state: SmtpState::Initial,
            client_domain: None,
            mail_from: None,
            rcpt_to: Vec::new(),
            data: Vec::new(),
            oversized: false,
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    /// Domain announced by the client in HELO/EHLO
    pub fn client_domain(&self) -> Option<&str> {
        self.client_domain.as_deref()
    }

    pub fn in_data_mode(&self) -> bool {
        self.state == SmtpState::Data
    }

    /// Clear the transaction, keeping the greeting
    fn reset_transaction(&mut self) {
        self.mail_from = None;
        self.rcpt_to.clear();
        self.data.clear();
        self.oversized = false;
        if self.state != SmtpState::Initial {
            self.state = SmtpState::Greeted;
        }
    }

    /// Handle one command line and produce the reply.
    pub fn handle_command(&mut self, line: &str) -> Step {
        match Command::parse(line).and_then(|cmd| self.execute(cmd)) {
            Ok(step) => step,
            Err(e) => Step::Reply(SmtpResponse::from_error(&e)),
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Step, SmtpError> {
        let reply = match cmd {
            Command::Helo(domain) => {
                let reply = SmtpResponse::helo(&self.hostname, &domain);
                self.greet(domain);
                reply
            }
            Command::Ehlo(domain) => {
                let reply = SmtpResponse::ehlo(&self.hostname, &domain, self.max_message_size);
                self.greet(domain);
                reply
            }
            Command::Mail(from) => {
                match self.state {
                    SmtpState::Initial => {
                        return Err(SmtpError::InvalidState(
                            "send HELO/EHLO first".to_string(),
                        ))
                    }
                    SmtpState::Greeted => {}
                    _ => {
                        return Err(SmtpError::InvalidState(
                            "nested MAIL command".to_string(),
                        ))
                    }
                }
                self.mail_from = Some(from);
                self.state = SmtpState::MailReceived;
                SmtpResponse::ok()
            }
            Command::Rcpt(to) => {
                if !matches!(
                    self.state,
                    SmtpState::MailReceived | SmtpState::RecipientsReceived
                ) {
                    return Err(SmtpError::InvalidState("need MAIL before RCPT".to_string()));
                }
                if self.rcpt_to.len() >= SmtpLimits::MAX_RECIPIENTS {
                    return Err(SmtpError::TooManyRecipients {
                        max: SmtpLimits::MAX_RECIPIENTS,
                    });
                }
                self.rcpt_to.push(to);
                self.state = SmtpState::RecipientsReceived;
                SmtpResponse::ok()
            }
            Command::Data => {
                if self.state != SmtpState::RecipientsReceived {
                    return Err(SmtpError::InvalidState("need RCPT before DATA".to_string()));
                }
                self.data.clear();
                self.oversized = false;
                self.state = SmtpState::Data;
                SmtpResponse::data_start()
            }
            Command::Rset => {
                self.reset_transaction();
                SmtpResponse::ok()
            }
            Command::Noop => SmtpResponse::ok(),
            Command::Quit => return Ok(Step::Close(SmtpResponse::quit())),
        };
        Ok(Step::Reply(reply))
    }

    fn greet(&mut self, domain: String) {
        self.client_domain = Some(domain);
        self.state = SmtpState::Greeted;
        self.reset_transaction();
    }

    /// Feed one raw line (terminator included) received in DATA mode.
    ///
    /// Lines are kept byte-for-byte apart from dot-unstuffing. Once the
    /// size limit is exceeded further lines are discarded and the transaction
    /// completes with [`SmtpError::TooMuchData`].
    pub fn push_data_line(&mut self, line: &[u8]) -> DataLine {
        if line == b".\r\n" || line == b".\n" || line == b"." {
            return DataLine::Complete(self.finish_data());
        }

        let line = match line.first() {
            Some(b'.') => &line[1..],
            _ => line,
        };

        if self.oversized || self.data.len() + line.len() > self.max_message_size {
            self.oversized = true;
            self.data.clear();
        } else {
            self.data.extend_from_slice(line);
        }
        DataLine::Continue
    }

    fn finish_data(&mut self) -> Result<Delivery, SmtpError> {
        let result = if self.oversized {
            Err(SmtpError::TooMuchData {
                max: self.max_message_size,
            })
        } else {
            Ok(Delivery {
                mail_from: self.mail_from.clone().unwrap_or_default(),
                rcpt_to: self.rcpt_to.clone(),
                content: Some(std::mem::take(&mut self.data)),
            })
        };
        self.reset_transaction();
        result
    }
}
