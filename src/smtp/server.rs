//! SMTP server implementation

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::ingest::Ingestor;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{DataLine, SmtpSession, Step};

/// Upper bound for a single command line before it is rejected outright.
const COMMAND_READ_LIMIT: u64 = 4096;

/// SMTP listener that hands every finished transaction to an [`Ingestor`]
#[derive(Debug, Clone)]
pub struct SmtpServer {
    /// Name announced in the greeting
    hostname: String,
    ingestor: Ingestor,
    max_message_size: usize,
}

impl SmtpServer {
    pub fn new(hostname: &str, ingestor: Ingestor, max_message_size: usize) -> Self {
        Self {
            hostname: hostname.to_owned(),
            ingestor,
            max_message_size,
        }
    }

    /// Bind the listening socket.
    pub fn bind(addr: &str) -> crate::error::Result<TcpListener> {
        TcpListener::bind(addr).map_err(|e| CaptureError::bind("SMTP", addr, e))
    }

    /// Accept connections forever, one thread per client (blocking).
    pub fn serve(&self, listener: TcpListener) {
        match listener.local_addr() {
            Ok(addr) => info!(%addr, "SMTP server listening"),
            Err(e) => warn!(error = %e, "SMTP listener has no local address"),
        }

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        debug!(%peer, "SMTP connection opened");
                        if let Err(e) = server.handle_client(stream) {
                            warn!(%peer, error = %e, "Error handling SMTP client");
                        }
                        debug!(%peer, "SMTP connection closed");
                    });
                }
                Err(e) => warn!(error = %e, "Error accepting SMTP connection"),
            }
        }
    }

    /// Run one SMTP conversation to completion
    fn handle_client(&self, mut stream: TcpStream) -> Result<(), SmtpError> {
        let mut session = SmtpSession::new(&self.hostname, self.max_message_size);
        let mut reader = BufReader::new(stream.try_clone()?);

        self.send_response(&mut stream, &SmtpResponse::greeting(&self.hostname))?;

        // Room for the largest message plus the line terminator.
        let data_read_limit = self.max_message_size as u64 + 3;
        let mut line = Vec::new();
        loop {
            line.clear();

            if session.in_data_mode() {
                if read_line_limited(&mut reader, &mut line, data_read_limit)? == 0 {
                    break;
                }
                match session.push_data_line(&line) {
                    DataLine::Continue => {}
                    DataLine::Complete(Ok(delivery)) => {
                        let ack = self.ingestor.on_message_received(delivery);
                        self.send_response(&mut stream, &SmtpResponse::from_ack(&ack))?;
                    }
                    DataLine::Complete(Err(e)) => {
                        info!(
                            client = session.client_domain().unwrap_or("-"),
                            error = %e,
                            "Rejected message"
                        );
                        self.send_response(&mut stream, &SmtpResponse::from_error(&e))?;
                    }
                }
                continue;
            }

            if read_line_limited(&mut reader, &mut line, COMMAND_READ_LIMIT)? == 0 {
                break;
            }
            if !line.ends_with(b"\n") && line.len() as u64 == COMMAND_READ_LIMIT {
                discard_rest_of_line(&mut reader)?;
                let err = SmtpError::LineTooLong {
                    max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
                };
                self.send_response(&mut stream, &SmtpResponse::from_error(&err))?;
                continue;
            }

            let text = String::from_utf8_lossy(&line);
            let command = text.trim_end_matches(['\r', '\n']);
            if command.trim().is_empty() {
                continue;
            }
            debug!(command, "SMTP command");

            match session.handle_command(command) {
                Step::Reply(response) => self.send_response(&mut stream, &response)?,
                Step::Close(response) => {
                    self.send_response(&mut stream, &response)?;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Send a response to the client
    fn send_response(
        &self,
        stream: &mut TcpStream,
        response: &SmtpResponse,
    ) -> Result<(), SmtpError> {
        let too_long = response
            .lines
            .iter()
            .any(|l| l.len() + 6 > SmtpLimits::REPLY_LINE_MAX_LENGTH);
        if too_long {
            let truncated = SmtpResponse::new(response.code, "Response too long (truncated)");
            stream.write_all(truncated.format().as_bytes())?;
        } else {
            stream.write_all(response.format().as_bytes())?;
        }
        stream.flush()?;
        Ok(())
    }
}

/// Read up to and including `\n`, stopping after `limit` bytes.
fn read_line_limited<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: u64,
) -> io::Result<usize> {
    reader.by_ref().take(limit).read_until(b'\n', buf)
}

fn discard_rest_of_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let mut sink = Vec::new();
    loop {
        sink.clear();
        let n = read_line_limited(reader, &mut sink, COMMAND_READ_LIMIT)?;
        if n == 0 || sink.ends_with(b"\n") {
            return Ok(());
        }
    }
}
