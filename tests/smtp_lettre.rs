use std::error::Error;
use std::net::TcpListener;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use lettre::message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart};
use lettre::{SmtpTransport, Transport};

use mailorca::ingest::Ingestor;
use mailorca::smtp::SmtpServer;
use mailorca::store::MailStore;

fn start_server(max_history: usize) -> (u16, Arc<MailStore>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let store = Arc::new(MailStore::new(NonZeroUsize::new(max_history).unwrap()));
    let server = SmtpServer::new("localhost", Ingestor::new(store.clone()), 1024 * 1024);
    thread::spawn(move || server.serve(listener));
    (port, store)
}

fn mailer(port: u16) -> SmtpTransport {
    SmtpTransport::builder_dangerous("127.0.0.1")
        .port(port)
        .build()
}

#[test]
fn basic_lettre_send() -> Result<(), Box<dyn Error>> {
    let (port, store) = start_server(10);

    let message = Message::builder()
        .from("花子 <hanako@example.com>".parse::<Mailbox>()?)
        .to("太郎 <tarou@example.com>".parse::<Mailbox>()?)
        .subject("件名")
        .body("本文".to_owned())?;

    mailer(port).send(&message)?;

    assert_eq!(store.len(), 1);
    let mail = &store.list()[0];
    assert_eq!(mail.parsed().subject(), Some("件名"));
    assert_eq!(
        mail.parsed().body_text.as_deref().map(str::trim_end),
        Some("本文")
    );
    assert!(mail.parsed().body_html.is_none());

    let from = mail
        .parsed()
        .headers
        .get("From")
        .and_then(|v| v.first())
        .unwrap_or_default();
    assert!(from.contains("花子"));
    assert!(from.contains("<hanako@example.com>"));

    Ok(())
}

#[test]
fn lettre_alternative_bodies() -> Result<(), Box<dyn Error>> {
    let (port, store) = start_server(10);

    let message = Message::builder()
        .from("sender@example.com".parse::<Mailbox>()?)
        .to("rcpt@example.com".parse::<Mailbox>()?)
        .subject("Alternative")
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body("plain version".to_owned()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body("<p>html version</p>".to_owned()),
                ),
        )?;

    mailer(port).send(&message)?;

    let mail = &store.list()[0];
    assert_eq!(
        mail.parsed().body_text.as_deref().map(str::trim_end),
        Some("plain version")
    );
    assert_eq!(
        mail.parsed().body_html.as_deref().map(str::trim_end),
        Some("<p>html version</p>")
    );

    Ok(())
}

#[test]
fn history_is_bounded_across_sessions() -> Result<(), Box<dyn Error>> {
    let (port, store) = start_server(2);
    let mailer = mailer(port);

    for n in 1..=3 {
        let message = Message::builder()
            .from("sender@example.com".parse::<Mailbox>()?)
            .to("rcpt@example.com".parse::<Mailbox>()?)
            .subject(format!("message {n}"))
            .body(String::from("hello"))?;
        mailer.send(&message)?;
    }

    let subjects: Vec<String> = store
        .list()
        .iter()
        .filter_map(|m| m.parsed().subject().map(str::to_owned))
        .collect();
    assert_eq!(subjects, vec!["message 3", "message 2"]);

    Ok(())
}
