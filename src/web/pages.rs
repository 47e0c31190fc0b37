//! Server-rendered HTML pages: the message list and a single message.

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use regex::Regex;
use serde::Serialize;
use tera::{Context, Tera, Value};
use tracing::{debug, error};

use crate::config::UiConfig;
use crate::error::Result;
use crate::model::mail::{CapturedMessage, HeaderValue, Headers};
use crate::store::MailStore;

const URL_PATTERN: &str = r"https?://[^\s]+";

/// Templates plus the settings the pages are rendered with.
pub struct Pages {
    tera: Tera,
    ui: UiConfig,
    smtp_port: u16,
}

#[derive(Debug, Serialize)]
struct ListRow {
    id: String,
    cells: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HeaderRow<'a> {
    name: &'a str,
    value: String,
}

impl Pages {
    pub fn new(ui: &UiConfig, smtp_port: u16) -> Result<Self> {
        let url = Regex::new(URL_PATTERN)?;

        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("templates/base.html")),
            ("list.html", include_str!("templates/list.html")),
            ("detail.html", include_str!("templates/detail.html")),
        ])?;
        tera.register_filter(
            "urlize",
            move |value: &Value, _: &HashMap<String, Value>| {
                Ok(Value::String(urlize(&url, value.as_str().unwrap_or_default())))
            },
        );

        Ok(Self {
            tera,
            ui: ui.clone(),
            smtp_port,
        })
    }

    fn render(&self, name: &str, context: &Context) -> HttpResponse {
        match self.tera.render(name, context) {
            Ok(body) => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(e) => {
                error!(template = name, error = %e, "Template rendering error");
                HttpResponse::InternalServerError().body("Failed to render page")
            }
        }
    }
}

/// Escape `text` for HTML and turn every `http(s)://` run into a link.
fn urlize(url: &Regex, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in url.find_iter(text) {
        out.push_str(&tera::escape_html(&text[last..m.start()]));
        let href = tera::escape_html(m.as_str());
        out.push_str(&format!(
            r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{href}</a>"#
        ));
        last = m.end();
    }
    out.push_str(&tera::escape_html(&text[last..]));
    out
}

/// Header value for display; repeated headers are joined with `, `.
fn header_text(headers: &Headers, name: &str) -> Option<String> {
    headers
        .get(name)
        .or_else(|| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
        .map(|v: &HeaderValue| v.values().join(", "))
}

fn list_row(mail: &CapturedMessage, columns: &[String]) -> ListRow {
    let headers = &mail.parsed().headers;
    ListRow {
        id: mail.id().to_string(),
        cells: columns
            .iter()
            .map(|c| header_text(headers, c).unwrap_or_default())
            .collect(),
    }
}

/// `GET /`: captured mail, newest first.
pub async fn index(pages: web::Data<Pages>, store: web::Data<MailStore>) -> HttpResponse {
    let mails = store.list();
    let rows: Vec<ListRow> = mails
        .iter()
        .map(|m| list_row(m, &pages.ui.list_columns))
        .collect();

    let mut context = Context::new();
    context.insert("mails", &rows);
    context.insert("columns", &pages.ui.list_columns);
    context.insert("smtp_port", &pages.smtp_port);
    context.insert("max_history", &store.max_history().get());
    pages.render("list.html", &context)
}

/// `GET /mail/{id}`
pub async fn detail(
    pages: web::Data<Pages>,
    store: web::Data<MailStore>,
    path: web::Path<String>,
) -> HttpResponse {
    let Some(mail) = super::handlers::lookup(&store, &path) else {
        debug!(id = %path, "Mail not found");
        return HttpResponse::NotFound()
            .content_type("text/plain; charset=utf-8")
            .body("Mail not found");
    };

    let parsed = mail.parsed();
    let headers: Vec<HeaderRow<'_>> = pages
        .ui
        .detail_headers
        .iter()
        .filter_map(|name| {
            header_text(&parsed.headers, name).map(|value| HeaderRow { name, value })
        })
        .collect();

    let mut context = Context::new();
    context.insert("id", &mail.id().to_string());
    context.insert("subject", parsed.subject().unwrap_or("(no subject)"));
    context.insert("received_at", &mail.received_at().to_rfc3339());
    context.insert("headers", &headers);
    context.insert("body_text", &parsed.body_text);
    context.insert("body_html", &parsed.body_html);
    pages.render("detail.html", &context)
}
