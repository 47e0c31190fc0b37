//! Request handlers for the JSON API and the `.eml` download.

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::debug;

use crate::model::mail::{CapturedMessage, MessageId};
use crate::store::MailStore;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    messages: usize,
    max_history: usize,
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found" }))
}

/// Look up a message by the textual id from the URL.
pub(super) fn lookup(store: &MailStore, id: &str) -> Option<std::sync::Arc<CapturedMessage>> {
    let id: MessageId = id.parse().ok()?;
    store.get(&id)
}

/// `GET /api/mails`: every stored message, newest first.
pub async fn list_mails(store: web::Data<MailStore>) -> HttpResponse {
    let mails = store.list();
    let body: Vec<&CapturedMessage> = mails.iter().map(|m| m.as_ref()).collect();
    HttpResponse::Ok().json(body)
}

/// `GET /api/mails/{id}`
pub async fn get_mail(store: web::Data<MailStore>, path: web::Path<String>) -> HttpResponse {
    match lookup(&store, &path) {
        Some(mail) => HttpResponse::Ok().json(mail.as_ref()),
        None => {
            debug!(id = %path, "Mail not found");
            not_found()
        }
    }
}

/// `GET /mail/{id}/download`: the message exactly as received.
pub async fn download_mail(store: web::Data<MailStore>, path: web::Path<String>) -> HttpResponse {
    let Some(mail) = lookup(&store, &path) else {
        return not_found();
    };

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(format!("{}.eml", mail.id()))],
    };
    HttpResponse::Ok()
        .content_type("message/rfc822")
        .insert_header(disposition)
        .body(mail.raw().to_vec())
}

/// `GET /api/health`
pub async fn health(store: web::Data<MailStore>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        messages: store.len(),
        max_history: store.max_history().get(),
    })
}
