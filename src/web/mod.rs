//! HTTP service: the web UI and the JSON API over captured mail.

pub mod handlers;
pub mod pages;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::error::{CaptureError, Result};
use crate::store::MailStore;

pub use pages::Pages;

/// Register every route on `cfg`.
///
/// The app must carry `web::Data<MailStore>` and `web::Data<Pages>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(pages::index))
        .route("/mail/{id}", web::get().to(pages::detail))
        .service(
        web::scope("/api")
            .route("/mails", web::get().to(handlers::list_mails))
            .route("/mails/{id}", web::get().to(handlers::get_mail))
            .route("/health", web::get().to(handlers::health)),
    )
    .route("/mail/{id}/download", web::get().to(handlers::download_mail));
}

/// Serve the UI and API on `addr` until the server is stopped.
pub async fn run(addr: &str, store: Arc<MailStore>, pages: Pages) -> Result<()> {
    let store = web::Data::from(store);
    let pages = web::Data::new(pages);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(pages.clone())
            .configure(configure)
    })
    .bind(addr)
    .map_err(|e| CaptureError::bind("HTTP", addr, e))?;

    info!(addr, "Web UI and API listening");
    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UiConfig;
    use actix_web::http::{header, StatusCode};
    use actix_web::test;
    use serde_json::Value;
    use std::num::NonZeroUsize;

    fn store_with(messages: &[&[u8]]) -> Arc<MailStore> {
        let store = Arc::new(MailStore::new(NonZeroUsize::new(10).unwrap()));
        for raw in messages {
            store.add(raw.to_vec());
        }
        store
    }

    macro_rules! app {
        ($store:expr) => {
            app!($store, UiConfig::default())
        };
        ($store:expr, $ui:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::from($store.clone()))
                    .app_data(web::Data::new(Pages::new(&$ui, 2525).unwrap()))
                    .configure(configure),
            )
            .await
        };
    }

    /// Status and body text of `GET uri`.
    macro_rules! page {
        ($app:expr, $uri:expr) => {{
            let req = test::TestRequest::get().uri($uri).to_request();
            let resp = test::call_service(&$app, req).await;
            let status = resp.status();
            let body = test::read_body(resp).await;
            (status, String::from_utf8(body.to_vec()).unwrap())
        }};
    }

    #[actix_web::test]
    async fn test_list_newest_first_without_raw() {
        let store = store_with(&[b"Subject: first\r\n\r\none", b"Subject: second\r\n\r\ntwo"]);
        let app = app!(store);

        let req = test::TestRequest::get().uri("/api/mails").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let mails = body.as_array().unwrap();
        assert_eq!(mails.len(), 2);
        assert_eq!(mails[0]["parsed"]["headers"]["Subject"], "second");
        assert_eq!(mails[1]["parsed"]["headers"]["Subject"], "first");
        assert!(mails[0].get("raw").is_none());
        assert!(mails[0]["id"].is_string());
    }

    #[actix_web::test]
    async fn test_get_single_mail() {
        let store = store_with(&[b"Subject: hello\r\n\r\nbody"]);
        let id = store.list()[0].id();
        let app = app!(store);

        let req = test::TestRequest::get()
            .uri(&format!("/api/mails/{id}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["parsed"]["body_text"], "body");
    }

    #[actix_web::test]
    async fn test_unknown_and_malformed_ids_are_404() {
        let store = store_with(&[]);
        let app = app!(store);

        for uri in [
            "/api/mails/not-a-uuid",
            "/api/mails/00000000-0000-4000-8000-000000000000",
            "/mail/not-a-uuid/download",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Not found");
        }
    }

    #[actix_web::test]
    async fn test_download_returns_raw_bytes() {
        let raw: &[u8] = b"Subject: raw\r\n\r\n\xe9t\xe9\r\n";
        let store = store_with(&[raw]);
        let id = store.list()[0].id();
        let app = app!(store);

        let req = test::TestRequest::get()
            .uri(&format!("/mail/{id}/download"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "message/rfc822"
        );
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains(&format!("{id}.eml")));

        let body = test::read_body(resp).await;
        assert_eq!(&body[..], raw);
    }

    #[actix_web::test]
    async fn test_health() {
        let store = store_with(&[b"Subject: a\r\n\r\n"]);
        let app = app!(store);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["messages"], 1);
        assert_eq!(body["max_history"], 10);
    }

    #[actix_web::test]
    async fn test_list_page_shows_configured_columns() {
        let store = store_with(&[
            b"Subject: older\r\nTo: a@example.com\r\n\r\none",
            b"Subject: newer <b>\r\nTo: b@example.com\r\nFrom: me@example.com\r\n\r\ntwo",
        ]);
        let newest = store.list()[0].id();
        let app = app!(store);

        let (status, html) = page!(app, "/");
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("MailOrca"));
        assert!(html.contains("2525"));
        for column in ["<th>Date</th>", "<th>Subject</th>", "<th>To</th>", "<th>From</th>"] {
            assert!(html.contains(column), "{column}");
        }
        assert!(html.contains(&format!("href=\"/mail/{newest}\"")));
        assert!(html.contains("newer &lt;b&gt;"));
        let newer = html.find("newer").unwrap();
        let older = html.find("older").unwrap();
        assert!(newer < older);
    }

    #[actix_web::test]
    async fn test_list_page_custom_columns_and_empty_store() {
        let ui = UiConfig {
            list_columns: vec!["X-Trace".to_string()],
            ..UiConfig::default()
        };
        let app = app!(store_with(&[]), ui.clone());

        let (status, html) = page!(app, "/");
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("No mail yet."));

        let app = app!(store_with(&[b"X-Trace: abc123\r\n\r\n"]), ui);
        let (_, html) = page!(app, "/");
        assert!(html.contains("<th>X-Trace</th>"));
        assert!(!html.contains("<th>Subject</th>"));
        assert!(html.contains("abc123"));
    }

    #[actix_web::test]
    async fn test_detail_page_escapes_and_links_text_body() {
        let raw: &[u8] = concat!(
            "From: sender@example.com\r\n",
            "To: rcpt@example.com\r\n",
            "Subject: Report\r\n",
            "X-Mailer: hidden\r\n",
            "\r\n",
            "<script>alert(1)</script> see https://example.com/path\r\n",
        )
        .as_bytes();
        let store = store_with(&[raw]);
        let id = store.list()[0].id();
        let app = app!(store);

        let (status, html) = page!(app, &format!("/mail/{id}"));
        assert_eq!(status, StatusCode::OK);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;&#x2F;script&gt;"));
        assert!(html.contains("<a href=\"https:&#x2F;&#x2F;example.com&#x2F;path\""));
        assert!(html.contains("<th>From</th><td>sender@example.com</td>"));
        assert!(html.contains("<th>Subject</th><td>Report</td>"));
        assert!(!html.contains("X-Mailer"));
        assert!(html.contains(&format!("/mail/{id}/download")));
    }

    #[actix_web::test]
    async fn test_detail_page_html_body_in_sandboxed_frame() {
        let raw: &[u8] =
            b"Content-Type: text/html\r\nSubject: h\r\n\r\n<p onclick=\"x\">hi</p>\r\n";
        let store = store_with(&[raw]);
        let id = store.list()[0].id();
        let app = app!(store);

        let (_, html) = page!(app, &format!("/mail/{id}"));
        assert!(html.contains("<iframe sandbox srcdoc=\"&lt;p onclick=&quot;x&quot;&gt;hi"));
        assert!(!html.contains("<p onclick"));
    }

    #[actix_web::test]
    async fn test_detail_page_unknown_id_is_404() {
        let app = app!(store_with(&[]));
        for uri in ["/mail/not-a-uuid", "/mail/00000000-0000-4000-8000-000000000000"] {
            let (status, body) = page!(app, uri);
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, "Mail not found");
        }
    }
}
