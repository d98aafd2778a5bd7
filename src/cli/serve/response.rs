//! HTTP response handlers.

use anyhow::Result;
use tiny_http::{Header, Method, Request, Response, StatusCode};

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JSON: &str = "application/json";
}

/// Respond with a rendered page.
pub fn respond_html(request: Request, status: u16, body: String) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, status, types::HTML);
    }
    send_body(request, status, types::HTML, body.into_bytes())
}

/// Respond with a JSON body (action responses, diagnostics, health).
pub fn respond_json(request: Request, status: u16, body: String) -> Result<()> {
    send_body(request, status, types::JSON, body.into_bytes())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    send_body(
        request,
        405,
        types::PLAIN,
        b"405 Method Not Allowed".to_vec(),
    )
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(
        request,
        503,
        types::PLAIN,
        b"503 Service Unavailable".to_vec(),
    )
}

/// Page render failure. Detail is shown only in development.
pub fn respond_render_error(request: Request, error: &str, detailed: bool) -> Result<()> {
    let body = if detailed {
        format!(
            "<html><body><h1>Render Error</h1><pre>{}</pre></body></html>",
            crate::utils::html::escape(error)
        )
    } else {
        "<html><body><h1>Internal error</h1></body></html>".to_owned()
    };
    send_body(request, 500, types::HTML, body.into_bytes())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response =
        Response::empty(StatusCode(status)).with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    // Static ASCII on both sides never fails
    Header::from_bytes(key, value).unwrap()
}
