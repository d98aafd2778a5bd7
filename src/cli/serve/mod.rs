//! Development server.
//!
//! | Route                 | Handler                                  |
//! |-----------------------|------------------------------------------|
//! | `GET /_surge/health`  | `{"ok":true}`                            |
//! | `POST /_surge/action` | action protocol ([`crate::protocol`])    |
//! | `GET <route>`         | page render through [`Engine::render_page`] |

mod lifecycle;
mod response;

use crate::{
    cache::PageRequest,
    core::{Engine, is_shutdown},
    debug, log,
    protocol::{ACTION_PATH, COMPONENTS_HEADER, handle_action, parse_addressed},
};
use anyhow::{Context, Result};
use crossbeam::channel;
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tiny_http::{Method, Request, Server};

/// Liveness probe path.
pub const HEALTH_PATH: &str = "/_surge/health";

/// Worker threads handling requests.
const WORKERS: usize = 4;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    engine: Arc<Engine>,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop.
///
/// `interface` and `port` override the `[serve]` section.
pub fn bind_server(
    engine: Arc<Engine>,
    interface: Option<IpAddr>,
    port: Option<u16>,
) -> Result<BoundServer> {
    let serve = &engine.config().serve;
    let (server, addr) = lifecycle::bind_with_retry(
        interface.unwrap_or(serve.interface),
        port.unwrap_or(serve.port),
    )?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);

    Ok(BoundServer {
        server,
        addr,
        engine,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the request loop (blocking).
    pub fn run(self) -> Result<()> {
        run_request_loop(&self.server, &self.engine)?;
        lifecycle::wait_for_shutdown(&self.shutdown_rx);
        Ok(())
    }
}

fn run_request_loop(server: &Server, engine: &Arc<Engine>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(WORKERS)
        .thread_name(|i| format!("surge-worker-{i}"))
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let engine = Arc::clone(engine);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &engine) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, engine: &Arc<Engine>) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let path = request.url().split('?').next().unwrap_or("/").to_owned();
    debug!("serve"; "{} {}", request.method(), request.url());

    match (request.method(), path.as_str()) {
        (_, HEALTH_PATH) => response::respond_json(request, 200, r#"{"ok":true}"#.to_owned()),
        (Method::Post, ACTION_PATH) => serve_action(request, engine),
        (_, ACTION_PATH) => response::respond_method_not_allowed(request),
        (Method::Get | Method::Head, _) => serve_page(request, engine),
        _ => response::respond_method_not_allowed(request),
    }
}

fn serve_action(mut request: Request, engine: &Arc<Engine>) -> Result<()> {
    let addressed = request
        .headers()
        .iter()
        .find(|h| h.field.equiv(COMPONENTS_HEADER))
        .map(|h| parse_addressed(h.value.as_str()))
        .unwrap_or_default();

    // Read one byte past the ceiling so oversized bodies are still rejected
    let limit = engine.config().engine.max_payload as u64 + 1;
    let mut body = Vec::new();
    request.as_reader().take(limit).read_to_end(&mut body)?;

    let (status, json) = handle_action(engine, &body, &addressed);
    response::respond_json(request, status, json)
}

fn serve_page(request: Request, engine: &Arc<Engine>) -> Result<()> {
    let page = PageRequest::parse(request.method().as_str(), request.url());

    match engine.render_page(&page) {
        Ok(Some(html)) => response::respond_html(request, 200, html),
        Ok(None) => response::respond_not_found(request),
        Err(e) => {
            log!("serve"; "{} failed: {}", page.path, e);
            let detailed = engine.config().engine.env.is_dev();
            response::respond_render_error(request, &e.to_string(), detailed)
        }
    }
}
