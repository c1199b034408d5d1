//! Demo host — a small hyper server wired through torii's hooks.
//!
//! torii never dispatches requests itself; this is what the framework-side
//! adapter looks like. Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/5        # wrapped object body
//!   curl http://localhost:3000/users/0        # handler error -> failure envelope
//!   curl http://localhost:3000/greet          # bare string, wrapped + serialized explicitly
//!   curl http://localhost:3000/version        # raw_response opt-out, unwrapped
//!   curl http://localhost:3000/v3/api-docs    # doc resource, invisible to torii

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{error, info};

use torii::{
    ApiMarker, CorrelationContext, EnvelopeWriter, HandlerMeta, Interceptor, MetaRegistry,
    RequestInfo, ResourceMeta, WriteOutcome,
};

struct App {
    interceptor: Interceptor,
    writer: EnvelopeWriter,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Once, at startup: the metadata table the hooks resolve against.
    let registry = MetaRegistry::new()
        .resource(
            ResourceMeta::new("UserController").api(ApiMarker::new("User management").tags(["user"])),
        )
        .handler(
            "UserController",
            HandlerMeta::new("get_user").params(["id"]).doc("fetch one user"),
        )
        .handler("GreetController", HandlerMeta::new("greet").doc("say hello"))
        .handler("MetaController", HandlerMeta::new("version").raw_response().no_log());

    let app = Arc::new(App {
        interceptor: Interceptor::new(registry),
        writer: EnvelopeWriter::new(),
    });

    let addr: SocketAddr = "0.0.0.0:3000".parse().expect("invalid socket address");
    let listener = TcpListener::bind(addr).await.expect("bind failed");
    info!(%addr, "demo host listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };
        let app = Arc::clone(&app);
        let io = TokioIo::new(stream);
        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let app = Arc::clone(&app);
                async move { Ok::<_, Infallible>(dispatch(app, req, peer).await) }
            });
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                error!(peer = %peer, "connection error: {e}");
            }
        });
    }
}

async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
    peer: SocketAddr,
) -> http::Response<Full<Bytes>> {
    let headers = req
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str().to_owned(), v.to_str().unwrap_or("").to_owned()))
        .collect();
    let info = RequestInfo::new(req.method().clone(), req.uri().clone(), headers, Some(peer));
    let path = req.uri().path().to_owned();

    if let Some(id) = path.strip_prefix("/users/") {
        let id: i64 = id.parse().unwrap_or(0);
        return invoke(&app, &info, "UserController", "get_user", &[json!(id)], || {
            if id == 0 {
                Err(std::io::Error::other("user storage unreachable"))
            } else {
                Ok(json!({"id": id, "name": "alice"}))
            }
        });
    }
    match path.as_str() {
        "/greet" => invoke(&app, &info, "GreetController", "greet", &[], || Ok(json!("hello"))),
        "/version" => invoke(&app, &info, "MetaController", "version", &[], || {
            Ok(json!({"version": "0.1.0"}))
        }),
        p if torii::is_doc_resource(p) => {
            // Doc tooling answers for itself; torii stays out of the way.
            json_response(200, r#"{"openapi":"3.0.0"}"#.to_owned())
        }
        _ => json_response(404, r#"{"message":"not found"}"#.to_owned()),
    }
}

/// Runs one handler through the full hook sequence: pre-call, the handler
/// body, exactly one terminal hook, then body-write interception.
fn invoke(
    app: &App,
    info: &RequestInfo,
    resource: &str,
    method: &str,
    args: &[Value],
    handler: impl FnOnce() -> Result<Value, std::io::Error>,
) -> http::Response<Full<Bytes>> {
    let mut ctx = CorrelationContext::new();
    app.interceptor.before_call(&mut ctx, info, resource, method, args);

    match handler() {
        Ok(body) => {
            app.interceptor.after_return(&mut ctx, info, resource, method);
            let desc = app.interceptor.registry().resolve(resource, method);
            if !app.writer.supports(&desc) {
                return json_response(200, body.to_string());
            }
            match app.writer.before_write(body, info) {
                WriteOutcome::Passthrough(v) | WriteOutcome::Value(v) => {
                    json_response(200, v.to_string())
                }
                WriteOutcome::Text(text) => json_response(200, text),
            }
        }
        Err(err) => {
            app.interceptor.after_error(&mut ctx, info, resource, method, args, &err);
            let envelope = app.writer.on_unhandled(&err);
            let body = serde_json::to_string(&envelope)
                .unwrap_or_else(|_| r#"{"success":false}"#.to_owned());
            json_response(200, body)
        }
    }
}

fn json_response(status: u16, body: String) -> http::Response<Full<Bytes>> {
    http::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("static response parts are valid")
}
