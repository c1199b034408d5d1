//! # torii
//!
//! Request correlation, structured call logging, and uniform response
//! envelopes for HTTP handlers. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Your routing framework dispatches requests and owns their lifecycle.
//! torii does not — by design. It sits at the framework's interception
//! seams and does three things:
//!
//! - **Correlates** — every inbound request gets a 32-hex-char identity at
//!   entry, threaded through an explicit [`CorrelationContext`] so the
//!   ENTER, EXIT, and ERROR records of one request link up and two
//!   concurrent requests can never see each other's identity.
//! - **Logs** — multi-line, separator-bracketed call records via `tracing`:
//!   who called (client address), what was called (handler full name plus
//!   its declared display name), with which arguments, and how it ended.
//! - **Wraps** — every non-error result is rewrapped as
//!   `{ data, code, success, message }` so clients parse one shape, with
//!   per-handler and per-type opt-outs.
//!
//! What the framework already owns — torii intentionally ignores:
//!
//! - **Routing and dispatch** — you call the hooks, torii never dispatches
//! - **Request lifecycle timeouts and cancellation**
//! - **Log transport** — records go to your `tracing` subscriber, shipping
//!   them is the subscriber's business
//! - **Distributed trace propagation** — the identity never crosses the
//!   process boundary
//!
//! ## Quick start
//!
//! ```rust
//! use serde_json::json;
//! use torii::{
//!     CorrelationContext, EnvelopeWriter, HandlerMeta, Interceptor,
//!     MetaRegistry, RequestInfo,
//! };
//!
//! // Once, at startup: declare handler metadata.
//! let registry = MetaRegistry::new()
//!     .handler("UserController", HandlerMeta::new("get_user")
//!         .params(["id"])
//!         .doc("fetch one user"));
//! let interceptor = Interceptor::new(registry);
//! let writer = EnvelopeWriter::new();
//!
//! // Per request, from your framework adapter:
//! let req = RequestInfo::new(
//!     http::Method::GET,
//!     "/users/5".parse().unwrap(),
//!     vec![("x-forwarded-for".into(), "10.0.0.1".into())],
//!     None,
//! );
//! let mut ctx = CorrelationContext::new();
//! let args = [json!(5)];
//!
//! interceptor.before_call(&mut ctx, &req, "UserController", "get_user", &args);
//! let body = json!({"id": 5, "name": "alice"});   // the handler ran
//! interceptor.after_return(&mut ctx, &req, "UserController", "get_user");
//!
//! let desc = interceptor.registry().resolve("UserController", "get_user");
//! if writer.supports(&desc) {
//!     let outcome = writer.before_write(body, &req);
//!     // write outcome.content_type() / the wrapped body to the response
//! }
//! ```

mod correlation;
mod envelope;
mod intercept;
mod metadata;
mod record;
mod request;

pub use correlation::{CorrelationContext, UNSET, new_request_id};
pub use envelope::{
    Envelope, EnvelopeWriter, FieldError, SUCCESS_MESSAGE, VALIDATION_FAILED, ValidationError,
    WriteOutcome,
};
pub use intercept::{
    DOC_RESOURCE_FRAGMENTS, Interceptor, UNKNOWN_IP, client_address, is_doc_resource,
};
pub use metadata::{
    ApiMarker, CHILD_NOT_CONFIGURED, HandlerDescriptor, HandlerMeta, MetaRegistry,
    PARENT_NOT_CONFIGURED, ResourceMeta,
};
pub use record::{LogRecord, NO_PARAMETERS, Phase, UNSERIALIZABLE};
pub use request::RequestInfo;
