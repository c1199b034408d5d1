//! The interception controller: pre-call, post-call, and on-error hooks.
//!
//! The hosting framework calls [`Interceptor::before_call`] before a
//! handler body runs, then exactly one of [`Interceptor::after_return`] or
//! [`Interceptor::after_error`]. Per request the hooks walk a fixed state
//! machine:
//!
//! ```text
//! IDLE ──before_call──▶ ENTERED ──after_return──▶ EXITED
//!                          │
//!                          └────after_error────▶ ERRORED
//! ```
//!
//! Both terminal transitions clear the correlation context, opted-out
//! handlers included, so a reused context never leaks an identity into the
//! next request.
//!
//! All hooks are synchronous and run to completion inside the request's
//! execution unit. Emission goes through `tracing` and is fire-and-forget;
//! a hook never fails the request it observes.

use std::fmt;

use serde_json::Value;
use tracing::{error, info};

use crate::correlation::{CorrelationContext, new_request_id};
use crate::metadata::MetaRegistry;
use crate::record::{LogRecord, Phase};
use crate::request::RequestInfo;

/// Path fragments identifying API-documentation tooling. Requests to these
/// are invisible to the hooks: no identity, no records, no wrapping.
pub const DOC_RESOURCE_FRAGMENTS: [&str; 5] = [
    "swagger-resources",
    "v2/api-docs",
    "v3/api-docs",
    "webjars",
    "swagger-ui.html",
];

/// Whether `path` belongs to API-documentation tooling.
pub fn is_doc_resource(path: &str) -> bool {
    DOC_RESOURCE_FRAGMENTS.iter().any(|f| path.contains(f))
}

/// Rendered when no client address can be resolved.
pub const UNKNOWN_IP: &str = "unknown IP";

/// Proxy headers consulted for the client address, in precedence order,
/// before falling back to the transport-level peer.
const FORWARD_HEADERS: [&str; 3] = ["x-forwarded-for", "proxy-client-ip", "wl-proxy-client-ip"];

/// Resolves the client address for a request.
///
/// Walks the proxy headers in order, skipping values that are empty or the
/// literal `"unknown"` (case-insensitive, a convention of older proxies),
/// then falls back to the peer address. A forwarded value listing several
/// hops yields only the first one. Never fails; the fallback of last
/// resort is the `"unknown IP"` placeholder.
pub fn client_address(req: &RequestInfo) -> String {
    let from_headers = FORWARD_HEADERS
        .iter()
        .filter_map(|name| req.header(name))
        .find(|v| !v.is_empty() && !v.eq_ignore_ascii_case("unknown"));

    let resolved = match from_headers {
        Some(value) => value.split(',').next().unwrap_or(value).trim().to_owned(),
        None => match req.peer() {
            Some(peer) => peer.ip().to_string(),
            None => return UNKNOWN_IP.to_owned(),
        },
    };
    if resolved.is_empty() { UNKNOWN_IP.to_owned() } else { resolved }
}

/// The three interception hooks, bound to a metadata registry.
///
/// Each hook returns the record it emitted (`None` when the request was a
/// doc resource or the handler opted out), so a host that mirrors records
/// to its own sink can do so without re-rendering.
pub struct Interceptor {
    registry: MetaRegistry,
}

impl Interceptor {
    pub fn new(registry: MetaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MetaRegistry {
        &self.registry
    }

    /// Pre-call hook. Generates and stores the request identity, then
    /// emits the ENTER record unless the handler opted out of logging.
    ///
    /// `args` are the call arguments as JSON values, matched positionally
    /// to the parameter names declared in the registry.
    pub fn before_call(
        &self,
        ctx: &mut CorrelationContext,
        req: &RequestInfo,
        resource: &str,
        method: &str,
        args: &[Value],
    ) -> Option<LogRecord> {
        if is_doc_resource(req.uri().path()) {
            return None;
        }
        let id = new_request_id();
        ctx.set(id.clone());

        let desc = self.registry.resolve(resource, method);
        if desc.no_log {
            return None;
        }
        let record = LogRecord::enter(
            &id,
            &client_address(req),
            desc.display_name.as_deref(),
            req.method(),
            req.uri(),
            &desc.full_name(),
            &desc.params,
            args,
        );
        emit(&record);
        Some(record)
    }

    /// Post-call hook for the normal return path. Emits the EXIT record
    /// (unless opted out) and clears the correlation context.
    pub fn after_return(
        &self,
        ctx: &mut CorrelationContext,
        req: &RequestInfo,
        resource: &str,
        method: &str,
    ) -> Option<LogRecord> {
        if is_doc_resource(req.uri().path()) {
            return None;
        }
        let desc = self.registry.resolve(resource, method);
        let record = if desc.no_log {
            None
        } else {
            let record = LogRecord::exit(
                ctx.get(),
                &client_address(req),
                desc.display_name.as_deref(),
                req.method(),
                req.uri(),
                &desc.full_name(),
            );
            emit(&record);
            Some(record)
        };
        ctx.clear();
        record
    }

    /// Post-call hook for the error path. Emits the ERROR record at error
    /// severity, with the triggering error's display text embedded, and
    /// clears the correlation context.
    pub fn after_error(
        &self,
        ctx: &mut CorrelationContext,
        req: &RequestInfo,
        resource: &str,
        method: &str,
        args: &[Value],
        error: &dyn fmt::Display,
    ) -> Option<LogRecord> {
        if is_doc_resource(req.uri().path()) {
            return None;
        }
        let desc = self.registry.resolve(resource, method);
        let record = if desc.no_log {
            None
        } else {
            let record = LogRecord::error(
                ctx.get(),
                &client_address(req),
                &desc.full_name(),
                &desc.params,
                args,
                &error.to_string(),
            );
            emit(&record);
            Some(record)
        };
        ctx.clear();
        record
    }
}

fn emit(record: &LogRecord) {
    match record.phase() {
        Phase::Error => error!("{record}"),
        Phase::Enter | Phase::Exit => info!("{record}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::HandlerMeta;
    use http::Method;
    use serde_json::json;

    fn request(path: &str, headers: &[(&str, &str)]) -> RequestInfo {
        RequestInfo::new(
            Method::GET,
            path.parse().unwrap(),
            headers
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            Some("192.168.1.9:4433".parse().unwrap()),
        )
    }

    fn interceptor() -> Interceptor {
        Interceptor::new(
            MetaRegistry::new()
                .handler("UserController", HandlerMeta::new("get_user").params(["id"]))
                .handler("UserController", HandlerMeta::new("quiet").no_log()),
        )
    }

    #[test]
    fn doc_resources_are_invisible() {
        let it = interceptor();
        let mut ctx = CorrelationContext::new();
        let req = request("/v3/api-docs/group", &[]);
        assert!(it.before_call(&mut ctx, &req, "UserController", "get_user", &[]).is_none());
        assert!(!ctx.is_set());
        assert!(it.after_return(&mut ctx, &req, "UserController", "get_user").is_none());
    }

    #[test]
    fn doc_fragments_match_anywhere_in_the_path() {
        assert!(is_doc_resource("/swagger-ui.html"));
        assert!(is_doc_resource("/webjars/ui/app.js"));
        assert!(is_doc_resource("/api/v2/api-docs"));
        assert!(!is_doc_resource("/users/5"));
    }

    #[test]
    fn exit_observes_the_identity_generated_at_enter() {
        let it = interceptor();
        let mut ctx = CorrelationContext::new();
        let req = request("/users/5", &[]);

        let enter = it
            .before_call(&mut ctx, &req, "UserController", "get_user", &[json!(5)])
            .unwrap();
        let id = ctx.get().to_owned();
        assert!(enter.text().contains(&id));

        let exit = it
            .after_return(&mut ctx, &req, "UserController", "get_user")
            .unwrap();
        assert!(exit.text().contains(&id));
        assert!(!ctx.is_set(), "context must be cleared on the normal exit path");
    }

    #[test]
    fn error_observes_the_identity_and_clears_the_context() {
        let it = interceptor();
        let mut ctx = CorrelationContext::new();
        let req = request("/users/5", &[]);

        it.before_call(&mut ctx, &req, "UserController", "get_user", &[json!(5)]);
        let id = ctx.get().to_owned();

        let err = std::io::Error::other("database unreachable");
        let record = it
            .after_error(&mut ctx, &req, "UserController", "get_user", &[json!(5)], &err)
            .unwrap();
        assert_eq!(record.phase(), Phase::Error);
        assert!(record.text().contains(&id));
        assert!(record.text().contains("database unreachable"));
        assert!(!ctx.is_set(), "context must be cleared on the error exit path");
    }

    #[test]
    fn concurrent_requests_keep_distinct_identities() {
        let it = interceptor();
        let req = request("/users/5", &[]);
        let mut ctx_a = CorrelationContext::new();
        let mut ctx_b = CorrelationContext::new();

        it.before_call(&mut ctx_a, &req, "UserController", "get_user", &[json!(1)]);
        it.before_call(&mut ctx_b, &req, "UserController", "get_user", &[json!(2)]);
        let (id_a, id_b) = (ctx_a.get().to_owned(), ctx_b.get().to_owned());
        assert_ne!(id_a, id_b);

        let exit_b = it
            .after_return(&mut ctx_b, &req, "UserController", "get_user")
            .unwrap();
        assert!(exit_b.text().contains(&id_b));
        assert!(!exit_b.text().contains(&id_a));
        assert_eq!(ctx_a.get(), id_a, "finishing B must not disturb A");
    }

    #[test]
    fn opted_out_handler_emits_nothing_but_still_clears() {
        let it = interceptor();
        let mut ctx = CorrelationContext::new();
        let req = request("/quiet", &[]);

        assert!(it.before_call(&mut ctx, &req, "UserController", "quiet", &[]).is_none());
        assert!(ctx.is_set(), "identity is still assigned for correlation elsewhere");
        assert!(it.after_return(&mut ctx, &req, "UserController", "quiet").is_none());
        assert!(!ctx.is_set(), "opt-out must not leak the identity");

        ctx.clear();
        it.before_call(&mut ctx, &req, "UserController", "quiet", &[]);
        let err = std::io::Error::other("boom");
        assert!(
            it.after_error(&mut ctx, &req, "UserController", "quiet", &[], &err)
                .is_none()
        );
        assert!(!ctx.is_set());
    }

    #[test]
    fn forwarded_for_wins_and_only_the_first_hop_counts() {
        let req = request("/x", &[("X-Forwarded-For", "10.0.0.1, 10.0.0.2")]);
        assert_eq!(client_address(&req), "10.0.0.1");
    }

    #[test]
    fn unknown_header_values_fall_through() {
        let req = request(
            "/x",
            &[("X-Forwarded-For", "UNKNOWN"), ("Proxy-Client-IP", "172.16.0.8")],
        );
        assert_eq!(client_address(&req), "172.16.0.8");
    }

    #[test]
    fn legacy_proxy_header_is_third_in_line() {
        let req = request("/x", &[("WL-Proxy-Client-IP", "172.16.0.9")]);
        assert_eq!(client_address(&req), "172.16.0.9");
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let req = request("/x", &[]);
        assert_eq!(client_address(&req), "192.168.1.9");
    }

    #[test]
    fn no_source_at_all_yields_the_placeholder() {
        let req = RequestInfo::new(Method::GET, "/x".parse().unwrap(), Vec::new(), None);
        assert_eq!(client_address(&req), UNKNOWN_IP);
    }
}
