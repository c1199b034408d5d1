//! Handler metadata: declaration-time markers and call-time resolution.
//!
//! The original AOP-style design probed annotations reflectively on every
//! call. Rust has no runtime reflection and doesn't need it here: handler
//! metadata is static, so it is declared once at startup in a
//! [`MetaRegistry`] and resolved to a [`HandlerDescriptor`] per invocation
//! with two hash lookups.
//!
//! Two marker levels mirror the two annotation targets:
//!
//! - [`ResourceMeta`] — the declaring type: API-grouping labels and the
//!   type-level raw-response opt-out.
//! - [`HandlerMeta`] — one handler method: operation labels, ordered
//!   parameter names, and the `no_log` / `raw_response` opt-outs.
//!
//! Registration chains like the rest of the crate's builders:
//!
//! ```rust
//! use torii::{ApiMarker, HandlerMeta, MetaRegistry, ResourceMeta};
//!
//! let registry = MetaRegistry::new()
//!     .resource(ResourceMeta::new("UserController")
//!         .api(ApiMarker::new("User management").tags(["user"])))
//!     .handler("UserController", HandlerMeta::new("get_user")
//!         .params(["id"])
//!         .doc("fetch one user"));
//!
//! let desc = registry.resolve("UserController", "get_user");
//! assert_eq!(desc.full_name(), "UserController.get_user");
//! assert_eq!(desc.display_name.as_deref(), Some("user ### fetch one user"));
//! ```

use std::collections::HashMap;

/// Placeholder parent label when grouping markers exist but are all blank.
pub const PARENT_NOT_CONFIGURED: &str = "resource name not configured";

/// Placeholder child label when operation markers exist but are all blank.
pub const CHILD_NOT_CONFIGURED: &str = "handler name not configured";

// ── Declaration-time markers ──────────────────────────────────────────────────

/// The primary API-grouping marker: a descriptive label plus optional tags.
///
/// When resolving the parent display label, a non-empty tag list wins
/// (joined with `-`); otherwise the label is used.
#[derive(Clone, Debug, Default)]
pub struct ApiMarker {
    label: String,
    tags: Vec<String>,
}

impl ApiMarker {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), tags: Vec::new() }
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Type-level metadata for one declaring resource (controller).
#[derive(Clone, Debug)]
pub struct ResourceMeta {
    name: String,
    api: Option<ApiMarker>,
    tag: Option<String>,
    tag_list: Option<Vec<String>>,
    raw_response: bool,
}

impl ResourceMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api: None,
            tag: None,
            tag_list: None,
            raw_response: false,
        }
    }

    /// Attaches the primary API-grouping marker.
    pub fn api(mut self, marker: ApiMarker) -> Self {
        self.api = Some(marker);
        self
    }

    /// Attaches the secondary grouping marker (a single name).
    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tag = Some(name.into());
        self
    }

    /// Attaches the plural grouping marker (entries joined with `-`).
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_list = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Every handler on this resource returns its body unwrapped.
    pub fn raw_response(mut self) -> Self {
        self.raw_response = true;
        self
    }

    /// Parent display label, resolved through the marker fallback chain:
    /// primary tags joined with `-`, primary label, secondary tag, plural
    /// tags joined with `-`. First non-blank wins. `None` means no grouping
    /// marker is present at all; `Some("")` means markers exist but are
    /// blank (the caller substitutes the placeholder).
    fn parent_label(&self) -> Option<String> {
        let from_api = self.api.as_ref().map(|api| {
            if api.tags.is_empty() { api.label.clone() } else { api.tags.join("-") }
        });
        let from_tag = self.tag.clone();
        let from_tags = self.tag_list.as_ref().map(|t| t.join("-"));

        if from_api.is_none() && from_tag.is_none() && from_tags.is_none() {
            return None;
        }
        Some(
            [from_api, from_tag, from_tags]
                .into_iter()
                .flatten()
                .find(|s| !s.trim().is_empty())
                .unwrap_or_default(),
        )
    }
}

/// Method-level metadata for one handler.
#[derive(Clone, Debug)]
pub struct HandlerMeta {
    method: String,
    params: Vec<String>,
    doc: Option<String>,
    summary: Option<String>,
    no_log: bool,
    raw_response: bool,
    returns_envelope: bool,
}

impl HandlerMeta {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Vec::new(),
            doc: None,
            summary: None,
            no_log: false,
            raw_response: false,
            returns_envelope: false,
        }
    }

    /// Ordered parameter names, matched positionally to call arguments.
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = names.into_iter().map(Into::into).collect();
        self
    }

    /// Primary operation label.
    pub fn doc(mut self, label: impl Into<String>) -> Self {
        self.doc = Some(label.into());
        self
    }

    /// Secondary operation label, consulted when [`doc`](Self::doc) is
    /// absent or blank.
    pub fn summary(mut self, label: impl Into<String>) -> Self {
        self.summary = Some(label.into());
        self
    }

    /// Suppresses ENTER/EXIT/ERROR records for this handler.
    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    /// This handler's body is returned unwrapped.
    pub fn raw_response(mut self) -> Self {
        self.raw_response = true;
        self
    }

    /// This handler already returns the envelope type; wrapping again would
    /// nest envelopes.
    pub fn returns_envelope(mut self) -> Self {
        self.returns_envelope = true;
        self
    }

    /// Child display label: doc, then summary, first non-blank. Same
    /// `None`-vs-`Some("")` distinction as `ResourceMeta::parent_label`.
    fn child_label(&self) -> Option<String> {
        if self.doc.is_none() && self.summary.is_none() {
            return None;
        }
        Some(
            [self.doc.clone(), self.summary.clone()]
                .into_iter()
                .flatten()
                .find(|s| !s.trim().is_empty())
                .unwrap_or_default(),
        )
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Everything the interception hooks need to know about one handler,
/// resolved per invocation. Not cached between calls; resolution is two
/// hash lookups and a handful of clones.
#[derive(Clone, Debug)]
pub struct HandlerDescriptor {
    pub type_name: String,
    pub method_name: String,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
    /// Method-level logging opt-out.
    pub no_log: bool,
    /// Raw-response opt-out, method or type level.
    pub raw_response: bool,
    /// The handler's declared return type is already the envelope.
    pub returns_envelope: bool,
    /// Two-level display name, `parent ### child`. `None` when neither
    /// level carries any marker — in that case nothing is rendered, rather
    /// than two placeholders glued together.
    pub display_name: Option<String>,
}

impl HandlerDescriptor {
    /// `Type.method`, the declaring-handler full name used in log records.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.type_name, self.method_name)
    }
}

/// The startup-time metadata table: resource and handler declarations,
/// keyed by name. Resolution never fails — an unregistered handler resolves
/// to a descriptor with every marker absent.
#[derive(Debug, Default)]
pub struct MetaRegistry {
    resources: HashMap<String, ResourceMeta>,
    handlers: HashMap<(String, String), HandlerMeta>,
}

impl MetaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers type-level metadata. Returns `self` for chaining.
    pub fn resource(mut self, meta: ResourceMeta) -> Self {
        self.resources.insert(meta.name.clone(), meta);
        self
    }

    /// Registers method-level metadata under `resource`. Returns `self`
    /// for chaining.
    pub fn handler(mut self, resource: &str, meta: HandlerMeta) -> Self {
        self.handlers
            .insert((resource.to_owned(), meta.method.clone()), meta);
        self
    }

    /// Resolves the descriptor for one handler invocation.
    pub fn resolve(&self, resource: &str, method: &str) -> HandlerDescriptor {
        let res = self.resources.get(resource);
        let handler = self.handlers.get(&(resource.to_owned(), method.to_owned()));

        let parent = res.and_then(ResourceMeta::parent_label);
        let child = handler.and_then(HandlerMeta::child_label);
        let display_name = if parent.is_none() && child.is_none() {
            None
        } else {
            Some(format!(
                "{} ### {}",
                label_or(parent, PARENT_NOT_CONFIGURED),
                label_or(child, CHILD_NOT_CONFIGURED),
            ))
        };

        HandlerDescriptor {
            type_name: resource.to_owned(),
            method_name: method.to_owned(),
            params: handler.map(|h| h.params.clone()).unwrap_or_default(),
            no_log: handler.is_some_and(|h| h.no_log),
            raw_response: handler.is_some_and(|h| h.raw_response)
                || res.is_some_and(|r| r.raw_response),
            returns_envelope: handler.is_some_and(|h| h.returns_envelope),
            display_name,
        }
    }
}

fn label_or(label: Option<String>, placeholder: &str) -> String {
    match label {
        Some(l) if !l.trim().is_empty() => l,
        _ => placeholder.to_owned(),
    }
}
