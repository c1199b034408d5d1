//! The uniform response envelope and the body-write interception point.
//!
//! Every non-error, non-opted-out handler result is rewrapped as
//! `{ data, code, success, message }` before it leaves the process, so
//! clients always parse one shape. The host's serialization layer asks
//! [`EnvelopeWriter::supports`] once per handler and, when true, routes the
//! outgoing body through [`EnvelopeWriter::before_write`].
//!
//! Two error surfaces complete the contract: validation failures become a
//! failure envelope naming the first offending field, and any otherwise
//! unhandled error becomes a failure envelope carrying the error's type and
//! message — a handler can fail, the process never answers with nothing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::intercept::is_doc_resource;
use crate::metadata::HandlerDescriptor;
use crate::request::RequestInfo;

/// Message carried by success envelopes.
pub const SUCCESS_MESSAGE: &str = "request succeeded";

/// Message carried by validation-failure envelopes with no field detail.
pub const VALIDATION_FAILED: &str = "parameter validation failed";

/// Written as the body when even envelope serialization fails. Kept as a
/// literal so this path cannot itself fail.
const FALLBACK_FAILURE: &str =
    r#"{"data":null,"code":500,"success":false,"message":"response serialization failed"}"#;

// ── Envelope ──────────────────────────────────────────────────────────────────

/// The uniform response shape. Constructed per response, never mutated.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub code: u16,
    pub success: bool,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// The success envelope: `200 / true / "request succeeded"`.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            code: 200,
            success: true,
            message: Some(SUCCESS_MESSAGE.to_owned()),
        }
    }

    /// The failure envelope: `500 / false / <detail>`, no data.
    pub fn fail(message: impl Into<String>) -> Self {
        Self { data: None, code: 500, success: false, message: Some(message.into()) }
    }
}

// ── Write interception ────────────────────────────────────────────────────────

/// What the host should write after body interception.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOutcome {
    /// Doc resource: the body untouched, content type untouched.
    Passthrough(Value),
    /// The envelope already serialized to a JSON string. Bare string bodies
    /// take this path — handed back as a plain value, the transport layer
    /// would ship them as a raw non-JSON body.
    Text(String),
    /// The envelope as a value; normal serialization proceeds.
    Value(Value),
}

impl WriteOutcome {
    /// The content type the host should force, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Passthrough(_) => None,
            Self::Text(_) | Self::Value(_) => Some("application/json"),
        }
    }
}

/// The body-write interception point plus the two error surfaces.
#[derive(Debug, Default)]
pub struct EnvelopeWriter;

impl EnvelopeWriter {
    pub fn new() -> Self {
        Self
    }

    /// Whether this handler's results should be wrapped at all. False when
    /// the handler already returns the envelope type or carries a
    /// raw-response marker at method or type level.
    pub fn supports(&self, desc: &HandlerDescriptor) -> bool {
        !desc.returns_envelope && !desc.raw_response
    }

    /// Intercepts one outgoing body. Doc resources pass through with the
    /// content type left alone; everything else is wrapped in a success
    /// envelope with the content type forced to JSON.
    pub fn before_write(&self, body: Value, req: &RequestInfo) -> WriteOutcome {
        if is_doc_resource(req.uri().path()) {
            return WriteOutcome::Passthrough(body);
        }
        let bare_string = body.is_string();
        let envelope = json!({
            "data": body,
            "code": 200,
            "success": true,
            "message": SUCCESS_MESSAGE,
        });
        if bare_string {
            let text = serde_json::to_string(&envelope).unwrap_or_else(|err| {
                error!("envelope serialization failed: {err}");
                FALLBACK_FAILURE.to_owned()
            });
            WriteOutcome::Text(text)
        } else {
            WriteOutcome::Value(envelope)
        }
    }

    /// Handles a structured field-validation failure: logs it and returns
    /// a failure envelope naming the first invalid field.
    pub fn on_validation_failure(&self, err: &ValidationError) -> Envelope<Value> {
        error!("{err}");
        match err.first() {
            Some(field) => Envelope::fail(format!(
                "parameter < {} > invalid, {}",
                field.field, field.message
            )),
            None => Envelope::fail(VALIDATION_FAILED),
        }
    }

    /// The catch-all: logs any otherwise unhandled error and returns a
    /// failure envelope carrying the error's type name and message.
    pub fn on_unhandled<E: std::error::Error>(&self, err: &E) -> Envelope<Value> {
        error!("{err}");
        Envelope::fail(format!("{}: {err}", std::any::type_name::<E>()))
    }
}

// ── Validation errors ─────────────────────────────────────────────────────────

/// One invalid field and why.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// A request whose arguments failed structured validation. May carry zero
/// field errors when the validator only knows "something was wrong."
#[derive(Debug, Default)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one field error. Returns `self` for chaining.
    pub fn field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str(VALIDATION_FAILED);
        }
        write!(f, "validation failed:")?;
        for e in &self.errors {
            write!(f, " [{}: {}]", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
