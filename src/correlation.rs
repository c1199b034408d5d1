//! Per-request correlation identity.
//!
//! Every intercepted request gets an opaque 32-hex-char identity at entry.
//! The identity lives in a [`CorrelationContext`] — a slot owned by exactly
//! one in-flight request and threaded explicitly through the hook chain.
//!
//! # Why explicit, not thread-local
//!
//! A thread-local slot works until a pooled thread is reused without the
//! exit hook having run, at which point request B reads request A's
//! identity. An explicit per-request context makes that class of bug
//! unrepresentable: isolation holds by construction, and `clear()` exists
//! only so a *reused* context starts each request empty.

use uuid::Uuid;

/// Value returned by [`CorrelationContext::get`] when no identity is live.
pub const UNSET: &str = "unset";

/// Generates a fresh request identity: a v4 UUID in simple form,
/// 32 lowercase hex characters.
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The identity slot for one in-flight request.
///
/// Lifecycle per request: [`set`](Self::set) at entry,
/// [`get`](Self::get) from the exit hooks, [`clear`](Self::clear) on both
/// the normal and the error exit path. At most one identity is live per
/// context at any time — `set` replaces, it does not stack.
#[derive(Debug, Default)]
pub struct CorrelationContext {
    id: Option<String>,
}

impl CorrelationContext {
    /// An empty context. No identity is live until [`set`](Self::set).
    pub fn new() -> Self {
        Self { id: None }
    }

    /// Associates `id` with this request, replacing any previous identity.
    pub fn set(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Returns the live identity, or the literal `"unset"` if none.
    pub fn get(&self) -> &str {
        self.id.as_deref().unwrap_or(UNSET)
    }

    /// Whether an identity is currently live.
    pub fn is_set(&self) -> bool {
        self.id.is_some()
    }

    /// Drops the identity. Both exit hooks call this; a context that is
    /// reused for a later request must never carry the previous identity.
    pub fn clear(&mut self) {
        self.id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_reads_unset() {
        let ctx = CorrelationContext::new();
        assert_eq!(ctx.get(), UNSET);
        assert!(!ctx.is_set());
    }

    #[test]
    fn set_get_clear_roundtrip() {
        let mut ctx = CorrelationContext::new();
        ctx.set("abc123");
        assert_eq!(ctx.get(), "abc123");
        assert!(ctx.is_set());
        ctx.clear();
        assert_eq!(ctx.get(), UNSET);
    }

    #[test]
    fn set_replaces_previous_identity() {
        let mut ctx = CorrelationContext::new();
        ctx.set("first");
        ctx.set("second");
        assert_eq!(ctx.get(), "second");
    }

    #[test]
    fn generated_ids_are_32_hex_and_unique() {
        let a = new_request_id();
        let b = new_request_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn contexts_are_isolated() {
        let mut a = CorrelationContext::new();
        let mut b = CorrelationContext::new();
        a.set(new_request_id());
        b.set(new_request_id());
        assert_ne!(a.get(), b.get());
        a.clear();
        assert!(b.is_set());
    }
}
