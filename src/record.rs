//! Structured call-log records.
//!
//! One record per interception phase — ENTER, EXIT, ERROR — rendered as a
//! single multi-line block bracketed by fixed-width separator lines, so a
//! record stays visually intact even when many requests interleave in the
//! same sink. Records are immutable once built: rendered, emitted once,
//! discarded.
//!
//! A rendered ENTER record looks like:
//!
//! ```text
//! <==========================  (110 '=' chars)  ==========================>
//!     handler call [ START ]: -------START-------
//!         client IP - request ID: [ 10.0.0.1 ] - [ 9f86d081884c7d65... ]
//!         api name: [ user ### fetch one user ]
//!         method and URI: [ GET - /users/5 ]
//!         handler: [ UserController.get_user ]
//!         parameters: [ id = 5 ]
//! <==========================  (110 '=' chars)  ==========================>
//! ```

use std::fmt;

use http::{Method, Uri};
use serde_json::Value;

/// Width of the `=` run in the separator line.
const SEPARATOR_WIDTH: usize = 110;

/// Rendered in place of an argument value that fails JSON serialization.
/// A broken value must never abort the record.
pub const UNSERIALIZABLE: &str = "<unserializable>";

/// Rendered in place of the parameter list for zero-argument handlers.
pub const NO_PARAMETERS: &str = "no parameters";

/// Which interception phase a record belongs to. ERROR records are emitted
/// at error severity, the other two at info.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Enter,
    Exit,
    Error,
}

/// One rendered log record. Build with [`LogRecord::enter`],
/// [`LogRecord::exit`], or [`LogRecord::error`]; read back with
/// [`text`](Self::text) or via `Display`.
#[derive(Debug)]
pub struct LogRecord {
    phase: Phase,
    text: String,
}

impl LogRecord {
    /// The ENTER record: full field set including the parameter list.
    #[allow(clippy::too_many_arguments)]
    pub fn enter(
        identity: &str,
        client: &str,
        display_name: Option<&str>,
        method: &Method,
        uri: &Uri,
        handler: &str,
        param_names: &[String],
        args: &[Value],
    ) -> Self {
        let mut b = Builder::new("handler call [ START ]: -------START-------");
        b.raw(format_args!(
            "client IP - request ID: [ {client} ] - [ {identity} ]"
        ));
        if let Some(name) = display_name {
            b.field("api name", name);
        }
        b.raw(format_args!("method and URI: [ {method} - {uri} ]"));
        b.field("handler", handler);
        b.field("parameters", render_params(param_names, args));
        b.finish(Phase::Enter)
    }

    /// The EXIT record: same fields as ENTER minus the parameter list. The
    /// identity comes from the correlation context, not a fresh generation.
    pub fn exit(
        identity: &str,
        client: &str,
        display_name: Option<&str>,
        method: &Method,
        uri: &Uri,
        handler: &str,
    ) -> Self {
        let mut b = Builder::new("handler call [ END ]: -------END-------");
        b.raw(format_args!(
            "client IP - request ID: [ {client} ] - [ {identity} ]"
        ));
        if let Some(name) = display_name {
            b.field("api name", name);
        }
        b.raw(format_args!("method and URI: [ {method} - {uri} ]"));
        b.field("handler", handler);
        b.finish(Phase::Exit)
    }

    /// The ERROR record: identity, client, failed handler, the triggering
    /// error's display text, and the parameter list.
    pub fn error(
        identity: &str,
        client: &str,
        handler: &str,
        param_names: &[String],
        args: &[Value],
        detail: &str,
    ) -> Self {
        let mut b = Builder::new("handler call [ ERROR ]: -------ERROR-------");
        b.field("request ID", identity);
        b.field("client IP", client);
        b.field("failed handler", handler);
        b.field("error", detail);
        b.field("parameters", render_params(param_names, args));
        b.finish(Phase::Error)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The rendered multi-line block, separators included.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ── Assembly ──────────────────────────────────────────────────────────────────

struct Builder {
    text: String,
}

impl Builder {
    fn new(title: &str) -> Self {
        let mut text = String::with_capacity(512);
        text.push('\n');
        push_separator(&mut text);
        text.push_str("\n\t");
        text.push_str(title);
        Self { text }
    }

    /// `label: [ value ]` on its own indented line.
    fn field(&mut self, label: &str, value: impl fmt::Display) {
        self.raw(format_args!("{label}: [ {value} ]"));
    }

    /// A pre-formatted indented line, for the fields whose bracketing
    /// doesn't fit the `label: [ value ]` mould.
    fn raw(&mut self, line: fmt::Arguments<'_>) {
        self.text.push_str("\n\t\t");
        fmt::Write::write_fmt(&mut self.text, line).expect("writing to a String cannot fail");
    }

    fn finish(mut self, phase: Phase) -> LogRecord {
        self.text.push('\n');
        push_separator(&mut self.text);
        self.text.push('\n');
        LogRecord { phase, text: self.text }
    }
}

fn push_separator(out: &mut String) {
    out.push('<');
    for _ in 0..SEPARATOR_WIDTH {
        out.push('=');
    }
    out.push('>');
}

/// `name = <json>` pairs in declaration order, space-separated. Names and
/// args are matched positionally; a value that refuses to serialize is
/// substituted, never fatal.
fn render_params(names: &[String], args: &[Value]) -> String {
    debug_assert_eq!(names.len(), args.len(), "parameter names and arguments must align");
    if names.is_empty() {
        return NO_PARAMETERS.to_owned();
    }
    names
        .iter()
        .zip(args)
        .map(|(name, value)| {
            let json =
                serde_json::to_string(value).unwrap_or_else(|_| UNSERIALIZABLE.to_owned());
            format!("{name} = {json}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn enter_record_carries_all_fields() {
        let record = LogRecord::enter(
            "deadbeef",
            "10.0.0.1",
            Some("user ### fetch one user"),
            &Method::GET,
            &"/users/5".parse().unwrap(),
            "UserController.get_user",
            &names(&["id"]),
            &[json!(5)],
        );
        assert_eq!(record.phase(), Phase::Enter);
        let text = record.text();
        assert!(text.contains("-------START-------"));
        assert!(text.contains("[ 10.0.0.1 ] - [ deadbeef ]"));
        assert!(text.contains("api name: [ user ### fetch one user ]"));
        assert!(text.contains("method and URI: [ GET - /users/5 ]"));
        assert!(text.contains("handler: [ UserController.get_user ]"));
        assert!(text.contains("parameters: [ id = 5 ]"));
    }

    #[test]
    fn records_are_bracketed_by_two_separators() {
        let record = LogRecord::exit(
            "deadbeef",
            "10.0.0.1",
            None,
            &Method::GET,
            &"/ping".parse().unwrap(),
            "C.ping",
        );
        let separator = format!("<{}>", "=".repeat(110));
        assert_eq!(record.text().matches(&separator).count(), 2);
        assert!(record.text().starts_with('\n'));
        assert!(record.text().ends_with('\n'));
    }

    #[test]
    fn absent_display_name_renders_nothing() {
        let record = LogRecord::exit(
            "id",
            "ip",
            None,
            &Method::GET,
            &"/x".parse().unwrap(),
            "C.m",
        );
        assert!(!record.text().contains("api name"));
    }

    #[test]
    fn exit_record_has_no_parameter_list() {
        let record = LogRecord::exit(
            "id",
            "ip",
            None,
            &Method::POST,
            &"/x".parse().unwrap(),
            "C.m",
        );
        assert!(!record.text().contains("parameters"));
    }

    #[test]
    fn zero_arguments_render_the_no_parameters_marker() {
        let record = LogRecord::enter(
            "id",
            "ip",
            None,
            &Method::GET,
            &"/x".parse().unwrap(),
            "C.m",
            &[],
            &[],
        );
        assert!(record.text().contains("parameters: [ no parameters ]"));
    }

    #[test]
    fn two_arguments_render_in_declaration_order() {
        let rendered = render_params(&names(&["id", "name"]), &[json!(5), json!("a")]);
        assert_eq!(rendered, r#"id = 5 name = "a""#);
    }

    #[test]
    fn structured_arguments_render_as_json() {
        let rendered = render_params(&names(&["body"]), &[json!({"x": 1})]);
        assert_eq!(rendered, r#"body = {"x":1}"#);
    }

    #[test]
    fn error_record_embeds_the_error_detail() {
        let record = LogRecord::error(
            "deadbeef",
            "10.0.0.1",
            "C.m",
            &names(&["id"]),
            &[json!(5)],
            "database unreachable",
        );
        assert_eq!(record.phase(), Phase::Error);
        let text = record.text();
        assert!(text.contains("-------ERROR-------"));
        assert!(text.contains("request ID: [ deadbeef ]"));
        assert!(text.contains("client IP: [ 10.0.0.1 ]"));
        assert!(text.contains("failed handler: [ C.m ]"));
        assert!(text.contains("error: [ database unreachable ]"));
        assert!(text.contains("parameters: [ id = 5 ]"));
    }
}
