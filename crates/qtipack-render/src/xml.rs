//! XML escaping shared by both dialects.

/// Escape a string for use as XML character data.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape a string for use inside a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    escape(s).replace('"', "&quot;").replace('\'', "&apos;")
}

/// Two spaces per nesting level.
pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
