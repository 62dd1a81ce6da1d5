#![forbid(unsafe_code)]

//! Character escaping shared by the serializer and the canonicalizer.
//!
//! The rules are the Canonical XML ones, which also produce well-formed
//! output for ordinary serialization:
//! - character data: `&`, `<`, `>` and `\r`
//! - attribute values: `&`, `<`, `"`, `\t`, `\n` and `\r`

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Text,
    Attribute,
}

fn escape(s: &str, context: Context) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 8);
    for ch in s.chars() {
        let replacement = match (ch, context) {
            ('&', _) => "&amp;",
            ('<', _) => "&lt;",
            ('\r', _) => "&#xD;",
            ('>', Context::Text) => "&gt;",
            ('"', Context::Attribute) => "&quot;",
            ('\t', Context::Attribute) => "&#x9;",
            ('\n', Context::Attribute) => "&#xA;",
            _ => {
                out.push(ch);
                continue;
            }
        };
        out.push_str(replacement);
    }
    out
}

/// Escape character data.
pub fn escape_text(s: &str) -> String {
    escape(s, Context::Text)
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    escape(s, Context::Attribute)
}
