#![forbid(unsafe_code)]

//! Character escaping for canonical output.
//!
//! - Text nodes: `&` → `&amp;`, `<` → `&lt;`, `>` → `&gt;`, `\r` → `&#xD;`
//! - Attribute values: `&`, `<`, `"` plus `\t` → `&#x9;`, `\n` → `&#xA;`, `\r` → `&#xD;`
//! - PI data: `\r` → `&#xD;`

/// Append `s` escaped as text content.
pub fn push_text(out: &mut Vec<u8>, s: &str) {
    let mut last = 0;
    for (i, ch) in s.char_indices() {
        let rep: &[u8] = match ch {
            '&' => b"&amp;",
            '<' => b"&lt;",
            '>' => b"&gt;",
            '\r' => b"&#xD;",
            _ => continue,
        };
        out.extend_from_slice(&s.as_bytes()[last..i]);
        out.extend_from_slice(rep);
        last = i + 1;
    }
    out.extend_from_slice(&s.as_bytes()[last..]);
}

/// Append `s` escaped as a double-quoted attribute value.
pub fn push_attr(out: &mut Vec<u8>, s: &str) {
    let mut last = 0;
    for (i, ch) in s.char_indices() {
        let rep: &[u8] = match ch {
            '&' => b"&amp;",
            '<' => b"&lt;",
            '"' => b"&quot;",
            '\t' => b"&#x9;",
            '\n' => b"&#xA;",
            '\r' => b"&#xD;",
            _ => continue,
        };
        out.extend_from_slice(&s.as_bytes()[last..i]);
        out.extend_from_slice(rep);
        last = i + 1;
    }
    out.extend_from_slice(&s.as_bytes()[last..]);
}

/// Append processing instruction data.
pub fn push_pi(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.replace('\r', "&#xD;").as_bytes());
}

pub fn escape_text(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    push_text(&mut out, s);
    String::from_utf8_lossy(&out).into_owned()
}

pub fn escape_attr(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    push_attr(&mut out, s);
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("hello"), "hello");
        assert_eq!(escape_text("a&b<c>d"), "a&amp;b&lt;c&gt;d");
        assert_eq!(escape_text("line\rend"), "line&#xD;end");
        assert_eq!(escape_text("\"quoted\" ünïcode"), "\"quoted\" ünïcode");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("a&b\"c>"), "a&amp;b&quot;c>");
        assert_eq!(escape_attr("a\tb\nc\rd"), "a&#x9;b&#xA;c&#xD;d");
    }
}
