//! Small line-scanning helpers shared by the text-based handlers.

/// Net brace count of a line, ignoring string literals.
pub(crate) fn net_braces(line: &str) -> i64 {
    let mut n = 0;
    let mut quote: Option<char> = None;
    for ch in line.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '{') => n += 1,
            (None, '}') => n -= 1,
            _ => {}
        }
    }
    n
}

/// The part of `line` before a line comment opened outside any string.
pub(crate) fn strip_comment<'a>(line: &'a str, marker: &str) -> &'a str {
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, _) if line[i..].starts_with(marker) => return &line[..i],
            _ => {}
        }
    }
    line
}

pub(crate) fn unquote(v: &str) -> String {
    v.trim().trim_matches('"').trim_matches('\'').to_string()
}
