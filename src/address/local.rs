/// Dot-atom local part: atext + '.' not leading, trailing or doubled.
/// Non-ASCII characters are UTF-8 atext (RFC 6531).
pub(crate) fn is_dot_atom(s: &str) -> bool {
    if s.is_empty() || s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || (!c.is_ascii() && !c.is_control())
            || matches!(
                c,
                '!' | '#'
                    | '$'
                    | '%'
                    | '&'
                    | '\''
                    | '*'
                    | '+'
                    | '-'
                    | '/'
                    | '='
                    | '?'
                    | '^'
                    | '_'
                    | '`'
                    | '{'
                    | '|'
                    | '}'
                    | '~'
                    | '.'
            )
    })
}

/// Accepts a simple quoted-string, otherwise falls back to [`is_dot_atom`].
pub(crate) fn is_local_part(s: &str) -> bool {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        !s[1..s.len() - 1].contains(['"', '\r', '\n'])
    } else {
        is_dot_atom(s)
    }
}
