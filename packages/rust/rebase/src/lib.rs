//! `url(...)` rebasing for concatenated stylesheets.
//!
//! Vendor stylesheets reference fonts and images relative to their own
//! location. Once they are concatenated into a bundle under a different
//! directory, those references must be rewritten to paths (or absolute URLs)
//! that still resolve.
//!
//! # Grammar
//!
//! This is a delimiter scan, not a CSS parser. A reference is recognised as
//!
//! ```text
//! url( ws* [quote] body [same quote] ws* )
//! ```
//!
//! where `url` is matched ASCII case-insensitively and must not be the tail
//! of a longer identifier, `quote` is `"` or `'`, and `body` is one or more
//! characters other than `"`, `'` and `)`. Text that does not fit, such as
//! bodies containing parentheses or quotes, or an unterminated quote, is
//! unsupported input and is copied through untouched.

use std::fmt::Write as _;

use tracing::trace;
use vendorcss_shared::{RebaseContext, RebaseMode};

const URL_OPEN: &str = "url(";

/// Prefixes that already resolve independently of the stylesheet's location.
const PASSTHROUGH_PREFIXES: [&str; 5] = ["data:", "http:", "https:", "//", "#"];

/// Rewrite every recognised `url(...)` in `css` for the given context.
pub fn rebase_css_urls(css: &str, ctx: &RebaseContext) -> String {
    let mut out = String::with_capacity(css.len() + css.len() / 16);
    let mut cursor = 0;
    let mut rewritten = 0usize;

    while let Some(start) = find_url_open(css, cursor) {
        let body_start = start + URL_OPEN.len();

        let Some(token) = parse_token(&css[body_start..]) else {
            out.push_str(&css[cursor..body_start]);
            cursor = body_start;
            continue;
        };
        let end = body_start + token.len;

        out.push_str(&css[cursor..start]);
        match rebase_url(token.url, ctx) {
            Some(rebased) => {
                let q = token.quote.unwrap_or('"');
                let _ = write!(out, "url({q}{rebased}{q})");
                rewritten += 1;
            }
            None => out.push_str(&css[start..end]),
        }
        cursor = end;
    }
    out.push_str(&css[cursor..]);

    trace!(rewritten, dir = %ctx.source_directory, "rebased url() references");
    out
}

/// Rebase a single, already-unwrapped URL.
///
/// Returns `None` when the URL must pass through unchanged.
pub fn rebase_url(url: &str, ctx: &RebaseContext) -> Option<String> {
    if url.is_empty() || is_passthrough(url) {
        return None;
    }

    let split = url.find(['?', '#']).unwrap_or(url.len());
    let (path, suffix) = url.split_at(split);
    if path.is_empty() {
        return None;
    }

    match &ctx.mode {
        RebaseMode::Site { base_prefix } => {
            let absolute = if path.starts_with('/') {
                path.to_string()
            } else {
                normalize_posix(&format!("/{}/{}", ctx.source_directory, path))
            };
            let joined = collapse_slashes(&format!("{base_prefix}{absolute}"));
            Some(format!("{joined}{suffix}"))
        }
        RebaseMode::Remote { source_url } => source_url
            .join(path)
            .ok()
            .map(|resolved| format!("{resolved}{suffix}")),
    }
}

fn is_passthrough(url: &str) -> bool {
    PASSTHROUGH_PREFIXES.iter().any(|prefix| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

struct UrlToken<'a> {
    /// Trimmed body, quotes removed.
    url: &'a str,
    quote: Option<char>,
    /// Bytes consumed after `url(`, including the closing paren.
    len: usize,
}

/// Byte offset of the next `url(` at or after `from` that starts a token.
fn find_url_open(css: &str, from: usize) -> Option<usize> {
    let bytes = css.as_bytes();
    let open = URL_OPEN.as_bytes();
    let mut i = from;
    while i + open.len() <= bytes.len() {
        if bytes[i..i + open.len()].eq_ignore_ascii_case(open)
            && (i == 0 || !is_ident_byte(bytes[i - 1]))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

/// Match the token body following `url(`.
fn parse_token(rest: &str) -> Option<UrlToken<'_>> {
    let mut i = skip_whitespace(rest, 0);

    let quote = match rest[i..].chars().next() {
        Some(c @ ('"' | '\'')) => {
            i += 1;
            Some(c)
        }
        _ => None,
    };

    let body_start = i;
    let body_len = rest[i..].find(['"', '\'', ')'])?;
    if body_len == 0 {
        return None;
    }
    i += body_len;

    if let Some(q) = quote {
        if !rest[i..].starts_with(q) {
            return None;
        }
        i += 1;
    }

    i = skip_whitespace(rest, i);
    if !rest[i..].starts_with(')') {
        return None;
    }

    Some(UrlToken {
        url: rest[body_start..body_start + body_len].trim(),
        quote,
        len: i + 1,
    })
}

fn skip_whitespace(s: &str, from: usize) -> usize {
    let tail = &s[from..];
    from + (tail.len() - tail.trim_start().len())
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Resolve `.` and `..` in an absolute POSIX path; `..` never climbs above `/`.
fn normalize_posix(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut normalized = format!("/{}", segments.join("/"));
    if path.ends_with('/') && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Collapse runs of two or more `/` into one.
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}
