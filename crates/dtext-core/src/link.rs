//! Boundary rules for URLs, mentions, wiki links and search links.
//!
//! Everything here works on byte offsets into the validated source and
//! returns ranges; the inline engine decides what nodes to build.

use crate::escape::encode_component;
use crate::options::ParseOptions;
use crate::scanner::{
    Delimiters, char_before, is_blank, is_mention_terminator, is_trailing_boundary,
    is_url_terminator, starts_with_ignore_case,
};
use std::ops::Range;

/// Length of an `http://` or `https://` scheme at `pos` (case-insensitive).
pub(crate) fn scheme_len(bytes: &[u8], pos: usize) -> Option<usize> {
    if starts_with_ignore_case(bytes, pos, b"https://") {
        Some(8)
    } else if starts_with_ignore_case(bytes, pos, b"http://") {
        Some(7)
    } else {
        None
    }
}

fn scan_url_chars(src: &str, pos: usize) -> usize {
    let rest = &src[pos..];
    let len = rest
        .char_indices()
        .find(|&(_, ch)| is_url_terminator(ch))
        .map_or(rest.len(), |(idx, _)| idx);
    pos + len
}

fn drop_trailing_boundary(src: &str, start: usize, end: usize) -> usize {
    match char_before(src, end) {
        Some(ch) if end > start && is_trailing_boundary(ch) => end - ch.len_utf8(),
        _ => end,
    }
}

/// A bare `http(s)://` URL in running text. Returns the end offset.
pub(crate) fn match_autolink(src: &str, pos: usize) -> Option<usize> {
    let scheme = scheme_len(src.as_bytes(), pos)?;
    let body = pos + scheme;
    let end = drop_trailing_boundary(src, body, scan_url_chars(src, body));
    (end > body).then_some(end)
}

/// `<http(s)://...>`. Returns the URL range and the end past `>`.
pub(crate) fn match_delimited_url(src: &str, pos: usize) -> Option<(Range<usize>, usize)> {
    let bytes = src.as_bytes();
    if bytes.get(pos) != Some(&b'<') {
        return None;
    }
    let start = pos + 1;
    let scheme = scheme_len(bytes, start)?;
    let end = scan_url_chars(src, start + scheme);
    if end == start + scheme || bytes.get(end) != Some(&b'>') {
        return None;
    }
    Some((start..end, end + 1))
}

fn is_link_target_start(bytes: &[u8], pos: usize) -> bool {
    scheme_len(bytes, pos).is_some() || matches!(bytes.get(pos), Some(b'/' | b'#'))
}

/// The URL of `"label":url`: absolute, rooted or a fragment, ending at the
/// first terminator with one trailing boundary character left out.
fn match_bare_target(src: &str, pos: usize) -> Option<usize> {
    if !is_link_target_start(src.as_bytes(), pos) {
        return None;
    }
    let end = drop_trailing_boundary(src, pos, scan_url_chars(src, pos));
    (end > pos).then_some(end)
}

/// The URL inside `[...]`; `pos` points just past the opening bracket.
fn match_bracketed_target(
    src: &str,
    pos: usize,
    delims: &mut Delimiters,
) -> Option<Range<usize>> {
    let bytes = src.as_bytes();
    if !is_link_target_start(bytes, pos) {
        return None;
    }
    let end = delims.target.find(bytes, pos)?;
    if bytes[end] != b']' || end == pos {
        return None;
    }
    Some(pos..end)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NamedLink {
    pub url: Range<usize>,
    pub label: Range<usize>,
    pub end: usize,
}

/// `"label":[url]` or `"label":url`, starting at the opening quote.
pub(crate) fn match_quoted_link(
    src: &str,
    pos: usize,
    delims: &mut Delimiters,
) -> Option<NamedLink> {
    let bytes = src.as_bytes();
    if bytes.get(pos) != Some(&b'"') {
        return None;
    }
    let label_start = pos + 1;
    let label_len = bytes[label_start..].iter().position(|&b| b == b'"')?;
    let label = label_start..label_start + label_len;
    if label.is_empty() || bytes[label.clone()].contains(&b'\n') {
        return None;
    }
    let mut cursor = label.end + 1;
    if bytes.get(cursor) != Some(&b':') {
        return None;
    }
    cursor += 1;
    if bytes.get(cursor) == Some(&b'[')
        && let Some(url) = match_bracketed_target(src, cursor + 1, delims)
    {
        let end = url.end + 1;
        return Some(NamedLink { url, label, end });
    }
    let end = match_bare_target(src, cursor)?;
    Some(NamedLink {
        url: cursor..end,
        label,
        end,
    })
}

/// `[url](label)`, starting at the opening bracket.
pub(crate) fn match_markdown_link(
    src: &str,
    pos: usize,
    delims: &mut Delimiters,
) -> Option<NamedLink> {
    let bytes = src.as_bytes();
    if bytes.get(pos) != Some(&b'[') {
        return None;
    }
    let url = match_bracketed_target(src, pos + 1, delims)?;
    if bytes.get(url.end + 1) != Some(&b'(') {
        return None;
    }
    let label_start = url.end + 2;
    let label = label_start..delims.paren.find(bytes, label_start)?;
    if label.is_empty() || bytes[label.end] != b')' {
        return None;
    }
    let end = label.end + 1;
    Some(NamedLink { url, label, end })
}

/// `<a href="url">label</a>`. No attribute other than `href` is accepted.
pub(crate) fn match_html_link(
    src: &str,
    pos: usize,
    delims: &mut Delimiters,
) -> Option<NamedLink> {
    let bytes = src.as_bytes();
    if !starts_with_ignore_case(bytes, pos, b"<a href=\"") {
        return None;
    }
    let url_start = pos + 9;
    let url_len = bytes[url_start..]
        .iter()
        .position(|&b| b == b'"' || b == b'\n')?;
    let url = url_start..url_start + url_len;
    if url.is_empty() || bytes[url.end] != b'"' || !is_link_target_start(bytes, url.start) {
        return None;
    }
    if bytes.get(url.end + 1) != Some(&b'>') {
        return None;
    }
    let label_start = url.end + 2;
    let label_end = delims.anchor.find(bytes, label_start)?;
    if bytes[label_end] == b'\n' || label_end == label_start {
        return None;
    }
    Some(NamedLink {
        url,
        label: label_start..label_end,
        end: label_end + 4,
    })
}

/// Resolved `href` plus whether the link leaves the site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LinkTarget {
    pub href: String,
    pub external: bool,
}

pub(crate) fn classify_url(url: &str, options: &ParseOptions) -> LinkTarget {
    let absolute;
    let url = if url.len() > 2 && url.starts_with("//") {
        absolute = format!("http:{url}");
        absolute.as_str()
    } else {
        url
    };
    if url.starts_with('/') || url.starts_with('#') {
        return LinkTarget {
            href: format!("{}{url}", options.url_prefix()),
            external: false,
        };
    }
    let external = match options.internal_host() {
        Some(domain) => url_host(url) != domain,
        None => true,
    };
    LinkTarget {
        href: url.to_string(),
        external,
    }
}

/// Host part of an absolute URL, without userinfo or port.
pub(crate) fn url_host(url: &str) -> &str {
    let authority_start = url.find("://").map_or(0, |idx| idx + 3);
    let rest = &url[authority_start..];
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host_port = authority
        .rfind('@')
        .map_or(authority, |at| &authority[at + 1..]);
    host_port
        .find(':')
        .map_or(host_port, |colon| &host_port[..colon])
}

/// A bare `@name` at `pos`. Returns the end of the name.
pub(crate) fn match_mention(src: &str, pos: usize) -> Option<usize> {
    if src.as_bytes().get(pos) != Some(&b'@') {
        return None;
    }
    if let Some(prev) = char_before(src, pos)
        && (prev.is_alphanumeric() || matches!(prev, '@' | '<' | '_'))
    {
        return None;
    }
    let start = pos + 1;
    let rest = &src[start..];
    let len = rest
        .char_indices()
        .find(|&(_, ch)| is_mention_terminator(ch))
        .map_or(rest.len(), |(idx, _)| idx);
    let end = drop_trailing_boundary(src, start, start + len);
    is_valid_mention_name(&src[start..end]).then_some(end)
}

fn is_valid_mention_name(name: &str) -> bool {
    let rest = name
        .strip_prefix('_')
        .or_else(|| name.strip_prefix('.'))
        .unwrap_or(name);
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) if !first.is_ascii_punctuation() => chars.next().is_some(),
        _ => false,
    }
}

/// `<@name>`. Returns the name range and the end past `>`.
pub(crate) fn match_delimited_mention(
    src: &str,
    pos: usize,
    delims: &mut Delimiters,
) -> Option<(Range<usize>, usize)> {
    let bytes = src.as_bytes();
    if bytes.get(pos..pos + 2) != Some(&b"<@"[..]) {
        return None;
    }
    let start = pos + 2;
    match bytes.get(start) {
        Some(&b) if !is_blank(b) && b != b'\n' && b != b'>' => {}
        _ => return None,
    }
    let end = delims.angle.find(bytes, start)?;
    if bytes[end] != b'>' {
        return None;
    }
    Some((start..end, end + 1))
}

pub(crate) fn mention_href(name: &str, options: &ParseOptions) -> String {
    format!("{}/users?name={}", options.url_prefix(), encode_component(name))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WikiMatch {
    pub target: Range<usize>,
    pub label: Option<Range<usize>>,
    pub end: usize,
}

/// `[[target]]` or `[[target|label]]`, starting at the first bracket.
pub(crate) fn match_wiki_link(src: &str, pos: usize) -> Option<WikiMatch> {
    let bytes = src.as_bytes();
    if bytes.get(pos..pos + 2) != Some(&b"[["[..]) {
        return None;
    }
    let target_start = pos + 2;
    let target_len = bytes[target_start..]
        .iter()
        .position(|&b| matches!(b, b'[' | b']' | b'|' | b'\n'))?;
    let target = target_start..target_start + target_len;
    if target.is_empty() {
        return None;
    }
    match bytes[target.end] {
        b']' if bytes.get(target.end + 1) == Some(&b']') => Some(WikiMatch {
            end: target.end + 2,
            target,
            label: None,
        }),
        b'|' => {
            let label_start = target.end + 1;
            let label_len = bytes[label_start..]
                .iter()
                .position(|&b| matches!(b, b'[' | b']' | b'\n'))?;
            let label_end = label_start + label_len;
            if bytes[label_end] != b']' || bytes.get(label_end + 1) != Some(&b']') {
                return None;
            }
            Some(WikiMatch {
                target,
                label: Some(label_start..label_end),
                end: label_end + 2,
            })
        }
        _ => None,
    }
}

/// `/wiki_pages/` path for a title: ASCII-lowercased, spaces as underscores,
/// all-digit titles prefixed with `~` so they are not read as ids.
pub(crate) fn wiki_href(target: &str, options: &ParseOptions) -> String {
    let mut title: String = target
        .chars()
        .map(|ch| if ch == ' ' { '_' } else { ch.to_ascii_lowercase() })
        .collect();
    if title.bytes().all(|b| b.is_ascii_digit()) {
        title.insert(0, '~');
    }
    format!("{}/wiki_pages/{}", options.url_prefix(), encode_component(&title))
}

/// Label for `[[target|]]`: the namespace and a trailing qualifier such as
/// `_(cosplay)` are dropped.
pub(crate) fn pipe_trick(target: &str) -> &str {
    let name = target.rfind(':').map_or(target, |idx| &target[idx + 1..]);
    if let Some(body) = name.strip_suffix(')')
        && let Some(open) = body.rfind('(')
        && !body[open + 1..].contains(')')
        && open > 0
        && matches!(name.as_bytes()[open - 1], b' ' | b'_')
    {
        return &name[..open - 1];
    }
    name
}

/// `{{query}}`. Returns the query range and the end past `}}`.
pub(crate) fn match_search_link(
    src: &str,
    pos: usize,
    delims: &mut Delimiters,
) -> Option<(Range<usize>, usize)> {
    let bytes = src.as_bytes();
    if bytes.get(pos..pos + 2) != Some(&b"{{"[..]) {
        return None;
    }
    let start = pos + 2;
    let end = delims.brace.find(bytes, start)?;
    if end == start || bytes.get(end..end + 2) != Some(&b"}}"[..]) {
        return None;
    }
    Some((start..end, end + 2))
}

pub(crate) fn search_href(query: &str, options: &ParseOptions) -> String {
    format!("{}/posts?tags={}", options.url_prefix(), encode_component(query))
}

/// Length of the run of ASCII alphanumerics starting at `pos`.
pub(crate) fn ascii_word_len(src: &str, pos: usize) -> usize {
    src.as_bytes()[pos..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count()
}

pub(crate) fn is_word_char_before(src: &str, pos: usize) -> bool {
    char_before(src, pos).is_some_and(char::is_alphanumeric)
}
