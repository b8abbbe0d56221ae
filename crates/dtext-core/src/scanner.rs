use crate::error::{DTextError, DTextResult};
use std::ops::Range;

/// Checks raw input before any parsing happens.
///
/// Null bytes are reported before encoding problems so that a buffer with
/// both always yields the same error.
pub fn validate(input: &[u8]) -> DTextResult<&str> {
    if let Some(offset) = input.iter().position(|&b| b == 0) {
        return Err(DTextError::ControlByte { offset });
    }
    std::str::from_utf8(input).map_err(|err| DTextError::Encoding {
        offset: err.valid_up_to(),
    })
}

pub(crate) fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

/// Length of the line terminator at `pos`: 1 for `\n`, 2 for `\r\n`, 0 otherwise.
pub(crate) fn newline_len(bytes: &[u8], pos: usize) -> usize {
    match bytes.get(pos) {
        Some(b'\n') => 1,
        Some(b'\r') if bytes.get(pos + 1) == Some(&b'\n') => 2,
        _ => 0,
    }
}

pub(crate) fn skip_blanks(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_blank(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// True when only blanks remain before the next line terminator or the end.
pub(crate) fn at_line_end(bytes: &[u8], pos: usize) -> bool {
    let pos = skip_blanks(bytes, pos);
    pos == bytes.len() || newline_len(bytes, pos) > 0
}

pub(crate) fn starts_with_ignore_case(bytes: &[u8], pos: usize, pattern: &[u8]) -> bool {
    bytes
        .get(pos..pos + pattern.len())
        .is_some_and(|window| window.eq_ignore_ascii_case(pattern))
}

pub(crate) fn char_at(src: &str, pos: usize) -> Option<char> {
    src.get(pos..).and_then(|rest| rest.chars().next())
}

pub(crate) fn char_before(src: &str, pos: usize) -> Option<char> {
    src.get(..pos).and_then(|head| head.chars().next_back())
}

pub(crate) fn is_url_terminator(ch: char) -> bool {
    ch.is_ascii_whitespace()
        || matches!(
            ch,
            '<' | '>'
                | '"'
                | '\u{3000}'
                | '、'
                | '。'
                | '〈'
                | '〉'
                | '《'
                | '》'
                | '「'
                | '」'
                | '『'
                | '』'
                | '【'
                | '】'
                | '〔'
                | '〕'
                | '〖'
                | '〗'
                | '〘'
                | '〙'
                | '〚'
                | '〛'
                | '〜'
                | '（'
                | '）'
        )
}

pub(crate) fn is_mention_terminator(ch: char) -> bool {
    ch.is_ascii_whitespace()
        || matches!(
            ch,
            '@' | '<'
                | '>'
                | '['
                | ']'
                | '{'
                | '}'
                | '"'
                | '\\'
                | '」'
                | '』'
                | '）'
                | '】'
                | '〕'
                | '〉'
                | '》'
                | '〗'
                | '〙'
                | '〛'
        )
}

/// Punctuation that may end a sentence right after a URL or mention.
pub(crate) fn is_trailing_boundary(ch: char) -> bool {
    matches!(
        ch,
        ':' | ';' | '.' | ',' | '!' | '?' | ')' | ']' | '<' | '>'
    )
}

/// Forward search for the next offset accepted by `accept`, remembered
/// between calls. A lookup starting inside the last searched stretch
/// returns the stored answer without rescanning, so repeated openers with
/// no closer cost linear time overall. Every call must pass the same bytes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Finder {
    accept: fn(&[u8], usize) -> bool,
    from: usize,
    /// Offset found by the last search, or the input length.
    found: Option<usize>,
}

impl Finder {
    fn new(accept: fn(&[u8], usize) -> bool) -> Self {
        Self {
            accept,
            from: 0,
            found: None,
        }
    }

    pub(crate) fn find(&mut self, bytes: &[u8], from: usize) -> Option<usize> {
        let found = match self.found {
            Some(found) if self.from <= from && from <= found => found,
            _ => {
                let accept = self.accept;
                let found = (from..bytes.len())
                    .find(|&idx| accept(bytes, idx))
                    .unwrap_or(bytes.len());
                self.from = from;
                self.found = Some(found);
                found
            }
        };
        (found < bytes.len()).then_some(found)
    }
}

/// One finder per closing delimiter that a link or tag scan looks for.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Delimiters {
    /// `>` or a line feed: `<@name>` and `<expand title>`.
    pub angle: Finder,
    /// `]` or a line feed: `[expand title]`.
    pub bracket: Finder,
    /// `]` or whitespace: bracketed link targets.
    pub target: Finder,
    /// `)` or a line feed: Markdown link labels.
    pub paren: Finder,
    /// `}` or a line feed: search links.
    pub brace: Finder,
    /// `</a>` or a line feed: HTML link labels.
    pub anchor: Finder,
}

impl Delimiters {
    pub(crate) fn new() -> Self {
        Self {
            angle: Finder::new(|bytes, idx| matches!(bytes[idx], b'>' | b'\n')),
            bracket: Finder::new(|bytes, idx| matches!(bytes[idx], b']' | b'\n')),
            target: Finder::new(|bytes, idx| {
                bytes[idx] == b']' || bytes[idx].is_ascii_whitespace()
            }),
            paren: Finder::new(|bytes, idx| matches!(bytes[idx], b')' | b'\n')),
            brace: Finder::new(|bytes, idx| matches!(bytes[idx], b'}' | b'\n')),
            anchor: Finder::new(|bytes, idx| {
                bytes[idx] == b'\n' || starts_with_ignore_case(bytes, idx, b"</a>")
            }),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TagName {
    Bold,
    Italic,
    Strike,
    Underline,
    Tn,
    Spoiler,
    Code,
    NoDText,
    Quote,
    Expand,
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableHeader,
    TableData,
    Hr,
}

fn tag_name(name: &[u8]) -> Option<TagName> {
    let name = name.to_ascii_lowercase();
    let tag = match name.as_slice() {
        b"b" | b"strong" => TagName::Bold,
        b"i" | b"em" => TagName::Italic,
        b"s" => TagName::Strike,
        b"u" => TagName::Underline,
        b"tn" => TagName::Tn,
        b"spoiler" | b"spoilers" => TagName::Spoiler,
        b"code" => TagName::Code,
        b"nodtext" => TagName::NoDText,
        b"quote" => TagName::Quote,
        b"expand" => TagName::Expand,
        b"table" => TagName::Table,
        b"thead" => TagName::TableHead,
        b"tbody" => TagName::TableBody,
        b"tr" => TagName::TableRow,
        b"th" => TagName::TableHeader,
        b"td" => TagName::TableData,
        b"hr" => TagName::Hr,
        _ => return None,
    };
    Some(tag)
}

/// A bracket (`[b]`) or angle (`<b>`) tag without attributes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Tag {
    pub name: TagName,
    pub closing: bool,
    pub end: usize,
}

pub(crate) fn match_tag(bytes: &[u8], pos: usize) -> Option<Tag> {
    let close = match bytes.get(pos)? {
        b'[' => b']',
        b'<' => b'>',
        _ => return None,
    };
    let mut cursor = pos + 1;
    let closing = bytes.get(cursor) == Some(&b'/');
    if closing {
        cursor += 1;
    }
    let name_len = bytes[cursor..]
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    let name = tag_name(&bytes[cursor..cursor + name_len])?;
    cursor += name_len;
    if bytes.get(cursor) != Some(&close) {
        return None;
    }
    Some(Tag {
        name,
        closing,
        end: cursor + 1,
    })
}

/// `[expand]`, `[expand=title]`, `[expand title]` and the angle forms.
/// Returns the title range, if any, and the end of the tag.
pub(crate) fn match_expand_open(
    bytes: &[u8],
    pos: usize,
    delims: &mut Delimiters,
) -> Option<(Option<Range<usize>>, usize)> {
    let (close, finder) = match bytes.get(pos)? {
        b'[' => (b']', &mut delims.bracket),
        b'<' => (b'>', &mut delims.angle),
        _ => return None,
    };
    if !starts_with_ignore_case(bytes, pos + 1, b"expand") {
        return None;
    }
    let mut cursor = pos + 7;
    if bytes.get(cursor) == Some(&close) {
        return Some((None, cursor + 1));
    }
    let after_blanks = skip_blanks(bytes, cursor);
    if bytes.get(after_blanks) == Some(&b'=') {
        cursor = skip_blanks(bytes, after_blanks + 1);
    } else if after_blanks > cursor {
        cursor = after_blanks;
    } else {
        return None;
    }
    let end = finder.find(bytes, cursor)?;
    if bytes[end] != close {
        return None;
    }
    Some((Some(cursor..end), end + 1))
}

/// First `[/name]` or `</name>` at or after `from`, as (start, end).
pub(crate) fn find_closing_tag(bytes: &[u8], from: usize, name: TagName) -> Option<(usize, usize)> {
    (from..bytes.len())
        .filter(|&idx| matches!(bytes[idx], b'[' | b'<'))
        .find_map(|idx| match match_tag(bytes, idx) {
            Some(tag) if tag.closing && tag.name == name => Some((idx, tag.end)),
            _ => None,
        })
}
