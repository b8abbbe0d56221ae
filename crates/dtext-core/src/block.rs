use crate::ast::{BlockKind, EmphasisKind};
use crate::error::DTextResult;
use crate::parser::{Mode, Parser};
use crate::scanner::{
    Delimiters, TagName, at_line_end, char_at, find_closing_tag, match_expand_open, match_tag,
    newline_len, skip_blanks,
};
use crate::stack::Element;
use std::ops::Range;

/// `[hr]` or `<hr>` alone on its line, blanks allowed around it.
/// Returns the offset after the trailing blanks.
pub(crate) fn match_hr_line(bytes: &[u8], pos: usize) -> Option<usize> {
    let tag_pos = skip_blanks(bytes, pos);
    let tag = match_tag(bytes, tag_pos)?;
    if tag.name != TagName::Hr || tag.closing {
        return None;
    }
    let end = skip_blanks(bytes, tag.end);
    at_line_end(bytes, end).then_some(end)
}

/// A line made of exactly three backticks and optional trailing blanks.
fn fence_line(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos..pos + 3) != Some(&b"```"[..]) || bytes.get(pos + 3) == Some(&b'`') {
        return None;
    }
    let end = skip_blanks(bytes, pos + 3);
    at_line_end(bytes, end).then_some(end)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CodeFence {
    pub content: Range<usize>,
    /// End of the closing delimiter line, before its line terminator.
    pub end: usize,
}

pub(crate) fn match_code_fence(bytes: &[u8], pos: usize) -> Option<CodeFence> {
    let open_end = fence_line(bytes, pos)?;
    let newline = newline_len(bytes, open_end);
    if newline == 0 {
        return None;
    }
    let content_start = open_end + newline;
    let mut cursor = content_start;
    while let Some(offset) = bytes[cursor..].iter().position(|&b| b == b'\n') {
        let line_end = cursor + offset;
        if let Some(end) = fence_line(bytes, line_end + 1) {
            let content_end = if line_end > content_start && bytes[line_end - 1] == b'\r' {
                line_end - 1
            } else {
                line_end
            };
            return Some(CodeFence {
                content: content_start..content_end,
                end,
            });
        }
        cursor = line_end + 1;
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HeaderMatch {
    pub level: u8,
    pub id: Option<Range<usize>>,
    /// Start of the header text.
    pub end: usize,
}

/// `h1.` to `h6.`, optionally `h2#anchor.`.
pub(crate) fn match_header(bytes: &[u8], pos: usize) -> Option<HeaderMatch> {
    if !matches!(bytes.get(pos), Some(b'h' | b'H')) {
        return None;
    }
    let level = match bytes.get(pos + 1) {
        Some(&digit @ b'1'..=b'6') => digit - b'0',
        _ => return None,
    };
    let mut cursor = pos + 2;
    let mut id = None;
    if bytes.get(cursor) == Some(&b'#') {
        let start = cursor + 1;
        let len = bytes[start..]
            .iter()
            .take_while(|&&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-'))
            .count();
        if len == 0 {
            return None;
        }
        id = Some(start..start + len);
        cursor = start + len;
    }
    if bytes.get(cursor) != Some(&b'.') {
        return None;
    }
    Some(HeaderMatch {
        level,
        id,
        end: skip_blanks(bytes, cursor + 1),
    })
}

/// `*`, `**`, ... followed by blanks and some text on the same line.
/// Returns the depth and the start of the item text.
pub(crate) fn match_list_item(bytes: &[u8], pos: usize) -> Option<(usize, usize)> {
    let depth = bytes[pos..].iter().take_while(|&&b| b == b'*').count();
    if depth == 0 {
        return None;
    }
    let end = skip_blanks(bytes, pos + depth);
    if end == pos + depth || end == bytes.len() || newline_len(bytes, end) > 0 {
        return None;
    }
    Some((depth, end))
}

/// True when a `[quote]` or `[expand]` opener starts at `pos`.
pub(crate) fn starts_block_container(
    bytes: &[u8],
    pos: usize,
    delims: &mut Delimiters,
) -> bool {
    match_expand_open(bytes, pos, delims).is_some()
        || match_tag(bytes, pos).is_some_and(|tag| tag.name == TagName::Quote && !tag.closing)
}

impl Parser<'_> {
    pub(crate) fn block_step(&mut self) -> DTextResult<Mode> {
        let bytes = self.bytes;
        let start = self.pos;
        let tag_pos = skip_blanks(bytes, start);
        if tag_pos == bytes.len() {
            self.pos = tag_pos;
            return Ok(Mode::Block);
        }
        let newline = newline_len(bytes, tag_pos);
        if newline > 0 {
            self.pos = tag_pos + newline;
            return Ok(Mode::Block);
        }

        if let Some(end) = match_hr_line(bytes, start) {
            self.close_before_block();
            self.append_block(BlockKind::HorizontalRule, tag_pos, end);
            self.pos = end;
            return Ok(Mode::Block);
        }

        if let Some(fence) = match_code_fence(bytes, start) {
            self.close_before_block();
            let code = self.src[fence.content].to_string();
            self.append_block(BlockKind::CodeBlock(code), start, fence.end);
            self.pos = fence.end;
            return Ok(Mode::Block);
        }

        if let Some(header) = match_header(bytes, start) {
            self.close_before_block();
            let id = header.id.map(|range| self.src[range].to_string());
            self.push(Element::Header {
                level: header.level,
                id,
            })?;
            self.header_mode = true;
            self.pos = header.end;
            return Ok(Mode::Inline);
        }

        if let Some((depth, end)) = match_list_item(bytes, start) {
            self.open_list_item(depth)?;
            self.pos = end;
            return Ok(Mode::Inline);
        }

        if let Some(mode) = self.block_tag(start, tag_pos)? {
            return Ok(mode);
        }

        if matches!(
            self.stack.top(),
            None | Some(Element::Quote | Element::BlockSpoiler | Element::Expand { .. })
        ) {
            self.push(Element::Paragraph)?;
        }
        Ok(Mode::Inline)
    }

    /// Container openers and closers at the start of a line.
    fn block_tag(&mut self, start: usize, tag_pos: usize) -> DTextResult<Option<Mode>> {
        let bytes = self.bytes;

        if let Some((title, end)) = match_expand_open(bytes, tag_pos, &mut self.delims) {
            let title = title.map_or_else(|| "Show".to_string(), |range| self.src[range].to_string());
            self.open_container(Element::Expand { title }, tag_pos, end)?;
            return Ok(Some(Mode::Block));
        }

        let Some(tag) = match_tag(bytes, tag_pos) else {
            return Ok(None);
        };

        if tag.closing {
            let closed = match tag.name {
                TagName::Quote => self.close_if_open(|open| *open == Element::Quote, tag.end),
                TagName::Expand => {
                    self.close_if_open(|open| matches!(open, Element::Expand { .. }), tag.end)
                }
                TagName::Spoiler => {
                    // A stray spoiler closer on its own line is dropped.
                    if !self.close_if_open(|open| *open == Element::BlockSpoiler, tag.end) {
                        self.close_if_open(
                            |open| *open == Element::Inline(EmphasisKind::Spoiler),
                            tag.end,
                        );
                    }
                    true
                }
                _ => false,
            };
            if !closed {
                return Ok(None);
            }
            self.pos = skip_blanks(bytes, tag.end);
            return Ok(Some(self.resume_mode()));
        }

        let mode = match tag.name {
            TagName::Quote => {
                self.open_container(Element::Quote, tag_pos, tag.end)?;
                Mode::Block
            }
            TagName::Spoiler => {
                self.open_container(Element::BlockSpoiler, tag_pos, tag.end)?;
                Mode::Block
            }
            TagName::Tn => {
                self.open_container(Element::TnBlock, tag_pos, tag.end)?;
                Mode::Inline
            }
            TagName::Table => {
                self.open_container(Element::Table, tag_pos, tag.end)?;
                Mode::Table
            }
            TagName::Code => {
                self.close_before_block();
                let (body, end) = self.raw_body(tag.end, TagName::Code);
                let code = self.src[body].to_string();
                self.append_block(BlockKind::CodeBlock(code), tag_pos, end);
                self.pos = end;
                Mode::Block
            }
            TagName::NoDText if tag_pos == start => {
                self.close_before_block();
                let (body, end) = self.raw_body(tag.end, TagName::NoDText);
                let text = self.src[body].to_string();
                self.append_block(BlockKind::NoDText(text), tag_pos, end);
                self.pos = end;
                Mode::Block
            }
            _ => return Ok(None),
        };
        Ok(Some(mode))
    }

    fn open_container(&mut self, element: Element, tag_pos: usize, end: usize) -> DTextResult<()> {
        self.close_before_block();
        self.pos = tag_pos;
        self.push(element)?;
        self.pos = skip_blanks(self.bytes, end);
        Ok(())
    }

    /// Body of a block-level `[code]` or `[nodtext]`: one newline after the
    /// opener is dropped and the body runs to the closer or the end of input.
    fn raw_body(&self, open_end: usize, name: TagName) -> (Range<usize>, usize) {
        let body_start = open_end + newline_len(self.bytes, open_end);
        let len = self.bytes.len();
        let (body_end, end) = find_closing_tag(self.bytes, body_start, name).unwrap_or((len, len));
        (body_start..body_end, end)
    }

    pub(crate) fn table_step(&mut self) -> DTextResult<Mode> {
        let Some(tag) = match_tag(self.bytes, self.pos) else {
            self.pos += char_at(self.src, self.pos).map_or(1, char::len_utf8);
            return Ok(Mode::Table);
        };

        let structure = match tag.name {
            TagName::TableHead => Element::TableHead,
            TagName::TableBody => Element::TableBody,
            TagName::TableRow => Element::TableRow,
            TagName::TableHeader | TagName::TableData if !tag.closing => {
                let header = tag.name == TagName::TableHeader;
                self.push(Element::TableCell { header })?;
                self.pos = tag.end;
                return Ok(Mode::Inline);
            }
            TagName::Table if tag.closing => {
                self.pos = tag.end;
                self.close_until(|open| *open == Element::Table);
                return Ok(self.resume_mode());
            }
            _ => {
                self.pos += 1;
                return Ok(Mode::Table);
            }
        };

        if tag.closing {
            self.close_if_open(|open| *open == structure, tag.end);
        } else {
            self.push(structure)?;
        }
        self.pos = tag.end;
        Ok(Mode::Table)
    }
}
