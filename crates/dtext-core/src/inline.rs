use crate::ast::{Children, EmphasisKind, Inline, InlineKind, Node};
use crate::block::{match_code_fence, match_hr_line, match_list_item, starts_block_container};
use crate::error::DTextResult;
use crate::id_link::match_id_link;
use crate::link::{
    NamedLink, ascii_word_len, classify_url, is_word_char_before, match_autolink,
    match_delimited_mention, match_delimited_url, match_html_link, match_markdown_link,
    match_mention, match_quoted_link, match_search_link, match_wiki_link, mention_href,
    pipe_trick, search_href, wiki_href,
};
use crate::parser::{Flow, Parser};
use crate::scanner::{
    Tag, TagName, char_at, find_closing_tag, match_expand_open, match_tag, newline_len,
    skip_blanks,
};
use crate::span::Span;
use crate::stack::{Element, ElementClass, ElementStack};
use std::ops::Range;

fn emphasis_kind(name: TagName) -> Option<EmphasisKind> {
    match name {
        TagName::Bold => Some(EmphasisKind::Bold),
        TagName::Italic => Some(EmphasisKind::Italic),
        TagName::Strike => Some(EmphasisKind::Strikethrough),
        TagName::Underline => Some(EmphasisKind::Underline),
        _ => None,
    }
}

/// Counts consecutive line terminators starting at `pos`. Lines holding only
/// blanks count too. Returns the count and the offset after the last one.
fn newline_run(bytes: &[u8], pos: usize) -> (usize, usize) {
    let mut count = 0;
    let mut cursor = pos;
    let mut end = pos;
    loop {
        let len = newline_len(bytes, cursor);
        if len == 0 {
            return (count, end);
        }
        count += 1;
        end = cursor + len;
        cursor = skip_blanks(bytes, end);
    }
}

/// Parses a link label. Only bold, italic, strike and underline tags are
/// recognized; everything else is text.
fn parse_label(src: &str, range: Range<usize>) -> DTextResult<Children> {
    let bytes = &src.as_bytes()[..range.end];
    let mut stack = ElementStack::new();
    let mut text_start = range.start;
    let mut pos = range.start;
    while pos < range.end {
        if let Some(tag) = match_tag(bytes, pos)
            && let Some(kind) = emphasis_kind(tag.name)
            && (!tag.closing || stack.top() == Some(&Element::Inline(kind)))
        {
            stack.append_text(&src[text_start..pos], Span::new(text_start, pos));
            if tag.closing {
                stack.pop(tag.end);
            } else {
                stack.push(Element::Inline(kind), pos)?;
            }
            pos = tag.end;
            text_start = pos;
            continue;
        }
        pos += char_at(src, pos).map_or(1, char::len_utf8);
    }
    stack.append_text(&src[text_start..range.end], Span::new(text_start, range.end));
    Ok(stack.finish(range.end))
}

impl Parser<'_> {
    /// Consumes inline content until a structural boundary hands control
    /// back to the block engine, or until the end of input.
    pub(crate) fn inline_run(&mut self) -> DTextResult<Flow> {
        self.text_start = self.pos;
        while self.pos < self.bytes.len() {
            let flow = self.inline_step()?;
            if flow != Flow::Continue {
                return Ok(flow);
            }
        }
        self.flush_text();
        Ok(Flow::Continue)
    }

    fn inline_step(&mut self) -> DTextResult<Flow> {
        let pos = self.pos;
        let flow = match self.bytes[pos] {
            b'\n' => Some(self.newline()?),
            b'\r' if newline_len(self.bytes, pos) == 2 => Some(self.newline()?),
            b'[' => self.bracket()?,
            b'<' => self.angle()?,
            b'"' => self.quoted_link()?,
            b'{' => self.search_link(),
            b'@' => self.mention(),
            b if b.is_ascii_alphabetic() => self.autolink().or_else(|| self.id_link()),
            _ => None,
        };
        if let Some(flow) = flow {
            return Ok(flow);
        }
        self.pos += char_at(self.src, pos).map_or(1, char::len_utf8);
        Ok(Flow::Continue)
    }

    /// Moves past a construct that has already been appended to the tree.
    fn skip_to(&mut self, end: usize) {
        self.pos = end;
        self.text_start = end;
    }

    fn fret(&self) -> Flow {
        Flow::Return(self.resume_mode())
    }

    fn newline(&mut self) -> DTextResult<Flow> {
        self.flush_text();
        let start = self.pos;
        let len = self.bytes.len();

        if self.options.inline {
            let end = start + newline_len(self.bytes, start);
            self.append_inline(InlineKind::LineBreak, start, end);
            self.skip_to(end);
            return Ok(Flow::Continue);
        }

        let (count, run_end) = newline_run(self.bytes, start);
        if let Some(flow) = self.close_after_newlines(start, run_end) {
            return Ok(flow);
        }
        if skip_blanks(self.bytes, run_end) == len {
            self.skip_to(len);
            return Ok(Flow::Continue);
        }

        if count >= 2 {
            self.close_before_block();
            if self.stack.top() == Some(&Element::TnBlock) {
                self.pop();
            }
            self.skip_to(run_end);
            return Ok(self.fret());
        }

        if self.header_mode {
            self.pop();
            self.header_mode = false;
            self.skip_to(run_end);
            return Ok(self.fret());
        }

        let bytes = self.bytes;
        if match_list_item(bytes, run_end).is_some()
            && self.stack.innermost_block() != Some(ElementClass::TableCell)
        {
            self.skip_to(run_end);
            return Ok(self.fret());
        }

        let starts_block = match_hr_line(bytes, run_end).is_some()
            || match_code_fence(bytes, run_end).is_some()
            || (self.stack.innermost_block() == Some(ElementClass::Paragraph)
                && starts_block_container(
                    bytes,
                    skip_blanks(bytes, run_end),
                    &mut self.delims,
                ));
        if starts_block {
            self.close_before_block();
            self.skip_to(run_end);
            return Ok(self.fret());
        }

        self.append_inline(InlineKind::LineBreak, start, run_end);
        self.skip_to(run_end);
        Ok(Flow::Continue)
    }

    /// A closing tag right after a run of newlines swallows the newlines.
    fn close_after_newlines(&mut self, start: usize, run_end: usize) -> Option<Flow> {
        let tag = match_tag(self.bytes, run_end).filter(|tag| tag.closing)?;
        let after = match tag.name {
            TagName::Quote => {
                self.close_if_open(|open| *open == Element::Quote, tag.end)
                    .then(|| skip_blanks(self.bytes, tag.end))?
            }
            TagName::Expand => self
                .close_if_open(|open| matches!(open, Element::Expand { .. }), tag.end)
                .then(|| skip_blanks(self.bytes, tag.end))?,
            TagName::Tn => {
                if self.stack.top() == Some(&Element::Inline(EmphasisKind::Tn)) {
                    self.pos = tag.end;
                    self.pop();
                    self.skip_to(tag.end);
                    return Some(Flow::Continue);
                }
                self.close_if_open(|open| *open == Element::TnBlock, tag.end)
                    .then_some(tag.end)?
            }
            TagName::TableData | TagName::TableHeader => {
                let header = tag.name == TagName::TableHeader;
                self.close_if_open(|open| *open == Element::TableCell { header }, tag.end)
                    .then_some(tag.end)?
            }
            TagName::Spoiler => return Some(self.close_spoiler(start, tag.end)),
            _ => return None,
        };
        self.skip_to(after);
        Some(self.fret())
    }

    /// Handles a spoiler closer found at `match_start`.
    fn close_spoiler(&mut self, match_start: usize, after: usize) -> Flow {
        self.pos = match_start;
        self.flush_text();

        let inline_spoiler = |open: &Element| *open == Element::Inline(EmphasisKind::Spoiler);
        if self.close_if_open(inline_spoiler, after) {
            self.skip_to(after);
            return Flow::Continue;
        }

        let block_open = self.stack.contains(|open| *open == Element::BlockSpoiler);
        if block_open && !self.header_mode {
            self.close_if_open(|open| *open == Element::BlockSpoiler, after);
            self.skip_to(after);
            return self.fret();
        }
        if block_open || self.options.inline {
            self.pos = after;
            return Flow::Continue;
        }

        // Nothing to close: the rest of the input is emitted as plain text
        // after everything that is open.
        let len = self.bytes.len();
        self.close_all();
        self.stack
            .append_text(&self.src[match_start..], Span::new(match_start, len));
        self.skip_to(len);
        Flow::Stop
    }

    fn bracket(&mut self) -> DTextResult<Option<Flow>> {
        if let Some(flow) = self.wiki_link() {
            return Ok(Some(flow));
        }
        if let Some(flow) = self.tag()? {
            return Ok(Some(flow));
        }
        match match_markdown_link(self.src, self.pos, &mut self.delims) {
            Some(found) => self.named_link(found).map(Some),
            None => Ok(None),
        }
    }

    fn angle(&mut self) -> DTextResult<Option<Flow>> {
        let start = self.pos;
        if let Some(found) = match_html_link(self.src, start, &mut self.delims) {
            return self.named_link(found).map(Some);
        }
        if !self.options.disable_mentions
            && let Some((name, end)) =
                match_delimited_mention(self.src, start, &mut self.delims)
        {
            return Ok(Some(self.push_mention(name, start, end)));
        }
        if let Some((url, end)) = match_delimited_url(self.src, start) {
            self.flush_text();
            return Ok(Some(self.push_url_link(url, start, end)));
        }
        self.tag()
    }

    /// Bracket or angle tags in running text.
    fn tag(&mut self) -> DTextResult<Option<Flow>> {
        let start = self.pos;
        if match_expand_open(self.bytes, start, &mut self.delims).is_some() {
            return Ok(self.block_opener());
        }
        let Some(tag) = match_tag(self.bytes, start) else {
            return Ok(None);
        };
        if tag.closing {
            return Ok(self.closing_tag(tag, start));
        }

        if let Some(kind) = emphasis_kind(tag.name) {
            return self.open_emphasis(kind, tag.end).map(Some);
        }
        match tag.name {
            TagName::Tn => self.open_emphasis(EmphasisKind::Tn, tag.end).map(Some),
            TagName::Spoiler => {
                self.open_emphasis(EmphasisKind::Spoiler, tag.end)?;
                let (count, run_end) = newline_run(self.bytes, tag.end);
                if count >= 2 {
                    self.skip_to(run_end);
                }
                Ok(Some(Flow::Continue))
            }
            TagName::Code | TagName::NoDText => {
                self.flush_text();
                let len = self.bytes.len();
                let (body_end, end) =
                    find_closing_tag(self.bytes, tag.end, tag.name).unwrap_or((len, len));
                let body = &self.src[tag.end..body_end];
                if tag.name == TagName::Code {
                    self.append_inline(InlineKind::Code(body.to_string()), start, end);
                } else {
                    self.stack.append_text(body, Span::new(tag.end, body_end));
                }
                self.skip_to(end);
                Ok(Some(Flow::Continue))
            }
            TagName::Quote | TagName::Table => Ok(self.block_opener()),
            _ => Ok(None),
        }
    }

    fn open_emphasis(&mut self, kind: EmphasisKind, end: usize) -> DTextResult<Flow> {
        self.flush_text();
        self.push(Element::Inline(kind))?;
        self.skip_to(end);
        Ok(Flow::Continue)
    }

    /// A block opener in the middle of a line ends the current block. Inside
    /// table cells and in inline mode the opener is plain text.
    fn block_opener(&mut self) -> Option<Flow> {
        if self.options.inline || self.stack.innermost_block() == Some(ElementClass::TableCell) {
            return None;
        }
        self.flush_text();
        self.close_before_block();
        Some(self.fret())
    }

    fn closing_tag(&mut self, tag: Tag, start: usize) -> Option<Flow> {
        if let Some(kind) = emphasis_kind(tag.name) {
            return self.close_emphasis(kind, tag.end);
        }
        let after = match tag.name {
            TagName::Tn => {
                if let Some(flow) = self.close_emphasis(EmphasisKind::Tn, tag.end) {
                    return Some(flow);
                }
                if self.options.inline {
                    return None;
                }
                self.close_open(|open| *open == Element::TnBlock, tag.end)?;
                tag.end
            }
            TagName::Spoiler => return Some(self.close_spoiler(start, tag.end)),
            TagName::Quote => {
                self.close_open(|open| *open == Element::Quote, tag.end)?;
                skip_blanks(self.bytes, tag.end)
            }
            TagName::Expand => {
                self.close_open(|open| matches!(open, Element::Expand { .. }), tag.end)?;
                skip_blanks(self.bytes, tag.end)
            }
            TagName::TableData | TagName::TableHeader => {
                let header = tag.name == TagName::TableHeader;
                self.close_open(|open| *open == Element::TableCell { header }, tag.end)?;
                tag.end
            }
            TagName::TableRow => {
                self.close_open(|open| *open == Element::TableRow, tag.end)?;
                tag.end
            }
            TagName::TableBody => {
                self.close_open(|open| *open == Element::TableBody, tag.end)?;
                tag.end
            }
            TagName::TableHead => {
                self.close_open(|open| *open == Element::TableHead, tag.end)?;
                tag.end
            }
            TagName::Table => {
                self.close_open(|open| *open == Element::Table, tag.end)?;
                tag.end
            }
            _ => return None,
        };
        self.skip_to(after);
        Some(self.fret())
    }

    /// Closes the innermost element matching `pred` after flushing pending
    /// text. `None` when no such element is open.
    fn close_open(&mut self, pred: impl Fn(&Element) -> bool + Copy, end: usize) -> Option<()> {
        if !self.stack.contains(pred) {
            return None;
        }
        self.flush_text();
        self.close_if_open(pred, end);
        Some(())
    }

    /// Inline close tags only close the element on top of the stack.
    fn close_emphasis(&mut self, kind: EmphasisKind, end: usize) -> Option<Flow> {
        if self.stack.top() != Some(&Element::Inline(kind)) {
            return None;
        }
        self.flush_text();
        self.pos = end;
        self.pop();
        self.skip_to(end);
        Some(Flow::Continue)
    }

    fn wiki_link(&mut self) -> Option<Flow> {
        let start = self.pos;
        let found = match_wiki_link(self.src, start)?;
        self.flush_text();
        let prefix_start = self.stack.take_word_before(start);
        let end = found.end + ascii_word_len(self.src, found.end);

        let target = &self.src[found.target.clone()];
        let mut label = String::new();
        if let Some(prefix_start) = prefix_start {
            label.push_str(&self.src[prefix_start..start]);
        }
        match found.label {
            Some(range) if !range.is_empty() => label.push_str(&self.src[range]),
            Some(_) => label.push_str(pipe_trick(target)),
            None => label.push_str(target),
        }
        label.push_str(&self.src[found.end..end]);

        let href = wiki_href(target, self.options);
        self.append_inline(
            InlineKind::WikiLink { href, label },
            prefix_start.unwrap_or(start),
            end,
        );
        self.skip_to(end);
        Some(Flow::Continue)
    }

    fn quoted_link(&mut self) -> DTextResult<Option<Flow>> {
        match match_quoted_link(self.src, self.pos, &mut self.delims) {
            Some(found) => self.named_link(found).map(Some),
            None => Ok(None),
        }
    }

    fn named_link(&mut self, found: NamedLink) -> DTextResult<Flow> {
        self.flush_text();
        let start = self.pos;
        let target = classify_url(&self.src[found.url], self.options);
        let children = parse_label(self.src, found.label)?;
        self.append_inline(
            InlineKind::Link {
                href: target.href,
                external: target.external,
                named: true,
                children,
            },
            start,
            found.end,
        );
        self.skip_to(found.end);
        Ok(Flow::Continue)
    }

    fn autolink(&mut self) -> Option<Flow> {
        let start = self.pos;
        let end = match_autolink(self.src, start)?;
        self.flush_text();
        Some(self.push_url_link(start..end, start, end))
    }

    /// A link whose label is the URL itself.
    fn push_url_link(&mut self, url: Range<usize>, start: usize, end: usize) -> Flow {
        let text = &self.src[url.clone()];
        let target = classify_url(text, self.options);
        let children = vec![Node::Inline(Inline {
            span: Span::new(url.start, url.end),
            kind: InlineKind::Text(text.to_string()),
        })];
        self.append_inline(
            InlineKind::Link {
                href: target.href,
                external: target.external,
                named: false,
                children,
            },
            start,
            end,
        );
        self.skip_to(end);
        Flow::Continue
    }

    fn mention(&mut self) -> Option<Flow> {
        if self.options.disable_mentions {
            return None;
        }
        let start = self.pos;
        let end = match_mention(self.src, start)?;
        Some(self.push_mention(start + 1..end, start, end))
    }

    fn push_mention(&mut self, name: Range<usize>, start: usize, end: usize) -> Flow {
        self.flush_text();
        let name = &self.src[name];
        let href = mention_href(name, self.options);
        self.append_inline(
            InlineKind::Mention {
                name: name.to_string(),
                href,
            },
            start,
            end,
        );
        self.skip_to(end);
        Flow::Continue
    }

    fn search_link(&mut self) -> Option<Flow> {
        let start = self.pos;
        let (query, end) = match_search_link(self.src, start, &mut self.delims)?;
        self.flush_text();
        let label = self.src[query].to_string();
        let href = search_href(&label, self.options);
        self.append_inline(InlineKind::SearchLink { href, label }, start, end);
        self.skip_to(end);
        Some(Flow::Continue)
    }

    fn id_link(&mut self) -> Option<Flow> {
        let start = self.pos;
        if is_word_char_before(self.src, start) {
            return None;
        }
        let found = match_id_link(self.src, start, self.options.url_prefix())?;
        self.flush_text();
        self.append_inline(
            InlineKind::IdLink {
                href: found.href,
                class: found.rule.class,
                external: found.rule.is_external(),
                label: self.src[start..found.label_end].to_string(),
            },
            start,
            found.end,
        );
        self.skip_to(found.end);
        Some(Flow::Continue)
    }
}
