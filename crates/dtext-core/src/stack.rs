use crate::ast::{Block, BlockKind, Children, EmphasisKind, Inline, InlineKind, Node};
use crate::error::{DTextError, DTextResult};
use crate::span::Span;

/// Ceiling on simultaneously open elements and on unbroken list runs.
pub const MAX_STACK_DEPTH: usize = 512;

/// An element that is still open and collecting children.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Element {
    Paragraph,
    Header { level: u8, id: Option<String> },
    List,
    ListItem,
    Quote,
    BlockSpoiler,
    Expand { title: String },
    TnBlock,
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableCell { header: bool },
    Inline(EmphasisKind),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ElementClass {
    Inline,
    Paragraph,
    Header,
    List,
    ListItem,
    /// Quote, spoiler, expand and translator-note blocks.
    Container,
    TableStructure,
    TableCell,
}

impl Element {
    pub(crate) fn class(&self) -> ElementClass {
        match self {
            Element::Inline(_) => ElementClass::Inline,
            Element::Paragraph => ElementClass::Paragraph,
            Element::Header { .. } => ElementClass::Header,
            Element::List => ElementClass::List,
            Element::ListItem => ElementClass::ListItem,
            Element::Quote | Element::BlockSpoiler | Element::Expand { .. } | Element::TnBlock => {
                ElementClass::Container
            }
            Element::Table | Element::TableHead | Element::TableBody | Element::TableRow => {
                ElementClass::TableStructure
            }
            Element::TableCell { .. } => ElementClass::TableCell,
        }
    }

    fn into_node(self, span: Span, children: Children) -> Node {
        let kind = match self {
            Element::Inline(kind) => {
                return Node::Inline(Inline {
                    span,
                    kind: InlineKind::Emphasis { kind, children },
                });
            }
            Element::Paragraph => BlockKind::Paragraph,
            Element::Header { level, id } => BlockKind::Header { level, id },
            Element::List => BlockKind::List,
            Element::ListItem => BlockKind::ListItem,
            Element::Quote => BlockKind::Quote,
            Element::BlockSpoiler => BlockKind::Spoiler,
            Element::Expand { title } => BlockKind::Expand { title },
            Element::TnBlock => BlockKind::TnNote,
            Element::Table => BlockKind::Table,
            Element::TableHead => BlockKind::TableHead,
            Element::TableBody => BlockKind::TableBody,
            Element::TableRow => BlockKind::TableRow,
            Element::TableCell { header } => BlockKind::TableCell { header },
        };
        Node::Block(Block {
            span,
            kind,
            children,
        })
    }
}

#[derive(Debug)]
struct Frame {
    element: Element,
    start: usize,
    children: Children,
}

/// The open-element stack. Popping a frame turns it into a finished node
/// appended to its parent, or to the document root when nothing is open.
#[derive(Debug, Default)]
pub(crate) struct ElementStack {
    frames: Vec<Frame>,
    root: Children,
}

impl ElementStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, element: Element, start: usize) -> DTextResult<()> {
        if self.frames.len() >= MAX_STACK_DEPTH {
            return Err(DTextError::NestingLimitExceeded {
                max_depth: MAX_STACK_DEPTH,
            });
        }
        self.frames.push(Frame {
            element,
            start,
            children: Vec::new(),
        });
        Ok(())
    }

    pub(crate) fn pop(&mut self, end: usize) -> Option<ElementClass> {
        let frame = self.frames.pop()?;
        let class = frame.element.class();
        let span = Span::new(frame.start, end.max(frame.start));
        let node = frame.element.into_node(span, frame.children);
        self.current_children().push(node);
        Some(class)
    }

    pub(crate) fn top(&self) -> Option<&Element> {
        self.frames.last().map(|frame| &frame.element)
    }

    pub(crate) fn top_class(&self) -> Option<ElementClass> {
        self.top().map(Element::class)
    }

    pub(crate) fn contains(&self, pred: impl Fn(&Element) -> bool) -> bool {
        self.frames.iter().any(|frame| pred(&frame.element))
    }

    pub(crate) fn count(&self, pred: impl Fn(&Element) -> bool) -> usize {
        self.frames.iter().filter(|frame| pred(&frame.element)).count()
    }

    /// Class of the innermost element that is not an inline span.
    pub(crate) fn innermost_block(&self) -> Option<ElementClass> {
        self.frames
            .iter()
            .rev()
            .map(|frame| frame.element.class())
            .find(|class| *class != ElementClass::Inline)
    }

    fn current_children(&mut self) -> &mut Children {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    /// Appends a finished node, merging adjacent text runs.
    pub(crate) fn append(&mut self, node: Node) {
        let children = self.current_children();
        if let Node::Inline(Inline {
            span,
            kind: InlineKind::Text(text),
        }) = &node
            && let Some(Node::Inline(Inline {
                span: prev_span,
                kind: InlineKind::Text(prev),
            })) = children.last_mut()
            && prev_span.end == span.start
        {
            prev.push_str(text);
            prev_span.end = span.end;
            return;
        }
        children.push(node);
    }

    pub(crate) fn append_text(&mut self, text: &str, span: Span) {
        if text.is_empty() {
            return;
        }
        self.append(Node::Inline(Inline {
            span,
            kind: InlineKind::Text(text.to_string()),
        }));
    }

    /// Removes the trailing ASCII word from a text node that ends exactly at
    /// `end` and returns where the removed word started.
    pub(crate) fn take_word_before(&mut self, end: usize) -> Option<usize> {
        let children = self.current_children();
        let Some(Node::Inline(Inline {
            span,
            kind: InlineKind::Text(text),
        })) = children.last_mut()
        else {
            return None;
        };
        if span.end != end {
            return None;
        }
        let word = text
            .bytes()
            .rev()
            .take_while(u8::is_ascii_alphanumeric)
            .count();
        if word == 0 {
            return None;
        }
        text.truncate(text.len() - word);
        span.end -= word;
        let start = span.end;
        if text.is_empty() {
            children.pop();
        }
        Some(start)
    }

    pub(crate) fn finish(mut self, end: usize) -> Children {
        while self.pop(end).is_some() {}
        self.root
    }
}
