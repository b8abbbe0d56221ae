use crate::ast::{Block, BlockKind, Document, Inline, InlineKind, Node};
use crate::error::{DTextError, DTextResult};
use crate::options::ParseOptions;
use crate::scanner::{Delimiters, validate};
use crate::span::Span;
use crate::stack::{Element, ElementClass, ElementStack, MAX_STACK_DEPTH};

/// Which engine consumes input at the current position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    Block,
    Inline,
    Table,
}

/// Outcome of one inline step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Flow {
    Continue,
    /// Hand control back to the structural engine.
    Return(Mode),
    /// The rest of the input has been consumed.
    Stop,
}

/// Parses validated text into a document tree.
pub fn parse(src: &str, options: &ParseOptions) -> DTextResult<Document> {
    validate(src.as_bytes())?;
    let src = if options.inline {
        src.strip_suffix("\r\n")
            .or_else(|| src.strip_suffix('\n'))
            .unwrap_or(src)
    } else {
        src
    };
    let mut parser = Parser::new(src, options);
    parser.run()?;
    let nodes = parser.stack.finish(src.len());
    Ok(Document {
        span: Span::new(0, src.len()),
        nodes,
    })
}

pub(crate) struct Parser<'a> {
    pub(crate) src: &'a str,
    pub(crate) bytes: &'a [u8],
    pub(crate) options: &'a ParseOptions,
    pub(crate) pos: usize,
    /// Start of the text run not yet appended to the tree.
    pub(crate) text_start: usize,
    pub(crate) stack: ElementStack,
    /// Set while the first line of a header is being read.
    pub(crate) header_mode: bool,
    /// List items opened since the last time no list was open.
    list_run: usize,
    pub(crate) delims: Delimiters,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            options,
            pos: 0,
            text_start: 0,
            stack: ElementStack::new(),
            header_mode: false,
            list_run: 0,
            delims: Delimiters::new(),
        }
    }

    fn run(&mut self) -> DTextResult<()> {
        let mut mode = if self.options.inline {
            Mode::Inline
        } else {
            Mode::Block
        };
        while self.pos < self.bytes.len() {
            mode = match mode {
                Mode::Block => self.block_step()?,
                Mode::Table => self.table_step()?,
                Mode::Inline => match self.inline_run()? {
                    Flow::Return(next) => next,
                    Flow::Continue => Mode::Inline,
                    Flow::Stop => break,
                },
            };
        }
        Ok(())
    }

    /// Mode to resume in after the inline engine gives up control.
    pub(crate) fn resume_mode(&self) -> Mode {
        match self.stack.top_class() {
            Some(ElementClass::TableStructure) => Mode::Table,
            _ => Mode::Block,
        }
    }

    pub(crate) fn push(&mut self, element: Element) -> DTextResult<()> {
        self.stack.push(element, self.pos)
    }

    pub(crate) fn pop(&mut self) -> Option<ElementClass> {
        let class = self.stack.pop(self.pos);
        if class == Some(ElementClass::Header) {
            self.header_mode = false;
        }
        class
    }

    /// Pops through the innermost element matching `pred`.
    pub(crate) fn close_until(&mut self, pred: impl Fn(&Element) -> bool) {
        while let Some(top) = self.stack.top() {
            let done = pred(top);
            self.pop();
            if done {
                break;
            }
        }
    }

    /// Closes through the innermost element matching `pred` when one is open,
    /// ending the closed elements at `end`.
    pub(crate) fn close_if_open(&mut self, pred: impl Fn(&Element) -> bool + Copy, end: usize) -> bool {
        if !self.stack.contains(pred) {
            return false;
        }
        self.pos = end;
        self.close_until(pred);
        true
    }

    pub(crate) fn close_all(&mut self) {
        while self.pop().is_some() {}
    }

    /// Closes inline spans, paragraphs, headers and lists up to the nearest
    /// container so that a new block can start.
    pub(crate) fn close_before_block(&mut self) {
        while let Some(
            ElementClass::Inline
            | ElementClass::Paragraph
            | ElementClass::Header
            | ElementClass::List
            | ElementClass::ListItem,
        ) = self.stack.top_class()
        {
            self.pop();
        }
        self.header_mode = false;
    }

    fn close_leaf_blocks(&mut self) {
        if self.stack.top() == Some(&Element::Paragraph) {
            self.pop();
        }
    }

    /// Opens a list item at `depth`, adjusting the number of open lists.
    pub(crate) fn open_list_item(&mut self, depth: usize) -> DTextResult<()> {
        if self.stack.top() == Some(&Element::ListItem) {
            self.pop();
        } else {
            self.close_leaf_blocks();
        }

        let is_list = |element: &Element| *element == Element::List;
        if !self.stack.contains(is_list) {
            self.list_run = 0;
        }
        self.list_run += 1;
        if self.list_run > MAX_STACK_DEPTH {
            return Err(DTextError::NestingLimitExceeded {
                max_depth: MAX_STACK_DEPTH,
            });
        }

        while self.stack.count(is_list) < depth {
            self.push(Element::List)?;
        }
        while self.stack.count(is_list) > depth {
            self.close_until(is_list);
        }
        self.push(Element::ListItem)
    }

    /// Appends the pending text run ending at the current position.
    pub(crate) fn flush_text(&mut self) {
        if self.text_start < self.pos {
            let span = Span::new(self.text_start, self.pos);
            self.stack
                .append_text(&self.src[span.start..span.end], span);
        }
        self.text_start = self.pos;
    }

    pub(crate) fn append_block(&mut self, kind: BlockKind, start: usize, end: usize) {
        self.stack.append(Node::Block(Block {
            span: Span::new(start, end),
            kind,
            children: Vec::new(),
        }));
    }

    pub(crate) fn append_inline(&mut self, kind: InlineKind, start: usize, end: usize) {
        self.stack.append(Node::Inline(Inline {
            span: Span::new(start, end),
            kind,
        }));
    }
}
