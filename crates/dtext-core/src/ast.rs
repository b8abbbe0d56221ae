use crate::span::Span;

pub type Children = Vec<Node>;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub span: Span,
    pub nodes: Children,
}

/// Blocks and inlines share one child list: unclosed inline elements can end
/// up wrapping block content, and that nesting is reproduced as written.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Block(Block),
    Inline(Inline),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Block(block) => block.span,
            Node::Inline(inline) => inline.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub kind: BlockKind,
    pub children: Children,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockKind {
    Paragraph,
    Header { level: u8, id: Option<String> },
    List,
    ListItem,
    Quote,
    Spoiler,
    Expand { title: String },
    CodeBlock(String),
    NoDText(String),
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableCell { header: bool },
    HorizontalRule,
    TnNote,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Inline {
    pub span: Span,
    pub kind: InlineKind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EmphasisKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    Tn,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InlineKind {
    Text(String),
    LineBreak,
    Emphasis {
        kind: EmphasisKind,
        children: Children,
    },
    Code(String),
    Link {
        href: String,
        external: bool,
        named: bool,
        children: Children,
    },
    Mention {
        name: String,
        href: String,
    },
    WikiLink {
        href: String,
        label: String,
    },
    SearchLink {
        href: String,
        label: String,
    },
    IdLink {
        href: String,
        class: &'static str,
        external: bool,
        label: String,
    },
}
