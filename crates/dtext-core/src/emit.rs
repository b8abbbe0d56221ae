use crate::ast::{Block, BlockKind, Document, EmphasisKind, Inline, InlineKind, Node};
use crate::escape::push_escaped;
use crate::id_link::id_link_css_class;

const EXTERNAL_REL: &str = "rel=\"external nofollow noreferrer\" ";

/// Emits HTML for a parsed document. All text and attribute values are
/// escaped; no other sanitization is needed.
pub fn emit_html(document: &Document) -> String {
    let mut writer = HtmlWriter::new();
    writer.nodes(&document.nodes);
    writer.finish()
}

struct HtmlWriter {
    out: String,
}

impl HtmlWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn raw(&mut self, html: &str) {
        self.out.push_str(html);
    }

    fn text(&mut self, text: &str) {
        push_escaped(&mut self.out, text);
    }

    fn finish(self) -> String {
        self.out
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Block(block) => self.block(block),
                Node::Inline(inline) => self.inline(inline),
            }
        }
    }

    fn wrap(&mut self, open: &str, nodes: &[Node], close: &str) {
        self.raw(open);
        self.nodes(nodes);
        self.raw(close);
    }

    fn block(&mut self, block: &Block) {
        let children = &block.children;
        match &block.kind {
            BlockKind::Paragraph => self.wrap("<p>", children, "</p>"),
            BlockKind::TnNote => self.wrap("<p class=\"tn\">", children, "</p>"),
            BlockKind::Header { level, id } => {
                match id {
                    Some(id) => {
                        self.raw(&format!("<h{level} id=\"dtext-"));
                        self.text(id);
                        self.raw("\">");
                    }
                    None => self.raw(&format!("<h{level}>")),
                }
                self.nodes(children);
                self.raw(&format!("</h{level}>"));
            }
            BlockKind::List => self.wrap("<ul>", children, "</ul>"),
            BlockKind::ListItem => self.wrap("<li>", children, "</li>"),
            BlockKind::Quote => self.wrap("<blockquote>", children, "</blockquote>"),
            BlockKind::Spoiler => self.wrap("<div class=\"spoiler\">", children, "</div>"),
            BlockKind::Expand { title } => {
                self.raw("<details><summary>");
                self.text(title);
                self.wrap("</summary><div>", children, "</div></details>");
            }
            BlockKind::CodeBlock(code) => {
                self.raw("<pre>");
                self.text(code);
                self.raw("</pre>");
            }
            BlockKind::NoDText(text) => {
                self.raw("<p>");
                self.text(text);
                self.raw("</p>");
            }
            BlockKind::Table => self.wrap("<table class=\"striped\">", children, "</table>"),
            BlockKind::TableHead => self.wrap("<thead>", children, "</thead>"),
            BlockKind::TableBody => self.wrap("<tbody>", children, "</tbody>"),
            BlockKind::TableRow => self.wrap("<tr>", children, "</tr>"),
            BlockKind::TableCell { header: true } => self.wrap("<th>", children, "</th>"),
            BlockKind::TableCell { header: false } => self.wrap("<td>", children, "</td>"),
            BlockKind::HorizontalRule => self.raw("<hr>"),
        }
    }

    fn inline(&mut self, inline: &Inline) {
        match &inline.kind {
            InlineKind::Text(text) => self.text(text),
            InlineKind::LineBreak => self.raw("<br>"),
            InlineKind::Emphasis { kind, children } => {
                let (open, close) = match kind {
                    EmphasisKind::Bold => ("<strong>", "</strong>"),
                    EmphasisKind::Italic => ("<em>", "</em>"),
                    EmphasisKind::Underline => ("<u>", "</u>"),
                    EmphasisKind::Strikethrough => ("<s>", "</s>"),
                    EmphasisKind::Spoiler => ("<span class=\"spoiler\">", "</span>"),
                    EmphasisKind::Tn => ("<span class=\"tn\">", "</span>"),
                };
                self.wrap(open, children, close);
            }
            InlineKind::Code(code) => {
                self.raw("<code>");
                self.text(code);
                self.raw("</code>");
            }
            InlineKind::Link {
                href,
                external,
                named,
                children,
            } => {
                let class = match (external, named) {
                    (false, _) => "dtext-link",
                    (true, false) => "dtext-link dtext-external-link",
                    (true, true) => "dtext-link dtext-external-link dtext-named-external-link",
                };
                self.anchor(*external, class, href);
                self.wrap("", children, "</a>");
            }
            InlineKind::Mention { name, href } => {
                self.raw("<a class=\"dtext-link dtext-user-mention-link\" data-user-name=\"");
                self.text(name);
                self.raw("\" href=\"");
                self.text(href);
                self.raw("\">@");
                self.text(name);
                self.raw("</a>");
            }
            InlineKind::WikiLink { href, label } => {
                self.anchor(false, "dtext-link dtext-wiki-link", href);
                self.text(label);
                self.raw("</a>");
            }
            InlineKind::SearchLink { href, label } => {
                self.anchor(false, "dtext-link dtext-post-search-link", href);
                self.text(label);
                self.raw("</a>");
            }
            InlineKind::IdLink {
                href,
                class,
                external,
                label,
            } => {
                self.anchor(*external, &id_link_css_class(class), href);
                self.text(label);
                self.raw("</a>");
            }
        }
    }

    /// Writes an opening `<a>` tag.
    fn anchor(&mut self, external: bool, class: &str, href: &str) {
        self.raw("<a ");
        if external {
            self.raw(EXTERNAL_REL);
        }
        self.raw("class=\"");
        self.raw(class);
        self.raw("\" href=\"");
        self.text(href);
        self.raw("\">");
    }
}
