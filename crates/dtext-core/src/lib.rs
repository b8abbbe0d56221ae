mod ast;
mod block;
mod emit;
mod error;
mod escape;
mod id_link;
mod inline;
mod link;
mod options;
mod parser;
mod scanner;
mod span;
mod stack;

pub use ast::{Block, BlockKind, Children, Document, EmphasisKind, Inline, InlineKind, Node};
pub use emit::emit_html;
pub use error::{DTextError, DTextResult};
pub use escape::{encode_component, escape_html};
pub use id_link::{ID_LINK_RULES, IdLinkRule, IdPattern, SubField};
pub use options::ParseOptions;
pub use parser::parse;
pub use scanner::validate;
pub use span::Span;
pub use stack::MAX_STACK_DEPTH;

/// Renders raw input bytes to an HTML fragment.
///
/// Absent input renders to absent output. The bytes are validated before
/// anything is parsed, and any error discards the whole render.
pub fn render(input: Option<&[u8]>, options: &ParseOptions) -> DTextResult<Option<String>> {
    let Some(input) = input else {
        return Ok(None);
    };
    let src = validate(input)?;
    render_str(src, options).map(Some)
}

pub fn render_str(src: &str, options: &ParseOptions) -> DTextResult<String> {
    let document = parse(src, options)?;
    Ok(emit_html(&document))
}
