use dtext_core::{DTextError, ParseOptions};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOptions {
    inline: Option<bool>,
    base_url: Option<String>,
    domain: Option<String>,
    disable_mentions: Option<bool>,
}

impl From<RenderOptions> for ParseOptions {
    fn from(options: RenderOptions) -> Self {
        ParseOptions {
            inline: options.inline.unwrap_or(false),
            base_url: options.base_url,
            domain: options.domain,
            disable_mentions: options.disable_mentions.unwrap_or(false),
        }
    }
}

/// Renders a DText string to HTML.
///
/// `null` and `undefined` render to `null`. Any other non-string input
/// throws a `TypeError`; invalid input throws an `Error`.
#[wasm_bindgen]
pub fn render(input: JsValue, options: JsValue) -> Result<Option<String>, JsValue> {
    if input.is_null() || input.is_undefined() {
        return Ok(None);
    }
    let Some(source) = input.as_string() else {
        let err = DTextError::Type {
            found: input.js_typeof().as_string().unwrap_or_default(),
        };
        return Err(js_sys::TypeError::new(&err.to_string()).into());
    };
    let options = options_from_js(options)?;
    dtext_core::render_str(&source, &options)
        .map(Some)
        .map_err(|err| js_sys::Error::new(&err.to_string()).into())
}

fn options_from_js(value: JsValue) -> Result<ParseOptions, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(ParseOptions::default());
    }
    let parsed: RenderOptions =
        serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(parsed.into())
}
