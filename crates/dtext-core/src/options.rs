/// Per-call rendering configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct ParseOptions {
    /// Render inline content only: no paragraphs or block structure.
    pub inline: bool,
    /// Prefix for site-relative links (`/posts/1` becomes `{base_url}/posts/1`).
    pub base_url: Option<String>,
    /// Host whose absolute links are treated as internal.
    pub domain: Option<String>,
    pub disable_mentions: bool,
}

impl ParseOptions {
    pub(crate) fn url_prefix(&self) -> &str {
        self.base_url.as_deref().unwrap_or("")
    }

    pub(crate) fn internal_host(&self) -> Option<&str> {
        self.domain.as_deref().filter(|domain| !domain.is_empty())
    }
}
