use crate::escape::encode_component;
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdPattern {
    Digits,
    Alphanumeric,
}

/// Optional trailing field after the id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubField {
    None,
    /// `/pN`, appended to the URL after `prefix` and kept in the label.
    Page { prefix: &'static str },
    /// `/token`, sent as `?key=` and left out of the label.
    Key,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IdLinkRule {
    pub prefix: &'static str,
    pub class: &'static str,
    pub url: &'static str,
    pub id: IdPattern,
    pub sub: SubField,
}

impl IdLinkRule {
    /// Cross-site rules point at absolute URLs and are never rebased.
    pub fn is_external(&self) -> bool {
        self.url.starts_with("https://")
    }

    pub fn css_class(&self) -> String {
        id_link_css_class(self.class)
    }
}

/// Full `class` attribute of an id link of the given kind.
pub(crate) fn id_link_css_class(kind: &str) -> String {
    format!("dtext-link dtext-id-link dtext-{kind}-id-link")
}

const fn rule(prefix: &'static str, class: &'static str, url: &'static str) -> IdLinkRule {
    IdLinkRule {
        prefix,
        class,
        url,
        id: IdPattern::Digits,
        sub: SubField::None,
    }
}

pub static ID_LINK_RULES: &[IdLinkRule] = &[
    rule("post", "post", "/posts/"),
    rule("appeal", "post-appeal", "/post_appeals/"),
    rule("flag", "post-flag", "/post_flags/"),
    rule("note", "note", "/notes/"),
    rule("forum", "forum-post", "/forum_posts/"),
    IdLinkRule {
        sub: SubField::Page { prefix: "?page=" },
        ..rule("topic", "forum-topic", "/forum_topics/")
    },
    rule("comment", "comment", "/comments/"),
    rule("pool", "pool", "/pools/"),
    rule("user", "user", "/users/"),
    rule("artist", "artist", "/artists/"),
    rule("ban", "ban", "/bans/"),
    rule("alias", "tag-alias", "/tag_aliases/"),
    rule("implication", "tag-implication", "/tag_implications/"),
    rule("favgroup", "favorite-group", "/favorite_groups/"),
    rule("mod action", "mod-action", "/mod_actions/"),
    rule("feedback", "user-feedback", "/user_feedbacks/"),
    rule("wiki", "wiki-page", "/wiki_pages/"),
    rule("modreport", "moderation-report", "/moderation_reports/"),
    IdLinkRule {
        sub: SubField::Key,
        ..rule("dmail", "dmail", "/dmails/")
    },
    rule(
        "issue",
        "github",
        "https://github.com/danbooru/danbooru/issues/",
    ),
    rule(
        "pull",
        "github-pull",
        "https://github.com/danbooru/danbooru/pull/",
    ),
    rule(
        "commit",
        "github-commit",
        "https://github.com/danbooru/danbooru/commit/",
    ),
    IdLinkRule {
        id: IdPattern::Alphanumeric,
        ..rule(
            "artstation",
            "artstation",
            "https://www.artstation.com/artwork/",
        )
    },
    rule(
        "deviantart",
        "deviantart",
        "https://www.deviantart.com/deviation/",
    ),
    rule("nijie", "nijie", "https://nijie.info/view.php?id="),
    rule("pawoo", "pawoo", "https://pawoo.net/web/statuses/"),
    IdLinkRule {
        sub: SubField::Page { prefix: "#" },
        ..rule("pixiv", "pixiv", "https://www.pixiv.net/artworks/")
    },
    rule("seiga", "seiga", "https://seiga.nicovideo.jp/seiga/im"),
    rule("twitter", "twitter", "https://twitter.com/i/web/status/"),
    rule("yandere", "yandere", "https://yande.re/post/show/"),
    rule(
        "sankaku",
        "sankaku",
        "https://chan.sankakucomplex.com/post/show/",
    ),
    rule(
        "gelbooru",
        "gelbooru",
        "https://gelbooru.com/index.php?page=post&s=view&id=",
    ),
];

/// Rules bucketed by the lowercase first byte of their prefix.
static RULES_BY_INITIAL: Lazy<HashMap<u8, Vec<&'static IdLinkRule>>> = Lazy::new(|| {
    let mut index: HashMap<u8, Vec<&'static IdLinkRule>> = HashMap::new();
    for rule in ID_LINK_RULES {
        index.entry(rule.prefix.as_bytes()[0]).or_default().push(rule);
    }
    index
});

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct IdLinkMatch {
    pub rule: &'static IdLinkRule,
    pub href: String,
    /// End of the visible label; differs from `end` when a key was consumed.
    pub label_end: usize,
    pub end: usize,
}

/// Matches `prefix #id` at `pos`. The caller guarantees the preceding
/// character is not alphanumeric.
pub(crate) fn match_id_link(src: &str, pos: usize, url_prefix: &str) -> Option<IdLinkMatch> {
    let bytes = src.as_bytes();
    let initial = bytes.get(pos)?.to_ascii_lowercase();
    let candidates = RULES_BY_INITIAL.get(&initial)?;
    candidates
        .iter()
        .find_map(|rule| match_rule(rule, bytes, pos, url_prefix))
}

fn match_rule(
    rule: &'static IdLinkRule,
    bytes: &[u8],
    pos: usize,
    url_prefix: &str,
) -> Option<IdLinkMatch> {
    let prefix = rule.prefix.as_bytes();
    let window = bytes.get(pos..pos + prefix.len())?;
    if !window.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let mut cursor = pos + prefix.len();
    if bytes.get(cursor..cursor + 2) != Some(&b" #"[..]) {
        return None;
    }
    cursor += 2;
    let id_start = cursor;
    while let Some(&b) = bytes.get(cursor) {
        let ok = match rule.id {
            IdPattern::Digits => b.is_ascii_digit(),
            IdPattern::Alphanumeric => b.is_ascii_alphanumeric(),
        };
        if !ok {
            break;
        }
        cursor += 1;
    }
    if cursor == id_start {
        return None;
    }
    let id = std::str::from_utf8(&bytes[id_start..cursor]).ok()?;
    let base = if rule.is_external() { "" } else { url_prefix };
    let mut href = format!("{base}{}{id}", rule.url);

    let mut label_end = cursor;
    match rule.sub {
        SubField::None => {}
        SubField::Page { prefix } => {
            if let Some(end) = scan_page(bytes, cursor) {
                let page = std::str::from_utf8(&bytes[cursor + 2..end]).ok()?;
                href.push_str(prefix);
                href.push_str(page);
                cursor = end;
                label_end = end;
            }
        }
        SubField::Key => {
            if let Some(end) = scan_key(bytes, cursor) {
                let key = std::str::from_utf8(&bytes[cursor + 1..end]).ok()?;
                href.push_str("?key=");
                href.push_str(&encode_component(key));
                cursor = end;
            }
        }
    }

    Some(IdLinkMatch {
        rule,
        href,
        label_end,
        end: cursor,
    })
}

fn scan_page(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos..pos + 2) != Some(&b"/p"[..]) {
        return None;
    }
    let digits = bytes[pos + 2..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    (digits > 0).then_some(pos + 2 + digits)
}

fn scan_key(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'/') {
        return None;
    }
    let len = bytes[pos + 1..]
        .iter()
        .take_while(|&&b| b.is_ascii_alphanumeric() || matches!(b, b'=' | b'_' | b'-'))
        .count();
    (len > 0).then_some(pos + 1 + len)
}
