//! Rescoping of extracted rules under a container selector.

use super::rules::{block_start, split_selectors};
use crate::url::resolve;

/// One extracted rule, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleRule {
    /// `@media`, `@import`, `@font-face`, ...: passed through as is.
    AtRule(String),
    Plain {
        selectors: Vec<String>,
        block: String,
        /// The scope selector this rule has already been prefixed with.
        scoped_under: Option<String>,
    },
}

impl StyleRule {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with('@') {
            return StyleRule::AtRule(raw.to_string());
        }
        let split = block_start(raw).unwrap_or(raw.len());
        StyleRule::Plain {
            selectors: split_selectors(&raw[..split]).into_iter().map(str::to_string).collect(),
            block: raw[split..].to_string(),
            scoped_under: None,
        }
    }

    /// Prefixes every selector with `scope`. A rule already scoped under the
    /// same selector is left alone.
    pub fn scope(&mut self, scope: &str) {
        if let StyleRule::Plain {
            selectors,
            scoped_under,
            ..
        } = self
        {
            if scoped_under.as_deref() == Some(scope) {
                return;
            }
            for selector in selectors.iter_mut() {
                *selector = format!("{} {}", scope, selector);
            }
            *scoped_under = Some(scope.to_string());
        }
    }

    pub fn rewrite_urls(&mut self, base_url: &str) {
        match self {
            StyleRule::AtRule(text) => *text = absolutize_urls(text, base_url),
            StyleRule::Plain { block, .. } => *block = absolutize_urls(block, base_url),
        }
    }

    pub fn to_css(&self) -> String {
        match self {
            StyleRule::AtRule(text) => text.clone(),
            StyleRule::Plain { selectors, block, .. } => format!("{} {}", selectors.join(", "), block),
        }
    }
}

/// A style sheet as an ordered list of rules; scoping it twice under the same
/// selector is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ScopedSheet {
    pub rules: Vec<StyleRule>,
    urls_resolved_against: Option<String>,
}

impl ScopedSheet {
    pub fn from_raw<S: AsRef<str>>(raw_rules: &[S]) -> Self {
        Self {
            rules: raw_rules.iter().map(|r| StyleRule::parse(r.as_ref())).collect(),
            urls_resolved_against: None,
        }
    }

    pub fn scope(&mut self, scope_selector: &str, base_url: &str) {
        let resolve_urls = self.urls_resolved_against.as_deref() != Some(base_url);
        for rule in &mut self.rules {
            if resolve_urls {
                rule.rewrite_urls(base_url);
            }
            rule.scope(scope_selector);
        }
        self.urls_resolved_against = Some(base_url.to_string());
    }

    pub fn to_css(&self) -> String {
        self.rules.iter().map(StyleRule::to_css).collect::<Vec<_>>().join("\n")
    }
}

/// Scopes raw rules under `scope_selector` and makes their `url()`
/// references absolute against `base_url`. Rules are joined by newlines.
pub fn scope<S: AsRef<str>>(rules: &[S], scope_selector: &str, base_url: &str) -> String {
    let mut sheet = ScopedSheet::from_raw(rules);
    sheet.scope(scope_selector, base_url);
    sheet.to_css()
}

/// Resolves the target of every `url(...)` in `css` against `base_url`.
///
/// Handles `url("...")`, `url('...')` and unquoted `url(...)`, the latter
/// ending at whitespace or `)`.
pub fn absolutize_urls(css: &str, base_url: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;

    while let Some(found) = find_url_function(rest) {
        let after_paren = found + 4;
        let args = &rest[after_paren..];
        let trimmed = args.trim_start();
        let lead = args.len() - trimmed.len();

        let (value_start, value_len) = match trimmed.chars().next() {
            Some(q @ ('"' | '\'')) => match trimmed[1..].find(q) {
                Some(len) => (lead + 1, len),
                None => (lead + 1, trimmed.len() - 1),
            },
            Some(')') | None => (lead, 0),
            Some(_) => {
                let len = trimmed
                    .find(|c: char| c.is_whitespace() || c == ')')
                    .unwrap_or(trimmed.len());
                (lead, len)
            }
        };

        out.push_str(&rest[..after_paren + value_start]);
        let value = &args[value_start..value_start + value_len];
        if value.is_empty() {
            out.push_str(value);
        } else {
            out.push_str(&resolve(value, base_url));
        }
        rest = &args[value_start + value_len..];
    }

    out.push_str(rest);
    out
}

/// Byte offset of the next `url(` that starts a word.
fn find_url_function(text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = text[from..].find("url(") {
        let pos = from + offset;
        let word_start = text[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '-'));
        if word_start {
            return Some(pos);
        }
        from = pos + 4;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::rules::extract_rules;

    #[test]
    fn test_scope_prefixes_every_selector_once() {
        let css = scope(&["h1, h2 {color: red}", ".slide li{margin:0}"], "#slides", "http://x/");
        assert_eq!(css, "#slides h1, #slides h2 {color: red}\n#slides .slide li {margin:0}");
    }

    #[test]
    fn test_at_rules_pass_through() {
        let body = "@media print { .a { color: black } }";
        assert_eq!(scope(&[body], "#slides", "http://x/"), body);
    }

    #[test]
    fn test_urls_in_all_three_forms() {
        let css = "a{background: url(\"img/a.png\")} b{background:url( 'b.png' )} c{background:url(c.png) no-repeat}";
        let out = absolutize_urls(css, "http://h/deck/index.html");
        assert_eq!(
            out,
            "a{background: url(\"http://h/deck/img/a.png\")} b{background:url( 'http://h/deck/b.png' )} c{background:url(http://h/deck/c.png) no-repeat}"
        );
    }

    #[test]
    fn test_url_rewriting_leaves_absolute_and_empty_alone() {
        let css = "x{a:url(data:image/gif;base64,R0l) b:url() c:myurl(d.png)}";
        assert_eq!(absolutize_urls(css, "http://h/"), css);
    }

    #[test]
    fn test_at_rule_urls_are_rewritten() {
        let out = scope(&["@font-face { src: url(f.woff) }"], "#slides", "http://h/d/");
        assert_eq!(out, "@font-face { src: url(http://h/d/f.woff) }");
    }

    #[test]
    fn test_rescoping_a_sheet_is_idempotent() {
        let raw = extract_rules("p, q { x: 1 } @media screen { r { y: 2 } }");
        let mut sheet = ScopedSheet::from_raw(&raw);
        sheet.scope("#slides", "http://h/");
        let once = sheet.to_css();
        sheet.scope("#slides", "http://h/");
        assert_eq!(sheet.to_css(), once);
        assert_eq!(once, "#slides p, #slides q { x: 1 }\n@media screen { r { y: 2 } }");
    }
}
