//! Top-level rule extraction.
//!
//! A small scanner over the style text: comments are removed first, then the
//! text is cut into top-level at-rules and plain rules. Blocks are matched by
//! brace depth, skipping braces inside quoted strings, so nested at-rule
//! bodies come out whole.

/// Removes `/* ... */` comments. An unterminated comment runs to the end.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Splits a style sheet into the text of its top-level rules and at-rules.
///
/// Text that is neither (stray `}` or `;`, an unterminated block at the end)
/// is dropped.
pub fn extract_rules(style_text: &str) -> Vec<String> {
    let text = strip_comments(style_text);
    let mut scanner = Scanner::new(&text);
    let mut rules = Vec::new();

    while let Some(start) = scanner.skip_whitespace() {
        match scanner.peek() {
            Some('@') => {
                if let Some(end) = scanner.at_rule_end() {
                    rules.push(text[start..end].to_string());
                }
            }
            Some('{') | Some('}') | Some(';') => {
                scanner.bump();
            }
            Some(_) => {
                if let Some(end) = scanner.plain_rule_end() {
                    rules.push(text[start..end].to_string());
                }
            }
            None => break,
        }
    }

    rules
}

/// Returns the byte offset of the first `{` that is not inside a string or
/// parentheses, if any.
pub fn block_start(rule: &str) -> Option<usize> {
    let mut scanner = Scanner::new(rule);
    let mut parens = 0usize;
    while let Some((pos, c)) = scanner.next_char() {
        match c {
            '"' | '\'' => scanner.skip_string(c),
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            '{' if parens == 0 => return Some(pos),
            _ => {}
        }
    }
    None
}

/// Splits a selector list on commas that are outside brackets, parentheses
/// and strings.
pub fn split_selectors(selectors: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut scanner = Scanner::new(selectors);
    let mut depth = 0usize;
    let mut last = 0;
    while let Some((pos, c)) = scanner.next_char() {
        match c {
            '"' | '\'' => scanner.skip_string(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(selectors[last..pos].trim());
                last = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(selectors[last..].trim());
    parts.retain(|s| !s.is_empty());
    parts
}

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn next_char(&mut self) -> Option<(usize, char)> {
        let pos = self.pos;
        self.bump().map(|c| (pos, c))
    }

    /// Advances past whitespace; returns the new position unless at the end.
    fn skip_whitespace(&mut self) -> Option<usize> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        if self.pos < self.text.len() { Some(self.pos) } else { None }
    }

    /// Skips to just after the closing quote. A backslash escapes the next
    /// character.
    fn skip_string(&mut self, quote: char) {
        while let Some(c) = self.bump() {
            if c == '\\' {
                self.bump();
            } else if c == quote {
                return;
            }
        }
    }

    /// Positioned just after an opening `{`; returns the offset after the
    /// matching `}`.
    fn block_end(&mut self) -> Option<usize> {
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            match c {
                '"' | '\'' => self.skip_string(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(self.pos);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// `@name prelude ;` or `@name prelude { ... }`.
    fn at_rule_end(&mut self) -> Option<usize> {
        self.bump();
        while let Some(c) = self.bump() {
            match c {
                '"' | '\'' => self.skip_string(c),
                ';' => return Some(self.pos),
                '{' => return self.block_end(),
                _ => {}
            }
        }
        None
    }

    /// `selectors { ... }`. A selector run interrupted by `@`, `;` or `}`
    /// is discarded and scanning resumes at the interrupting character.
    fn plain_rule_end(&mut self) -> Option<usize> {
        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' => {
                    self.bump();
                    self.skip_string(c);
                }
                '{' => {
                    self.bump();
                    return self.block_end();
                }
                '@' | ';' | '}' => return None,
                _ => {
                    self.bump();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(s: &str) -> bool {
        s.matches('{').count() == s.matches('}').count()
    }

    #[test]
    fn test_plain_rules_and_comments() {
        let rules = extract_rules("/* head */ h1 { color: red } /* x { */ p, li {margin: 0}");
        assert_eq!(rules, vec!["h1 { color: red }", "p, li {margin: 0}"]);
    }

    #[test]
    fn test_nested_at_rule_captured_whole() {
        let css = "@media (min-width: 40em) { .a { x: 1 } @supports (display: grid) { .b { y: 2 } } } .c {z: 3}";
        let rules = extract_rules(css);
        assert_eq!(rules.len(), 2);
        assert!(rules[0].starts_with("@media"));
        assert!(rules[0].ends_with("} } }"));
        assert_eq!(rules[1], ".c {z: 3}");
        assert!(rules.iter().all(|r| balanced(r)));
    }

    #[test]
    fn test_statement_at_rule_ends_at_semicolon() {
        let rules = extract_rules("@import url(\"a.css\");\n@charset \"utf-8\"; .a{b:c}");
        assert_eq!(rules, vec!["@import url(\"a.css\");", "@charset \"utf-8\";", ".a{b:c}"]);
    }

    #[test]
    fn test_braces_in_strings_do_not_count() {
        let rules = extract_rules(".q::before { content: \"}\" } .r { content: '{' }");
        assert_eq!(rules, vec![".q::before { content: \"}\" }", ".r { content: '{' }"]);
    }

    #[test]
    fn test_stray_text_is_dropped() {
        let rules = extract_rules("} ; .a {b: c} .unterminated { d: e");
        assert_eq!(rules, vec![".a {b: c}"]);
    }

    #[test]
    fn test_block_start_ignores_parentheses() {
        assert_eq!(block_start("a {b}"), Some(2));
        assert_eq!(block_start("a[title='{'] {b}"), Some(13));
        assert_eq!(block_start("no block"), None);
    }

    #[test]
    fn test_split_selectors_respects_nesting() {
        assert_eq!(split_selectors("h1, h2 ,h3"), vec!["h1", "h2", "h3"]);
        assert_eq!(split_selectors(":is(a, b) > c, [data-x=\"1,2\"]"), vec![":is(a, b) > c", "[data-x=\"1,2\"]"]);
    }
}
