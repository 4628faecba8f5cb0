//! Chat markdown to plain text, one line at a time.
//!
//! Line-leading block markers (headings, quotes, list bullets, rules) are
//! dropped. Inline emphasis, strike, code and link markup keep only their
//! text. A backslash escape yields the literal character. Text inside code
//! spans is left as written.

use regex::{Captures, Regex};

/// Escaped ASCII punctuation is parked in plane 15 while the inline rules run.
const PARK: u32 = 0xF0000;

fn park(text: &str) -> String {
    text.chars()
        .map(|c| char::from_u32(PARK + c as u32).unwrap_or(c))
        .collect()
}

fn unpark(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            u if (PARK..PARK + 0x80).contains(&u) => char::from_u32(u - PARK).unwrap_or(c),
            _ => c,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct MarkdownStripper {
    escape: Regex,
    rule: Regex,
    heading: Regex,
    quote: Regex,
    bullet: Regex,
    code: Regex,
    /// Applied in order; each keeps its first group.
    inline: Vec<Regex>,
}

impl MarkdownStripper {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            escape: Regex::new(r"\\([\\`*_{}\[\]()#+\-.!~>|<])")?,
            rule: Regex::new(r"^ {0,3}(?:(?:\* *){3,}|(?:- *){3,}|(?:_ *){3,})$")?,
            heading: Regex::new(r"^ {0,3}#{1,6}(?: +|$)(.*?)(?: +#+)? *$")?,
            quote: Regex::new(r"^ {0,3}(?:> ?)+")?,
            bullet: Regex::new(r"^ *(?:[*+-]|\d+\.) +")?,
            code: Regex::new(r"```([^`]+)```|``([^`]+)``|`([^`]+)`")?,
            inline: vec![
                Regex::new(r#"\[([^\]]*)\]\([^)\s]*(?: +"[^"]*")?\)"#)?,
                Regex::new(r"<((?:https?|mailto):[^>\s]+)>")?,
                Regex::new(r"\*\*(.+?)\*\*")?,
                Regex::new(r"__(.+?)__")?,
                Regex::new(r"~~(.+?)~~")?,
                Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*")?,
                Regex::new(r"\b_([^_\s](?:[^_]*[^_\s])?)_\b")?,
            ],
        })
    }

    /// Plain text of `markdown`, keeping its line structure.
    pub fn strip(&self, markdown: &str) -> String {
        markdown
            .split('\n')
            .map(|line| self.line(line.strip_suffix('\r').unwrap_or(line)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line(&self, line: &str) -> String {
        let parked = self.escape.replace_all(line, |c: &Captures| park(&c[1]));
        if self.rule.is_match(&parked) {
            return String::new();
        }
        let body = match self.heading.captures(&parked) {
            Some(c) => c.get(1).map_or("", |m| m.as_str()).to_string(),
            None => parked.to_string(),
        };
        let body = self.quote.replace(&body, "");
        let body = self.bullet.replace(&body, "");

        let mut out = String::with_capacity(body.len());
        let mut last = 0;
        for caps in self.code.captures_iter(&body) {
            let Some(span) = caps.get(0) else {
                continue;
            };
            out.push_str(&self.inline(&body[last..span.start()]));
            if let Some(code) = caps.iter().skip(1).flatten().next() {
                out.push_str(code.as_str());
            }
            last = span.end();
        }
        out.push_str(&self.inline(&body[last..]));
        unpark(&out)
    }

    fn inline(&self, text: &str) -> String {
        let mut s = text.to_string();
        for re in &self.inline {
            s = re.replace_all(&s, "$1").into_owned();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(s: &str) -> String {
        MarkdownStripper::new().unwrap().strip(s)
    }

    #[test]
    fn emphasis_keeps_text() {
        assert_eq!(
            strip("**bold** and _it_ and ~~gone~~ and *em*"),
            "bold and it and gone and em"
        );
        assert_eq!(strip("***both***"), "both");
    }

    #[test]
    fn block_markers_are_dropped() {
        assert_eq!(strip("# Title"), "Title");
        assert_eq!(strip("## Closed ##"), "Closed");
        assert_eq!(strip("> quoted"), "quoted");
        assert_eq!(strip("- item\n1. first"), "item\nfirst");
        assert_eq!(strip("a\n***\nb"), "a\n\nb");
    }

    #[test]
    fn links_keep_their_label() {
        assert_eq!(
            strip("see [docs](https://x.y \"t\") or <https://a.b>"),
            "see docs or https://a.b"
        );
    }

    #[test]
    fn code_spans_are_literal() {
        assert_eq!(strip("`**raw**` stays"), "**raw** stays");
        assert_eq!(strip("```x_y_z```"), "x_y_z");
    }

    #[test]
    fn plain_text_is_untouched() {
        for s in ["snake_case_name", "2 * 3 * 4", "#hashtag", "a  b", ""] {
            assert_eq!(strip(s), s);
        }
        assert_eq!(strip("\\*not italic\\*"), "*not italic*");
    }
}
