use crate::entities::decode_entities;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// A single lexical unit of listing markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    StartTag { name: String, attrs: Vec<Attribute> },
    EndTag { name: String },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Look up an attribute value by lowercase name.
pub fn attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

/// Lenient pull tokenizer over markup text.
///
/// Never fails: stray `<` become text, unterminated tags at end of input are
/// dropped, and close tags are reported whether or not they match anything.
/// Comments and declarations are skipped; `script`/`style` bodies come back as
/// one raw text event.
pub struct MarkupEvents<'a> {
    input: &'a str,
    pos: usize,
    raw_text_end: Option<&'static str>,
}

impl<'a> MarkupEvents<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text_end: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn raw_text(&mut self, name: &'static str) -> Option<MarkupEvent> {
        self.raw_text_end = None;
        let rest = self.rest();
        let end = find_close_tag(rest, name).unwrap_or(rest.len());
        self.pos += end;
        if end == 0 {
            return None;
        }
        Some(MarkupEvent::Text(rest[..end].to_string()))
    }

    fn text(&mut self) -> MarkupEvent {
        let rest = self.rest();
        // Always consume the leading char so a stray '<' makes progress.
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let end = rest[first..]
            .find('<')
            .map(|i| i + first)
            .unwrap_or(rest.len());
        self.pos += end;
        MarkupEvent::Text(decode_entities(&rest[..end]))
    }

    /// Try to read a markup construct at `<`. `Ok(Some)` is an event, `Ok(None)`
    /// means the construct was skipped, `Err(())` means the `<` is literal text.
    fn markup(&mut self) -> Result<Option<MarkupEvent>, ()> {
        let rest = self.rest();
        let bytes = rest.as_bytes();

        if rest.starts_with(COMMENT_START) {
            let body = &rest[COMMENT_START.len()..];
            self.pos += match body.find(COMMENT_END) {
                Some(end) => COMMENT_START.len() + end + COMMENT_END.len(),
                None => rest.len(),
            };
            return Ok(None);
        }

        match bytes.get(1) {
            Some(b'!') | Some(b'?') => {
                self.pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
                Ok(None)
            }
            Some(b'/') if bytes.get(2).is_some_and(u8::is_ascii_alphabetic) => {
                let Some(close) = rest.find('>') else {
                    self.pos = self.input.len();
                    return Ok(None);
                };
                let name = tag_name(&rest[2..close]);
                self.pos += close + 1;
                Ok(Some(MarkupEvent::EndTag { name }))
            }
            Some(b'/') => {
                // `</>` and `</ ...>` carry no tag; drop them.
                self.pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
                Ok(None)
            }
            Some(b) if b.is_ascii_alphabetic() => Ok(self.start_tag()),
            _ => Err(()),
        }
    }

    fn start_tag(&mut self) -> Option<MarkupEvent> {
        let rest = self.rest();
        let Some(close) = find_tag_end(rest) else {
            self.pos = self.input.len();
            return None;
        };
        let inner = &rest[1..close];
        self.pos += close + 1;

        let name_len = inner
            .find(|c: char| c.is_ascii_whitespace() || c == '/')
            .unwrap_or(inner.len());
        let name = inner[..name_len].to_ascii_lowercase();
        let attrs = parse_attributes(&inner[name_len..]);

        self.raw_text_end = match name.as_str() {
            "script" => Some("script"),
            "style" => Some("style"),
            _ => None,
        };
        Some(MarkupEvent::StartTag { name, attrs })
    }
}

impl Iterator for MarkupEvents<'_> {
    type Item = MarkupEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(name) = self.raw_text_end {
            if let Some(event) = self.raw_text(name) {
                return Some(event);
            }
        }

        while self.pos < self.input.len() {
            if !self.rest().starts_with('<') {
                return Some(self.text());
            }
            match self.markup() {
                Ok(Some(event)) => return Some(event),
                Ok(None) => continue,
                Err(()) => return Some(self.text()),
            }
        }
        None
    }
}

fn tag_name(raw: &str) -> String {
    raw.split(|c: char| c.is_ascii_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Position of the `>` ending a start tag, skipping `>` inside quoted values.
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, b) in rest.bytes().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            // Quotes only open a value directly after `=`.
            (None, b'"' | b'\'') if rest.as_bytes()[..i].trim_ascii_end().ends_with(b"=") => {
                quote = Some(b)
            }
            (None, b'>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

/// Byte offset of the `</name` that ends a raw text element, case-insensitive.
fn find_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let needle_len = name.len() + 2;
    let mut from = 0;
    while let Some(rel) = haystack[from..].find("</") {
        let at = from + rel;
        if bytes.len() >= at + needle_len
            && bytes[at + 2..at + needle_len].eq_ignore_ascii_case(name.as_bytes())
        {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

fn parse_attributes(mut s: &str) -> Vec<Attribute> {
    let mut attrs: Vec<Attribute> = Vec::new();
    loop {
        s = s.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if s.is_empty() {
            break;
        }

        let name_len = s
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '/')
            .unwrap_or(s.len())
            .max(1);
        let name = s[..name_len].to_ascii_lowercase();
        s = s[name_len..].trim_start();

        let value = match s.strip_prefix('=') {
            Some(after) => {
                let after = after.trim_start();
                let (raw, remaining) = split_value(after);
                s = remaining;
                decode_entities(raw)
            }
            None => String::new(),
        };

        if !attrs.iter().any(|a| a.name == name) {
            attrs.push(Attribute { name, value });
        }
    }
    attrs
}

fn split_value(s: &str) -> (&str, &str) {
    match s.as_bytes().first() {
        Some(&q) if q == b'"' || q == b'\'' => {
            let body = &s[1..];
            match body.find(q as char) {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, ""),
            }
        }
        _ => {
            let end = s.find(|c: char| c.is_ascii_whitespace()).unwrap_or(s.len());
            (&s[..end], &s[end..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{attr, Attribute, MarkupEvent, MarkupEvents};
    use pretty_assertions::assert_eq;

    fn events(input: &str) -> Vec<MarkupEvent> {
        MarkupEvents::new(input).collect()
    }

    fn start(name: &str, attrs: &[(&str, &str)]) -> MarkupEvent {
        MarkupEvent::StartTag {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(n, v)| Attribute {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }

    fn end(name: &str) -> MarkupEvent {
        MarkupEvent::EndTag {
            name: name.to_string(),
        }
    }

    fn text(s: &str) -> MarkupEvent {
        MarkupEvent::Text(s.to_string())
    }

    #[test]
    fn anchor_with_text() {
        assert_eq!(
            events(r#"<A HREF="/x">Hi &amp; bye</a>"#),
            vec![start("a", &[("href", "/x")]), text("Hi & bye"), end("a")]
        );
    }

    #[test]
    fn attribute_forms() {
        let got = events(r#"<div class='news-log big' data-x=1 hidden id="a>b">"#);
        assert_eq!(
            got,
            vec![start(
                "div",
                &[
                    ("class", "news-log big"),
                    ("data-x", "1"),
                    ("hidden", ""),
                    ("id", "a>b")
                ]
            )]
        );
    }

    #[test]
    fn duplicate_attribute_keeps_first() {
        let got = events(r#"<a href="one" href="two">"#);
        match &got[0] {
            MarkupEvent::StartTag { attrs, .. } => assert_eq!(attr(attrs, "href"), Some("one")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        assert_eq!(
            events("<!DOCTYPE html><!-- <a href=x> -->ok<?xml x?>"),
            vec![text("ok")]
        );
    }

    #[test]
    fn stray_angle_brackets_are_text() {
        assert_eq!(
            events("1 < 2 <3 </ >done"),
            vec![text("1 "), text("< 2 "), text("<3 "), text("done")]
        );
    }

    #[test]
    fn unmatched_close_tags_are_still_reported() {
        assert_eq!(
            events("</div>x</span>"),
            vec![end("div"), text("x"), end("span")]
        );
    }

    #[test]
    fn unterminated_tag_at_end_is_dropped() {
        assert_eq!(events("before<a href=\"x"), vec![text("before")]);
        assert_eq!(events("before</div"), vec![text("before")]);
    }

    #[test]
    fn script_body_is_raw_text() {
        assert_eq!(
            events("<script>if (a<b) { x = '<a href=y>'; }</SCRIPT>after"),
            vec![
                start("script", &[]),
                text("if (a<b) { x = '<a href=y>'; }"),
                end("script"),
                text("after"),
            ]
        );
    }

    #[test]
    fn self_closing_tags_yield_start_only() {
        assert_eq!(events("<br/><img src=x />"), vec![start("br", &[]), start("img", &[("src", "x")])]);
    }
}
