//! Single-pass candidate state machine.
//!
//! Links and date containers are paired by local adjacency: a date closes the
//! candidate that is open when it ends, and a date seen while nothing is open
//! waits for the next link. Duplicate links are dropped at flush time.

use std::borrow::Cow;
use std::collections::HashSet;

use engine_logging::{engine_debug, engine_trace};

use crate::event::{MarkupEvent, MarkupEvents};
use crate::matchers::FieldMatchers;
use crate::repair::repair;
use crate::types::Candidate;

/// Extract listing candidates from `markup` in first-encounter order.
pub fn extract_candidates(markup: &str, matchers: &dyn FieldMatchers) -> Vec<Candidate> {
    let mut machine = CandidateMachine::new(matchers);
    for event in MarkupEvents::new(markup) {
        machine.apply(event);
    }
    machine.finish()
}

/// A date observed before any candidate was open. Consumed by the next link.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingDate(String);

#[derive(Debug)]
enum EngineState {
    Idle,
    Building(OpenCandidate),
}

#[derive(Debug)]
struct OpenCandidate {
    url: String,
    link_tag: String,
    link_open: bool,
    title: String,
    date: Option<String>,
}

#[derive(Debug)]
struct DateScope {
    tag: String,
    depth: usize,
    buffer: String,
}

pub struct CandidateMachine<'m> {
    matchers: &'m dyn FieldMatchers,
    state: EngineState,
    pending: Option<PendingDate>,
    date_scope: Option<DateScope>,
    seen: HashSet<String>,
    out: Vec<Candidate>,
}

impl<'m> CandidateMachine<'m> {
    pub fn new(matchers: &'m dyn FieldMatchers) -> Self {
        Self {
            matchers,
            state: EngineState::Idle,
            pending: None,
            date_scope: None,
            seen: HashSet::new(),
            out: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: MarkupEvent) {
        match event {
            MarkupEvent::StartTag { name, attrs } => {
                if let Some(url) = self.matchers.reference_link(&name, &attrs) {
                    self.open_candidate(url, &name);
                }
                if let Some(scope) = &mut self.date_scope {
                    if scope.tag == name {
                        scope.depth += 1;
                    }
                } else if self.matchers.is_date_container(&name, &attrs) {
                    self.date_scope = Some(DateScope {
                        tag: name,
                        depth: 1,
                        buffer: String::new(),
                    });
                }
            }
            MarkupEvent::Text(text) => {
                if let EngineState::Building(open) = &mut self.state {
                    if open.link_open {
                        open.title.push_str(&text);
                        return;
                    }
                }
                if let Some(scope) = &mut self.date_scope {
                    scope.buffer.push_str(&text);
                }
            }
            MarkupEvent::EndTag { name } => {
                self.close_link(&name);
                self.close_date(&name);
            }
        }
    }

    /// Flush the open candidate, if any, and return the output sequence.
    pub fn finish(mut self) -> Vec<Candidate> {
        if let EngineState::Building(open) = std::mem::replace(&mut self.state, EngineState::Idle)
        {
            self.flush(open);
        }
        if let Some(PendingDate(date)) = self.pending.take() {
            engine_debug!("Discarding orphan date {:?} at end of listing", date);
        }
        self.out
    }

    fn open_candidate(&mut self, url: String, link_tag: &str) {
        // A title never straddles the next link: whatever is open is final.
        if let EngineState::Building(open) = std::mem::replace(&mut self.state, EngineState::Idle)
        {
            self.flush(open);
        }
        let date = self.pending.take().map(|PendingDate(date)| date);
        engine_trace!("Opening candidate {} (pending date: {:?})", url, date);
        self.state = EngineState::Building(OpenCandidate {
            url,
            link_tag: link_tag.to_string(),
            link_open: true,
            title: String::new(),
            date,
        });
    }

    fn close_link(&mut self, name: &str) {
        let EngineState::Building(open) = &mut self.state else {
            return;
        };
        if !open.link_open || open.link_tag != name {
            return;
        }
        open.link_open = false;
        open.title = normalize_space(&open.title);
    }

    fn close_date(&mut self, name: &str) {
        let Some(scope) = &mut self.date_scope else {
            return;
        };
        if scope.tag != name {
            return;
        }
        scope.depth -= 1;
        if scope.depth > 0 {
            return;
        }
        let Some(scope) = self.date_scope.take() else {
            return;
        };

        let date = normalize_space(&scope.buffer);
        if date.is_empty() {
            return;
        }

        match &mut self.state {
            EngineState::Building(open) => {
                // The nearest date wins over one carried in from before the link.
                if let Some(carried) = open.date.replace(date) {
                    engine_debug!("Replacing carried date {:?} for {}", carried, open.url);
                }
                self.flush_open();
            }
            EngineState::Idle => {
                if let Some(PendingDate(stale)) = self.pending.replace(PendingDate(date)) {
                    engine_debug!("Replacing unclaimed date {:?}", stale);
                }
            }
        }
    }

    fn flush_open(&mut self) {
        if let EngineState::Building(open) = std::mem::replace(&mut self.state, EngineState::Idle)
        {
            self.flush(open);
        }
    }

    fn flush(&mut self, open: OpenCandidate) {
        if self.seen.contains(&open.url) {
            engine_debug!("Dropping duplicate candidate {}", open.url);
            return;
        }

        let title = non_empty(normalize_space(&open.title)).map(repaired);
        let date_text = open.date.and_then(non_empty).map(repaired);

        engine_trace!("Flushing candidate {} ({:?}, {:?})", open.url, title, date_text);
        self.seen.insert(open.url.clone());
        self.out.push(Candidate {
            url: open.url,
            title,
            date_text,
        });
    }
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn repaired(text: String) -> String {
    let fixed = match repair(&text) {
        Cow::Borrowed(_) => None,
        Cow::Owned(fixed) => Some(fixed),
    };
    match fixed {
        Some(fixed) => {
            engine_debug!("Repaired mis-encoded text {:?} -> {:?}", text, fixed);
            fixed
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_candidates, normalize_space};
    use crate::matchers::SourceProfile;
    use crate::types::Candidate;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://newsroom.fidelity.com/pressreleases/";

    fn link(id: &str, title: &str) -> String {
        format!(r#"<a href="{BASE}{id}">{title}</a>"#)
    }

    fn date(text: &str) -> String {
        format!(r#"<div class="news-log">{text}</div>"#)
    }

    fn cand(id: &str, title: Option<&str>, date: Option<&str>) -> Candidate {
        Candidate {
            url: format!("{BASE}{id}"),
            title: title.map(str::to_string),
            date_text: date.map(str::to_string),
        }
    }

    fn run(markup: &str) -> Vec<Candidate> {
        extract_candidates(markup, &SourceProfile::fidelity_press())
    }

    #[test]
    fn normalize_space_collapses_and_trims() {
        assert_eq!(normalize_space("  a \n\t b\u{00A0}c  "), "a b c");
        assert_eq!(normalize_space(" \n "), "");
    }

    #[test]
    fn empty_markup_yields_nothing() {
        assert!(run("").is_empty());
        assert!(run("<html><body><p>Nothing here</p></body></html>").is_empty());
    }

    #[test]
    fn date_first_items_keep_carried_date() {
        let markup = [
            date("Jan 1, 2026"),
            link("a", "A"),
            "<p>teaser</p>".to_string(),
            date("Jan 2, 2026"),
            link("b", "B"),
        ]
        .concat();
        // "a" is still open when the second date closes, so it takes that date.
        assert_eq!(
            run(&markup),
            vec![
                cand("a", Some("A"), Some("Jan 2, 2026")),
                cand("b", Some("B"), None),
            ]
        );

        let markup = [date("Jan 1, 2026"), link("a", "A"), link("b", "B")].concat();
        assert_eq!(
            run(&markup),
            vec![
                cand("a", Some("A"), Some("Jan 1, 2026")),
                cand("b", Some("B"), None),
            ]
        );
    }

    #[test]
    fn leading_stray_date_does_not_shift_pairs() {
        let markup = [
            date("Updated Jan 9, 2026"),
            link("a", "A"),
            date("Jan 1, 2026"),
            link("b", "B"),
            date("Jan 2, 2026"),
        ]
        .concat();
        assert_eq!(
            run(&markup),
            vec![
                cand("a", Some("A"), Some("Jan 1, 2026")),
                cand("b", Some("B"), Some("Jan 2, 2026")),
            ]
        );
    }

    #[test]
    fn missing_date_does_not_shift_later_pairs() {
        let markup = [
            link("a", "A"),
            date("Jan 1, 2026"),
            link("b", "B"),
            link("c", "C"),
            date("Jan 3, 2026"),
        ]
        .concat();
        assert_eq!(
            run(&markup),
            vec![
                cand("a", Some("A"), Some("Jan 1, 2026")),
                cand("b", Some("B"), None),
                cand("c", Some("C"), Some("Jan 3, 2026")),
            ]
        );
    }

    #[test]
    fn title_is_normalized_across_nested_markup() {
        let markup = format!(
            r#"<a href="{BASE}x">
                <span>Fidelity&reg;</span>
                launches   <b>new</b> fund
            </a>{}"#,
            date("  March\n 3,  2026 ")
        );
        assert_eq!(
            run(&markup),
            vec![cand("x", Some("Fidelity® launches new fund"), Some("March 3, 2026"))]
        );
    }

    #[test]
    fn empty_title_is_absent() {
        let markup = [link("x", "   "), date("Jan 1, 2026")].concat();
        assert_eq!(run(&markup), vec![cand("x", None, Some("Jan 1, 2026"))]);
    }

    #[test]
    fn empty_date_container_is_ignored() {
        let markup = [link("x", "X"), date("  "), date("Jan 1, 2026")].concat();
        assert_eq!(run(&markup), vec![cand("x", Some("X"), Some("Jan 1, 2026"))]);
    }

    #[test]
    fn nested_elements_inside_date_container() {
        let markup = format!(
            r#"{}<div class="news-log"><div class="icon"></div>April 4, 2026</div>"#,
            link("x", "X")
        );
        assert_eq!(run(&markup), vec![cand("x", Some("X"), Some("April 4, 2026"))]);
    }

    #[test]
    fn text_between_link_and_date_is_not_title() {
        let markup = [link("x", "X"), "<p>Summary text</p>".to_string(), date("Jan 1, 2026")].concat();
        assert_eq!(run(&markup), vec![cand("x", Some("X"), Some("Jan 1, 2026"))]);
    }

    #[test]
    fn unclosed_link_takes_remaining_text_as_title() {
        let markup = format!(r#"<a href="{BASE}x">Never closed"#);
        assert_eq!(run(&markup), vec![cand("x", Some("Never closed"), None)]);
    }

    #[test]
    fn duplicate_dropped_even_when_second_has_date() {
        let markup = [link("x", "First"), link("x", "Second"), date("Jan 1, 2026")].concat();
        assert_eq!(run(&markup), vec![cand("x", Some("First"), None)]);
    }

    #[test]
    fn stale_pending_date_is_replaced() {
        let markup = [date("Old"), date("New"), link("x", "X")].concat();
        assert_eq!(run(&markup), vec![cand("x", Some("X"), Some("New"))]);
    }

    #[test]
    fn repair_applies_to_title_and_date() {
        let markup = [
            link("x", "Fidelity\u{00C2}\u{00AE} fund"),
            date("Jan\u{00E2}\u{20AC}\u{201C}Feb"),
        ]
        .concat();
        assert_eq!(run(&markup), vec![cand("x", Some("Fidelity® fund"), Some("Jan–Feb"))]);
    }

    #[test]
    fn out_of_scope_links_are_ignored() {
        let markup = [
            r#"<a href="https://www.fidelity.com/">Home</a>"#.to_string(),
            link("x", "X"),
            r#"<a href="/about">About</a>"#.to_string(),
            date("Jan 1, 2026"),
        ]
        .concat();
        assert_eq!(run(&markup), vec![cand("x", Some("X"), Some("Jan 1, 2026"))]);
    }
}
