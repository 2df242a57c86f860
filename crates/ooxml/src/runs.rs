//! Text rewriting across formatting runs
//!
//! Word processors split visible text into runs wherever formatting, spell
//! checking or revision tracking changes, so a single `{{ token }}` can be
//! spread over several `<w:t>` elements. Rewriting therefore works on
//! *groups*: every text element inside one container element (a paragraph,
//! a shared-string item) is concatenated, the rewriter sees the whole
//! string, and its splices are mapped back onto the individual elements.
//!
//! A replacement is written into the element where its range starts; the
//! rest of the range is removed from the following elements. Formatting of
//! the first run therefore wins for the replaced text.

use crate::{OoxmlError, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::ops::Range;

/// Replace `range` (byte offsets into the group text) with `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub text: String,
}

impl Splice {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// Produces the splices to apply to the text of one group
pub trait TextRewriter {
    fn rewrite(&self, text: &str) -> Vec<Splice>;
}

impl<F> TextRewriter for F
where
    F: Fn(&str) -> Vec<Splice>,
{
    fn rewrite(&self, text: &str) -> Vec<Splice> {
        self(text)
    }
}

/// A text element and the character-data events inside it
#[derive(Debug)]
struct TextNode {
    start_event: usize,
    text_events: Vec<usize>,
    text: String,
}

#[derive(Debug)]
struct Group {
    start_event: usize,
    nodes: Vec<TextNode>,
}

impl Group {
    fn text(&self) -> String {
        self.nodes.iter().map(|node| node.text.as_str()).collect()
    }
}

fn read_events(xml: &[u8]) -> Result<Vec<Event<'_>>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut events = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => events.push(event),
        }
    }
    Ok(events)
}

fn scan_groups(events: &[Event<'_>], container: &[u8], text_element: &[u8]) -> Result<Vec<Group>> {
    let mut open: Vec<Group> = Vec::new();
    let mut finished = Vec::new();
    let mut current: Option<TextNode> = None;

    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(e) if e.local_name().as_ref() == container => {
                open.push(Group {
                    start_event: index,
                    nodes: Vec::new(),
                });
            }
            Event::End(e) if e.local_name().as_ref() == container => {
                if let Some(group) = open.pop() {
                    finished.push(group);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == text_element && !open.is_empty() => {
                current = Some(TextNode {
                    start_event: index,
                    text_events: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(e) if e.local_name().as_ref() == text_element => {
                if let (Some(node), Some(group)) = (current.take(), open.last_mut()) {
                    group.nodes.push(node);
                }
            }
            Event::Text(t) => {
                if let Some(node) = current.as_mut() {
                    node.text.push_str(&t.unescape()?);
                    node.text_events.push(index);
                }
            }
            Event::CData(c) => {
                if let Some(node) = current.as_mut() {
                    let text = std::str::from_utf8(c)
                        .map_err(|e| OoxmlError::Malformed(format!("CDATA is not UTF-8: {e}")))?;
                    node.text.push_str(text);
                    node.text_events.push(index);
                }
            }
            _ => {}
        }
    }

    finished.extend(open);
    finished.sort_by_key(|group| group.start_event);
    Ok(finished)
}

/// Sort splices and drop any that are out of bounds, split a character or
/// overlap an earlier splice
fn normalize_splices(mut splices: Vec<Splice>, text: &str) -> Vec<Splice> {
    splices.sort_by_key(|splice| (splice.range.start, splice.range.end));

    let mut kept: Vec<Splice> = Vec::with_capacity(splices.len());
    let mut last_end = 0;
    for splice in splices {
        let Range { start, end } = splice.range;
        let valid = start <= end
            && end <= text.len()
            && text.is_char_boundary(start)
            && text.is_char_boundary(end)
            && (kept.is_empty() || start >= last_end);
        if valid {
            last_end = end;
            kept.push(splice);
        }
    }
    kept
}

/// New text of every node after applying `splices` to the group text
fn distribute(nodes: &[TextNode], full: &str, splices: &[Splice]) -> Vec<String> {
    let mut spans = Vec::with_capacity(nodes.len());
    let mut offset = 0;
    for node in nodes {
        spans.push((offset, offset + node.text.len()));
        offset += node.text.len();
    }

    let owner = |position: usize| {
        spans
            .iter()
            .position(|&(s, e)| position >= s && position < e)
            .unwrap_or(spans.len().saturating_sub(1))
    };

    spans
        .iter()
        .enumerate()
        .map(|(index, &(s, e))| {
            let mut out = String::new();
            let mut pos = s;
            for splice in splices {
                let owned = owner(splice.range.start) == index;
                let cs = splice.range.start.max(s);
                let ce = splice.range.end.min(e);
                if !owned && cs >= ce {
                    continue;
                }
                let cs = cs.min(e);
                if cs > pos {
                    out.push_str(&full[pos..cs]);
                    pos = cs;
                }
                if owned {
                    out.push_str(&splice.text);
                }
                if ce > pos {
                    pos = ce;
                }
            }
            if pos < e {
                out.push_str(&full[pos..e]);
            }
            out
        })
        .collect()
}

fn needs_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

fn with_preserve(start: &BytesStart<'_>) -> Result<Option<BytesStart<'static>>> {
    if start.try_get_attribute("xml:space")?.is_some() {
        return Ok(None);
    }
    let mut start = start.clone().into_owned();
    start.push_attribute(("xml:space", "preserve"));
    Ok(Some(start))
}

/// Rewrite the text of every `container` element, where text lives in
/// `text_element` children
///
/// Element names are matched on their local part, so `"p"` matches `<w:p>`.
/// Returns the new XML and the number of splices applied. When nothing
/// changes the input bytes are returned unchanged.
pub fn rewrite_text_runs(
    xml: &[u8],
    container: &str,
    text_element: &str,
    rewriter: &dyn TextRewriter,
) -> Result<(Vec<u8>, usize)> {
    let events = read_events(xml)?;
    let groups = scan_groups(&events, container.as_bytes(), text_element.as_bytes())?;

    let mut replacements: HashMap<usize, Vec<Event<'static>>> = HashMap::new();
    let mut applied = 0;

    for group in &groups {
        let full = group.text();
        let splices = normalize_splices(rewriter.rewrite(&full), &full);
        if splices.is_empty() {
            continue;
        }
        applied += splices.len();

        let new_texts = distribute(&group.nodes, &full, &splices);
        for (node, new_text) in group.nodes.iter().zip(new_texts) {
            if new_text == node.text {
                continue;
            }

            let start = match &events[node.start_event] {
                Event::Start(start) if needs_preserve(&new_text) => with_preserve(start)?,
                _ => None,
            };
            let text_event = Event::Text(BytesText::new(&new_text).into_owned());

            match node.text_events.split_first() {
                Some((first, rest)) => {
                    replacements.insert(*first, vec![text_event]);
                    for index in rest {
                        replacements.insert(*index, Vec::new());
                    }
                    if let Some(start) = start {
                        replacements.insert(node.start_event, vec![Event::Start(start)]);
                    }
                }
                None => {
                    let start = match start {
                        Some(start) => Event::Start(start),
                        None => events[node.start_event].clone().into_owned(),
                    };
                    replacements.insert(node.start_event, vec![start, text_event]);
                }
            }
        }
    }

    if replacements.is_empty() {
        return Ok((xml.to_vec(), applied));
    }

    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 64));
    for (index, event) in events.into_iter().enumerate() {
        match replacements.remove(&index) {
            Some(substitutes) => {
                for substitute in substitutes {
                    writer.write_event(substitute)?;
                }
            }
            None => writer.write_event(event)?,
        }
    }

    Ok((writer.into_inner(), applied))
}

/// Concatenated text of every `container` element, in document order
pub fn collect_text_groups(xml: &[u8], container: &str, text_element: &str) -> Result<Vec<String>> {
    let events = read_events(xml)?;
    let groups = scan_groups(&events, container.as_bytes(), text_element.as_bytes())?;
    Ok(groups.iter().map(Group::text).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn replace_all(needle: &'static str, value: &'static str) -> impl Fn(&str) -> Vec<Splice> {
        move |text: &str| {
            text.match_indices(needle)
                .map(|(at, m)| Splice::new(at..at + m.len(), value))
                .collect()
        }
    }

    fn rewrite(xml: &str, needle: &'static str, value: &'static str) -> (String, usize) {
        let (bytes, count) =
            rewrite_text_runs(xml.as_bytes(), "p", "t", &replace_all(needle, value)).unwrap();
        (String::from_utf8(bytes).unwrap(), count)
    }

    #[test]
    fn test_single_run_replacement() {
        let (out, count) = rewrite("<w:p><w:r><w:t>Hi {{name}}</w:t></w:r></w:p>", "{{name}}", "Jane");
        assert_eq!(out, "<w:p><w:r><w:t>Hi Jane</w:t></w:r></w:p>");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_token_split_across_runs() {
        let xml = "<w:p><w:r><w:t>Hello {{na</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>me}}!</w:t></w:r></w:p>";
        let (out, count) = rewrite(xml, "{{name}}", "Jane");
        assert_eq!(
            out,
            "<w:p><w:r><w:t>Hello Jane</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>!</w:t></w:r></w:p>"
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn test_token_spanning_three_runs() {
        let xml = "<w:p><w:r><w:t>{{</w:t></w:r><w:r><w:t>x</w:t></w:r><w:r><w:t>}} end</w:t></w:r></w:p>";
        let (out, _) = rewrite(xml, "{{x}}", "1");
        assert_eq!(
            out,
            "<w:p><w:r><w:t>1</w:t></w:r><w:r><w:t></w:t></w:r><w:r><w:t xml:space=\"preserve\"> end</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_preserve_added_for_edge_whitespace() {
        let xml = "<w:p><w:r><w:t>{{a}}</w:t></w:r><w:r><w:t>x</w:t></w:r></w:p>";
        let (out, _) = rewrite(xml, "{{a}}", "Jane ");
        assert_eq!(
            out,
            "<w:p><w:r><w:t xml:space=\"preserve\">Jane </w:t></w:r><w:r><w:t>x</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_replacement_is_escaped() {
        let (out, _) = rewrite("<w:p><w:r><w:t>{{co}}</w:t></w:r></w:p>", "{{co}}", "A & B <Ltd>");
        assert!(out.contains("A &amp; B &lt;Ltd&gt;"));
    }

    #[test]
    fn test_entities_in_source_text() {
        let xml = "<w:p><w:r><w:t>Tom &amp; {{x}}</w:t></w:r></w:p>";
        let (out, count) = rewrite(xml, "{{x}}", "Jerry");
        assert_eq!(count, 1);
        assert_eq!(
            collect_text_groups(out.as_bytes(), "p", "t").unwrap(),
            vec!["Tom & Jerry".to_string()]
        );
    }

    #[test]
    fn test_unchanged_input_returned_verbatim() {
        let xml = "<?xml version=\"1.0\"?>\n<w:p  a='1'><w:r><w:t>plain</w:t></w:r></w:p>";
        let (out, count) = rewrite(xml, "{{x}}", "y");
        assert_eq!(out, xml);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_text_outside_container_untouched() {
        let xml = "<root><t>{{x}}</t><p><t>{{x}}</t></p></root>";
        let (out, count) = rewrite(xml, "{{x}}", "y");
        assert_eq!(out, "<root><t>{{x}}</t><p><t>y</t></p></root>");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_nested_containers_are_separate_groups() {
        let xml = "<p><t>outer</t><x><p><t>inner</t></p></x></p>";
        let groups = collect_text_groups(xml.as_bytes(), "p", "t").unwrap();
        assert_eq!(groups, vec!["outer".to_string(), "inner".to_string()]);
    }

    #[test]
    fn test_overlapping_splices_dropped() {
        let rewriter = |_: &str| vec![Splice::new(0..3, "A"), Splice::new(2..4, "B")];
        let (out, count) = rewrite_text_runs(b"<p><t>abcdef</t></p>", "p", "t", &rewriter).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<p><t>Adef</t></p>");
        assert_eq!(count, 1);
    }
}
