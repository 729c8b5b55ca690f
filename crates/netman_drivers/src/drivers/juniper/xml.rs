//! A minimal owned element tree, independent of anything Juniper-specific.
//! `config_tree.rs` and `edit.rs` build/read `Element`s; this module only
//! knows how to get them to and from the wire.

use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

pub const OP_DELETE: &str = "delete";
pub const OP_REPLACE: &str = "replace";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        let mut e = Self::new(tag);
        e.text = Some(text.into());
        e
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn operation(self, op: &str) -> Self {
        self.attr("operation", op)
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn operation_attr(&self) -> Option<&str> {
        self.get_attr("operation")
    }

    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    pub fn text_trimmed(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim)
    }

    pub fn to_xml(&self) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_element(&mut writer, self).expect("writing to an in-memory buffer cannot fail");
        String::from_utf8(writer.into_inner().into_inner()).expect("quick-xml emits utf8")
    }

    /// Parses the first top-level element found in `xml`.
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).context("reading xml event")? {
                Event::Start(ref e) => stack.push(start_element(e)?),
                Event::Empty(ref e) => {
                    let el = start_element(e)?;
                    push_child(&mut stack, &mut root, el);
                }
                Event::Text(ref e) => {
                    if let Some(top) = stack.last_mut() {
                        let text = e.unescape().context("unescaping text")?.into_owned();
                        if !text.trim().is_empty() {
                            top.text = Some(text);
                        }
                    }
                }
                Event::End(ref e) => {
                    let closed = stack.pop().with_context(|| {
                        format!("unmatched closing tag {}", String::from_utf8_lossy(e.name().as_ref()))
                    })?;
                    push_child(&mut stack, &mut root, closed);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        root.context("no xml element found")
    }
}

fn push_child(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
    } else {
        *root = Some(el);
    }
}

fn start_element(e: &BytesStart) -> Result<Element> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut el = Element::new(tag);
    for attr in e.attributes() {
        let attr = attr.context("reading attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().context("unescaping attribute")?.into_owned();
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, el: &Element) -> Result<()> {
    if el.children.is_empty() && el.text.is_none() {
        let mut start = BytesStart::new(el.tag.as_str());
        for (k, v) in &el.attrs {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    let mut start = BytesStart::new(el.tag.as_str());
    for (k, v) in &el.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(start))?;
    if let Some(text) = &el.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &el.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(el.tag.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_nested_elements() {
        let el = Element::new("vlans").child(
            Element::new("vlan")
                .operation(OP_DELETE)
                .child(Element::with_text("name", "STANDARD")),
        );
        let xml = el.to_xml();
        assert!(xml.contains(r#"operation="delete""#));
        let parsed = Element::parse(&xml).unwrap();
        assert_eq!(parsed.tag, "vlans");
        let vlan = parsed.find("vlan").unwrap();
        assert_eq!(vlan.operation_attr(), Some("delete"));
        assert_eq!(vlan.find("name").unwrap().text_trimmed(), Some("STANDARD"));
    }

    #[test]
    fn empty_elements_serialise_self_closing() {
        let el = Element::new("disable").operation(OP_DELETE);
        assert_eq!(el.to_xml(), r#"<disable operation="delete"/>"#);
    }
}
