//! Minimal XML document tree built on top of quick-xml
//!
//! GPX carries open-ended attribute sets and vendor extensions that a typed
//! GPX parser would drop, so the document walk operates on a plain element
//! tree with tag and attribute lookups instead.

use crate::data::{DataError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::BufRead;

/// A parsed XML element: name, attributes in document order, accumulated
/// text/CDATA content and child elements in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    /// The element tag name
    pub name: String,
    /// Attribute name/value pairs, preserving document order
    pub attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA content of this element
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Look up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over direct child elements with the given tag name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Collect all descendant elements with the given tag name, in document
    /// order. Mirrors the `getElementsByTagName` lookup the GPX walk relies on.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// First descendant element with the given tag name, if any.
    pub fn first_descendant(&self, name: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(node) = child.first_descendant(name) {
                return Some(node);
            }
        }
        None
    }

    /// Whether any descendant element has the given tag name.
    pub fn has_descendant(&self, name: &str) -> bool {
        self.first_descendant(name).is_some()
    }
}

/// Parse an XML document from a buffered reader and return the root element.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(true);

    let mut buf = Vec::new();

    // Skip the prolog (declaration, comments, whitespace) up to the root
    // element, then hand off to the recursive element parser.
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let start = start.into_owned();
                let mut node_buf = Vec::new();
                return parse_node(&mut reader, &mut node_buf, start, false);
            }
            Event::Empty(start) => {
                let start = start.into_owned();
                let mut node_buf = Vec::new();
                return parse_node(&mut reader, &mut node_buf, start, true);
            }
            Event::Eof => {
                return Err(DataError::MalformedDocument(
                    "no root element found".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Parse an XML document from a string slice.
pub fn parse_str(input: &str) -> Result<XmlNode> {
    parse_reader(input.as_bytes())
}

fn parse_node<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    start: quick_xml::events::BytesStart<'static>,
    self_closing: bool,
) -> Result<XmlNode> {
    let name_bytes = start.name().as_ref().to_vec();
    let mut node = XmlNode {
        name: String::from_utf8_lossy(&name_bytes).into_owned(),
        attributes: collect_attributes(start.attributes())?,
        text: String::new(),
        children: Vec::new(),
    };

    if self_closing {
        return Ok(node);
    }

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(child) => {
                let child = parse_node(reader, &mut Vec::new(), child.into_owned(), false)?;
                node.children.push(child);
            }
            Event::Empty(child) => {
                let child = parse_node(reader, &mut Vec::new(), child.into_owned(), true)?;
                node.children.push(child);
            }
            Event::Text(text) => {
                let value = text.unescape()?;
                if !value.trim().is_empty() {
                    node.text.push_str(&value);
                }
            }
            Event::CData(text) => {
                let value = String::from_utf8_lossy(text.as_ref()).to_string();
                if !value.trim().is_empty() {
                    node.text.push_str(&value);
                }
            }
            Event::End(end) => {
                if end.name().as_ref() != name_bytes.as_slice() {
                    return Err(DataError::MalformedDocument(format!(
                        "<{}> closed by </{}>",
                        node.name,
                        String::from_utf8_lossy(end.name().as_ref()),
                    )));
                }
                return Ok(node);
            }
            Event::Eof => {
                return Err(DataError::MalformedDocument(format!(
                    "<{}> is never closed",
                    node.name
                )));
            }
            _ => {}
        }
    }
}

fn collect_attributes(
    attributes: quick_xml::events::attributes::Attributes<'_>,
) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for attr in attributes {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        pairs.push((key, value));
    }
    Ok(pairs)
}
