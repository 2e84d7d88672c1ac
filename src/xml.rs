//! Minimal element tree over quick-xml events.
//!
//! Track files are small, so we materialise the whole document and query it by
//! tag name. Building the tree doubles as the well-formedness check: quick-xml
//! rejects mismatched end tags itself, but it reports EOF without complaint
//! when elements are still open, so that case is caught here.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ParseError;

type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Local name, namespace prefix removed (`gx:coord` -> `coord`).
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr_result in start.attributes() {
            let attr = attr_result.map_err(|e| ParseError::Xml(e.into()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = std::str::from_utf8(&attr.value)
                .unwrap_or_default()
                .to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct text content (text, CDATA and resolved entities).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Child elements with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants with the given local name, in document order.
    /// The element itself is not included.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// First descendant with the given local name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.find(name)
            }
        })
    }
}

/// Parse a complete XML document into its root element.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element::from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(e)) => {
                let element = stack.pop().ok_or_else(|| {
                    ParseError::Malformed(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
            }
            Ok(Event::GeneralRef(e)) => {
                let ch = match e.resolve_char_ref() {
                    Ok(Some(ch)) => ch,
                    Ok(None) => {
                        let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                        predefined_entity(name).ok_or_else(|| {
                            ParseError::Malformed(format!("undefined entity &{name};"))
                        })?
                    }
                    Err(err) => {
                        return Err(ParseError::Malformed(format!(
                            "invalid character reference: {err}"
                        )));
                    }
                };
                if let Some(top) = stack.last_mut() {
                    top.text.push(ch);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Malformed(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| ParseError::Malformed("document has no root element".to_string()))
}

fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(ParseError::Malformed(
            "document has more than one root element".to_string(),
        ))
    }
}
