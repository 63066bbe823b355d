//! Minimal element tree over quick-xml, keeping mixed content the way
//! search responses need it: element text, ordered children, and tail text.

pub mod entities;

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};

/// How far into the payload the XML declaration is looked for.
const DECLARATION_SCAN_BYTES: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("payload is not valid {0}")]
    Decode(&'static str),

    #[error("XML syntax error: {0}")]
    Syntax(String),

    #[error("no root element")]
    NoRoot,

    #[error("content outside the root element")]
    OutsideRoot,

    #[error("unclosed element <{0}>")]
    Unclosed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    /// Character data before the first child.
    pub text: String,
    pub children: Vec<Element>,
    /// Character data after this element's end tag, owned by the parent.
    pub tail: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        Self {
            tag: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Self::default()
        }
    }

    /// Depth-first, pre-order walk starting with `self`.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn iter_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.iter().filter(move |e| e.tag == tag)
    }

    /// Appends character data at the current end of this element's content.
    fn push_text(&mut self, data: &str) {
        match self.children.last_mut() {
            Some(last) => last.tail.push_str(data),
            None => self.text.push_str(data),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Parses a raw response body into its root element.
pub fn parse_document(payload: &[u8]) -> Result<Element, ParseError> {
    let text = decode_payload(payload)?;
    parse_str(&text)
}

fn parse_str(xml: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::Syntax(format!("{e} at byte {}", reader.buffer_position())))?;

        match event {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::OutsideRoot);
                }
                stack.push(Element::from_start(&start));
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::OutsideRoot);
                }
                close_element(Element::from_start(&start), &mut stack, &mut root);
            }
            Event::End(_) => {
                // quick-xml has already checked that the end name matches.
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Syntax("unexpected end tag".to_string()))?;
                close_element(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                // Only the five XML entities; HTML names are undefined here.
                let data = text
                    .unescape_with(resolve_xml_entity)
                    .map_err(|e| ParseError::Syntax(e.to_string()))?;
                push_character_data(&data, &mut stack)?;
            }
            Event::CData(cdata) => {
                let data = String::from_utf8_lossy(&cdata).into_owned();
                push_character_data(&data, &mut stack)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no content.
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed(open.tag));
    }
    root.ok_or(ParseError::NoRoot)
}

fn close_element(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn push_character_data(data: &str, stack: &mut [Element]) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(current) => current.push_text(data),
        None if data.trim().is_empty() => {}
        None => return Err(ParseError::OutsideRoot),
    }
    Ok(())
}

/// Decodes the payload to UTF-8, honoring a byte order mark or the
/// `encoding` attribute of the XML declaration.
fn decode_payload(payload: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    let encoding = match Encoding::for_bom(payload) {
        Some((encoding, _)) => encoding,
        None => match declared_encoding(payload) {
            Some(label) => Encoding::for_label(label.as_bytes())
                .ok_or_else(|| ParseError::UnknownEncoding(label.to_string()))?,
            None => UTF_8,
        },
    };

    if encoding == UTF_8 {
        let body = payload.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(payload);
        return std::str::from_utf8(body)
            .map(Cow::Borrowed)
            .map_err(|_| ParseError::Decode("UTF-8"));
    }

    let (text, _, had_errors) = encoding.decode(payload);
    if had_errors {
        return Err(ParseError::Decode(encoding.name()));
    }
    Ok(text)
}

/// Reads the `encoding` pseudo-attribute from an ASCII-compatible `<?xml ...?>` prolog.
fn declared_encoding(payload: &[u8]) -> Option<&str> {
    let head = &payload[..payload.len().min(DECLARATION_SCAN_BYTES)];
    if !head.starts_with(b"<?xml") {
        return None;
    }
    let end = head.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&head[..end]).ok()?;

    let after = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after[1..];
    value.find(quote).map(|close| &value[..close])
}
