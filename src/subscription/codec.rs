//! SOAP envelope encoding and decoding for the remote subscription service.
//!
//! Requests are small fixed templates, so they are rendered directly with every
//! argument escaped. Responses are parsed into a [`ParsedNode`] tree keyed by
//! local element names, which makes lookups independent of the namespace
//! prefixes the remote side happens to choose (`S:`, `soap:`, `ns2:`...).

use std::borrow::Cow;

use quick_xml::{escape::escape, events::Event, Reader};

use super::errors::ProtocolError;

pub const ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SERVICE_NAMESPACE: &str = "http://services.kinokuniya/";
pub const CONTENT_TYPE: &str = "text/xml";

/// Wire names of a remote operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationName {
    request: Cow<'static, str>,
    response: Cow<'static, str>,
    first_arg: usize,
}

impl OperationName {
    pub const APPROVE: OperationName =
        OperationName::fixed("approveSubscribe", "approveSubscribeResponse", 0);
    pub const REJECT: OperationName =
        OperationName::fixed("rejectSubscribe", "rejectSubscribeResponse", 0);
    // The list operations number their arguments from arg1 on the remote side
    pub const LIST_PENDING: OperationName =
        OperationName::fixed("getAllReqSubscribe", "getAllReqSubscribeResponse", 1);
    pub const LIST_SUBSCRIBERS: OperationName =
        OperationName::fixed("getAllSubscribers", "getAllSubscriberResponse", 1);

    const fn fixed(request: &'static str, response: &'static str, first_arg: usize) -> Self {
        Self {
            request: Cow::Borrowed(request),
            response: Cow::Borrowed(response),
            first_arg,
        }
    }

    /// An operation following the usual `{name}` / `{name}Response` convention
    pub fn conventional(request: impl Into<String>) -> Self {
        let request = request.into();
        let response = format!("{request}Response");
        Self {
            request: Cow::Owned(request),
            response: Cow::Owned(response),
            first_arg: 0,
        }
    }

    pub fn request_element(&self) -> &str {
        &self.request
    }

    pub fn response_element(&self) -> &str {
        &self.response
    }
}

/// Build the request document for `operation`.
///
/// `args` are emitted in order as `arg{n}` elements and `auth_key` is always
/// appended as the last argument.
pub fn build_request(operation: &OperationName, args: &[String], auth_key: &str) -> Vec<u8> {
    let mut body = String::new();
    let values = args.iter().map(String::as_str).chain(std::iter::once(auth_key));
    for (position, value) in values.enumerate() {
        let index = operation.first_arg + position;
        body.push_str(&format!(
            "<arg{index} xmlns=\"\">{}</arg{index}>",
            escape(value)
        ));
    }

    format!(
        "<Envelope xmlns=\"{ENVELOPE_NAMESPACE}\"><Body><{op} xmlns=\"{SERVICE_NAMESPACE}\">{body}</{op}></Body></Envelope>",
        op = operation.request_element(),
    )
    .into_bytes()
}

/// Locate the response element of `operation` inside the envelope.
pub fn parse_response(bytes: &[u8], operation: &OperationName) -> Result<ParsedNode, ProtocolError> {
    let root = parse_document(bytes)?;
    if root.name != "Envelope" {
        return Err(ProtocolError::MissingNode(format!(
            "expected Envelope, found {}",
            root.name
        )));
    }
    let body = root.require_child("Body")?;

    if let Some(fault) = body.child("Fault") {
        return Err(ProtocolError::Fault {
            code: fault.child_text("faultcode").unwrap_or_default().to_string(),
            message: fault.child_text("faultstring").unwrap_or_default().to_string(),
        });
    }

    body.child(operation.response_element())
        .cloned()
        .ok_or_else(|| {
            ProtocolError::MissingNode(format!("Body/{}", operation.response_element()))
        })
}

/// An element of a parsed response
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedNode {
    pub name: String,
    pub text: String,
    pub children: Vec<ParsedNode>,
}

impl ParsedNode {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<&ParsedNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name, in document order
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ParsedNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(ParsedNode::text)
    }

    /// Follow a `/`-free sequence of local names, taking the first match at each step
    pub fn path(&self, segments: &[&str]) -> Option<&ParsedNode> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn require_child(&self, name: &str) -> Result<&ParsedNode, ProtocolError> {
        self.child(name)
            .ok_or_else(|| ProtocolError::MissingNode(format!("{}/{name}", self.name)))
    }

    pub fn require_path(&self, segments: &[&str]) -> Result<&ParsedNode, ProtocolError> {
        self.path(segments).ok_or_else(|| {
            ProtocolError::MissingNode(format!("{}/{}", self.name, segments.join("/")))
        })
    }
}

fn parse_document(bytes: &[u8]) -> Result<ParsedNode, ProtocolError> {
    let xml = std::str::from_utf8(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    // Text is kept as sent: answers are matched literally, padding included
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<ParsedNode> = Vec::new();
    let mut root: Option<ParsedNode> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        match event {
            Event::Start(start) => {
                stack.push(ParsedNode::new(local_name(start.local_name().as_ref())?));
            }
            Event::Empty(start) => {
                let node = ParsedNode::new(local_name(start.local_name().as_ref())?);
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
                // Indentation between elements
                if text.trim().is_empty() {
                    continue;
                }
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = std::str::from_utf8(&data)
                    .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
                append_text(&mut stack, text)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| ProtocolError::Malformed("unexpected closing tag".into()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no data
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ProtocolError::Malformed("unclosed element".into()));
    }
    root.ok_or_else(|| ProtocolError::Malformed("empty document".into()))
}

fn local_name(raw: &[u8]) -> Result<String, ProtocolError> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| ProtocolError::Malformed(e.to_string()))
}

fn append_text(stack: &mut [ParsedNode], text: &str) -> Result<(), ProtocolError> {
    match stack.last_mut() {
        Some(node) => {
            node.text.push_str(text);
            Ok(())
        }
        None => Err(ProtocolError::Malformed("text outside of root element".into())),
    }
}

fn attach(
    stack: &mut [ParsedNode],
    root: &mut Option<ParsedNode>,
    node: ParsedNode,
) -> Result<(), ProtocolError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(ProtocolError::Malformed("multiple root elements".into())),
    }
    Ok(())
}
