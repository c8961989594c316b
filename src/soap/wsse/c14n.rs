use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::str;

use crate::soap::wsse::{Result, SigningError};

/// In-scope namespace declarations, prefix to URI; `""` is the default namespace.
pub type Namespaces = BTreeMap<String, String>;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Perform Exclusive XML Canonicalization of a single element.
///
/// `inherited` holds the declarations in scope at the element's position in
/// its original document; the ones the element visibly uses are rendered on
/// it.
pub fn canonicalize(xml: impl AsRef<str>, inherited: &Namespaces) -> Result<String> {
    let mut reader = Reader::from_str(xml.as_ref());
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut out = String::with_capacity(xml.as_ref().len());

    // Stack of declared namespace maps
    let mut ns_declared_stack = vec![inherited.clone()];
    // Stack of rendered namespace maps
    let mut ns_rendered_stack = vec![Namespaces::new()];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                handle_start(&mut out, &e, &mut ns_declared_stack, &mut ns_rendered_stack)?;
            }
            Event::End(e) => {
                out.push_str("</");
                out.push_str(str::from_utf8(e.name().as_ref())?);
                out.push('>');
                ns_declared_stack.pop();
                ns_rendered_stack.pop();
            }
            // Text outside the element is not part of its canonical form
            Event::Text(e) if ns_declared_stack.len() > 1 => {
                let raw = normalize_line_endings(str::from_utf8(&e)?);
                let text = unescape(&raw).map_err(|e| SigningError::Xml(e.to_string()))?;
                escape_text_value(&mut out, &text);
            }
            Event::CData(e) if ns_declared_stack.len() > 1 => {
                // CDATA is normalized to text content
                let raw = normalize_line_endings(str::from_utf8(&e)?);
                escape_text_value(&mut out, &raw);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Normalize line endings to LF as an XML processor would
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Attribute-value normalization for CDATA-typed attributes
fn normalize_attr_whitespace(value: &str) -> Cow<'_, str> {
    if !value.contains(['\r', '\n', '\t']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        normalize_line_endings(value)
            .chars()
            .map(|c| if matches!(c, '\n' | '\t') { ' ' } else { c })
            .collect(),
    )
}

/// Escape attribute value per C14N rules.
fn escape_attr_value(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

/// Escape text node value per C14N rules.
fn escape_text_value(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

fn prefix_of(qname: &str) -> &str {
    qname.split_once(':').map(|(prefix, _)| prefix).unwrap_or("")
}

/// Handle a Start tag event: writes the start tag with canonicalized attributes & namespaces.
fn handle_start(
    out: &mut String,
    e: &BytesStart,
    ns_declared_stack: &mut Vec<Namespaces>,
    ns_rendered_stack: &mut Vec<Namespaces>,
) -> Result<()> {
    let mut declared = ns_declared_stack.last().cloned().unwrap_or_default();
    let parent_rendered = ns_rendered_stack.last().cloned().unwrap_or_default();

    // Separate namespace declarations vs regular attributes
    let mut regular_attrs = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?;
        let raw = str::from_utf8(&attr.value)?;
        let value = unescape(&normalize_attr_whitespace(raw))
            .map_err(|e| SigningError::Xml(e.to_string()))?
            .into_owned();

        if key == "xmlns" {
            if value.is_empty() {
                declared.remove("");
            } else {
                declared.insert(String::new(), value);
            }
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.insert(prefix.to_string(), value);
        } else {
            regular_attrs.push((key.to_string(), value));
        }
    }

    let name = str::from_utf8(e.name().into_inner())?;

    // Determine visibly-utilized prefixes
    let mut visibly_utilized = BTreeSet::new();
    visibly_utilized.insert(prefix_of(name).to_string());
    for (key, _) in &regular_attrs {
        // unprefixed attributes are in no namespace; xml: is implicitly bound
        let prefix = prefix_of(key);
        if !prefix.is_empty() && prefix != "xml" {
            visibly_utilized.insert(prefix.to_string());
        }
    }

    // Namespace declarations to render, already in prefix order
    let mut render_ns: Vec<(String, String)> = Vec::new();
    for prefix in visibly_utilized {
        match declared.get(&prefix) {
            Some(uri) => {
                if parent_rendered.get(&prefix) != Some(uri) {
                    render_ns.push((prefix, uri.clone()));
                }
            }
            // an output ancestor rendered a default namespace that no longer applies
            None if prefix.is_empty() => {
                if parent_rendered.get("").is_some_and(|uri| !uri.is_empty()) {
                    render_ns.push((prefix, String::new()));
                }
            }
            None => {}
        }
    }

    out.push('<');
    out.push_str(name);

    for (prefix, uri) in &render_ns {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attr_value(out, uri);
        out.push('"');
    }

    // Sort attributes by namespace URI, then local name
    let mut attr_info: Vec<(&str, &str, &str, &str)> = regular_attrs
        .iter()
        .map(|(key, value)| {
            let (ns_uri, local_name) = match key.split_once(':') {
                Some(("xml", local)) => (XML_NS, local),
                Some((prefix, local)) => (declared.get(prefix).map(String::as_str).unwrap_or(""), local),
                None => ("", key.as_str()),
            };
            (ns_uri, local_name, key.as_str(), value.as_str())
        })
        .collect();
    attr_info.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    for (_, _, key, value) in &attr_info {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attr_value(out, value);
        out.push('"');
    }
    out.push('>');

    let mut rendered = parent_rendered;
    for (prefix, uri) in render_ns {
        rendered.insert(prefix, uri);
    }
    ns_declared_stack.push(declared);
    ns_rendered_stack.push(rendered);
    Ok(())
}
