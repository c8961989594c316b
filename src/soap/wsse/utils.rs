use crate::soap::wsse::{Namespaces, Result, SigningError};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;

/// An element cut out of a document together with the namespace
/// declarations its ancestors put in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub xml: String,
    pub namespaces: Namespaces,
}

/// Extract element by `Id`, `wsu:Id` or `xml:id` attribute
pub fn extract_element_by_id(xml: &str, id: &str) -> Result<Fragment> {
    extract_with_predicate(xml, |e| {
        e.attributes().filter_map(|a| a.ok()).any(|attr| {
            let is_id = attr.key.as_ref() == b"xml:id" || attr.key.local_name().as_ref() == b"Id";
            is_id && attr.unescape_value().ok().as_deref() == Some(id)
        })
    })?
    .ok_or_else(|| SigningError::Invalid(format!("element with Id '{id}' not found")))
}

/// Extract the first element with the given local name
pub fn extract_element(xml: &str, name: &str) -> Result<Fragment> {
    let target = name.as_bytes();
    extract_with_predicate(xml, |e| e.local_name().as_ref() == target)?
        .ok_or_else(|| SigningError::Invalid(format!("element '{name}' not found")))
}

/// Extract element by predicate
fn extract_with_predicate<F>(xml: &str, mut predicate: F) -> Result<Option<Fragment>>
where
    F: FnMut(&BytesStart) -> bool,
{
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut writer = Writer::new(Vec::new());
    let mut scopes = vec![Namespaces::new()];
    let mut found: Option<Namespaces> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if found.is_some() {
                    depth += 1;
                    writer.write_event(Event::Start(e))?;
                } else if predicate(&e) {
                    found = scopes.last().cloned();
                    depth = 1;
                    writer.write_event(Event::Start(e))?;
                } else {
                    let mut scope = scopes.last().cloned().unwrap_or_default();
                    declare_namespaces(&mut scope, &e)?;
                    scopes.push(scope);
                }
            }
            Event::End(e) => {
                if found.is_some() {
                    writer.write_event(Event::End(e))?;
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                } else {
                    scopes.pop();
                }
            }
            Event::Eof => break,
            e => {
                if found.is_some() {
                    writer.write_event(e)?;
                }
            }
        }
    }

    match found {
        Some(namespaces) => Ok(Some(Fragment {
            xml: String::from_utf8(writer.into_inner())?,
            namespaces,
        })),
        None => Ok(None),
    }
}

fn declare_namespaces(scope: &mut Namespaces, e: &BytesStart) -> Result<()> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = attr.key.as_ref();
        let prefix = if key == b"xmlns" {
            ""
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            std::str::from_utf8(prefix)?
        } else {
            continue;
        };
        let uri = attr.unescape_value()?;
        if uri.is_empty() && prefix.is_empty() {
            scope.remove("");
        } else {
            scope.insert(prefix.to_string(), uri.into_owned());
        }
    }
    Ok(())
}

/// Writes each `ds:DigestValue` whose enclosing `ds:Reference` URI has an
/// entry in `digests`.
pub fn fill_digest_values(xml: &str, digests: &HashMap<String, String>) -> Result<String> {
    let mut current_uri: Option<String> = None;
    replace_text(xml, |e| match e.local_name().as_ref() {
        b"Reference" => {
            current_uri = attribute_value(e, b"URI")?;
            Ok(None)
        }
        b"DigestValue" => Ok(current_uri
            .as_ref()
            .and_then(|uri| digests.get(uri))
            .cloned()),
        _ => Ok(None),
    })
}

/// Writes the first `ds:SignatureValue` of the document
pub fn fill_signature_value(xml: &str, value: &str) -> Result<String> {
    let mut filled = false;
    let signed = replace_text(xml, |e| {
        if !filled && e.local_name().as_ref() == b"SignatureValue" {
            filled = true;
            return Ok(Some(value.to_string()));
        }
        Ok(None)
    })?;
    if !filled {
        return Err(SigningError::Invalid("element 'SignatureValue' not found".into()));
    }
    Ok(signed)
}

/// Copies the document, replacing the content of every element for which
/// `replacement` yields a text.
fn replace_text<F>(xml: &str, mut replacement: F) -> Result<String>
where
    F: FnMut(&BytesStart) -> Result<Option<String>>,
{
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 512));
    // Depth inside a replaced element whose old content is dropped
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(e) => {
                    skip_depth -= 1;
                    if skip_depth == 0 {
                        writer.write_event(Event::End(e))?;
                    }
                }
                Event::Eof => return Err(SigningError::Xml("unexpected end of document".into())),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match replacement(&e)? {
                Some(text) => {
                    writer.write_event(Event::Start(e))?;
                    writer.write_event(Event::Text(BytesText::new(&text)))?;
                    skip_depth = 1;
                }
                None => writer.write_event(Event::Start(e))?,
            },
            Event::Empty(e) => match replacement(&e)? {
                Some(text) => {
                    let end = e.to_end().into_owned();
                    writer.write_event(Event::Start(e))?;
                    writer.write_event(Event::Text(BytesText::new(&text)))?;
                    writer.write_event(Event::End(end))?;
                }
                None => writer.write_event(Event::Empty(e))?,
            },
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn attribute_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
