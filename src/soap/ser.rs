use std::io::Write;

use crate::soap::config::XmlConfig;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::se::to_writer as quick_xml_to_writer;
use quick_xml::{Reader, SeError, Writer};
use serde::Serialize;

const XML_VERSION: &str = "1.0";
const UTF8: &str = "UTF-8";
const INDENT: (u8, usize) = (b' ', 2);

/// Serializes a value to an XML document with the given configuration.
///
/// Namespaces from the configuration are declared on the root element.
/// Text content is passed through untouched.
pub fn to_string<T>(config: &XmlConfig, value: &T) -> Result<String, SeError>
where
    T: Serialize,
{
    render(config, value, None)
}

/// Like [`to_string`], with the already encoded `content` written as the
/// children of the first element named `host`.
pub fn to_string_with_content<T>(
    config: &XmlConfig,
    value: &T,
    host: &str,
    content: &str,
) -> Result<String, SeError>
where
    T: Serialize,
{
    render(config, value, Some((host, content)))
}

fn render<T>(config: &XmlConfig, value: &T, mut splice: Option<(&str, &str)>) -> Result<String, SeError>
where
    T: Serialize,
{
    let mut xml_buf = String::new();
    quick_xml_to_writer(&mut xml_buf, value)?;

    let mut reader = Reader::from_str(&xml_buf);
    reader.config_mut().trim_text(false);

    let mut output_buf = Vec::with_capacity(xml_buf.len() + 128);
    let mut writer = if config.pretty {
        Writer::new_with_indent(&mut output_buf, INDENT.0, INDENT.1)
    } else {
        Writer::new(&mut output_buf)
    };

    let decl = BytesDecl::new(XML_VERSION, Some(UTF8), None);
    writer.write_event(Event::Decl(decl))?;

    let mut is_root = true;

    loop {
        match reader.read_event() {
            Ok(Event::Start(mut start)) => {
                if is_root {
                    declare_namespaces(config, &mut start);
                    is_root = false;
                }
                let content = take_host(&mut splice, &start);
                writer.write_event(Event::Start(start))?;
                if let Some(content) = content {
                    write_fragment(&mut writer, content)?;
                }
            }
            Ok(Event::Empty(mut start)) => {
                if is_root {
                    declare_namespaces(config, &mut start);
                    is_root = false;
                }
                match take_host(&mut splice, &start) {
                    Some(content) => {
                        let end = start.to_end().into_owned();
                        writer.write_event(Event::Start(start))?;
                        write_fragment(&mut writer, content)?;
                        writer.write_event(Event::End(end))?;
                    }
                    None => writer.write_event(Event::Empty(start))?,
                }
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => return Err(SeError::Custom(e.to_string())),
        }
    }

    if let Some((host, _)) = splice {
        return Err(SeError::Custom(format!("no <{host}> element to hold the content")));
    }

    String::from_utf8(output_buf).map_err(|e| SeError::Custom(e.to_string()))
}

fn declare_namespaces(config: &XmlConfig, start: &mut BytesStart<'_>) {
    for (prefix, uri) in config.namespaces.iter() {
        let attr_name = if prefix.is_empty() {
            "xmlns".into()
        } else {
            format!("xmlns:{prefix}")
        };
        start.push_attribute((attr_name.as_str(), uri.as_str()));
    }
}

fn take_host<'c>(splice: &mut Option<(&str, &'c str)>, start: &BytesStart<'_>) -> Option<&'c str> {
    match *splice {
        Some((host, content)) if start.name().as_ref() == host.as_bytes() => {
            *splice = None;
            Some(content)
        }
        _ => None,
    }
}

fn write_fragment<W: Write>(writer: &mut Writer<W>, fragment: &str) -> Result<(), SeError> {
    let mut reader = Reader::from_str(fragment);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(event) => writer.write_event(event)?,
            Err(e) => return Err(SeError::Custom(e.to_string())),
        }
    }
}
