use quick_xml::de::from_str as quick_xml_from_str;
use quick_xml::events::Event;
use quick_xml::{DeError, Reader, Writer};
use serde::de::DeserializeOwned;

/// Deserialize an instance of type T from a string of XML text.
///
/// Whitespace-only text between elements is dropped first so that
/// pretty-printed documents decode the same as compact ones.
pub fn from_str<T>(xml: &str) -> Result<T, DeError>
where
    T: DeserializeOwned,
{
    if !xml.contains('\n') && !xml.contains('\r') {
        return quick_xml_from_str(xml);
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut output_buf = Vec::with_capacity(xml.len());
    let mut writer = Writer::new(&mut output_buf);

    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let mut text = e.into_owned();
                text.inplace_trim_start();
                let empty = text.inplace_trim_end();
                if !empty {
                    writer
                        .write_event(Event::Text(text))
                        .map_err(|e| DeError::Custom(e.to_string()))?;
                }
            }
            Event::Eof => break,
            event => writer
                .write_event(event)
                .map_err(|e| DeError::Custom(e.to_string()))?,
        }
    }

    let normalized_xml =
        std::str::from_utf8(&output_buf).map_err(|e| DeError::Custom(e.to_string()))?;

    quick_xml_from_str(normalized_xml)
}

/// Checks that the text is a single well-formed XML document.
///
/// Exactly one root element is required and nothing but whitespace,
/// comments or processing instructions may appear outside of it.
pub fn check_well_formed(xml: &str) -> Result<(), DeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(_) if depth == 0 => roots += 1,
            Event::Text(text) if depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(DeError::Custom("text outside of the root element".into()));
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err(DeError::Custom("CDATA outside of the root element".into()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(DeError::Custom("unclosed element".into()));
    }
    match roots {
        1 => Ok(()),
        0 => Err(DeError::Custom("no root element".into())),
        _ => Err(DeError::Custom("more than one root element".into())),
    }
}
