//! Small quick-xml reading helpers shared by the package and nav parsers

use quick_xml::events::{BytesStart, BytesText};
use quick_xml::Reader;

/// Decode bytes as UTF-8 (lossy), dropping a leading byte-order mark
pub fn decode_utf8(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Reader over a string with whitespace-only text trimmed
pub fn reader(text: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    reader
}

/// Local (unprefixed) element name
pub fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Attributes as (local name, unescaped value) pairs. Malformed attributes
/// are skipped.
pub fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect()
}

/// Value of one attribute by local name
pub fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    attributes(e)
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}

/// Unescaped text; unknown entities (common in XHTML) fall back to the raw text
pub fn text(t: &BytesText<'_>) -> String {
    t.unescape()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(t).into_owned())
}
