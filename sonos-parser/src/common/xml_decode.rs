//! XML decoding utilities shared by the document parsers.
//!
//! Sonos devices and SMAPI services mix namespace prefixes freely
//! (`dc:title`, `upnp:class`, `r:resMD`, ...). Stripping the prefixes before
//! handing the document to serde keeps the struct definitions simple and
//! makes the parsers indifferent to which prefix a vendor picked.

use crate::error::{ParseError, ParseResult};
use serde::de::DeserializeOwned;

/// Parse XML string into a deserializable type with namespace stripping.
pub fn parse<T: DeserializeOwned>(xml: &str) -> ParseResult<T> {
    let stripped = strip_namespaces(xml);
    quick_xml::de::from_str(&stripped)
        .map_err(|e| ParseError::XmlDeserializationFailed(e.to_string()))
}

/// Strip namespace prefixes from element and attribute names and drop
/// `xmlns` declarations.
///
/// Text content, comments, CDATA sections and processing instructions are
/// copied verbatim, so escaped payloads such as embedded DIDL-Lite stay intact.
///
/// # Example
///
/// Input: `<e:propertyset><dc:title>Song</dc:title></e:propertyset>`
/// Output: `<propertyset><title>Song</title></propertyset>`
pub fn strip_namespaces(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        rest = &rest[lt..];

        if let Some(marker) = verbatim_section_end(rest) {
            let end = rest
                .find(marker)
                .map(|i| i + marker.len())
                .unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        let end = tag_end(rest);
        rewrite_tag(&rest[..end], &mut out);
        rest = &rest[end..];
    }

    out.push_str(rest);
    out
}

fn verbatim_section_end(s: &str) -> Option<&'static str> {
    if s.starts_with("<!--") {
        Some("-->")
    } else if s.starts_with("<![CDATA[") {
        Some("]]>")
    } else if s.starts_with("<?") {
        Some("?>")
    } else if s.starts_with("<!") {
        Some(">")
    } else {
        None
    }
}

/// Byte index just past the `>` closing the tag at the start of `s`,
/// ignoring any `>` inside quoted attribute values.
fn tag_end(s: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return i + 1,
            None => {}
        }
    }
    s.len()
}

fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn rewrite_tag(tag: &str, out: &mut String) {
    let inner = &tag[1..];
    let (closing, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(inner.len());
    let (name, attrs) = inner.split_at(name_end);

    out.push('<');
    if closing {
        out.push('/');
    }
    out.push_str(local_name(name));
    rewrite_attributes(attrs, out);
}

fn rewrite_attributes(mut s: &str, out: &mut String) {
    loop {
        let trimmed = s.trim_start();
        out.push_str(&s[..s.len() - trimmed.len()]);
        s = trimmed;
        if s.is_empty() || s.starts_with('/') || s.starts_with('>') {
            out.push_str(s);
            return;
        }

        let name_end = s
            .find(|c: char| c == '=' || c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(s.len());
        let name = &s[..name_end];
        s = &s[name_end..];

        let mut value = "";
        if let Some(after_eq) = s.trim_start().strip_prefix('=') {
            let v = after_eq.trim_start();
            match v.chars().next() {
                Some(q) if q == '"' || q == '\'' => {
                    let close = v[1..].find(q).map(|i| i + 2).unwrap_or(v.len());
                    value = &v[..close];
                    s = &v[close..];
                }
                _ => {
                    let end = v
                        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                        .unwrap_or(v.len());
                    value = &v[..end];
                    s = &v[end..];
                }
            }
        }

        if name.starts_with("xmlns") {
            continue;
        }
        out.push_str(local_name(name));
        if !value.is_empty() {
            out.push('=');
            out.push_str(value);
        }
    }
}
