//! Presentation map parser
//!
//! A presentation map is a per-service XML document. The only part this
//! crate consumes is the search section, which maps human-facing search
//! category ids to the `mappedId` the service expects in `search` requests:
//!
//! ```xml
//! <Presentation>
//!   <PresentationMap type="Search">
//!     <Match>
//!       <SearchCategories>
//!         <Category id="tracks" mappedId="search:track"/>
//!         <CustomCategory stringId="Blogs" mappedId="SBLG"/>
//!       </SearchCategories>
//!     </Match>
//!   </PresentationMap>
//! </Presentation>
//! ```
//!
//! `SearchCategories` is picked up at any depth. Some services spell the
//! attribute `mappedID`; both spellings are honoured.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{ParseError, ParseResult};

/// Search category id (or custom string id) to service-internal mapped id.
pub type PresentationMap = BTreeMap<String, String>;

fn attr(e: &BytesStart<'_>, name: &[u8]) -> ParseResult<Option<String>> {
    for a in e.attributes() {
        let a = a.map_err(|err| ParseError::InvalidXmlStructure(err.to_string()))?;
        if a.key.local_name().as_ref() == name {
            let value = a
                .unescape_value()
                .map_err(|err| ParseError::InvalidXmlStructure(err.to_string()))?;
            return Ok(Some(value.trim().to_string()));
        }
    }
    Ok(None)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn read_entry(e: &BytesStart<'_>) -> ParseResult<Option<(String, String)>> {
    let (id, mapped) = match e.local_name().as_ref() {
        b"Category" => {
            let mapped = match non_empty(attr(e, b"mappedId")?) {
                Some(m) => Some(m),
                None => non_empty(attr(e, b"mappedID")?),
            };
            (non_empty(attr(e, b"id")?), mapped)
        }
        b"CustomCategory" => (
            non_empty(attr(e, b"stringId")?),
            non_empty(attr(e, b"mappedId")?),
        ),
        _ => return Ok(None),
    };
    Ok(id.zip(mapped))
}

/// Parse the search-category mapping out of a presentation map document.
///
/// Entries with an empty id or mapped value are skipped. A document without
/// `SearchCategories` yields an empty map.
pub fn parse_presentation_map_xml(xml: &str) -> ParseResult<PresentationMap> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut out = PresentationMap::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut in_search = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                seen_root = true;
                depth += 1;
                if e.local_name().as_ref() == b"SearchCategories" {
                    in_search += 1;
                } else if in_search > 0 {
                    if let Some((id, mapped)) = read_entry(e)? {
                        out.insert(id, mapped);
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                seen_root = true;
                if in_search > 0 {
                    if let Some((id, mapped)) = read_entry(e)? {
                        out.insert(id, mapped);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                if e.local_name().as_ref() == b"SearchCategories" {
                    in_search = in_search.saturating_sub(1);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::XmlDeserializationFailed(format!(
                    "presentation map at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !seen_root {
        return Err(ParseError::MissingRequiredElement(
            "presentation map root element".to_string(),
        ));
    }
    if depth != 0 {
        return Err(ParseError::InvalidXmlStructure(
            "presentation map ended inside an open element".to_string(),
        ));
    }
    Ok(out)
}
