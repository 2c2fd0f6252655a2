//! SMAPI search
//!
//! Searches a music service directly, with the household's linked account.
//! Search categories are the user-facing names from the service's
//! presentation map (`tracks`, `albums`, ...), translated to the service's
//! own ids before the request goes out.

use serde::Serialize;
use soap_client::{child_text, SoapClient};
use sonos_parser::{MusicService, MusicServiceAuth, PresentationMap};
use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::credentials::{credentials_header, result_element, SMAPI_NS};
use crate::error::{Result, SmapiError};
use crate::tokens::TokenReader;

/// Largest page a service is asked for
pub const MAX_SEARCH_COUNT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Category id from the presentation map, or a service category id
    pub category: String,
    pub term: String,
    pub index: u32,
    pub count: u32,
}

impl SearchRequest {
    pub fn new(category: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            term: term.into(),
            index: 0,
            count: 20,
        }
    }

    pub fn page(mut self, index: u32, count: u32) -> Self {
        self.index = index;
        self.count = count.min(MAX_SEARCH_COUNT);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchItemKind {
    /// `mediaMetadata`: a playable track or stream
    Media,
    /// `mediaCollection`: an album, playlist, artist, ...
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: String,
    pub kind: SearchItemKind,
    /// Service item type, e.g. `track`, `album`, `playlist`
    pub item_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub can_play: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub index: u32,
    pub count: u32,
    pub total: u32,
    pub items: Vec<SearchItem>,
}

/// Searches music services. Holds only the read half of the token store.
#[derive(Debug, Clone)]
pub struct SmapiSearchClient<R> {
    soap: SoapClient,
    store: R,
    device_id: String,
}

impl<R: TokenReader> SmapiSearchClient<R> {
    pub fn new(soap: SoapClient, store: R, device_id: impl Into<String>) -> Self {
        Self {
            soap,
            store,
            device_id: device_id.into(),
        }
    }

    pub async fn search(
        &self,
        service: &MusicService,
        household_id: &str,
        categories: &PresentationMap,
        request: &SearchRequest,
    ) -> Result<SearchResult> {
        let category = resolve_category(service, categories, &request.category)?;

        let tokens = match service.auth {
            MusicServiceAuth::Anonymous => None,
            MusicServiceAuth::DeviceLink | MusicServiceAuth::AppLink => Some(
                self.store
                    .load(&service.id.to_string(), household_id)?
                    .ok_or_else(|| SmapiError::NotLinked {
                        service: service.name.clone(),
                        household: household_id.to_string(),
                    })?,
            ),
        };
        let header = credentials_header(
            &self.device_id,
            tokens.as_ref().map(|t| (t, household_id)),
        );

        let payload = format!(
            "<id>{}</id><term>{}</term><index>{}</index><count>{}</count>",
            soap_client::escape_xml(category),
            soap_client::escape_xml(&request.term),
            request.index,
            request.count.min(MAX_SEARCH_COUNT)
        );
        debug!(service = %service.name, %category, term = %request.term, "SMAPI search");

        let response = self
            .soap
            .call_url(service.endpoint(), SMAPI_NS, "search", Some(&header), &payload)
            .await?;
        Ok(parse_search_result(result_element(&response, "search")?))
    }
}

/// Map a category through the presentation map. Service ids already present
/// as mapped values are accepted as-is.
fn resolve_category<'a>(
    service: &MusicService,
    categories: &'a PresentationMap,
    category: &'a str,
) -> Result<&'a str> {
    if let Some(mapped) = categories.get(category) {
        return Ok(mapped);
    }
    if categories.values().any(|mapped| mapped == category) {
        return Ok(category);
    }
    Err(SmapiError::UnknownCategory {
        service: service.name.clone(),
        category: category.to_string(),
    })
}

fn parse_number(xml: &Element, name: &str) -> u32 {
    child_text(xml, name)
        .and_then(|t| t.parse().ok())
        .unwrap_or_default()
}

fn parse_search_result(result: &Element) -> SearchResult {
    let items: Vec<SearchItem> = result
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter_map(|el| {
            let kind = match el.name.as_str() {
                "mediaMetadata" => SearchItemKind::Media,
                "mediaCollection" => SearchItemKind::Collection,
                _ => return None,
            };
            let track = el.get_child("trackMetadata");
            let field = |name: &str| {
                child_text(el, name)
                    .or_else(|| track.and_then(|t| child_text(t, name)))
                    .filter(|v| !v.is_empty())
            };
            Some(SearchItem {
                id: child_text(el, "id").unwrap_or_default(),
                kind,
                item_type: child_text(el, "itemType").unwrap_or_default(),
                title: child_text(el, "title").unwrap_or_default(),
                artist: field("artist"),
                album: field("album"),
                can_play: match child_text(el, "canPlay").as_deref() {
                    Some(value) => value == "true",
                    None => kind == SearchItemKind::Media,
                },
            })
        })
        .collect();

    SearchResult {
        index: parse_number(result, "index"),
        count: child_text(result, "count")
            .and_then(|t| t.parse().ok())
            .unwrap_or(items.len() as u32),
        total: parse_number(result, "total"),
        items,
    }
}
