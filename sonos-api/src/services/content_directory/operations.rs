use std::fmt;

use serde::{Deserialize, Serialize};
use sonos_parser::{parse_didl_items, DidlItem, ParseResult};
use xmltree::Element;

use crate::error::ControlError;
use crate::operation::{arg, parse_field, text_field, SonosOperation, Validate, ValidationError};
use crate::service::Service;

/// Object id of the household's Sonos Favorites
pub const FAVORITES_OBJECT_ID: &str = "FV:2";

/// Upper bound the device enforces on `RequestedCount`
pub const MAX_BROWSE_COUNT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowseFlag {
    BrowseMetadata,
    BrowseDirectChildren,
}

impl fmt::Display for BrowseFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowseFlag::BrowseMetadata => f.write_str("BrowseMetadata"),
            BrowseFlag::BrowseDirectChildren => f.write_str("BrowseDirectChildren"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseOperationRequest {
    pub object_id: String,
    pub browse_flag: BrowseFlag,
    pub filter: String,
    pub starting_index: u32,
    /// 0 asks for everything the device is willing to return
    pub requested_count: u32,
    pub sort_criteria: String,
}

impl Validate for BrowseOperationRequest {
    fn validate_boundary(&self) -> Result<(), ValidationError> {
        if self.object_id.is_empty() {
            return Err(ValidationError::missing("object_id"));
        }
        if self.requested_count > MAX_BROWSE_COUNT {
            return Err(ValidationError::range_error(
                "requested_count",
                0,
                MAX_BROWSE_COUNT,
                self.requested_count,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseResponse {
    /// DIDL-Lite document with the returned objects
    pub result: String,
    pub number_returned: u32,
    pub total_matches: u32,
    pub update_id: u32,
}

impl BrowseResponse {
    /// Parse the returned DIDL-Lite document. An empty result has no items.
    pub fn items(&self) -> ParseResult<Vec<DidlItem>> {
        if self.result.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_didl_items(&self.result)
    }
}

pub struct BrowseOperation;

impl SonosOperation for BrowseOperation {
    type Request = BrowseOperationRequest;
    type Response = BrowseResponse;

    const SERVICE: Service = Service::ContentDirectory;
    const ACTION: &'static str = "Browse";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok([
            arg("ObjectID", &request.object_id),
            arg("BrowseFlag", request.browse_flag),
            arg("Filter", &request.filter),
            arg("StartingIndex", request.starting_index),
            arg("RequestedCount", request.requested_count),
            arg("SortCriteria", &request.sort_criteria),
        ]
        .concat())
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(BrowseResponse {
            result: text_field(xml, "Result")?,
            number_returned: parse_field(xml, "NumberReturned")?,
            total_matches: parse_field(xml, "TotalMatches")?,
            update_id: parse_field(xml, "UpdateID")?,
        })
    }
}

/// Request the children of `object_id`, all metadata fields.
pub fn browse_children(
    object_id: impl Into<String>,
    starting_index: u32,
    requested_count: u32,
) -> BrowseOperationRequest {
    BrowseOperationRequest {
        object_id: object_id.into(),
        browse_flag: BrowseFlag::BrowseDirectChildren,
        filter: "*".to_string(),
        starting_index,
        requested_count,
        sort_criteria: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ValidationLevel;

    #[test]
    fn test_browse_payload() {
        let payload = BrowseOperation::build_payload(&browse_children(FAVORITES_OBJECT_ID, 0, 100)).unwrap();
        assert_eq!(
            payload,
            "<ObjectID>FV:2</ObjectID><BrowseFlag>BrowseDirectChildren</BrowseFlag><Filter>*</Filter><StartingIndex>0</StartingIndex><RequestedCount>100</RequestedCount><SortCriteria></SortCriteria>"
        );
    }

    #[test]
    fn test_browse_validation() {
        assert!(browse_children("", 0, 10)
            .validate(ValidationLevel::Boundary)
            .is_err());
        assert!(browse_children("Q:0", 0, 5000)
            .validate(ValidationLevel::Boundary)
            .is_err());
    }

    #[test]
    fn test_parse_browse_response_items() {
        let xml = Element::parse(
            r#"<BrowseResponse><Result>&lt;DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/"&gt;&lt;item id="FV:2/3" parentID="FV:2" restricted="false"&gt;&lt;dc:title&gt;Radio&lt;/dc:title&gt;&lt;upnp:class&gt;object.itemobject.item.sonos-favorite&lt;/upnp:class&gt;&lt;res&gt;x-sonosapi-stream:s1234&lt;/res&gt;&lt;/item&gt;&lt;/DIDL-Lite&gt;</Result><NumberReturned>1</NumberReturned><TotalMatches>1</TotalMatches><UpdateID>7</UpdateID></BrowseResponse>"#
                .as_bytes(),
        )
        .unwrap();
        let response = BrowseOperation::parse_response(&xml).unwrap();
        assert_eq!(response.total_matches, 1);
        let items = response.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Radio");
        assert_eq!(items[0].uri, "x-sonosapi-stream:s1234");
    }

    #[test]
    fn test_empty_result_has_no_items() {
        let response = BrowseResponse {
            result: String::new(),
            number_returned: 0,
            total_matches: 0,
            update_id: 1,
        };
        assert!(response.items().unwrap().is_empty());
    }
}
