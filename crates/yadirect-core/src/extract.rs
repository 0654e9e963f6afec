//! Result extraction for JSON resources
//!
//! Every API method wraps its payload under a method-specific key of `result`
//! (`AddResults`, `Campaigns`, ...). The tables here map method and resource to
//! that key.

use serde_json::Value;
use tracing::warn;

use crate::resources::Resource;
use crate::{Error, Result};

/// Where a method's payload lives inside `result`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKey {
    /// Array under this key
    Field(&'static str),
    /// The `result` object itself
    Whole,
}

/// Result key for non-`get` methods
pub fn method_result_key(method: &str) -> Option<ResultKey> {
    let key = match method {
        "add" => "AddResults",
        "update" => "UpdateResults",
        "unarchive" => "UnarchiveResults",
        "suspend" => "SuspendResults",
        "resume" => "ResumeResults",
        "delete" => "DeleteResults",
        "archive" => "ArchiveResults",
        "moderate" => "ModerateResults",
        "setBids" => "SetBidsResults",
        "set" => "SetResults",
        "setAuto" => "SetAutoResults",
        "toggle" => "ToggleResults",
        "hasSearchVolume" => "HasSearchVolumeResults",
        "checkDictionaries" | "checkCampaigns" | "check" => return Some(ResultKey::Whole),
        _ => return None,
    };
    Some(ResultKey::Field(key))
}

/// Result key of `get` for each resource
pub fn get_result_key(resource: Resource) -> Option<&'static str> {
    let key = match resource.endpoint() {
        "campaigns" => "Campaigns",
        "adgroups" => "AdGroups",
        "ads" => "Ads",
        "audiencetargets" => "AudienceTargets",
        "creatives" => "Creatives",
        "adimages" => "AdImages",
        "vcards" => "VCards",
        "sitelinks" => "SitelinksSets",
        "adextensions" => "AdExtensions",
        "keywords" => "Keywords",
        "retargetinglists" => "RetargetingLists",
        "bids" => "Bids",
        "keywordbids" => "KeywordBids",
        "bidmodifiers" => "BidModifiers",
        "agencyclients" | "clients" => "Clients",
        "leads" => "Leads",
        "dynamictextadtargets" => "Webpages",
        "turbopages" => "TurboPages",
        "negativekeywordsharedsets" => "NegativeKeywordSharedSets",
        "businesses" => "Businesses",
        "feeds" => "Feeds",
        "smartadtargets" => "SmartAdTargets",
        _ => return None,
    };
    Some(key)
}

/// Resolve the result key for `method` on `resource`
pub fn result_key(method: &str, resource: Resource) -> Result<ResultKey> {
    if resource.is_report() {
        return Err(Error::UnsupportedResource {
            resource: resource.to_string(),
        });
    }
    if method == "get" {
        return get_result_key(resource)
            .map(ResultKey::Field)
            .ok_or_else(|| Error::UnsupportedResource {
                resource: resource.to_string(),
            });
    }
    method_result_key(method).ok_or_else(|| Error::UnsupportedMethod {
        method: method.to_string(),
    })
}

/// Payload of one response body
///
/// A missing key yields an empty array; the server leaves it out when nothing matched.
pub fn extract(method: &str, resource: Resource, body: &Value) -> Result<Value> {
    let key = result_key(method, resource)?;
    let result = body.get("result").ok_or_else(|| Error::Decode {
        message: format!("{} response for {} has no result object", method, resource),
    })?;

    match key {
        ResultKey::Whole => Ok(result.clone()),
        ResultKey::Field(field) => Ok(result
            .get(field)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()))),
    }
}

/// Payload of a multi-page or multi-chunk call
///
/// `get` arrays are concatenated in page order. Other methods only have one
/// meaningful page, the first.
pub fn extract_pages<'a, I>(method: &str, resource: Resource, bodies: I) -> Result<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let key = result_key(method, resource)?;
    let mut bodies = bodies.into_iter();

    if method != "get" {
        let first = bodies.next().ok_or_else(|| Error::Decode {
            message: format!("{} call for {} returned no pages", method, resource),
        })?;
        let extra = bodies.count();
        if extra > 0 {
            warn!(method, resource = %resource, extra, "ignoring pages after the first");
        }
        return extract(method, resource, first);
    }

    let ResultKey::Field(field) = key else {
        return Err(Error::UnsupportedMethod {
            method: method.to_string(),
        });
    };

    let mut items = Vec::new();
    for body in bodies {
        match extract(method, resource, body)? {
            Value::Array(page_items) => items.extend(page_items),
            other => {
                return Err(Error::Decode {
                    message: format!("result.{} is not an array: {}", field, other),
                })
            }
        }
    }
    Ok(Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_get_clients_empty() {
        let body = json!({"result": {"Clients": []}});
        assert_eq!(extract("get", Resource::Clients, &body).unwrap(), json!([]));
    }

    #[test]
    fn test_add_results() {
        let body = json!({"result": {"AddResults": [{"Id": 1}]}});
        assert_eq!(extract("add", Resource::Campaigns, &body).unwrap(), json!([{"Id": 1}]));
    }

    #[test]
    fn test_missing_key_is_empty() {
        let body = json!({"result": {}});
        assert_eq!(extract("get", Resource::Campaigns, &body).unwrap(), json!([]));
    }

    #[test]
    fn test_check_returns_whole_result() {
        let body = json!({"result": {"Modified": {"CampaignIds": [1]}, "Timestamp": "2024"}});
        assert_eq!(
            extract("checkCampaigns", Resource::Changes, &body).unwrap(),
            body["result"]
        );
    }

    #[test]
    fn test_has_search_volume() {
        let body = json!({"result": {"HasSearchVolumeResults": [{"Keyword": "x"}]}});
        assert_eq!(
            extract("hasSearchVolume", Resource::KeywordsResearch, &body).unwrap(),
            json!([{"Keyword": "x"}])
        );
    }

    #[test]
    fn test_get_key_table() {
        assert_eq!(get_result_key(Resource::DynamicAds), Some("Webpages"));
        assert_eq!(get_result_key(Resource::Sitelinks), Some("SitelinksSets"));
        assert_eq!(get_result_key(Resource::AgencyClients), Some("Clients"));
        assert_eq!(get_result_key(Resource::Dictionaries), None);
    }

    #[test]
    fn test_unsupported() {
        let body = json!({"result": {}});
        assert_eq!(
            extract("frobnicate", Resource::Campaigns, &body).unwrap_err().kind(),
            ErrorKind::UnsupportedMethod
        );
        assert_eq!(
            extract("get", Resource::Dictionaries, &body).unwrap_err().kind(),
            ErrorKind::UnsupportedResource
        );
        assert_eq!(
            extract("get", Resource::Reports, &body).unwrap_err().kind(),
            ErrorKind::UnsupportedResource
        );
    }

    #[test]
    fn test_missing_result_is_decode_error() {
        let err = extract("get", Resource::Ads, &json!({"data": 1})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_extract_pages_concatenates_get() {
        let first = json!({"result": {"Clients": [{"id": 1}], "LimitedBy": 1}});
        let second = json!({"result": {"Clients": [{"id": 2}]}});
        let items = extract_pages("get", Resource::Clients, [&first, &second]).unwrap();
        assert_eq!(items, json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_extract_pages_uses_first_for_other_methods() {
        let first = json!({"result": {"DeleteResults": [{"Id": 1}]}});
        let second = json!({"result": {"DeleteResults": [{"Id": 2}]}});
        let items = extract_pages("delete", Resource::Ads, [&first, &second]).unwrap();
        assert_eq!(items, json!([{"Id": 1}]));
    }
}
