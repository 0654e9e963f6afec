//! Resource catalog: logical resource names and their API paths

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Path prefix shared by every v5 JSON resource
pub const API_PREFIX: &str = "json/v5";

/// Every resource the client can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    AdExtensions,
    AdGroups,
    AdImages,
    Ads,
    AgencyClients,
    AudienceTargets,
    BidModifiers,
    Bids,
    Businesses,
    Campaigns,
    Changes,
    Clients,
    Creatives,
    Dictionaries,
    DynamicAds,
    Feeds,
    KeywordBids,
    Keywords,
    KeywordsResearch,
    Leads,
    NegativeKeywordSharedSets,
    Reports,
    Retargeting,
    Sitelinks,
    SmartAdTargets,
    TurboPages,
    VCards,
}

impl Resource {
    pub const ALL: [Resource; 27] = [
        Resource::AdExtensions,
        Resource::AdGroups,
        Resource::AdImages,
        Resource::Ads,
        Resource::AgencyClients,
        Resource::AudienceTargets,
        Resource::BidModifiers,
        Resource::Bids,
        Resource::Businesses,
        Resource::Campaigns,
        Resource::Changes,
        Resource::Clients,
        Resource::Creatives,
        Resource::Dictionaries,
        Resource::DynamicAds,
        Resource::Feeds,
        Resource::KeywordBids,
        Resource::Keywords,
        Resource::KeywordsResearch,
        Resource::Leads,
        Resource::NegativeKeywordSharedSets,
        Resource::Reports,
        Resource::Retargeting,
        Resource::Sitelinks,
        Resource::SmartAdTargets,
        Resource::TurboPages,
        Resource::VCards,
    ];

    /// Name callers use to address the resource
    pub fn name(&self) -> &'static str {
        match self {
            Resource::AdExtensions => "adextensions",
            Resource::AdGroups => "adgroups",
            Resource::AdImages => "adimages",
            Resource::Ads => "ads",
            Resource::AgencyClients => "agencyclients",
            Resource::AudienceTargets => "audiencetargets",
            Resource::BidModifiers => "bidmodifiers",
            Resource::Bids => "bids",
            Resource::Businesses => "businesses",
            Resource::Campaigns => "campaigns",
            Resource::Changes => "changes",
            Resource::Clients => "clients",
            Resource::Creatives => "creatives",
            Resource::Dictionaries => "dictionaries",
            Resource::DynamicAds => "dynamicads",
            Resource::Feeds => "feeds",
            Resource::KeywordBids => "keywordbids",
            Resource::Keywords => "keywords",
            Resource::KeywordsResearch => "keywordsresearch",
            Resource::Leads => "leads",
            Resource::NegativeKeywordSharedSets => "negativekeywordsharedsets",
            Resource::Reports => "reports",
            Resource::Retargeting => "retargeting",
            Resource::Sitelinks => "sitelinks",
            Resource::SmartAdTargets => "smartadtargets",
            Resource::TurboPages => "turbopages",
            Resource::VCards => "vcards",
        }
    }

    /// Last path segment on the server; differs from the name for a few resources
    pub fn endpoint(&self) -> &'static str {
        match self {
            Resource::DynamicAds => "dynamictextadtargets",
            Resource::Retargeting => "retargetinglists",
            other => other.name(),
        }
    }

    /// Path relative to the api root, e.g. `json/v5/campaigns`
    pub fn path(&self) -> String {
        format!("{}/{}", API_PREFIX, self.endpoint())
    }

    /// The long-running TSV report resource
    pub fn is_report(&self) -> bool {
        matches!(self, Resource::Reports)
    }

    pub fn docs_url(&self) -> String {
        match self {
            Resource::Reports => "https://yandex.ru/dev/direct/doc/reports/reports-docpage/".to_string(),
            other => format!(
                "https://yandex.ru/dev/direct/doc/ref-v5/{0}/{0}-docpage/",
                other.endpoint()
            ),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.name() == wanted || r.endpoint() == wanted)
            .ok_or(Error::UnknownResource { name: s.to_string() })
    }
}
