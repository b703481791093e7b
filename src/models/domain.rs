use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Error;

/// Subject area whose questions live in their own store partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Domain {
    #[serde(rename = "Computer_Security")]
    ComputerSecurity,
    #[serde(rename = "History")]
    History,
    #[serde(rename = "Social_Science")]
    SocialScience,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::ComputerSecurity, Domain::History, Domain::SocialScience];

    /// Partition key under which this domain's records are stored.
    pub fn partition(self) -> &'static str {
        match self {
            Domain::ComputerSecurity => "Computer_Security",
            Domain::History => "History",
            Domain::SocialScience => "Social_Science",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.partition())
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.partition() == s)
            .ok_or_else(|| Error::InvalidDomain(s.to_string()))
    }
}
