//! API credentials and the region table.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// e24cloud regions supported by the driver.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Region {
    /// Warsaw data centre.
    #[default]
    EuPoland1Warszawa,
    /// Poznań data centre.
    EuPoland1Poznan,
}

struct RegionEntry {
    region: Region,
    name: &'static str,
    zone_id: &'static str,
}

const REGIONS: [RegionEntry; 2] = [
    RegionEntry {
        region: Region::EuPoland1Warszawa,
        name: "eu-poland-1warszawa",
        zone_id: "0daeacdb-7b1b-f510-d44e-ec8fd457d7aa",
    },
    RegionEntry {
        region: Region::EuPoland1Poznan,
        name: "eu-poland-1poznan",
        zone_id: "24e12e20-0851-5354-e2c3-04b16c4c9c45",
    },
];

/// Raised when a region name is not in the table.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("invalid region: {0} (expected eu-poland-1warszawa or eu-poland-1poznan)")]
pub struct UnknownRegion(pub String);

impl Region {
    fn entry(self) -> &'static RegionEntry {
        match self {
            Self::EuPoland1Warszawa => &REGIONS[0],
            Self::EuPoland1Poznan => &REGIONS[1],
        }
    }

    /// Returns the region name used in host names and configuration.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Returns the placement zone identifier sent in create requests.
    #[must_use]
    pub fn zone_id(self) -> &'static str {
        self.entry().zone_id
    }

    /// Returns the API base URL for the region, including the trailing slash.
    #[must_use]
    pub fn base_url(self) -> String {
        format!("https://{}.api.e24cloud.com/v2/", self.name())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        REGIONS
            .iter()
            .find(|entry| entry.name == trimmed)
            .map(|entry| entry.region)
            .ok_or_else(|| UnknownRegion(trimmed.to_owned()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key pair and region used to sign every request of one client.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    region: Region,
}

impl Credentials {
    /// Creates credentials for `region`.
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>, region: Region) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            region,
        }
    }

    /// Public half of the key pair, sent in the `Authorization` header.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Secret used to key the request HMAC.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Region the credentials target.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("eu-poland-1warszawa", Region::EuPoland1Warszawa)]
    #[case(" eu-poland-1poznan ", Region::EuPoland1Poznan)]
    fn parses_known_regions(#[case] raw: &str, #[case] expected: Region) {
        assert_eq!(raw.parse::<Region>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_region() {
        let err = "eu-germany-1".parse::<Region>().expect_err("unknown region");
        assert_eq!(err, UnknownRegion(String::from("eu-germany-1")));
    }

    #[test]
    fn zone_ids_differ_per_region() {
        assert_eq!(
            Region::EuPoland1Warszawa.zone_id(),
            "0daeacdb-7b1b-f510-d44e-ec8fd457d7aa"
        );
        assert_eq!(
            Region::EuPoland1Poznan.zone_id(),
            "24e12e20-0851-5354-e2c3-04b16c4c9c45"
        );
    }

    #[test]
    fn base_url_embeds_region_name() {
        assert_eq!(
            Region::EuPoland1Poznan.base_url(),
            "https://eu-poland-1poznan.api.e24cloud.com/v2/"
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("key", "hunter2", Region::default());
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"), "{rendered}");
        assert!(rendered.contains("key"), "{rendered}");
    }
}
