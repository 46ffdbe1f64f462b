//! Upgrade plan and installed upgrade binaries, as reported by Cosmovisor.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Unix timestamp of `0001-01-01T00:00:00Z`, the "unset" time written by
/// the Cosmos SDK upgrade module.
const UNSET_TIME_UNIX: i64 = -62_135_596_800;

/// Currently scheduled software upgrade.
///
/// Mirrors the SDK's `upgrade.v1beta1.Plan` as printed by
/// `query upgrade plan --output json`. An empty `name` means no upgrade is
/// pending.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradePlan {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub info: String,
    /// Target height, kept as the decimal string the chain reports.
    #[serde(
        default,
        rename = "height",
        deserialize_with = "deserialize_height",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_height: Option<String>,
    /// Explicit target time. May hold the zero time, meaning "unset".
    #[serde(default, rename = "time", skip_serializing_if = "Option::is_none")]
    pub target_time: Option<DateTime<Utc>>,
}

impl UpgradePlan {
    pub fn is_pending(&self) -> bool {
        !self.name.is_empty()
    }

    /// Returns the target time only when it is set to something other than
    /// the zero value.
    pub fn explicit_time(&self) -> Option<DateTime<Utc>> {
        self.target_time
            .filter(|t| t.timestamp() != UNSET_TIME_UNIX || t.timestamp_subsec_nanos() != 0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeightRepr {
    Number(i64),
    Text(String),
}

// The SDK writes the height as a JSON number, the gRPC gateway as a string.
fn deserialize_height<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<HeightRepr>::deserialize(deserializer)?.map(|h| match h {
            HeightRepr::Number(n) => n.to_string(),
            HeightRepr::Text(s) => s,
        }),
    )
}

/// Set of upgrade binaries present on disk, keyed by directory name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradeBinarySet {
    names: HashSet<String>,
}

impl UpgradeBinarySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Checks membership by the normalized name (see
    /// [`normalize_upgrade_name`]).
    pub fn has_upgrade(&self, normalized_name: &str) -> bool {
        self.names.contains(normalized_name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for UpgradeBinarySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Converts an upgrade plan name into the directory name Cosmovisor uses
/// under `upgrades/`: lowercased, then query-escaped (space becomes `+`).
pub fn normalize_upgrade_name(name: &str) -> String {
    form_urlencoded::byte_serialize(name.to_lowercase().as_bytes()).collect()
}
