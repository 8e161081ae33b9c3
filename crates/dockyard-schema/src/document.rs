use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// How the container relates to the data tier it talks to.
///
/// `web_only` containers share an external database with other instances, so a
/// rebuild keeps the old container serving until the new image is committed and
/// defers post-deployment migrations until the new code is live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentShape {
    #[default]
    Standalone,
    WebOnly,
}

/// One base or template document as written on disk.
///
/// Every field is optional so the merge can tell "not set" apart from "set to
/// empty". Unknown keys (provisioning `params`, `run`, `hooks`, ...) are
/// ignored here and survive only in the raw document text.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ConfigDocument {
    #[serde(default)]
    pub base_image: Option<String>,
    #[serde(default)]
    pub run_image: Option<String>,
    #[serde(default)]
    pub boot_command: Option<String>,
    #[serde(default)]
    pub no_boot_command: Option<bool>,
    #[serde(default)]
    pub docker_args: Option<String>,
    #[serde(default)]
    pub deployment: Option<DeploymentShape>,
    #[serde(default)]
    pub templates: Option<Vec<String>>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub expose: Option<Vec<String>>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub volumes: Option<Vec<VolumeEntry>>,
    #[serde(default)]
    pub links: Option<Vec<LinkEntry>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct VolumeEntry {
    pub volume: Volume,
}

/// Host directory bind-mounted into the container.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Volume {
    pub host: String,
    pub guest: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LinkEntry {
    pub link: Link,
}

/// Legacy container link, `--link name:alias`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub alias: String,
}

impl ConfigDocument {
    /// Parse one YAML document. Empty or comment-only input yields an empty document.
    pub fn parse(input: &str) -> Result<Self, serde_yaml::Error> {
        let has_content = input.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        });
        if !has_content {
            return Ok(Self::default());
        }
        serde_yaml::from_str(input)
    }
}

// Scalars are read as strings so `1.10` or `0x1F` reach the container exactly
// as written. A bare key (`KEY:` or `~`) is the empty string.
fn scalar_map<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<String>>>::deserialize(deserializer)?;
    Ok(raw.map(|map| {
        map.into_iter()
            .map(|(key, value)| (key, value.unwrap_or_default()))
            .collect()
    }))
}

fn scalar_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(raw.map(|list| list.into_iter().map(Option::unwrap_or_default).collect()))
}
