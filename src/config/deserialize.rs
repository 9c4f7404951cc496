// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles service names and the short or detailed server forms.

use serde::Deserialize;

use super::{ServerConfig, ServerOverride};
use crate::types::ServiceName;

pub fn deserialize_service_name<'de, D>(deserializer: D) -> Result<ServiceName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ServiceName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_service_name_option<'de, D>(
    deserializer: D,
) -> Result<Option<ServiceName>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| ServiceName::new(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_server<'de, D>(deserializer: D) -> Result<ServerConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    ServerEntry::deserialize(deserializer)?
        .into_server_config()
        .map_err(serde::de::Error::custom)
}

pub fn deserialize_server_override_option<'de, D>(
    deserializer: D,
) -> Result<Option<ServerOverride>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<OverrideEntry>::deserialize(deserializer)?
        .map(|entry| entry.into_server_override().map_err(serde::de::Error::custom))
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> Result<ServerConfig, String> {
        match self {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OverrideEntry {
    Simple(String),
    Detailed(ServerOverride),
}

impl OverrideEntry {
    fn into_server_override(self) -> Result<ServerOverride, String> {
        match self {
            OverrideEntry::Simple(s) => ServerOverride::parse(&s),
            OverrideEntry::Detailed(o) => Ok(o),
        }
    }
}
