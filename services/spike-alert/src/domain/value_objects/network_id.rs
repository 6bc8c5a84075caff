//! 联盟网络标识

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::SpikeError;

/// 网络标识，统一为小写（如 `kelkoo`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
#[display("{_0}")]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(value: impl AsRef<str>) -> Result<Self, SpikeError> {
        let normalized = value.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(SpikeError::invalid_config("network id must not be empty"));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SpikeError::invalid_config(format!(
                "network id contains invalid characters: {}",
                value.as_ref()
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 消息中展示的名称
    pub fn display_name(&self) -> String {
        match self.0.as_str() {
            "kelkoo" => "Kelkoo".to_string(),
            "admedia" => "Admedia".to_string(),
            "maxbounty" => "MaxBounty".to_string(),
            other => capitalize(other),
        }
    }
}

pub(crate) fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl TryFrom<String> for NetworkId {
    type Error = SpikeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NetworkId> for String {
    fn from(id: NetworkId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case() {
        let id = NetworkId::new(" MaxBounty ").unwrap();
        assert_eq!(id.as_str(), "maxbounty");
        assert_eq!(id.display_name(), "MaxBounty");
    }

    #[test]
    fn test_rejects_empty_and_symbols() {
        assert!(NetworkId::new("  ").is_err());
        assert!(NetworkId::new("kel koo").is_err());
        assert_eq!(NetworkId::new("awin").unwrap().display_name(), "Awin");
    }
}
