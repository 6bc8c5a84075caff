//! 强类型 ID 定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// 告警记录 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
pub struct AlertId(pub Uuid);

impl AlertId {
    pub fn new() -> Self {
        Self(tellspike_common::new_id())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for AlertId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_alert_ids_are_v7_and_parse_back() {
        let first = AlertId::new();
        let second = AlertId::new();
        assert_eq!(first.0.get_version_num(), 7);
        assert_ne!(first, second);
        assert_eq!(first.to_string().parse::<AlertId>().unwrap(), first);
    }
}
