//! 变化方向

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 变化方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    /// 与上期相同，永远不会告警
    Flat,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Flat => "flat",
        }
    }

    /// 消息中的方向标记
    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Up => "[SPIKE UP]",
            Direction::Down => "[SPIKE DOWN]",
            Direction::Flat => "[FLAT]",
        }
    }

    pub fn trend(&self) -> &'static str {
        match self {
            Direction::Up => "INCREASED",
            Direction::Down => "DECREASED",
            Direction::Flat => "UNCHANGED",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "flat" => Ok(Direction::Flat),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}
