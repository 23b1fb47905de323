//! Support agent as shown in channel and chat agent lists.

use serde::{Deserialize, Serialize};

/// Stable agent identifier assigned by the backend.
pub type AgentId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Away,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub avatar_link: Option<String>,
    pub status: AgentStatus,
}

impl Agent {
    pub fn new(id: AgentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar_link: None,
            status: AgentStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    /// Whether `other` differs in anything an agent list renders.
    pub fn differs_in_presentation(&self, other: &Self) -> bool {
        self.id != other.id || self.name != other.name || self.avatar_link != other.avatar_link
    }
}
