//! In-memory agent lists kept by an open chat.

use crate::model::agent::{Agent, AgentId};
use crate::repo::memory_repo::MemoryRepository;
use crate::repo::repository::RepositoryPolicies;

pub type AgentRepository = MemoryRepository<AgentId, Agent>;

/// Agents of the current channel.
///
/// Only presentation changes (name, avatar) count as updates, so status
/// flapping does not re-render the list.
pub fn channel_agents_repository(
    update_handler: impl Fn(&[Agent]) + Send + Sync + 'static,
) -> AgentRepository {
    MemoryRepository::new(
        RepositoryPolicies::new(|agent: &Agent| agent.id)
            .with_update_detection(Agent::differs_in_presentation)
            .with_update_handler(update_handler),
    )
}

/// Agents taking part in the current chat; every replacement is an update.
pub fn chat_agents_repository() -> AgentRepository {
    MemoryRepository::new(RepositoryPolicies::new(|agent: &Agent| agent.id))
}
