//! Persistence abstraction over the organism's entity set.
//!
//! A single trait keeps the tick scheduler and the organs decoupled from
//! the concrete store backend (PostgreSQL via [`crate::store::Store`]);
//! tests can substitute an in-memory fake without touching a database.

use async_trait::async_trait;

use crate::domain::*;
use crate::error::DatabaseError;

#[async_trait]
pub trait Database: Send + Sync {
    // --- Garden state (singleton) ---
    async fn get_garden_state(&self) -> Result<GardenState, DatabaseError>;
    async fn save_garden_state(&self, state: &GardenState) -> Result<(), DatabaseError>;

    // --- Gardeners ---
    async fn get_or_create_gardener(&self, id: &str) -> Result<Gardener, DatabaseError>;
    async fn save_gardener(&self, gardener: &Gardener) -> Result<(), DatabaseError>;

    // --- Seeds ---
    async fn insert_seed(&self, seed: &Seed) -> Result<(), DatabaseError>;
    async fn get_seed(&self, id: &str) -> Result<Option<Seed>, DatabaseError>;
    async fn update_seed(&self, seed: &Seed) -> Result<(), DatabaseError>;
    async fn list_living_seeds(&self) -> Result<Vec<Seed>, DatabaseError>;
    async fn list_seeds_by_status(&self, status: SeedStatus) -> Result<Vec<Seed>, DatabaseError>;
    async fn list_terminal_seeds(&self, limit: usize) -> Result<Vec<Seed>, DatabaseError>;

    // --- Sprouts ---
    async fn insert_sprout(&self, sprout: &Sprout) -> Result<(), DatabaseError>;
    async fn update_sprout(&self, sprout: &Sprout) -> Result<(), DatabaseError>;
    async fn list_sprouts_for_seed(&self, seed_id: &str) -> Result<Vec<Sprout>, DatabaseError>;

    // --- Symbiotic links ---
    async fn insert_link(&self, link: &SymbioticLink) -> Result<(), DatabaseError>;
    async fn update_link(&self, link: &SymbioticLink) -> Result<(), DatabaseError>;
    async fn list_links(&self) -> Result<Vec<SymbioticLink>, DatabaseError>;
    async fn link_exists(&self, a: &str, b: &str) -> Result<bool, DatabaseError>;

    // --- Ethical memory ---
    async fn get_antibody(
        &self,
        pattern_hash: &str,
        dimension: EthicalDimension,
    ) -> Result<Option<EthicalMemory>, DatabaseError>;
    async fn upsert_antibody(&self, antibody: &EthicalMemory) -> Result<(), DatabaseError>;

    // --- Dreams ---
    async fn insert_dream(&self, dream: &Dream) -> Result<(), DatabaseError>;
    async fn update_dream(&self, dream: &Dream) -> Result<(), DatabaseError>;
    async fn list_recent_dreams(&self, limit: usize) -> Result<Vec<Dream>, DatabaseError>;

    // --- Pulse reports ---
    async fn insert_pulse(&self, pulse: &PulseReport) -> Result<(), DatabaseError>;

    // --- Wounds ---
    async fn insert_wound(&self, wound: &WoundRecord) -> Result<(), DatabaseError>;
    async fn list_recent_wounds(&self, limit: usize) -> Result<Vec<WoundRecord>, DatabaseError>;

    // --- Agents ---
    async fn insert_agent(&self, agent: &AgentNode) -> Result<(), DatabaseError>;
    async fn update_agent(&self, agent: &AgentNode) -> Result<(), DatabaseError>;
    async fn list_active_agents(&self) -> Result<Vec<AgentNode>, DatabaseError>;
    async fn list_agents_for_seed(&self, seed_id: &str) -> Result<Vec<AgentNode>, DatabaseError>;

    // --- Hormone log ---
    async fn insert_hormone_log(&self, entry: &HormoneLog) -> Result<(), DatabaseError>;

    // --- Emotional state ---
    async fn insert_emotional_state(&self, state: &EmotionalState) -> Result<(), DatabaseError>;
    async fn latest_emotional_state(&self) -> Result<Option<EmotionalState>, DatabaseError>;

    // --- Inner thoughts ---
    async fn insert_inner_thought(&self, thought: &InnerThought) -> Result<(), DatabaseError>;
    async fn recent_inner_thoughts(&self, limit: usize) -> Result<Vec<InnerThought>, DatabaseError>;

    // --- Episodic memory ---
    async fn insert_memory(&self, memory: &EpisodicMemory) -> Result<(), DatabaseError>;
    async fn update_memory(&self, memory: &EpisodicMemory) -> Result<(), DatabaseError>;
    async fn recent_memories(&self, limit: usize) -> Result<Vec<EpisodicMemory>, DatabaseError>;
    async fn count_memories(&self) -> Result<i64, DatabaseError>;
    async fn prune_memories(&self, ids: &[String]) -> Result<(), DatabaseError>;

    // --- Predictions ---
    async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), DatabaseError>;
    async fn update_prediction(&self, prediction: &Prediction) -> Result<(), DatabaseError>;
    async fn unresolved_predictions(&self) -> Result<Vec<Prediction>, DatabaseError>;
    async fn count_unresolved_predictions(&self) -> Result<i64, DatabaseError>;

    // --- Self-model ---
    async fn insert_self_model_snapshot(
        &self,
        snapshot: &SelfModelSnapshot,
    ) -> Result<(), DatabaseError>;
    async fn latest_self_model_snapshot(
        &self,
    ) -> Result<Option<SelfModelSnapshot>, DatabaseError>;
}
