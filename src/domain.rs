//! Entity types persisted by the [`crate::store`] layer.
//!
//! Identifiers are opaque 16-hex-character strings rather than UUIDs —
//! short enough to show up readably in logs and events, matching the
//! source system's id scheme.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a new 16-hex-character opaque id.
pub fn new_id() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn next(self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

impl Default for Season {
    fn default() -> Self {
        Season::Spring
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedStatus {
    Planted,
    Growing,
    Harvested,
    Composted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SproutStatus {
    Budding,
    Growing,
    Blooming,
    Wilting,
    Composted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Mutualism,
    Commensalism,
    Parasitism,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenState {
    pub id: String,
    pub total_energy: f64,
    pub vitality: f64,
    pub season: Season,
    pub tidal_phase: f64,
    pub cycle_count: i64,
    pub wisdom_score: f64,
    pub antifragility_score: f64,
    pub dream_count: i64,
    pub soil_richness: f64,
    pub last_pulse: Option<DateTime<Utc>>,
    pub dampening_level: f64,
    pub false_positive_window: Vec<DateTime<Utc>>,
}

impl Default for GardenState {
    fn default() -> Self {
        Self {
            id: "garden".to_string(),
            total_energy: 0.0,
            vitality: 1.0,
            season: Season::Spring,
            tidal_phase: 0.0,
            cycle_count: 0,
            wisdom_score: 0.0,
            antifragility_score: 0.0,
            dream_count: 0,
            soil_richness: 1.0,
            last_pulse: None,
            dampening_level: 1.0,
            false_positive_window: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gardener {
    pub id: String,
    pub name: String,
    pub preference_vector: Vec<f64>,
    pub pheromone_trails: std::collections::HashMap<String, i64>,
    pub rhythm_profile: std::collections::HashMap<String, i64>,
    pub interaction_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    pub id: String,
    pub gardener_id: Option<String>,
    pub raw_text: String,
    pub essence: String,
    pub embedding: Vec<f64>,
    pub themes: Vec<String>,
    pub tone_valence: f64,
    pub tone_arousal: f64,
    pub energy: f64,
    pub ethical_score: f64,
    pub vitality: f64,
    pub season_born: Season,
    pub version: i32,
    pub status: SeedStatus,
    pub is_composted: bool,
    pub created_at: DateTime<Utc>,
}

impl Seed {
    pub fn resonance(&self) -> f64 {
        self.tone_valence.abs() * self.tone_arousal
    }

    pub fn is_living(&self) -> bool {
        matches!(self.status, SeedStatus::Planted | SeedStatus::Growing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprout {
    pub id: String,
    pub seed_id: String,
    pub parent_id: Option<String>,
    pub depth: i32,
    pub label: String,
    pub description: String,
    pub energy: f64,
    pub ethical_score: f64,
    pub pressure: f64,
    pub resonance: f64,
    pub warmth: f64,
    pub status: SproutStatus,
}

impl Sprout {
    pub fn is_living(&self) -> bool {
        !matches!(self.status, SproutStatus::Composted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbioticLink {
    pub id: String,
    /// Legacy column naming: these hold Seed ids, not Sprout ids.
    pub sprout_a_id: String,
    pub sprout_b_id: String,
    pub relationship_type: RelationshipType,
    pub synergy_score: f64,
    pub nutrient_flow: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EthicalDimension {
    Harm,
    Fairness,
    Sustainability,
    Consent,
    Kindness,
    Truthfulness,
}

impl EthicalDimension {
    pub const ALL: [EthicalDimension; 6] = [
        EthicalDimension::Harm,
        EthicalDimension::Fairness,
        EthicalDimension::Sustainability,
        EthicalDimension::Consent,
        EthicalDimension::Kindness,
        EthicalDimension::Truthfulness,
    ];

    pub fn weight(self) -> f64 {
        match self {
            EthicalDimension::Harm => 1.5,
            EthicalDimension::Fairness => 1.2,
            EthicalDimension::Sustainability => 1.0,
            EthicalDimension::Consent => 1.3,
            EthicalDimension::Kindness => 1.0,
            EthicalDimension::Truthfulness => 1.1,
        }
    }

    pub fn threshold(self) -> f64 {
        match self {
            EthicalDimension::Harm => 0.3,
            EthicalDimension::Fairness => 0.4,
            EthicalDimension::Sustainability => 0.5,
            EthicalDimension::Consent => 0.4,
            EthicalDimension::Kindness => 0.5,
            EthicalDimension::Truthfulness => 0.4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EthicalDimension::Harm => "harm",
            EthicalDimension::Fairness => "fairness",
            EthicalDimension::Sustainability => "sustainability",
            EthicalDimension::Consent => "consent",
            EthicalDimension::Kindness => "kindness",
            EthicalDimension::Truthfulness => "truthfulness",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthicalMemory {
    pub id: String,
    pub pattern_hash: String,
    pub dimension: EthicalDimension,
    pub strength: f64,
    pub false_positive_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dream {
    pub id: String,
    pub source_seed_ids: Vec<String>,
    pub insight: String,
    pub archetype_vector: Vec<f64>,
    pub temperature: f64,
    pub perplexity: f64,
    pub planted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseReport {
    pub id: String,
    pub cycle: i64,
    pub summary: String,
    pub thriving: Vec<String>,
    pub struggling: Vec<String>,
    pub healing: Vec<String>,
    pub dreaming: Vec<String>,
    pub emergent: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WoundSeverity {
    Minor,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WoundRecord {
    pub id: String,
    pub wound_type: String,
    pub severity: WoundSeverity,
    pub healing_action: String,
    pub scar_lesson: String,
    pub antifragility_gained: f64,
    pub healed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Spawning,
    Idle,
    Working,
    Completed,
    Retired,
    AwaitingApproval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCapability {
    Analyze,
    Summarize,
    Decompose,
    CodeGen,
    Planner,
    WebSearch,
    FileRead,
    CodeExec,
    FileWrite,
}

impl AgentCapability {
    pub fn is_gated(self) -> bool {
        matches!(self, AgentCapability::CodeExec | AgentCapability::FileWrite)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentCapability::Analyze => "analyze",
            AgentCapability::Summarize => "summarize",
            AgentCapability::Decompose => "decompose",
            AgentCapability::CodeGen => "code_gen",
            AgentCapability::Planner => "planner",
            AgentCapability::WebSearch => "web_search",
            AgentCapability::FileRead => "file_read",
            AgentCapability::CodeExec => "code_exec",
            AgentCapability::FileWrite => "file_write",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: String,
    pub name: String,
    pub agent_type: AgentCapability,
    pub status: AgentStatus,
    pub parent_id: Option<String>,
    pub seed_id: Option<String>,
    pub task_description: String,
    pub capability_params: serde_json::Value,
    pub context: serde_json::Value,
    pub result: Option<String>,
    pub error: Option<String>,
    pub spawned_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retired_at: Option<DateTime<Utc>>,
}

impl AgentNode {
    pub fn is_active(&self) -> bool {
        !matches!(self.status, AgentStatus::Completed | AgentStatus::Retired)
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HormoneKind {
    Instant,
    SlowRelease,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HormoneLog {
    pub id: String,
    pub hormone_name: String,
    pub emitter_organ: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalState {
    pub id: String,
    pub joy: f64,
    pub curiosity: f64,
    pub anxiety: f64,
    pub pride: f64,
    pub grief: f64,
    pub wonder: f64,
    pub dominant_emotion: String,
    pub intensity: f64,
    pub trigger_event: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtType {
    Observation,
    Reflection,
    Question,
    Rumination,
    Wonder,
}

impl ThoughtType {
    pub const ALL: [ThoughtType; 5] = [
        ThoughtType::Observation,
        ThoughtType::Reflection,
        ThoughtType::Question,
        ThoughtType::Rumination,
        ThoughtType::Wonder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThoughtType::Observation => "observation",
            ThoughtType::Reflection => "reflection",
            ThoughtType::Question => "question",
            ThoughtType::Rumination => "rumination",
            ThoughtType::Wonder => "wonder",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerThought {
    pub id: String,
    pub thought_type: ThoughtType,
    pub content: String,
    pub emotional_context: serde_json::Value,
    pub trigger: String,
    pub depth: i32,
    pub salience: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicMemory {
    pub id: String,
    pub narrative: String,
    pub event_type: String,
    pub emotional_valence: f64,
    pub emotional_intensity: f64,
    pub themes: Vec<String>,
    pub related_seed_ids: Vec<String>,
    pub recall_count: i64,
    pub last_recalled: Option<DateTime<Utc>>,
    pub is_core_memory: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    SeedOutcome,
    EnergyTrend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub prediction_type: PredictionType,
    pub subject_id: String,
    pub predicted_outcome: String,
    pub confidence: f64,
    pub actual_outcome: Option<String>,
    pub surprise_score: Option<f64>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Parse error for the small closed-set enums stored as `TEXT` columns.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {type_name}: {value}")]
pub struct EnumParseError {
    pub type_name: &'static str,
    pub value: String,
}

macro_rules! sql_enum {
    ($ty:ty, $type_name:literal, { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(<$ty>::$variant => $str,)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = EnumParseError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok(<$ty>::$variant),)+
                    other => Err(EnumParseError { type_name: $type_name, value: other.to_string() }),
                }
            }
        }
    };
}

sql_enum!(SeedStatus, "SeedStatus", {
    Planted => "planted",
    Growing => "growing",
    Harvested => "harvested",
    Composted => "composted",
});

sql_enum!(SproutStatus, "SproutStatus", {
    Budding => "budding",
    Growing => "growing",
    Blooming => "blooming",
    Wilting => "wilting",
    Composted => "composted",
});

sql_enum!(RelationshipType, "RelationshipType", {
    Mutualism => "mutualism",
    Commensalism => "commensalism",
    Parasitism => "parasitism",
});

sql_enum!(WoundSeverity, "WoundSeverity", {
    Minor => "minor",
    Moderate => "moderate",
    Severe => "severe",
});

sql_enum!(AgentStatus, "AgentStatus", {
    Spawning => "spawning",
    Idle => "idle",
    Working => "working",
    Completed => "completed",
    Retired => "retired",
    AwaitingApproval => "awaiting_approval",
});

sql_enum!(PredictionType, "PredictionType", {
    SeedOutcome => "seed_outcome",
    EnergyTrend => "energy_trend",
});

impl std::str::FromStr for Season {
    type Err = EnumParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "autumn" => Ok(Season::Autumn),
            "winter" => Ok(Season::Winter),
            other => Err(EnumParseError { type_name: "Season", value: other.to_string() }),
        }
    }
}

impl std::str::FromStr for EthicalDimension {
    type Err = EnumParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "harm" => Ok(EthicalDimension::Harm),
            "fairness" => Ok(EthicalDimension::Fairness),
            "sustainability" => Ok(EthicalDimension::Sustainability),
            "consent" => Ok(EthicalDimension::Consent),
            "kindness" => Ok(EthicalDimension::Kindness),
            "truthfulness" => Ok(EthicalDimension::Truthfulness),
            other => Err(EnumParseError { type_name: "EthicalDimension", value: other.to_string() }),
        }
    }
}

impl std::str::FromStr for AgentCapability {
    type Err = EnumParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analyze" => Ok(AgentCapability::Analyze),
            "summarize" => Ok(AgentCapability::Summarize),
            "decompose" => Ok(AgentCapability::Decompose),
            "code_gen" => Ok(AgentCapability::CodeGen),
            "planner" => Ok(AgentCapability::Planner),
            "web_search" => Ok(AgentCapability::WebSearch),
            "file_read" => Ok(AgentCapability::FileRead),
            "code_exec" => Ok(AgentCapability::CodeExec),
            "file_write" => Ok(AgentCapability::FileWrite),
            other => Err(EnumParseError { type_name: "AgentCapability", value: other.to_string() }),
        }
    }
}

impl std::str::FromStr for ThoughtType {
    type Err = EnumParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observation" => Ok(ThoughtType::Observation),
            "reflection" => Ok(ThoughtType::Reflection),
            "question" => Ok(ThoughtType::Question),
            "rumination" => Ok(ThoughtType::Rumination),
            "wonder" => Ok(ThoughtType::Wonder),
            other => Err(EnumParseError { type_name: "ThoughtType", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfModelSnapshot {
    pub id: String,
    pub harvest_rate: f64,
    pub compost_rate: f64,
    pub dream_accuracy: f64,
    pub theme_affinities: std::collections::HashMap<String, f64>,
    pub decision_accuracy: std::collections::HashMap<String, f64>,
    pub personality_traits: std::collections::HashMap<String, f64>,
    pub bias_warnings: Vec<String>,
    pub identity_narrative: String,
    pub created_at: DateTime<Utc>,
}
