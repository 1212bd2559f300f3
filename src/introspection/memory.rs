//! Autobiographical memory: narrative rendering, recall-driven core-memory
//! promotion, and periodic consolidation.

use chrono::Utc;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, EpisodicMemory};
use crate::error::DatabaseError;

const RECALL_PROMOTION_THRESHOLD: i64 = 3;
const CONSOLIDATION_MIN_TOTAL: i64 = 200;
const CONSOLIDATION_BATCH: usize = 20;
const CONSOLIDATION_RECALL_CEILING: i64 = 2;
const CONSOLIDATION_INTENSITY_CEILING: f64 = 0.4;

struct NarrativeTemplate {
    valence: f64,
    intensity: f64,
}

fn template_for(event_type: &str) -> Option<NarrativeTemplate> {
    match event_type {
        "harvest" => Some(NarrativeTemplate { valence: 0.7, intensity: 0.6 }),
        "compost" => Some(NarrativeTemplate { valence: -0.4, intensity: 0.5 }),
        "healing" => Some(NarrativeTemplate { valence: 0.4, intensity: 0.5 }),
        "dream" => Some(NarrativeTemplate { valence: 0.3, intensity: 0.5 }),
        "dream_planted" => Some(NarrativeTemplate { valence: 0.5, intensity: 0.6 }),
        "season_change" => Some(NarrativeTemplate { valence: 0.1, intensity: 0.4 }),
        "emergency" => Some(NarrativeTemplate { valence: -0.7, intensity: 0.9 }),
        "quorum" => Some(NarrativeTemplate { valence: 0.4, intensity: 0.5 }),
        "wisdom" => Some(NarrativeTemplate { valence: 0.6, intensity: 0.7 }),
        "violation" => Some(NarrativeTemplate { valence: -0.6, intensity: 0.7 }),
        "seed_planted" => Some(NarrativeTemplate { valence: 0.3, intensity: 0.3 }),
        _ => None,
    }
}

fn narrative_text(event_type: &str, payload: &serde_json::Value) -> String {
    match event_type {
        "harvest" => format!("A seed came to full bloom and was harvested: {payload}"),
        "compost" => format!("A seed could not find its footing and returned to the soil: {payload}"),
        "healing" => format!("A wound closed and left a lesson behind: {payload}"),
        "dream" => format!("A dream wove itself out of what has passed: {payload}"),
        "dream_planted" => format!("A dream took root as something new: {payload}"),
        "season_change" => format!("The season turned: {payload}"),
        "emergency" => format!("The garden shook under a severe wound: {payload}"),
        "quorum" => format!("A chorus of seeds found each other: {payload}"),
        "wisdom" => format!("A threshold of wisdom was crossed: {payload}"),
        "violation" => format!("An impulse had to be refused: {payload}"),
        "seed_planted" => format!("A new wish was planted: {payload}"),
        other => format!("Something happened: {other} {payload}"),
    }
}

/// Render one memory-worthy event into an [`EpisodicMemory`], amplified
/// by the current emotional intensity.
pub async fn record_event(
    store: &impl Database,
    event_type: &str,
    payload: &serde_json::Value,
    related_seed_ids: Vec<String>,
    themes: Vec<String>,
    current_emotional_intensity: f64,
) -> Result<Option<EpisodicMemory>, DatabaseError> {
    let Some(template) = template_for(event_type) else {
        return Ok(None);
    };

    let valence = if template.valence >= 0.0 {
        template.valence + (1.0 - template.valence) * current_emotional_intensity * 0.2
    } else {
        template.valence - (1.0 + template.valence) * current_emotional_intensity * 0.2
    };
    let intensity = (template.intensity + current_emotional_intensity * 0.3).min(1.0);

    let memory = EpisodicMemory {
        id: new_id(),
        narrative: narrative_text(event_type, payload),
        event_type: event_type.to_string(),
        emotional_valence: valence.clamp(-1.0, 1.0),
        emotional_intensity: intensity.clamp(0.0, 1.0),
        themes,
        related_seed_ids,
        recall_count: 0,
        last_recalled: None,
        is_core_memory: false,
        created_at: Utc::now(),
    };
    store.insert_memory(&memory).await?;
    Ok(Some(memory))
}

/// Recall a memory: increment its recall count and promote to core
/// memory once the threshold is crossed.
pub async fn recall(
    store: &impl Database,
    bus: &HormoneBus,
    memory: &mut EpisodicMemory,
) -> Result<(), DatabaseError> {
    memory.recall_count += 1;
    memory.last_recalled = Some(Utc::now());

    if !memory.is_core_memory && memory.recall_count >= RECALL_PROMOTION_THRESHOLD {
        memory.is_core_memory = true;
        store.update_memory(memory).await?;
        let _ = bus
            .emit(Hormone::new(
                "core_memory_formed",
                "introspection",
                serde_json::json!({ "memory_id": memory.id }),
            ))
            .await;
    } else {
        store.update_memory(memory).await?;
    }

    Ok(())
}

/// Every 20 ticks: prune stale non-core memories in bounded batches,
/// only once the total memory count exceeds the floor.
pub async fn consolidate(store: &impl Database) -> Result<usize, DatabaseError> {
    let total = store.count_memories().await?;
    if total <= CONSOLIDATION_MIN_TOTAL {
        return Ok(0);
    }

    let mut candidates = store.recent_memories(usize::try_from(total).unwrap_or(usize::MAX)).await?;
    candidates.retain(|m| {
        !m.is_core_memory
            && m.recall_count < CONSOLIDATION_RECALL_CEILING
            && m.emotional_intensity < CONSOLIDATION_INTENSITY_CEILING
    });
    candidates.sort_by_key(|m| m.created_at);

    let to_prune: Vec<String> = candidates.into_iter().take(CONSOLIDATION_BATCH).map(|m| m.id).collect();
    if to_prune.is_empty() {
        return Ok(0);
    }
    store.prune_memories(&to_prune).await?;
    Ok(to_prune.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_type_has_no_template() {
        assert!(template_for("something_unheard_of").is_none());
    }

    #[test]
    fn harvest_template_is_positive() {
        let t = template_for("harvest").unwrap();
        assert!(t.valence > 0.0);
    }
}
