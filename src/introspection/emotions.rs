//! Six-channel emotional state machine: event-driven deltas, baseline
//! decay, and cross-channel resonance.

use chrono::Utc;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, EmotionalState};
use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionDelta {
    pub joy: f64,
    pub curiosity: f64,
    pub anxiety: f64,
    pub pride: f64,
    pub grief: f64,
    pub wonder: f64,
}

fn delta_for_event(event: &str) -> EmotionDelta {
    match event {
        "seed_planted" => EmotionDelta { joy: 0.10, curiosity: 0.15, wonder: 0.05, ..Default::default() },
        "tree_grown" => EmotionDelta { joy: 0.08, pride: 0.10, wonder: 0.10, ..Default::default() },
        "photosynthesis" => EmotionDelta { joy: 0.02, pride: 0.01, ..Default::default() },
        "ethical_violation" => EmotionDelta { joy: -0.10, anxiety: 0.20, grief: 0.10, ..Default::default() },
        "ethical_clearance" => EmotionDelta { anxiety: -0.05, pride: 0.05, ..Default::default() },
        "healing_complete" => EmotionDelta { joy: 0.05, anxiety: -0.10, pride: 0.15, ..Default::default() },
        "season_change" => EmotionDelta { curiosity: 0.10, wonder: 0.15, ..Default::default() },
        "dream_generated" => EmotionDelta { joy: 0.05, curiosity: 0.15, wonder: 0.20, ..Default::default() },
        "lucid_dream" => EmotionDelta { joy: 0.10, curiosity: 0.20, wonder: 0.30, ..Default::default() },
        "pollination" => EmotionDelta { joy: 0.10, pride: 0.08, ..Default::default() },
        "quorum_reached" => EmotionDelta { joy: 0.10, pride: 0.15, wonder: 0.10, ..Default::default() },
        "apoptosis" => EmotionDelta { joy: -0.05, anxiety: 0.10, grief: 0.15, ..Default::default() },
        "emergency_winter" => EmotionDelta { joy: -0.20, anxiety: 0.30, grief: 0.20, wonder: -0.10, ..Default::default() },
        "energy_famine" => EmotionDelta { joy: -0.10, anxiety: 0.20, grief: 0.10, ..Default::default() },
        "energy_surplus" => EmotionDelta { joy: 0.05, anxiety: -0.05, ..Default::default() },
        "agent_spawned" => EmotionDelta { curiosity: 0.10, pride: 0.05, ..Default::default() },
        "agent_completed" => EmotionDelta { joy: 0.08, pride: 0.10, ..Default::default() },
        "agent_retired" => EmotionDelta { grief: 0.03, ..Default::default() },
        "wound_detected" => EmotionDelta { anxiety: 0.15, grief: 0.10, ..Default::default() },
        "wisdom_milestone" => EmotionDelta { joy: 0.15, pride: 0.20, wonder: 0.15, ..Default::default() },
        "auto_harvest" => EmotionDelta { joy: 0.20, pride: 0.15, wonder: 0.05, ..Default::default() },
        "auto_compost" => EmotionDelta { anxiety: 0.05, pride: 0.03, grief: 0.10, ..Default::default() },
        "auto_dream_planted" => EmotionDelta { joy: 0.10, curiosity: 0.15, wonder: 0.20, ..Default::default() },
        "high_surprise" => EmotionDelta { curiosity: 0.20, anxiety: 0.05, wonder: 0.15, ..Default::default() },
        "low_surprise" => EmotionDelta { anxiety: -0.05, pride: 0.10, ..Default::default() },
        "core_memory_formed" => EmotionDelta { joy: 0.05, pride: 0.10, wonder: 0.10, ..Default::default() },
        _ => EmotionDelta::default(),
    }
}

struct Baseline {
    joy: f64,
    curiosity: f64,
    anxiety: f64,
    pride: f64,
    grief: f64,
    wonder: f64,
}

const BASELINE: Baseline = Baseline {
    joy: 0.4,
    curiosity: 0.5,
    anxiety: 0.15,
    pride: 0.3,
    grief: 0.05,
    wonder: 0.35,
};

struct DecayRate {
    joy: f64,
    curiosity: f64,
    anxiety: f64,
    pride: f64,
    grief: f64,
    wonder: f64,
}

const DECAY: DecayRate = DecayRate {
    joy: 0.08,
    curiosity: 0.05,
    anxiety: 0.12,
    pride: 0.06,
    grief: 0.04,
    wonder: 0.07,
};

#[derive(Debug, Clone, Default)]
pub struct DecisionBias {
    pub conservatism: f64,
    pub exploration: f64,
    pub generosity: f64,
    pub introspection: f64,
    pub confidence: f64,
}

pub fn decision_bias(state: &EmotionalState) -> DecisionBias {
    DecisionBias {
        conservatism: (2.0 * state.anxiety).min(1.0),
        exploration: (1.5 * state.curiosity).min(1.0),
        generosity: (1.5 * state.joy).min(1.0),
        introspection: (1.2 * (state.grief + state.wonder)).min(1.0),
        confidence: (1.5 * state.pride).min(1.0),
    }
}

fn dominant_channel(state: &EmotionalState) -> &'static str {
    let channels = [
        ("joy", state.joy),
        ("curiosity", state.curiosity),
        ("anxiety", state.anxiety),
        ("pride", state.pride),
        ("grief", state.grief),
        ("wonder", state.wonder),
    ];
    channels
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(name, _)| *name)
        .unwrap_or("joy")
}

/// Apply the queue of event names accumulated since the last tick,
/// decay each channel toward baseline, apply resonance rules, persist a
/// snapshot, and emit `emotional_shift`.
pub async fn process_tick(
    store: &impl Database,
    bus: &HormoneBus,
    events_since_last_tick: &[String],
) -> Result<EmotionalState, DatabaseError> {
    let previous = store.latest_emotional_state().await?;
    let mut joy = previous.as_ref().map(|s| s.joy).unwrap_or(BASELINE.joy);
    let mut curiosity = previous.as_ref().map(|s| s.curiosity).unwrap_or(BASELINE.curiosity);
    let mut anxiety = previous.as_ref().map(|s| s.anxiety).unwrap_or(BASELINE.anxiety);
    let mut pride = previous.as_ref().map(|s| s.pride).unwrap_or(BASELINE.pride);
    let mut grief = previous.as_ref().map(|s| s.grief).unwrap_or(BASELINE.grief);
    let mut wonder = previous.as_ref().map(|s| s.wonder).unwrap_or(BASELINE.wonder);

    for event in events_since_last_tick {
        let d = delta_for_event(event);
        joy += d.joy;
        curiosity += d.curiosity;
        anxiety += d.anxiety;
        pride += d.pride;
        grief += d.grief;
        wonder += d.wonder;
    }

    joy += DECAY.joy * (BASELINE.joy - joy);
    curiosity += DECAY.curiosity * (BASELINE.curiosity - curiosity);
    anxiety += DECAY.anxiety * (BASELINE.anxiety - anxiety);
    pride += DECAY.pride * (BASELINE.pride - pride);
    grief += DECAY.grief * (BASELINE.grief - grief);
    wonder += DECAY.wonder * (BASELINE.wonder - wonder);

    if joy > 0.6 && pride > 0.5 {
        wonder += 0.02;
    }
    if anxiety > 0.5 && grief > 0.3 {
        curiosity -= 0.02;
    }

    let state = EmotionalState {
        id: new_id(),
        joy: joy.clamp(0.0, 1.0),
        curiosity: curiosity.clamp(0.0, 1.0),
        anxiety: anxiety.clamp(0.0, 1.0),
        pride: pride.clamp(0.0, 1.0),
        grief: grief.clamp(0.0, 1.0),
        wonder: wonder.clamp(0.0, 1.0),
        dominant_emotion: String::new(),
        intensity: 0.0,
        trigger_event: events_since_last_tick.last().cloned().unwrap_or_default(),
        created_at: Utc::now(),
    };
    let dominant = dominant_channel(&state).to_string();
    let intensity = [state.joy, state.curiosity, state.anxiety, state.pride, state.grief, state.wonder]
        .iter()
        .cloned()
        .fold(0.0_f64, f64::max);

    let state = EmotionalState {
        dominant_emotion: dominant,
        intensity,
        ..state
    };

    store.insert_emotional_state(&state).await?;

    let bias = decision_bias(&state);
    let _ = bus
        .emit(Hormone::new(
            "emotional_shift",
            "introspection",
            serde_json::json!({
                "dominant": state.dominant_emotion,
                "intensity": state.intensity,
                "decision_bias": {
                    "conservatism": bias.conservatism,
                    "exploration": bias.exploration,
                    "generosity": bias.generosity,
                    "introspection": bias.introspection,
                    "confidence": bias.confidence,
                },
            }),
        ))
        .await;

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethical_violation_raises_anxiety_and_lowers_joy() {
        let d = delta_for_event("ethical_violation");
        assert!(d.anxiety > 0.0);
        assert!(d.joy < 0.0);
    }

    #[test]
    fn decision_bias_is_clamped() {
        let state = EmotionalState {
            id: "x".to_string(),
            joy: 1.0,
            curiosity: 1.0,
            anxiety: 1.0,
            pride: 1.0,
            grief: 1.0,
            wonder: 1.0,
            dominant_emotion: "joy".to_string(),
            intensity: 1.0,
            trigger_event: String::new(),
            created_at: Utc::now(),
        };
        let bias = decision_bias(&state);
        assert!(bias.conservatism <= 1.0);
        assert!(bias.introspection <= 1.0);
    }
}
