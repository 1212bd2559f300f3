//! Emotion-weighted inner-voice thought sampling.

use std::collections::VecDeque;

use chrono::Utc;
use rand::Rng;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, EmotionalState, InnerThought, ThoughtType};
use crate::error::DatabaseError;
use crate::textmodel::TextModel;

const RECENT_THOUGHTS_CAPACITY: usize = 10;
const RECENT_EVENTS_CAPACITY: usize = 20;

fn base_weight(t: ThoughtType) -> f64 {
    match t {
        ThoughtType::Observation => 0.25,
        ThoughtType::Reflection => 0.25,
        ThoughtType::Question => 0.20,
        ThoughtType::Rumination => 0.10,
        ThoughtType::Wonder => 0.20,
    }
}

fn base_temperature(t: ThoughtType) -> f32 {
    match t {
        ThoughtType::Observation => 0.3,
        ThoughtType::Reflection => 0.4,
        ThoughtType::Question => 0.6,
        ThoughtType::Rumination => 0.4,
        ThoughtType::Wonder => 0.7,
    }
}

fn base_salience(t: ThoughtType) -> f64 {
    match t {
        ThoughtType::Observation => 0.3,
        ThoughtType::Reflection => 0.5,
        ThoughtType::Question => 0.6,
        ThoughtType::Rumination => 0.4,
        ThoughtType::Wonder => 0.7,
    }
}

fn weighted_thought_type(state: &EmotionalState) -> ThoughtType {
    let mut weights: Vec<(ThoughtType, f64)> =
        ThoughtType::ALL.iter().map(|t| (*t, base_weight(*t))).collect();

    for (t, w) in weights.iter_mut() {
        match t {
            ThoughtType::Question | ThoughtType::Wonder => *w += 0.3 * state.curiosity,
            _ => {}
        }
        if *t == ThoughtType::Rumination {
            *w += 0.3 * state.grief + 0.2 * state.anxiety;
        }
        if *t == ThoughtType::Wonder {
            *w += 0.3 * state.wonder;
        }
        if *t == ThoughtType::Reflection {
            *w += 0.2 * state.pride;
        }
        if *t == ThoughtType::Observation {
            *w += 0.2 * state.joy;
        }
        if *t == ThoughtType::Wonder {
            *w += 0.1 * state.joy;
        }
    }

    let total: f64 = weights.iter().map(|(_, w)| w.max(0.0)).sum();
    let mut roll = rand::thread_rng().gen_range(0.0..total.max(f64::EPSILON));
    for (t, w) in weights {
        roll -= w.max(0.0);
        if roll <= 0.0 {
            return t;
        }
    }
    ThoughtType::Observation
}

fn depth_for(t: ThoughtType, intensity: f64) -> i32 {
    if matches!(t, ThoughtType::Wonder | ThoughtType::Rumination) && intensity > 0.5 {
        2
    } else if matches!(t, ThoughtType::Reflection | ThoughtType::Question) && intensity > 0.3 {
        1
    } else {
        0
    }
}

pub struct InnerVoiceContext {
    pub recent_thoughts: VecDeque<String>,
    pub recent_events: VecDeque<String>,
}

impl Default for InnerVoiceContext {
    fn default() -> Self {
        Self {
            recent_thoughts: VecDeque::with_capacity(RECENT_THOUGHTS_CAPACITY),
            recent_events: VecDeque::with_capacity(RECENT_EVENTS_CAPACITY),
        }
    }
}

impl InnerVoiceContext {
    pub fn push_event(&mut self, description: String) {
        if self.recent_events.len() == RECENT_EVENTS_CAPACITY {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(description);
    }

    fn push_thought(&mut self, content: String) {
        if self.recent_thoughts.len() == RECENT_THOUGHTS_CAPACITY {
            self.recent_thoughts.pop_front();
        }
        self.recent_thoughts.push_back(content);
    }
}

/// Sample a thought type, compose a prompt from garden context, and
/// generate one sentence via the text model. Returns `None` if the model
/// yields nothing (an inner voice that has nothing to say this tick).
#[allow(clippy::too_many_arguments)]
pub async fn generate_thought(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    ctx: &mut InnerVoiceContext,
    state: &EmotionalState,
    garden_summary: &str,
    theme_counts: &str,
    recent_memories: &str,
    recent_dreams: &str,
) -> Result<Option<InnerThought>, DatabaseError> {
    let thought_type = weighted_thought_type(state);
    let temperature = (base_temperature(thought_type) + 0.2 * state.intensity as f32).min(0.9);

    let last_thought = ctx.recent_thoughts.back().cloned().unwrap_or_default();
    let prompt = format!(
        "As the garden's inner voice, produce one {:?} thought. Garden: {garden_summary}. \
         Themes: {theme_counts}. Recent events: {:?}. Recent memories: {recent_memories}. \
         Recent dreams: {recent_dreams}. Last thought: \"{last_thought}\".",
        thought_type,
        ctx.recent_events.iter().collect::<Vec<_>>(),
    );

    let content = text_model
        .generate(&prompt, None, temperature, 80, "introspection", "inner_voice")
        .await;
    if content.is_empty() {
        return Ok(None);
    }

    let salience = (base_salience(thought_type) + state.intensity * 0.3 + (content.len() as f64 / 200.0).min(0.2))
        .min(1.0);
    let depth = depth_for(thought_type, state.intensity);

    let thought = InnerThought {
        id: new_id(),
        thought_type,
        content: content.clone(),
        emotional_context: serde_json::json!({
            "joy": state.joy, "curiosity": state.curiosity, "anxiety": state.anxiety,
            "pride": state.pride, "grief": state.grief, "wonder": state.wonder,
        }),
        trigger: ctx.recent_events.back().cloned().unwrap_or_default(),
        depth,
        salience,
        created_at: Utc::now(),
    };
    store.insert_inner_thought(&thought).await?;
    ctx.push_thought(content);

    let _ = bus
        .emit(Hormone::new(
            "inner_thought",
            "introspection",
            serde_json::json!({ "thought_id": thought.id, "type": thought.thought_type.as_str() }),
        ))
        .await;

    Ok(Some(thought))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_is_zero_for_low_intensity_observation() {
        assert_eq!(depth_for(ThoughtType::Observation, 0.1), 0);
    }

    #[test]
    fn depth_is_two_for_intense_wonder() {
        assert_eq!(depth_for(ThoughtType::Wonder, 0.9), 2);
    }

    #[test]
    fn base_weights_sum_close_to_one() {
        let total: f64 = ThoughtType::ALL.iter().map(|t| base_weight(*t)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
