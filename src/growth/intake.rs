//! Turning a free-form wish into a planted [`Seed`].

use std::collections::HashMap;

use chrono::Utc;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, Gardener, Seed, SeedStatus};
use crate::error::DatabaseError;
use crate::growth::lexicon::{tokenize, HIGH_AROUSAL_WORDS, LOW_AROUSAL_WORDS, NEGATIVE_WORDS, POSITIVE_WORDS, THEME_LEXICON};
use crate::textmodel::TextModel;

pub struct IntakeResult {
    pub essence: String,
    pub themes: Vec<String>,
    pub tone_valence: f64,
    pub tone_arousal: f64,
}

fn heuristic_essence(raw_text: &str) -> String {
    let first_sentence = raw_text
        .split(['.', '!', '?'])
        .map(str::trim)
        .find(|s| s.len() >= 6);
    let essence = first_sentence.unwrap_or(raw_text.trim());
    essence.chars().take(200).collect()
}

fn heuristic_themes(tokens: &[String], pheromone_trails: &HashMap<String, i64>) -> Vec<String> {
    let mut scores: Vec<(f64, &str)> = THEME_LEXICON
        .iter()
        .map(|(theme, words)| {
            let hits = tokens.iter().filter(|t| words.contains(&t.as_str())).count() as f64;
            let bias = pheromone_trails.get(*theme).copied().unwrap_or(0) as f64 * 2.0;
            (hits + bias, *theme)
        })
        .filter(|(score, _)| *score > 0.0)
        .collect();

    scores.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
    let top: Vec<String> = scores.into_iter().take(5).map(|(_, t)| t.to_string()).collect();
    if top.is_empty() {
        vec!["general".to_string()]
    } else {
        top
    }
}

fn heuristic_tone(tokens: &[String]) -> (f64, f64) {
    let pos = tokens.iter().filter(|t| POSITIVE_WORDS.contains(&t.as_str())).count() as f64;
    let neg = tokens.iter().filter(|t| NEGATIVE_WORDS.contains(&t.as_str())).count() as f64;
    let valence = if pos + neg > 0.0 {
        (pos - neg) / (pos + neg).max(1.0)
    } else {
        0.0
    };

    let high = tokens.iter().filter(|t| HIGH_AROUSAL_WORDS.contains(&t.as_str())).count() as f64;
    let low = tokens.iter().filter(|t| LOW_AROUSAL_WORDS.contains(&t.as_str())).count() as f64;
    let arousal = 0.5 + 0.5 * (high - low) / (high + low).max(1.0);

    (valence.clamp(-1.0, 1.0), arousal.clamp(0.0, 1.0))
}

fn heuristic_energy(word_count: usize, theme_count: usize) -> f64 {
    (0.5 * word_count as f64 + 2.0 * theme_count as f64).clamp(5.0, 50.0)
}

/// Plant a wish: run intake (LLM essence/theme/tone extraction with
/// heuristic fallback), create the Seed row, update gardener interaction
/// history, and emit `seed_planted`.
pub async fn plant_wish(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    gardener_id: Option<&str>,
    raw_text: &str,
) -> Result<Seed, DatabaseError> {
    let gardener = match gardener_id {
        Some(id) => Some(store.get_or_create_gardener(id).await?),
        None => None,
    };
    let pheromones = gardener
        .as_ref()
        .map(|g| g.pheromone_trails.clone())
        .unwrap_or_default();

    let tokens = tokenize(raw_text);
    let intake = intake_text(text_model, raw_text, &tokens, &pheromones).await;
    let embedding = text_model.embed(&intake.essence);

    let garden = store.get_garden_state().await?;
    let theme_count = intake.themes.len();

    let seed = Seed {
        id: new_id(),
        gardener_id: gardener_id.map(str::to_string),
        raw_text: raw_text.to_string(),
        essence: intake.essence,
        embedding,
        themes: intake.themes,
        tone_valence: intake.tone_valence,
        tone_arousal: intake.tone_arousal,
        energy: heuristic_energy(tokens.len(), theme_count),
        ethical_score: 1.0,
        vitality: 1.0,
        season_born: garden.season,
        version: 1,
        status: SeedStatus::Planted,
        is_composted: false,
        created_at: Utc::now(),
    };

    store.insert_seed(&seed).await?;

    if let Some(mut gardener) = gardener {
        record_interaction(&mut gardener, &seed.themes);
        store.save_gardener(&gardener).await?;
    }

    emit_seed_planted(bus, &seed).await;

    Ok(seed)
}

async fn intake_text(
    text_model: &TextModel,
    raw_text: &str,
    tokens: &[String],
    pheromone_trails: &HashMap<String, i64>,
) -> IntakeResult {
    let prompt = format!(
        "Extract a JSON object with keys \"essence\" (a one-sentence paraphrase, under 200 \
         characters), \"themes\" (up to 5 lowercase single-word themes), \"valence\" (-1..1) \
         and \"arousal\" (0..1) from this wish: \"{raw_text}\""
    );
    let parsed = text_model
        .generate_json(&prompt, None, 0.3, 200, "intake", "essence_extraction")
        .await;

    if let Some(v) = parsed {
        let essence = v
            .get("essence")
            .and_then(|x| x.as_str())
            .map(str::to_string)
            .filter(|s| !s.is_empty());
        let themes = v.get("themes").and_then(|x| x.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str())
                .map(str::to_lowercase)
                .take(5)
                .collect::<Vec<_>>()
        });
        let valence = v.get("valence").and_then(|x| x.as_f64());
        let arousal = v.get("arousal").and_then(|x| x.as_f64());

        if let (Some(essence), Some(themes), Some(valence), Some(arousal)) =
            (essence, themes, valence, arousal)
        {
            return IntakeResult {
                essence,
                themes,
                tone_valence: valence.clamp(-1.0, 1.0),
                tone_arousal: arousal.clamp(0.0, 1.0),
            };
        }
    }

    let (valence, arousal) = heuristic_tone(tokens);
    IntakeResult {
        essence: heuristic_essence(raw_text),
        themes: heuristic_themes(tokens, pheromone_trails),
        tone_valence: valence,
        tone_arousal: arousal,
    }
}

fn record_interaction(gardener: &mut Gardener, themes: &[String]) {
    gardener.interaction_count += 1;
    for theme in themes {
        *gardener.pheromone_trails.entry(theme.clone()).or_insert(0) += 1;
    }
    let hour = Utc::now().format("%H").to_string();
    *gardener.rhythm_profile.entry(hour).or_insert(0) += 1;
}

pub async fn emit_seed_planted(bus: &HormoneBus, seed: &Seed) {
    let _ = bus
        .emit(Hormone::new(
            "seed_planted",
            "intake",
            serde_json::json!({ "seed_id": seed.id, "themes": seed.themes }),
        ))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essence_falls_back_to_first_sentence() {
        assert_eq!(heuristic_essence("I want to grow. More text follows."), "I want to grow");
    }

    #[test]
    fn themes_default_to_general() {
        let tokens = tokenize("xyz qqq zzz");
        let themes = heuristic_themes(&tokens, &HashMap::new());
        assert_eq!(themes, vec!["general".to_string()]);
    }

    #[test]
    fn themes_pick_up_creativity_and_connection() {
        let tokens = tokenize("I want to create beautiful art and share joy with my family");
        let themes = heuristic_themes(&tokens, &HashMap::new());
        assert!(themes.contains(&"creativity".to_string()));
        assert!(themes.contains(&"connection".to_string()));
    }

    #[test]
    fn energy_estimate_is_clamped() {
        assert!(heuristic_energy(0, 0) >= 5.0);
        assert!(heuristic_energy(10_000, 10) <= 50.0);
    }
}
