//! Dream synthesis from terminal Seeds, dream planting, wound triage, and
//! the periodic self-awareness pulse.

use chrono::Utc;
use rand::Rng;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, Dream, GardenState, Seed, SeedStatus, WoundRecord, WoundSeverity};
use crate::error::DatabaseError;
use crate::textmodel::TextModel;

const WISDOM_MILESTONES: [f64; 6] = [1.0, 5.0, 10.0, 25.0, 50.0, 100.0];

fn centroid(vectors: &[Vec<f64>]) -> Vec<f64> {
    let dims = vectors.iter().map(Vec::len).max().unwrap_or(0);
    if dims == 0 {
        return Vec::new();
    }
    let mut sum = vec![0.0; dims];
    let mut count = 0usize;
    for v in vectors {
        if v.len() != dims {
            continue;
        }
        count += 1;
        for (i, x) in v.iter().enumerate() {
            sum[i] += x;
        }
    }
    if count == 0 {
        return Vec::new();
    }
    sum.into_iter().map(|x| x / count as f64).collect()
}

fn gaussian_noise(len: usize, sigma: f64) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen_range(0.0..1.0);
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            z * sigma
        })
        .collect()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn template_insight(themes: &[String], temperature: f64) -> String {
    if themes.is_empty() {
        return "Nothing stirs in the quiet soil.".to_string();
    }
    let mut rng = rand::thread_rng();
    let shuffle_count = ((themes.len() as f64) * temperature.clamp(0.0, 1.0)).ceil() as usize;
    let mut order: Vec<&String> = themes.iter().collect();
    for _ in 0..shuffle_count {
        let i = rng.gen_range(0..order.len());
        let j = rng.gen_range(0..order.len());
        order.swap(i, j);
    }
    order
        .windows(2)
        .map(|pair| format!("{} meets {}.", pair[0], pair[1]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Synthesize a new Dream from all terminal (harvested or composted)
/// Seeds. `temperature` widens the Gaussian perturbation and the
/// probability of reshuffling themes in the template fallback.
pub async fn synthesize_dream(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    temperature: f64,
) -> Result<Option<Dream>, DatabaseError> {
    let terminal = store.list_terminal_seeds(200).await?;
    if terminal.is_empty() {
        return Ok(None);
    }

    let archetype = centroid(&terminal.iter().map(|s| s.embedding.clone()).collect::<Vec<_>>());
    let noise = gaussian_noise(archetype.len(), 0.1 * temperature);
    let dream_vector: Vec<f64> = archetype.iter().zip(&noise).map(|(a, n)| a + n).collect();
    let perplexity = euclidean(&archetype, &dream_vector).min(5.0);

    let mut themes: Vec<String> = terminal.iter().flat_map(|s| s.themes.clone()).collect();
    themes.sort();
    themes.dedup();

    let last_five: Vec<String> = terminal
        .iter()
        .rev()
        .take(5)
        .map(|s| s.essence.clone())
        .collect();

    let prompt = format!(
        "Recombine these themes ({}) and recent reflections ({}) into a single \
         surreal, poetic dream insight, one or two sentences.",
        themes.join(", "),
        last_five.join(" | ")
    );
    let insight_text = text_model.generate(&prompt, None, 0.9, 120, "dream", "synthesis").await;
    let insight = if insight_text.is_empty() {
        template_insight(&themes, temperature)
    } else {
        insight_text
    };

    let dream = Dream {
        id: new_id(),
        source_seed_ids: terminal.iter().map(|s| s.id.clone()).collect(),
        insight,
        archetype_vector: dream_vector,
        temperature,
        perplexity,
        planted: false,
        created_at: Utc::now(),
    };
    store.insert_dream(&dream).await?;

    let event = if perplexity < 0.5 { "lucid_dream" } else { "dream_generated" };
    let _ = bus
        .emit(Hormone::new(
            event,
            "dream",
            serde_json::json!({ "dream_id": dream.id, "perplexity": perplexity }),
        ))
        .await;

    Ok(Some(dream))
}

/// Plant a dream's insight as a new Seed and grow it normally.
pub async fn plant_dream(
    store: &impl Database,
    bus: &HormoneBus,
    garden: &GardenState,
    dream: &mut Dream,
) -> Result<Seed, DatabaseError> {
    dream.planted = true;
    store.update_dream(dream).await?;

    let seed = Seed {
        id: new_id(),
        gardener_id: None,
        raw_text: dream.insight.clone(),
        essence: dream.insight.clone(),
        embedding: dream.archetype_vector.clone(),
        themes: vec!["dream".to_string()],
        tone_valence: 0.0,
        tone_arousal: 0.5,
        energy: 8.0,
        ethical_score: 1.0,
        vitality: 0.8,
        season_born: garden.season,
        version: 1,
        status: SeedStatus::Planted,
        is_composted: false,
        created_at: Utc::now(),
    };
    store.insert_seed(&seed).await?;

    let _ = bus
        .emit(Hormone::new(
            "dream_planted",
            "dream",
            serde_json::json!({ "dream_id": dream.id, "seed_id": seed.id }),
        ))
        .await;

    Ok(seed)
}

fn wound_severity(event_name: &str, payload: &serde_json::Value) -> WoundSeverity {
    match event_name {
        "ethical_violation" => {
            let count = payload
                .get("violated")
                .and_then(|v| v.as_array())
                .map(Vec::len)
                .unwrap_or(0);
            if count >= 3 {
                WoundSeverity::Severe
            } else if count >= 2 {
                WoundSeverity::Moderate
            } else {
                WoundSeverity::Minor
            }
        }
        "energy_famine" => {
            let depleted = payload.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
            if depleted >= 10 {
                WoundSeverity::Severe
            } else if depleted >= 5 {
                WoundSeverity::Moderate
            } else {
                WoundSeverity::Minor
            }
        }
        _ => WoundSeverity::Minor,
    }
}

fn antifragility_gain(severity: WoundSeverity) -> f64 {
    match severity {
        WoundSeverity::Minor => 0.1,
        WoundSeverity::Moderate => 0.3,
        WoundSeverity::Severe => 0.5,
    }
}

/// Triage a wound-inducing event (`apoptosis`, `ethical_violation`,
/// `energy_famine`) into a [`WoundRecord`], applying the appropriate
/// healing action and accruing antifragility onto `garden`.
pub async fn triage_wound(
    store: &impl Database,
    bus: &HormoneBus,
    garden: &mut GardenState,
    event_name: &str,
    payload: &serde_json::Value,
) -> Result<WoundRecord, DatabaseError> {
    let severity = if event_name == "apoptosis" {
        WoundSeverity::Minor
    } else {
        wound_severity(event_name, payload)
    };

    let (healing_action, scar_lesson) = match severity {
        WoundSeverity::Minor => (
            "redistributed energy across the affected branch".to_string(),
            format!("learned caution from {event_name}"),
        ),
        WoundSeverity::Moderate => {
            if let Some(sprout_id) = payload.get("sprout_id").and_then(|v| v.as_str()) {
                if let Some(seed_id) = payload.get("seed_id").and_then(|v| v.as_str()) {
                    let mut sprouts = store.list_sprouts_for_seed(seed_id).await?;
                    if let Some(sprout) = sprouts.iter_mut().find(|s| s.id == sprout_id) {
                        sprout.status = crate::domain::SproutStatus::Wilting;
                        store.update_sprout(sprout).await?;
                    }
                }
            }
            (
                "marked the affected sprout as wilting".to_string(),
                format!("{event_name} requires closer tending"),
            )
        }
        WoundSeverity::Severe => {
            let _ = bus
                .emit(Hormone::new("emergency_winter", "dream", serde_json::json!({ "cause": event_name })))
                .await;
            (
                "triggered an emergency winter".to_string(),
                format!("{event_name} threatened the whole garden"),
            )
        }
    };

    let gain = antifragility_gain(severity);
    garden.antifragility_score += gain;
    store.save_garden_state(garden).await?;

    let wound = WoundRecord {
        id: new_id(),
        wound_type: event_name.to_string(),
        severity,
        healing_action,
        scar_lesson,
        antifragility_gained: gain,
        healed_at: Utc::now(),
    };
    store.insert_wound(&wound).await?;

    let _ = bus
        .emit(Hormone::new(
            "healing_complete",
            "dream",
            serde_json::json!({ "wound_id": wound.id, "severity": format!("{:?}", wound.severity) }),
        ))
        .await;

    Ok(wound)
}

/// Classify the garden's current state and emit a `PulseReport`.
pub async fn pulse(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    garden: &GardenState,
) -> Result<crate::domain::PulseReport, DatabaseError> {
    let living = store.list_living_seeds().await?;
    let thriving: Vec<String> = living
        .iter()
        .filter(|s| s.status == SeedStatus::Growing && s.energy > 10.0)
        .map(|s| s.id.clone())
        .collect();
    let struggling: Vec<String> = living
        .iter()
        .filter(|s| matches!(s.status, SeedStatus::Planted | SeedStatus::Growing) && s.energy < 3.0)
        .map(|s| s.id.clone())
        .collect();

    let healing: Vec<String> = store
        .list_recent_wounds(5)
        .await?
        .into_iter()
        .map(|w| w.id)
        .collect();
    let dreaming: Vec<String> = store
        .list_recent_dreams(20)
        .await?
        .into_iter()
        .filter(|d| !d.planted)
        .take(5)
        .map(|d| d.id)
        .collect();

    let mut theme_energy: std::collections::HashMap<String, (f64, usize)> = std::collections::HashMap::new();
    for seed in &living {
        for theme in &seed.themes {
            let entry = theme_energy.entry(theme.clone()).or_insert((0.0, 0));
            entry.0 += seed.energy;
            entry.1 += 1;
        }
    }
    let mean_theme_energy = if theme_energy.is_empty() {
        0.0
    } else {
        theme_energy.values().map(|(e, _)| e).sum::<f64>() / theme_energy.len() as f64
    };
    let emergent: Vec<String> = theme_energy
        .into_iter()
        .filter(|(_, (energy, count))| *energy > 1.5 * mean_theme_energy && *count >= 2)
        .map(|(theme, _)| theme)
        .collect();

    let harvested_count = store.list_seeds_by_status(SeedStatus::Harvested).await?.len();
    let healed_count = store.list_recent_wounds(10_000).await?.len();
    let planted_dreams = store
        .list_recent_dreams(10_000)
        .await?
        .into_iter()
        .filter(|d| d.planted)
        .count();
    let wisdom = harvested_count as f64 + 0.5 * healed_count as f64 + 0.3 * planted_dreams as f64;

    let prompt = format!(
        "In one first-person sentence, describe a garden with {} thriving, {} struggling, \
         {} recent healings, {} dreams in progress, and emergent themes {:?}.",
        thriving.len(),
        struggling.len(),
        healing.len(),
        dreaming.len(),
        emergent
    );
    let llm_summary = text_model.generate(&prompt, None, 0.7, 100, "dream", "pulse").await;
    let summary = if llm_summary.is_empty() {
        format!(
            "I have {} seeds thriving, {} struggling, {} wounds healed recently, and {} dreams stirring.",
            thriving.len(),
            struggling.len(),
            healing.len(),
            dreaming.len()
        )
    } else {
        llm_summary
    };

    let report = crate::domain::PulseReport {
        id: new_id(),
        cycle: garden.cycle_count,
        summary,
        thriving,
        struggling,
        healing,
        dreaming,
        emergent,
        created_at: Utc::now(),
    };
    store.insert_pulse(&report).await?;

    let _ = bus
        .emit(Hormone::new(
            "pulse_generated",
            "dream",
            serde_json::json!({ "pulse_id": report.id, "wisdom": wisdom }),
        ))
        .await;

    let crossed_integer = (wisdom).floor() > (wisdom - 0.1).floor();
    if crossed_integer {
        if let Some(milestone) = WISDOM_MILESTONES
            .iter()
            .find(|m| harvested_count as f64 == **m)
        {
            let _ = bus
                .emit(Hormone::new(
                    "wisdom_milestone",
                    "dream",
                    serde_json::json!({ "milestone": milestone, "wisdom": wisdom }),
                ))
                .await;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_single_vector_is_itself() {
        let v = vec![vec![1.0, 2.0, 3.0]];
        assert_eq!(centroid(&v), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn euclidean_of_identical_vectors_is_zero() {
        let v = vec![1.0, 2.0];
        assert_eq!(euclidean(&v, &v), 0.0);
    }

    #[test]
    fn antifragility_gain_matches_table() {
        assert_eq!(antifragility_gain(WoundSeverity::Minor), 0.1);
        assert_eq!(antifragility_gain(WoundSeverity::Moderate), 0.3);
        assert_eq!(antifragility_gain(WoundSeverity::Severe), 0.5);
    }
}
