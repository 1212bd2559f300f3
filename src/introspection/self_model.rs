//! Self-model: periodic trait derivation, bias detection, and a
//! first-person narrative summary.

use std::collections::HashMap;

use chrono::Utc;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, SeedStatus, WoundSeverity};
use crate::error::DatabaseError;
use crate::introspection::predictions::PredictionStats;
use crate::textmodel::TextModel;

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

struct BehaviouralStats {
    total_seeds: usize,
    harvested: usize,
    composted: usize,
    growing: usize,
    total_dreams: usize,
    planted_dreams: usize,
    severe_wounds: usize,
    total_wounds: usize,
    core_memories: usize,
    total_memories: usize,
    total_energy: f64,
}

fn derive_traits(stats: &BehaviouralStats, antifragility: f64, prediction_accuracy: f64) -> HashMap<String, f64> {
    let harvest_rate = rate(stats.harvested, stats.total_seeds);
    let compost_rate = rate(stats.composted, stats.total_seeds);
    let dream_plant_rate = rate(stats.planted_dreams, stats.total_dreams);

    let nurturing = clamp01(0.6 * harvest_rate + 0.4 * clamp01(stats.growing as f64 / 10.0));
    let adventurous = clamp01(0.2 + 0.8 * dream_plant_rate);
    let resilient = clamp01(
        0.2 + 0.3 * antifragility
            + 0.5 * (1.0 - rate(stats.severe_wounds, stats.total_wounds.max(1))),
    );
    let contemplative = clamp01(
        0.2 + clamp01(stats.core_memories as f64 / 5.0).min(0.4) + 0.4 * prediction_accuracy,
    );
    let generous = (1.0 - stats.total_energy / stats.total_seeds.max(1) as f64 / 50.0).clamp(0.1, 1.0);
    let cautious = clamp01(0.1 + 0.8 * compost_rate);
    let creative = clamp01(0.3 + clamp01(stats.total_dreams as f64 / 10.0).min(0.5));

    HashMap::from([
        ("nurturing".to_string(), nurturing),
        ("adventurous".to_string(), adventurous),
        ("resilient".to_string(), resilient),
        ("contemplative".to_string(), contemplative),
        ("generous".to_string(), generous),
        ("cautious".to_string(), cautious),
        ("creative".to_string(), creative),
    ])
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn bias_warnings(
    stats: &BehaviouralStats,
    traits: &HashMap<String, f64>,
    prediction_accuracy: f64,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let compost_rate = rate(stats.composted, stats.total_seeds);
    let harvest_rate = rate(stats.harvested, stats.total_seeds);
    let dream_plant_rate = rate(stats.planted_dreams, stats.total_dreams);

    if compost_rate > 0.5 {
        warnings.push("composts too aggressively — seeds never get a chance to grow".to_string());
    }
    if harvest_rate < 0.1 && stats.total_seeds > 5 {
        warnings.push("few seeds reach harvest — too demanding or not nurturing enough".to_string());
    }
    if dream_plant_rate < 0.1 && stats.total_dreams > 5 {
        warnings.push("rarely plants dreams — too conservative with creative insights".to_string());
    }
    if traits["cautious"] > 0.7 && traits["adventurous"] < 0.3 {
        warnings.push("very cautious but not adventurous — playing it too safe".to_string());
    }
    if prediction_accuracy < 0.3 {
        warnings.push("predictions are often wrong — distorted self-image".to_string());
    }
    if stats.core_memories == 0 && stats.total_memories > 10 {
        warnings.push("no core memories formed — not reflecting deeply enough".to_string());
    }

    warnings
}

/// Compile the self-model: traits, bias warnings, theme affinities, and
/// decision accuracy grouped by prediction type.
#[allow(clippy::too_many_arguments)]
pub async fn update_self_model(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    prediction_stats: &PredictionStats,
) -> Result<crate::domain::SelfModelSnapshot, DatabaseError> {
    let living = store.list_living_seeds().await?;
    let harvested = store.list_seeds_by_status(SeedStatus::Harvested).await?;
    let composted = store.list_seeds_by_status(SeedStatus::Composted).await?;
    let growing = store.list_seeds_by_status(SeedStatus::Growing).await?;
    let dreams = store.list_recent_dreams(10_000).await?;
    let wounds = store.list_recent_wounds(10_000).await?;
    let memories = store.recent_memories(10_000).await?;
    let garden = store.get_garden_state().await?;

    let total_seeds = living.len() + harvested.len() + composted.len();
    let total_energy: f64 = living.iter().map(|s| s.energy).sum();

    let stats = BehaviouralStats {
        total_seeds,
        harvested: harvested.len(),
        composted: composted.len(),
        growing: growing.len(),
        total_dreams: dreams.len(),
        planted_dreams: dreams.iter().filter(|d| d.planted).count(),
        severe_wounds: wounds.iter().filter(|w| w.severity == WoundSeverity::Severe).count(),
        total_wounds: wounds.len(),
        core_memories: memories.iter().filter(|m| m.is_core_memory).count(),
        total_memories: memories.len(),
        total_energy,
    };

    let prediction_accuracy = prediction_stats.accuracy();
    let traits = derive_traits(&stats, garden.antifragility_score, prediction_accuracy);
    let warnings = bias_warnings(&stats, &traits, prediction_accuracy);

    let mut theme_totals: HashMap<String, (usize, usize)> = HashMap::new();
    for seed in harvested.iter().chain(composted.iter()).chain(living.iter()) {
        for theme in &seed.themes {
            let entry = theme_totals.entry(theme.clone()).or_insert((0, 0));
            entry.1 += 1;
            if seed.status == SeedStatus::Harvested {
                entry.0 += 1;
            }
        }
    }
    let theme_affinities: HashMap<String, f64> = theme_totals
        .into_iter()
        .filter(|(_, (_, total))| *total >= 2)
        .map(|(theme, (harvested, total))| (theme, harvested as f64 / total as f64))
        .collect();

    let decision_accuracy = HashMap::from([(
        "overall".to_string(),
        prediction_accuracy,
    )]);

    let prompt = format!(
        "Write one short first-person sentence describing a garden-tending organism with these \
         traits: {traits:?}, and these self-observations: {warnings:?}."
    );
    let narrative_text = text_model
        .generate(&prompt, None, 0.6, 100, "introspection", "self_model")
        .await;
    let identity_narrative = if narrative_text.is_empty() {
        format!(
            "I tend my garden with a nurturing score of {:.2} and a cautious score of {:.2}.",
            traits.get("nurturing").copied().unwrap_or(0.0),
            traits.get("cautious").copied().unwrap_or(0.0)
        )
    } else {
        narrative_text
    };

    let snapshot = crate::domain::SelfModelSnapshot {
        id: new_id(),
        harvest_rate: rate(stats.harvested, stats.total_seeds),
        compost_rate: rate(stats.composted, stats.total_seeds),
        dream_accuracy: prediction_accuracy,
        theme_affinities,
        decision_accuracy,
        personality_traits: traits,
        bias_warnings: warnings,
        identity_narrative,
        created_at: Utc::now(),
    };
    store.insert_self_model_snapshot(&snapshot).await?;

    let _ = bus
        .emit(Hormone::new(
            "self_model_updated",
            "introspection",
            serde_json::json!({ "snapshot_id": snapshot.id }),
        ))
        .await;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_of_zero_total_is_zero() {
        assert_eq!(rate(3, 0), 0.0);
    }

    #[test]
    fn clamp01_bounds_values() {
        assert_eq!(clamp01(-1.0), 0.0);
        assert_eq!(clamp01(2.0), 1.0);
    }
}
