//! Prediction engine: seed-outcome and energy-trend forecasts, resolved
//! for surprise before new ones are created.

use chrono::Utc;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, GardenState, Prediction, PredictionType, Season, Seed, SeedStatus};
use crate::error::DatabaseError;

const UNRESOLVED_CAP: usize = 20;
const MAX_SEED_PREDICTIONS_PER_TICK: usize = 3;
const RESOLUTION_MIN_AGE_SECS: i64 = 60;

/// Process-lifetime running statistics for the prediction engine, kept
/// independent of the per-tick phase that drives it.
#[derive(Debug, Clone, Default)]
pub struct PredictionStats {
    pub resolved_count: u64,
    pub correct_count: u64,
    pub total_surprise: f64,
}

impl PredictionStats {
    pub fn accuracy(&self) -> f64 {
        if self.resolved_count == 0 {
            0.5
        } else {
            self.correct_count as f64 / self.resolved_count as f64
        }
    }

    pub fn average_surprise(&self) -> f64 {
        if self.resolved_count == 0 {
            0.5
        } else {
            self.total_surprise / self.resolved_count as f64
        }
    }

    fn record(&mut self, correct: bool, surprise: f64) {
        self.resolved_count += 1;
        if correct {
            self.correct_count += 1;
        }
        self.total_surprise += surprise;
    }
}

fn resolvable(prediction: &Prediction) -> bool {
    (Utc::now() - prediction.created_at).num_seconds() >= RESOLUTION_MIN_AGE_SECS
}

fn resolve_seed_outcome(prediction: &Prediction, actual_status: &str) -> (bool, f64) {
    let correct = prediction.predicted_outcome == actual_status;
    let surprise = if correct {
        (0.2 - 0.2 * prediction.confidence).max(0.0)
    } else {
        (0.2 + 0.8 * prediction.confidence).min(1.0)
    };
    (correct, surprise)
}

/// `predicted_outcome` for energy_trend predictions is encoded as
/// `"{direction}:{baseline_energy}"` since the schema has no dedicated
/// baseline column; this parses both halves back out.
fn parse_energy_trend_outcome(encoded: &str) -> (&str, f64) {
    match encoded.split_once(':') {
        Some((direction, baseline)) => (direction, baseline.parse().unwrap_or(0.0)),
        None => (encoded, 0.0),
    }
}

fn resolve_energy_trend(prediction: &Prediction, current_total_energy: f64) -> (bool, f64, String) {
    let (direction, baseline) = parse_energy_trend_outcome(&prediction.predicted_outcome);
    let delta = current_total_energy - baseline;
    let actual_direction = if delta > 2.0 {
        "increase"
    } else if delta < -2.0 {
        "decrease"
    } else {
        "stable"
    };
    let correct = direction == actual_direction;
    let surprise = if correct {
        (0.2 - 0.2 * prediction.confidence).max(0.0)
    } else {
        (0.2 + 0.8 * prediction.confidence).min(1.0)
    };
    (correct, surprise, actual_direction.to_string())
}

/// Resolve every resolvable unresolved prediction against current state,
/// updating `stats` and emitting `high_surprise`/`low_surprise`.
pub async fn resolve_pending(
    store: &impl Database,
    bus: &HormoneBus,
    stats: &mut PredictionStats,
    current_total_energy: f64,
) -> Result<usize, DatabaseError> {
    let pending = store.unresolved_predictions().await?;
    let mut resolved = 0;
    let mut tick_surprise_sum = 0.0;
    let mut tick_surprise_count = 0;

    for mut prediction in pending {
        if !resolvable(&prediction) {
            continue;
        }

        let (correct, surprise, actual) = match prediction.prediction_type {
            PredictionType::SeedOutcome => {
                let Some(seed) = store.get_seed(&prediction.subject_id).await? else {
                    continue;
                };
                let actual_status = seed_status_label(&seed.status).to_string();
                let (correct, surprise) = resolve_seed_outcome(&prediction, &actual_status);
                (correct, surprise, actual_status)
            }
            PredictionType::EnergyTrend => {
                let (correct, surprise, actual) =
                    resolve_energy_trend(&prediction, current_total_energy);
                (correct, surprise, actual)
            }
        };

        prediction.actual_outcome = Some(actual);
        prediction.surprise_score = Some(surprise);
        prediction.resolved = true;
        prediction.resolved_at = Some(Utc::now());
        store.update_prediction(&prediction).await?;

        stats.record(correct, surprise);
        tick_surprise_sum += surprise;
        tick_surprise_count += 1;
        resolved += 1;
    }

    if tick_surprise_count > 0 {
        let mean = tick_surprise_sum / tick_surprise_count as f64;
        if mean > 0.5 {
            let _ = bus
                .emit(Hormone::new("high_surprise", "introspection", serde_json::json!({ "mean_surprise": mean })))
                .await;
        } else if mean < 0.2 {
            let _ = bus
                .emit(Hormone::new("low_surprise", "introspection", serde_json::json!({ "mean_surprise": mean })))
                .await;
        }
    }

    Ok(resolved)
}

fn seed_status_label(status: &SeedStatus) -> &'static str {
    match status {
        SeedStatus::Planted => "planted",
        SeedStatus::Growing => "growing",
        SeedStatus::Harvested => "harvest",
        SeedStatus::Composted => "compost",
    }
}

fn heuristic_seed_prediction(seed: &Seed) -> (String, f64) {
    let age = (Utc::now() - seed.created_at).num_seconds() as f64;
    if seed.energy > 15.0 && age > 120.0 {
        ("harvest".to_string(), (0.5 + seed.energy / 50.0).min(0.9))
    } else if seed.energy < 2.0 && age > 200.0 {
        ("compost".to_string(), (0.4 + (300.0 - age) / 500.0).min(0.8).max(0.4))
    } else if seed.status == SeedStatus::Planted && age < 60.0 {
        ("growing".to_string(), 0.7)
    } else {
        ("continue".to_string(), 0.5)
    }
}

fn heuristic_energy_trend(season: Season, living_count: usize) -> (String, f64) {
    if matches!(season, Season::Spring | Season::Summer) && living_count > 2 {
        ("increase".to_string(), 0.6)
    } else if matches!(season, Season::Winter) || living_count == 0 {
        ("decrease".to_string(), 0.7)
    } else {
        ("stable".to_string(), 0.4)
    }
}

/// Create up to 3 new seed-outcome predictions and at most one
/// energy_trend prediction, subject to the unresolved cap.
pub async fn create_new(
    store: &impl Database,
    living_seeds: &[Seed],
    garden: &GardenState,
) -> Result<usize, DatabaseError> {
    let mut unresolved_count = store.count_unresolved_predictions().await? as usize;
    if unresolved_count >= UNRESOLVED_CAP {
        return Ok(0);
    }

    let unresolved = store.unresolved_predictions().await?;
    let mut created = 0;

    for seed in living_seeds.iter().take(MAX_SEED_PREDICTIONS_PER_TICK) {
        if unresolved_count >= UNRESOLVED_CAP {
            break;
        }
        let already = unresolved
            .iter()
            .any(|p| p.prediction_type == PredictionType::SeedOutcome && p.subject_id == seed.id);
        if already {
            continue;
        }

        let (outcome, confidence) = heuristic_seed_prediction(seed);
        let prediction = Prediction {
            id: new_id(),
            prediction_type: PredictionType::SeedOutcome,
            subject_id: seed.id.clone(),
            predicted_outcome: outcome,
            confidence,
            actual_outcome: None,
            surprise_score: None,
            resolved: false,
            created_at: Utc::now(),
            resolved_at: None,
        };
        store.insert_prediction(&prediction).await?;
        unresolved_count += 1;
        created += 1;
    }

    if unresolved_count < UNRESOLVED_CAP {
        let has_energy_trend = unresolved
            .iter()
            .any(|p| p.prediction_type == PredictionType::EnergyTrend);
        if !has_energy_trend {
            let (direction, confidence) = heuristic_energy_trend(garden.season, living_seeds.len());
            let prediction = Prediction {
                id: new_id(),
                prediction_type: PredictionType::EnergyTrend,
                subject_id: garden.id.clone(),
                predicted_outcome: format!("{direction}:{}", garden.total_energy),
                confidence,
                actual_outcome: None,
                surprise_score: None,
                resolved: false,
                created_at: Utc::now(),
                resolved_at: None,
            };
            store.insert_prediction(&prediction).await?;
            created += 1;
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_default_to_half() {
        let stats = PredictionStats::default();
        assert_eq!(stats.accuracy(), 0.5);
        assert_eq!(stats.average_surprise(), 0.5);
    }

    #[test]
    fn correct_guess_has_low_surprise() {
        let prediction = Prediction {
            id: "p".to_string(),
            prediction_type: PredictionType::SeedOutcome,
            subject_id: "s".to_string(),
            predicted_outcome: "harvest".to_string(),
            confidence: 0.8,
            actual_outcome: None,
            surprise_score: None,
            resolved: false,
            created_at: Utc::now(),
            resolved_at: None,
        };
        let (correct, surprise) = resolve_seed_outcome(&prediction, "harvest");
        assert!(correct);
        assert!(surprise < 0.2);
    }
}
