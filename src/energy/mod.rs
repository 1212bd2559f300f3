//! Photosynthesis, phloem distribution, mycorrhizal sharing, and seasonal
//! entropy decay — the energy economy that keeps the garden alive between
//! ticks.

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{GardenState, Season, Seed, Sprout, SproutStatus};
use crate::error::DatabaseError;
use crate::settings::EnergySettings;

fn tidal_coefficient(tidal_phase: f64, period_secs: f64) -> f64 {
    1.0 + 0.5 * (2.0 * std::f64::consts::PI * (tidal_phase % period_secs) / period_secs).sin()
}

fn season_entropy_modifier(season: Season) -> f64 {
    match season {
        Season::Spring => 0.5,
        Season::Summer => 1.0,
        Season::Autumn => 0.8,
        Season::Winter => 0.2,
    }
}

/// Convert attention into stored energy, modulated by the seed's resonance
/// and the garden's tidal cycle. Writes the new tidal phase back onto
/// `garden` so callers persist it alongside `seed`.
pub async fn photosynthesize(
    store: &impl Database,
    bus: &HormoneBus,
    settings: &EnergySettings,
    garden: &mut GardenState,
    seed: &mut Seed,
    attention_seconds: f64,
    multiplier: Option<f64>,
) -> Result<f64, DatabaseError> {
    let tidal = tidal_coefficient(garden.tidal_phase, settings.tidal_period_secs);
    let gained = (settings.base_photosynthesis_rate
        * attention_seconds
        * (seed.resonance().max(0.1) + 1.0)
        * tidal
        * multiplier.unwrap_or(1.0))
    .clamp(0.0, 50.0);

    seed.energy += gained;
    garden.total_energy += gained;
    garden.tidal_phase = (garden.tidal_phase + attention_seconds) % settings.tidal_period_secs;

    store.update_seed(seed).await?;
    store.save_garden_state(garden).await?;

    let _ = bus
        .emit(Hormone::new(
            "photosynthesis",
            "energy",
            serde_json::json!({ "seed_id": seed.id, "gained": gained }),
        ))
        .await;

    Ok(gained)
}

/// Push 30% of a seed's energy down into its living sprouts, weighted by
/// pressure and ethical standing.
pub async fn phloem(store: &impl Database, seed: &mut Seed) -> Result<(), DatabaseError> {
    let mut sprouts = store.list_sprouts_for_seed(&seed.id).await?;
    sprouts.retain(Sprout::is_living);
    sprouts.sort_by_key(|s| s.depth);

    let weights: Vec<f64> = sprouts.iter().map(|s| s.pressure * s.ethical_score).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || sprouts.is_empty() {
        return Ok(());
    }

    let pool = 0.3 * seed.energy;
    for (sprout, weight) in sprouts.iter_mut().zip(weights.iter()) {
        let share = (weight / total) * pool;
        sprout.energy += share;
        store.update_sprout(sprout).await?;
    }
    seed.energy -= pool;
    store.update_seed(seed).await?;

    Ok(())
}

/// Redistribute energy within a seed's sprout tree from energy-rich
/// sprouts to energy-poor ones, scaled by depth proximity.
pub async fn mycorrhiza(
    store: &impl Database,
    bus: &HormoneBus,
    settings: &EnergySettings,
    seed: &Seed,
) -> Result<f64, DatabaseError> {
    let mut sprouts = store.list_sprouts_for_seed(&seed.id).await?;
    sprouts.retain(Sprout::is_living);
    if sprouts.is_empty() {
        return Ok(0.0);
    }

    let mean = sprouts.iter().map(|s| s.energy).sum::<f64>() / sprouts.len() as f64;
    let donor_idx: Vec<usize> = sprouts
        .iter()
        .enumerate()
        .filter(|(_, s)| s.energy > 1.3 * mean)
        .map(|(i, _)| i)
        .collect();
    let receiver_idx: Vec<usize> = sprouts
        .iter()
        .enumerate()
        .filter(|(_, s)| s.energy < 0.7 * mean)
        .map(|(i, _)| i)
        .collect();

    if donor_idx.is_empty() || receiver_idx.is_empty() {
        return Ok(0.0);
    }

    let mut transferred = 0.0;
    for &d in &donor_idx {
        let surplus = sprouts[d].energy - mean;
        let donor_share = surplus * settings.mycorrhizal_ratio;
        if donor_share <= 0.0 {
            continue;
        }
        sprouts[d].energy -= donor_share;

        for &r in &receiver_idx {
            let proximity = 1.0 / (1.0 + (sprouts[d].depth - sprouts[r].depth).unsigned_abs() as f64);
            let gain = (donor_share / receiver_idx.len() as f64) * proximity;
            sprouts[r].energy += gain;
            transferred += gain;
        }
    }

    for sprout in &sprouts {
        store.update_sprout(sprout).await?;
    }

    if transferred > 0.5 {
        let _ = bus
            .emit(Hormone::new(
                "energy_surplus",
                "energy",
                serde_json::json!({ "seed_id": seed.id, "transferred": transferred }),
            ))
            .await;
    }

    Ok(transferred)
}

/// Apply seasonal entropy decay to a seed's living sprouts; sprouts whose
/// energy decays below 0.01 are zeroed and counted as depleted.
pub async fn entropy(
    store: &impl Database,
    bus: &HormoneBus,
    settings: &EnergySettings,
    season: Season,
    seed: &Seed,
) -> Result<usize, DatabaseError> {
    let mut sprouts = store.list_sprouts_for_seed(&seed.id).await?;
    sprouts.retain(Sprout::is_living);
    let rate = settings.base_entropy_rate * season_entropy_modifier(season);

    let mut depleted = 0;
    for sprout in &mut sprouts {
        sprout.energy *= 1.0 - rate;
        if sprout.energy < 0.01 {
            sprout.energy = 0.0;
            depleted += 1;
        }
        store.update_sprout(sprout).await?;
    }

    if depleted > 0 {
        let _ = bus
            .emit(Hormone::new(
                "energy_famine",
                "energy",
                serde_json::json!({ "seed_id": seed.id, "count": depleted, "season": season.as_str() }),
            ))
            .await;
    }

    Ok(depleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidal_coefficient_stays_in_expected_range() {
        for t in 0..20 {
            let c = tidal_coefficient(t as f64 * 1000.0, 14_400.0);
            assert!((0.5..=1.5).contains(&c));
        }
    }

    #[test]
    fn season_entropy_modifier_matches_table() {
        assert_eq!(season_entropy_modifier(Season::Spring), 0.5);
        assert_eq!(season_entropy_modifier(Season::Summer), 1.0);
        assert_eq!(season_entropy_modifier(Season::Autumn), 0.8);
        assert_eq!(season_entropy_modifier(Season::Winter), 0.2);
    }
}
