//! Mycelial network effects between Seeds: symbiotic linking, nutrient
//! sharing, quorum sensing, pollination, and seasonal turns.

use std::collections::{HashMap, HashSet};

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{GardenState, RelationshipType, Season, Seed, SeedStatus, SproutStatus};
use crate::error::DatabaseError;

const LINK_THRESHOLD: f64 = 0.4;
const MUTUALISM_THRESHOLD: f64 = 0.6;
const PARASITISM_THRESHOLD: f64 = 0.1;
const NUTRIENT_RATIO_TRIGGER: f64 = 1.5;
const NUTRIENT_TRANSFER_RATE: f64 = 0.1;
const QUORUM_SIZE: usize = 3;

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn jaccard(a: &[String], b: &[String]) -> f64 {
    let sa: HashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = b.iter().map(String::as_str).collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn synergy(a: &Seed, b: &Seed) -> f64 {
    0.6 * cosine(&a.embedding, &b.embedding) + 0.4 * jaccard(&a.themes, &b.themes)
}

fn classify(score: f64, a: &Seed, b: &Seed) -> RelationshipType {
    if score > MUTUALISM_THRESHOLD {
        RelationshipType::Mutualism
    } else if (a.energy - b.energy).abs() > 0.5 * a.energy.max(b.energy) {
        RelationshipType::Commensalism
    } else if score < PARASITISM_THRESHOLD {
        RelationshipType::Parasitism
    } else {
        RelationshipType::Mutualism
    }
}

fn normalize_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Scan every unordered pair of living Seeds and create new symbiotic
/// links where synergy clears the threshold and the pair is unlinked.
pub async fn scan_symbiotic_links(
    store: &impl Database,
    bus: &HormoneBus,
) -> Result<usize, DatabaseError> {
    let seeds = store.list_living_seeds().await?;
    let existing = store.list_links().await?;
    let mut known: HashSet<(String, String)> = existing
        .iter()
        .map(|l| {
            let (a, b) = normalize_pair(&l.sprout_a_id, &l.sprout_b_id);
            (a.to_string(), b.to_string())
        })
        .collect();

    let mut created = 0;
    for i in 0..seeds.len() {
        for j in (i + 1)..seeds.len() {
            let (a, b) = (&seeds[i], &seeds[j]);
            let (lo, hi) = normalize_pair(&a.id, &b.id);
            let key = (lo.to_string(), hi.to_string());
            if known.contains(&key) {
                continue;
            }

            let score = synergy(a, b);
            if score < LINK_THRESHOLD {
                continue;
            }

            let link = crate::domain::SymbioticLink {
                id: crate::domain::new_id(),
                sprout_a_id: lo.to_string(),
                sprout_b_id: hi.to_string(),
                relationship_type: classify(score, a, b),
                synergy_score: score,
                nutrient_flow: 0.0,
            };
            store.insert_link(&link).await?;
            known.insert(key);
            created += 1;

            let _ = bus
                .emit(Hormone::new(
                    "symbiotic_link_formed",
                    "network",
                    serde_json::json!({
                        "a": link.sprout_a_id,
                        "b": link.sprout_b_id,
                        "relationship": match link.relationship_type {
                            RelationshipType::Mutualism => "mutualism",
                            RelationshipType::Commensalism => "commensalism",
                            RelationshipType::Parasitism => "parasitism",
                        },
                        "synergy": score,
                    }),
                ))
                .await;
        }
    }

    Ok(created)
}

/// Transfer energy across existing links from the richer endpoint to the
/// poorer one, proportional to synergy and the energy gap.
pub async fn share_nutrients(store: &impl Database) -> Result<f64, DatabaseError> {
    let links = store.list_links().await?;
    let seeds = store.list_living_seeds().await?;
    let mut by_id: HashMap<String, Seed> = seeds.into_iter().map(|s| (s.id.clone(), s)).collect();

    let mut total_transferred = 0.0;
    for mut link in links {
        let (Some(a), Some(b)) = (
            by_id.get(&link.sprout_a_id).cloned(),
            by_id.get(&link.sprout_b_id).cloned(),
        ) else {
            continue;
        };

        let (rich_id, poor_id, rich_e, poor_e) = if a.energy >= b.energy {
            (a.id.clone(), b.id.clone(), a.energy, b.energy)
        } else {
            (b.id.clone(), a.id.clone(), b.energy, a.energy)
        };

        if poor_e <= 0.0 || rich_e < NUTRIENT_RATIO_TRIGGER * poor_e {
            continue;
        }

        let delta = rich_e - poor_e;
        let transfer = NUTRIENT_TRANSFER_RATE * link.synergy_score * delta;
        if transfer <= 0.0 {
            continue;
        }

        if let Some(rich) = by_id.get_mut(&rich_id) {
            rich.energy -= transfer;
        }
        if let Some(poor) = by_id.get_mut(&poor_id) {
            poor.energy += transfer;
        }
        link.nutrient_flow += transfer;
        total_transferred += transfer;
        store.update_link(&link).await?;
    }

    for seed in by_id.into_values() {
        store.update_seed(&seed).await?;
    }

    Ok(total_transferred)
}

/// Emit `quorum_reached` for every theme shared by at least
/// [`QUORUM_SIZE`] living Seeds.
pub async fn quorum_sensing(store: &impl Database, bus: &HormoneBus) -> Result<usize, DatabaseError> {
    let seeds = store.list_living_seeds().await?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for seed in &seeds {
        for theme in &seed.themes {
            *counts.entry(theme.clone()).or_insert(0) += 1;
        }
    }

    let mut reached = 0;
    for (theme, count) in counts {
        if count >= QUORUM_SIZE {
            reached += 1;
            let _ = bus
                .emit(Hormone::new(
                    "quorum_reached",
                    "network",
                    serde_json::json!({ "theme": theme, "count": count }),
                ))
                .await;
        }
    }
    Ok(reached)
}

/// Spread a small energy bonus to living, non-harvested Seeds whose theme
/// set properly overlaps the just-harvested Seed's themes.
pub async fn pollinate(
    store: &impl Database,
    bus: &HormoneBus,
    harvested: &Seed,
) -> Result<usize, DatabaseError> {
    let target_themes: HashSet<&str> = harvested.themes.iter().map(String::as_str).collect();
    if target_themes.is_empty() {
        return Ok(0);
    }

    let candidates = store.list_living_seeds().await?;
    let mut pollinated = 0;
    for mut seed in candidates {
        if seed.id == harvested.id || seed.status == SeedStatus::Harvested {
            continue;
        }
        let seed_themes: HashSet<&str> = seed.themes.iter().map(String::as_str).collect();
        let overlap: HashSet<&&str> = target_themes.intersection(&seed_themes).collect();
        if overlap.is_empty() || overlap.len() >= target_themes.len() {
            continue;
        }
        seed.energy += 0.5 * overlap.len() as f64 / target_themes.len() as f64;
        store.update_seed(&seed).await?;
        pollinated += 1;
    }

    if pollinated > 0 {
        let _ = bus
            .emit(Hormone::new(
                "pollination",
                "network",
                serde_json::json!({ "source": harvested.id, "count": pollinated }),
            ))
            .await;
    }

    Ok(pollinated)
}

/// Advance the garden to the next season and apply its one-time effects.
pub async fn turn_season(
    store: &impl Database,
    bus: &HormoneBus,
    garden: &mut GardenState,
    force: Option<Season>,
) -> Result<(), DatabaseError> {
    garden.season = force.unwrap_or_else(|| garden.season.next());
    garden.cycle_count += 1;

    match garden.season {
        Season::Spring => {
            for mut seed in store.list_seeds_by_status(SeedStatus::Growing).await? {
                seed.energy *= 1.1;
                store.update_seed(&seed).await?;
            }
            garden.vitality = (garden.vitality * 1.1).min(1.0);
        }
        Season::Autumn => {
            for seed in store.list_living_seeds().await? {
                let mut sprouts = store.list_sprouts_for_seed(&seed.id).await?;
                for sprout in sprouts.iter_mut() {
                    if sprout.status == SproutStatus::Budding && sprout.energy < 0.5 {
                        sprout.status = SproutStatus::Wilting;
                        store.update_sprout(sprout).await?;
                    }
                }
            }
        }
        Season::Winter => {
            garden.vitality = (garden.vitality * 0.9).max(0.3);
        }
        Season::Summer => {}
    }

    store.save_garden_state(garden).await?;

    let _ = bus
        .emit(Hormone::new(
            "season_change",
            "network",
            serde_json::json!({ "season": garden.season.as_str(), "cycle": garden.cycle_count }),
        ))
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        let a = vec!["a".to_string()];
        let b = vec!["b".to_string()];
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn normalize_pair_is_order_independent() {
        assert_eq!(normalize_pair("z", "a"), normalize_pair("a", "z"));
    }
}
