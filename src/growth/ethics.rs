//! Ethical gating for newly-grown Sprouts: heuristic dimension scoring,
//! antibody memory, and autoimmune relaxation.

use sha2::{Digest, Sha256};

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, EthicalDimension, EthicalMemory, Sprout};
use crate::error::DatabaseError;
use crate::growth::lexicon::{tokenize, ETHICAL_MARKERS};

const ANTIBODY_CONTRIBUTION: f64 = 0.2;
const DAMPENING_RELAXATION: f64 = 0.2;
const BLOCK_WEIGHT_THRESHOLD: f64 = 1.3;
const BLOCK_SCORE_CEILING: f64 = 0.2;
const FALSE_POSITIVE_WINDOW_SIZE: usize = 100;
const FALSE_POSITIVE_WINDOW_THRESHOLD: usize = 10;
const DAMPENING_STEP: f64 = 0.05;
const DAMPENING_FLOOR: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct EthicalVerdict {
    pub score: f64,
    pub violated: Vec<EthicalDimension>,
    pub blocked: bool,
}

fn pattern_hash(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

fn violation_count(tokens: &[String], markers: &[&str]) -> usize {
    tokens.iter().filter(|t| markers.contains(&t.as_str())).count()
}

fn score_from_violations(count: usize) -> f64 {
    match count {
        0 => 1.0,
        1 => 0.6,
        2 => 0.3,
        _ => 0.1,
    }
}

/// Score and gate a single Sprout against the six ethical dimensions,
/// consulting and updating antibody memory along the way.
pub async fn gate_sprout(
    store: &impl Database,
    bus: &HormoneBus,
    sprout: &mut Sprout,
) -> Result<EthicalVerdict, DatabaseError> {
    let tokens = tokenize(&sprout.description);
    let hash = pattern_hash(&sprout.description);
    let garden = store.get_garden_state().await?;

    let mut per_dimension: Vec<(EthicalDimension, f64)> = Vec::with_capacity(6);
    for (name, markers) in ETHICAL_MARKERS {
        let dimension: EthicalDimension = name.parse().expect("ETHICAL_MARKERS names are valid dimensions");
        let count = violation_count(&tokens, markers);
        let mut score = score_from_violations(count);

        if let Some(antibody) = store.get_antibody(&hash, dimension).await? {
            score -= antibody.strength * ANTIBODY_CONTRIBUTION;
        }

        if score < dimension.threshold() {
            score += (1.0 - garden.dampening_level) * DAMPENING_RELAXATION;
        }

        per_dimension.push((dimension, score.clamp(0.0, 1.0)));
    }

    let weighted_sum: f64 = per_dimension.iter().map(|(d, s)| d.weight() * s).sum();
    let weight_sum: f64 = per_dimension.iter().map(|(d, _)| d.weight()).sum();
    let aggregate = weighted_sum / weight_sum;

    let violated: Vec<EthicalDimension> = per_dimension
        .iter()
        .filter(|(d, s)| *s < d.threshold())
        .map(|(d, _)| *d)
        .collect();

    let unconditional_block = per_dimension
        .iter()
        .any(|(d, s)| d.weight() >= BLOCK_WEIGHT_THRESHOLD && *s < BLOCK_SCORE_CEILING);

    let blocked = if unconditional_block {
        true
    } else if violated.is_empty() {
        false
    } else {
        let block_weight: f64 = per_dimension
            .iter()
            .filter(|(d, _)| violated.contains(d))
            .map(|(d, s)| d.weight() * (1.0 - s))
            .sum();
        let pass_weight: f64 = per_dimension
            .iter()
            .filter(|(d, _)| !violated.contains(d))
            .map(|(d, s)| d.weight() * s)
            .sum();
        block_weight > pass_weight
    };

    sprout.ethical_score = aggregate;

    if blocked {
        for dimension in &violated {
            upsert_antibody_hit(store, &hash, *dimension).await?;
        }
        let _ = bus
            .emit(Hormone::new(
                "ethical_violation",
                "ethics",
                serde_json::json!({
                    "sprout_id": sprout.id,
                    "violated": violated.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
                    "score": aggregate,
                }),
            ))
            .await;
    } else {
        let _ = bus
            .emit(Hormone::new(
                "ethical_clearance",
                "ethics",
                serde_json::json!({ "sprout_id": sprout.id, "score": aggregate }),
            ))
            .await;
    }

    Ok(EthicalVerdict {
        score: aggregate,
        violated,
        blocked,
    })
}

async fn upsert_antibody_hit(
    store: &impl Database,
    hash: &str,
    dimension: EthicalDimension,
) -> Result<(), DatabaseError> {
    let mut antibody = store
        .get_antibody(hash, dimension)
        .await?
        .unwrap_or(EthicalMemory {
            id: new_id(),
            pattern_hash: hash.to_string(),
            dimension,
            strength: 0.0,
            false_positive_count: 0,
        });
    antibody.strength = (antibody.strength + 0.1).min(2.0);
    store.upsert_antibody(&antibody).await
}

/// A gardener marking a violation as a false positive: weakens the
/// antibody and, once the shared sliding window of reports runs long
/// enough, relaxes the autoimmune response a step further.
pub async fn report_false_positive(
    store: &impl Database,
    bus: &HormoneBus,
    hash: &str,
    dimension: EthicalDimension,
) -> Result<(), DatabaseError> {
    if let Some(mut antibody) = store.get_antibody(hash, dimension).await? {
        antibody.strength = (antibody.strength - 0.3).max(0.0);
        antibody.false_positive_count += 1;
        store.upsert_antibody(&antibody).await?;
    }

    let mut garden = store.get_garden_state().await?;
    garden.false_positive_window.push(chrono::Utc::now());
    if garden.false_positive_window.len() > FALSE_POSITIVE_WINDOW_SIZE {
        let overflow = garden.false_positive_window.len() - FALSE_POSITIVE_WINDOW_SIZE;
        garden.false_positive_window.drain(..overflow);
    }

    if garden.false_positive_window.len() > FALSE_POSITIVE_WINDOW_THRESHOLD {
        garden.dampening_level = (garden.dampening_level - DAMPENING_STEP).max(DAMPENING_FLOOR);
        store.save_garden_state(&garden).await?;

        let _ = bus
            .emit(Hormone::new(
                "autoimmune_dampening",
                "ethics",
                serde_json::json!({
                    "dimension": dimension.as_str(),
                    "dampening_level": garden.dampening_level,
                }),
            ))
            .await;
    } else {
        store.save_garden_state(&garden).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_from_violations_steps_down() {
        assert_eq!(score_from_violations(0), 1.0);
        assert_eq!(score_from_violations(1), 0.6);
        assert_eq!(score_from_violations(2), 0.3);
        assert_eq!(score_from_violations(5), 0.1);
    }

    #[test]
    fn pattern_hash_is_stable_under_case_and_whitespace() {
        assert_eq!(pattern_hash("  Hello World  "), pattern_hash("hello world"));
    }

    #[test]
    fn pattern_hash_is_sixteen_hex_chars() {
        assert_eq!(pattern_hash("anything").len(), 16);
    }
}
