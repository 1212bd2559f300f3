//! Fractal decomposition of a Seed into a tree of Sprouts, golden-ratio
//! weighted by depth and birth order.

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, Seed, SeedStatus, Sprout, SproutStatus};
use crate::error::DatabaseError;
use crate::growth::PHI;
use crate::textmodel::TextModel;

fn template_decomposition(themes: &[String]) -> [Vec<String>; 4] {
    let theme = themes.first().map(String::as_str).unwrap_or("general");
    let (intention, goal, task, action) = match theme {
        "creativity" => (
            vec!["express a creative vision".to_string()],
            vec!["sketch the idea".to_string(), "gather inspiration".to_string()],
            vec!["produce a first draft".to_string(), "seek feedback".to_string()],
            vec!["revise".to_string(), "share the result".to_string()],
        ),
        "connection" => (
            vec!["deepen a relationship".to_string()],
            vec!["reach out".to_string(), "make time together".to_string()],
            vec!["have an honest conversation".to_string()],
            vec!["follow up".to_string()],
        ),
        "health" => (
            vec!["care for the body".to_string()],
            vec!["build a routine".to_string()],
            vec!["exercise".to_string(), "rest".to_string()],
            vec!["track progress".to_string()],
        ),
        _ => (
            vec![format!("pursue {theme}")],
            vec!["clarify the goal".to_string()],
            vec!["take a concrete step".to_string()],
            vec!["reflect on the outcome".to_string()],
        ),
    };
    [intention, goal, task, action]
}

async fn decompose(text_model: &TextModel, seed: &Seed) -> [Vec<String>; 4] {
    let prompt = format!(
        "Break this wish into 4 JSON arrays of short phrases, one array per level \
         (intention, goal, task, action), most general first: \"{}\"",
        seed.essence
    );
    if let Some(v) = text_model
        .generate_json(&prompt, None, 0.5, 300, "growth", "decompose")
        .await
    {
        if let Some(arr) = v.as_array() {
            if arr.len() == 4 {
                let mut levels: Vec<Vec<String>> = Vec::with_capacity(4);
                for level in arr {
                    let entries = level
                        .as_array()
                        .map(|a| a.iter().filter_map(|s| s.as_str()).map(str::to_string).collect())
                        .unwrap_or_default();
                    levels.push(entries);
                }
                if levels.iter().all(|l| !l.is_empty()) {
                    return [
                        levels[0].clone(),
                        levels[1].clone(),
                        levels[2].clone(),
                        levels[3].clone(),
                    ];
                }
            }
        }
    }
    template_decomposition(&seed.themes)
}

struct GrowthNode {
    id: Option<String>,
    energy: f64,
}

/// Grow a Seed's fractal Sprout tree. Each level's entries spawn one child
/// per parent whose remaining energy is at least `PHI.powi(depth)`; child
/// energy divides by both the sibling count and `PHI.powi(birth_order)`.
pub async fn grow_tree(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    seed: &mut Seed,
) -> Result<usize, DatabaseError> {
    let levels = decompose(text_model, seed).await;

    let mut frontier = vec![GrowthNode {
        id: None,
        energy: seed.energy,
    }];
    let mut count = 0usize;
    let mut deepest = 0usize;

    for (depth, entries) in levels.iter().enumerate() {
        if entries.is_empty() {
            break;
        }
        let mut next_frontier = Vec::new();

        for parent in &frontier {
            if parent.energy < PHI.powi(depth as i32) {
                continue;
            }
            for (birth_order, label) in entries.iter().enumerate() {
                let child_energy =
                    (parent.energy / entries.len() as f64 / PHI.powi(birth_order as i32)).max(0.1);
                let pressure = (1.0 / (1.0 + 0.3 * depth as f64))
                    * (1.0 - 0.3 * (birth_order as f64 + 1.0) / entries.len() as f64);

                let sprout = Sprout {
                    id: new_id(),
                    seed_id: seed.id.clone(),
                    parent_id: parent.id.clone(),
                    depth: depth as i32,
                    label: label.clone(),
                    description: label.clone(),
                    energy: child_energy,
                    ethical_score: seed.ethical_score,
                    pressure: pressure.max(f64::EPSILON),
                    resonance: seed.resonance(),
                    warmth: 0.0,
                    status: SproutStatus::Budding,
                };

                store.insert_sprout(&sprout).await?;
                count += 1;
                deepest = deepest.max(depth);
                next_frontier.push(GrowthNode {
                    id: Some(sprout.id),
                    energy: child_energy,
                });
            }
        }

        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    if count > 0 {
        seed.status = SeedStatus::Growing;
        store.update_seed(seed).await?;
    }

    let _ = bus
        .emit(Hormone::new(
            "tree_grown",
            "growth",
            serde_json::json!({ "seed_id": seed.id, "count": count, "deepest_level": deepest }),
        ))
        .await;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_energy_is_non_increasing_with_birth_order() {
        let parent_energy = 20.0;
        let n = 3usize;
        let mut last = f64::MAX;
        for birth_order in 0..n {
            let e = (parent_energy / n as f64 / PHI.powi(birth_order as i32)).max(0.1);
            assert!(e <= last + 1e-9);
            last = e;
        }
    }

    #[test]
    fn template_decomposition_has_four_nonempty_levels() {
        let levels = template_decomposition(&["creativity".to_string()]);
        assert_eq!(levels.len(), 4);
        assert!(levels.iter().all(|l| !l.is_empty()));
    }
}
