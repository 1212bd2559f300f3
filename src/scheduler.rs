//! The tick loop: one `tokio::task` that drives every organ in strict
//! phase order, once per `tick_interval_secs`.
//!
//! Persistent state (seeds, sprouts, garden state, ...) lives in the
//! store and is re-read every tick. In-process state that would be
//! expensive or wrong to reconstruct from history — the emotional core's
//! previous values already round-trip through the store, but prediction
//! statistics and the inner-voice rolling buffers do not — is owned here
//! and threaded through by `&mut`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::agents::{self, LlmEvalBudget};
use crate::bus::HormoneBus;
use crate::config::{SchedulerConfig, WorkspaceConfig};
use crate::db::Database;
use crate::dream;
use crate::energy;
use crate::error::DatabaseError;
use crate::growth;
use crate::introspection::{self, InnerVoiceContext, PredictionStats};
use crate::network;
use crate::settings::EnergySettings;
use crate::textmodel::TextModel;

const SEED_PROMOTION_MIN_AGE_SECS: i64 = 30;
const SEED_PROMOTION_MIN_ENERGY: f64 = 2.0;
const DREAM_TEMPERATURE: f64 = 0.7;

pub struct Scheduler<S: Database> {
    store: S,
    bus: Arc<HormoneBus>,
    text_model: TextModel,
    workspace: WorkspaceConfig,
    energy_settings: EnergySettings,
    config: SchedulerConfig,
    prediction_stats: PredictionStats,
    inner_voice_ctx: InnerVoiceContext,
    tick_count: u64,
    last_tick_at: chrono::DateTime<Utc>,
}

impl<S: Database> Scheduler<S> {
    pub fn new(
        store: S,
        bus: Arc<HormoneBus>,
        text_model: TextModel,
        workspace: WorkspaceConfig,
        energy_settings: EnergySettings,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            bus,
            text_model,
            workspace,
            energy_settings,
            config,
            prediction_stats: PredictionStats::default(),
            inner_voice_ctx: InnerVoiceContext::default(),
            tick_count: 0,
            last_tick_at: Utc::now(),
        }
    }

    /// Run forever, ticking every `tick_interval_secs`. The first firing
    /// of `tokio::time::interval` happens immediately; it is consumed
    /// once before the loop so the organism's first real tick happens
    /// one interval after startup, not at t=0.
    pub async fn run(&mut self) -> ! {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.tick_interval_secs));
        interval.tick().await;
        loop {
            interval.tick().await;
            self.run_tick().await;
        }
    }

    async fn run_tick(&mut self) {
        self.tick_count += 1;
        let tick = self.tick_count;
        tracing::info!(tick, "tick start");

        let mut budget = LlmEvalBudget::new();

        if let Err(e) = self.phase_energy_economy().await {
            tracing::error!(tick, error = %e, "phase 1 (energy economy) failed");
        }

        match growth::decide_harvest_compost(&self.store, &self.bus, &self.text_model, &mut budget).await {
            Ok(outcome) => {
                for seed in &outcome.harvested {
                    if let Err(e) = network::pollinate(&self.store, &self.bus, seed).await {
                        tracing::error!(tick, error = %e, "pollination after harvest failed");
                    }
                }
            }
            Err(e) => tracing::error!(tick, error = %e, "phase 2 (harvest/compost) failed"),
        }

        if let Err(e) = self.phase_agents(&mut budget).await {
            tracing::error!(tick, error = %e, "phase 3 (agents) failed");
        }

        if tick % self.config.season_turn_every == 0 {
            if let Err(e) = self.phase_season_and_entropy().await {
                tracing::error!(tick, error = %e, "phase 4 (season/entropy) failed");
            }
        }

        if let Err(e) = self.phase_mycelium().await {
            tracing::error!(tick, error = %e, "phase 5 (mycelium) failed");
        }

        let season_boundary = tick % self.config.season_turn_every == 0;
        if tick % self.config.dream_every == 0 || season_boundary {
            if let Err(e) = self.phase_dream(&mut budget).await {
                tracing::error!(tick, error = %e, "phase 6 (dream) failed");
            }
        }

        if tick % self.config.pulse_every == 0 {
            if let Err(e) = self.phase_pulse().await {
                tracing::error!(tick, error = %e, "phase 7 (pulse) failed");
            }
        }

        if let Err(e) = self.phase_introspection().await {
            tracing::error!(tick, error = %e, "phase 8 (introspection) failed");
        }

        self.bus.flush_slow_release().await;
        self.last_tick_at = Utc::now();
        tracing::info!(tick, "tick complete");
    }

    /// Phase 1: photosynthesis, phloem, mycorrhiza, and promotion for
    /// every living Seed.
    async fn phase_energy_economy(&self) -> Result<(), DatabaseError> {
        let mut garden = self.store.get_garden_state().await?;
        let living = self.store.list_living_seeds().await?;
        let attention_seconds = self.config.tick_interval_secs as f64;

        for mut seed in living {
            energy::photosynthesize(
                &self.store,
                &self.bus,
                &self.energy_settings,
                &mut garden,
                &mut seed,
                attention_seconds,
                None,
            )
            .await?;
            energy::phloem(&self.store, &mut seed).await?;
            energy::mycorrhiza(&self.store, &self.bus, &self.energy_settings, &seed).await?;

            if seed.status == crate::domain::SeedStatus::Planted {
                let age = (Utc::now() - seed.created_at).num_seconds();
                if age >= SEED_PROMOTION_MIN_AGE_SECS && seed.energy > SEED_PROMOTION_MIN_ENERGY {
                    growth::grow_tree(&self.store, &self.bus, &self.text_model, &mut seed).await?;
                }
            }
            self.store.update_seed(&seed).await?;
        }

        self.store.save_garden_state(&garden).await?;
        Ok(())
    }

    /// Phase 3: retire, execute idle agents, retire again, plan missions.
    async fn phase_agents(&self, budget: &mut LlmEvalBudget) -> Result<(), crate::error::AgentError> {
        agents::lifecycle::retire_completed(&self.store, &self.bus).await?;
        agents::orchestrate::execute_idle_agents(&self.store, &self.bus, &self.workspace, &self.text_model).await?;
        agents::orchestrate::plan_missions(&self.store, &self.bus, &self.text_model, budget).await?;
        Ok(())
    }

    /// Phase 4: turn the season, apply entropy decay, and have the
    /// healer triage any famine it causes.
    async fn phase_season_and_entropy(&self) -> Result<(), DatabaseError> {
        let mut garden = self.store.get_garden_state().await?;
        network::turn_season(&self.store, &self.bus, &mut garden, None).await?;
        self.store.save_garden_state(&garden).await?;

        let living = self.store.list_living_seeds().await?;
        for seed in &living {
            let depleted = energy::entropy(&self.store, &self.bus, &self.energy_settings, garden.season, seed).await?;
            if depleted > 0 {
                let mut garden = self.store.get_garden_state().await?;
                let payload = serde_json::json!({ "seed_id": seed.id, "depleted": depleted });
                dream::triage_wound(&self.store, &self.bus, &mut garden, "energy_famine", &payload).await?;
                self.store.save_garden_state(&garden).await?;
            }
        }
        Ok(())
    }

    /// Phase 5: symbiotic link scan, nutrient sharing, quorum sensing.
    async fn phase_mycelium(&self) -> Result<(), DatabaseError> {
        network::scan_symbiotic_links(&self.store, &self.bus).await?;
        network::share_nutrients(&self.store).await?;
        network::quorum_sensing(&self.store, &self.bus).await?;
        Ok(())
    }

    /// Phase 6: dream synthesis, with autonomy deciding whether to plant
    /// it. Lucid dreams (perplexity < 0.5) always plant for free; other
    /// dreams consult the LLM budget.
    async fn phase_dream(&self, budget: &mut LlmEvalBudget) -> Result<(), DatabaseError> {
        let Some(mut dream) = dream::synthesize_dream(&self.store, &self.bus, &self.text_model, DREAM_TEMPERATURE).await?
        else {
            return Ok(());
        };

        let mut garden = self.store.get_garden_state().await?;
        garden.dream_count += 1;

        let should_plant = if dream.perplexity < 0.5 {
            true
        } else if budget.try_spend() {
            let prompt = format!(
                "Should this dream insight be planted as a new wish? Answer yes or no only.\n\n{}",
                dream.insight
            );
            let answer = self.text_model.generate(&prompt, None, 0.3, 10, "dream", "plant_decision").await;
            answer.to_lowercase().contains("yes")
        } else {
            false
        };

        if should_plant {
            dream::plant_dream(&self.store, &self.bus, &garden, &mut dream).await?;
        }

        self.store.save_garden_state(&garden).await?;
        Ok(())
    }

    /// Phase 7: the self-awareness pulse.
    async fn phase_pulse(&self) -> Result<(), DatabaseError> {
        let mut garden = self.store.get_garden_state().await?;
        dream::pulse(&self.store, &self.bus, &self.text_model, &garden).await?;

        let harvested_count = self.store.list_seeds_by_status(crate::domain::SeedStatus::Harvested).await?.len();
        let healed_count = self.store.list_recent_wounds(10_000).await?.len();
        let planted_dreams = self
            .store
            .list_recent_dreams(10_000)
            .await?
            .into_iter()
            .filter(|d| d.planted)
            .count();
        garden.wisdom_score = harvested_count as f64 + 0.5 * healed_count as f64 + 0.3 * planted_dreams as f64;
        garden.last_pulse = Some(Utc::now());
        self.store.save_garden_state(&garden).await?;

        Ok(())
    }

    /// Phase 8: emotions, memory, inner voice, predictions, self-model
    /// (every `self_model_every` ticks), memory consolidation (every
    /// `memory_consolidation_every` ticks).
    async fn phase_introspection(&mut self) -> Result<(), DatabaseError> {
        let recent = self.bus.history_since(self.last_tick_at).await;
        let event_names: Vec<String> = recent.iter().map(|h| h.name.clone()).collect();

        let state = introspection::emotions::process_tick(&self.store, &self.bus, &event_names).await?;

        for hormone in &recent {
            self.inner_voice_ctx.push_event(format!("{}: {}", hormone.name, hormone.emitter));
            if let Some(event_type) = memory_event_type(&hormone.name) {
                let related_seed_ids: Vec<String> = hormone
                    .payload
                    .get("seed_id")
                    .and_then(|v| v.as_str())
                    .map(|s| vec![s.to_string()])
                    .unwrap_or_default();
                introspection::memory::record_event(
                    &self.store,
                    event_type,
                    &hormone.payload,
                    related_seed_ids,
                    Vec::new(),
                    state.intensity,
                )
                .await?;
            }
        }

        let garden = self.store.get_garden_state().await?;
        let living = self.store.list_living_seeds().await?;
        let mut theme_counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for seed in &living {
            for theme in &seed.themes {
                *theme_counts.entry(theme.clone()).or_insert(0) += 1;
            }
        }
        let theme_counts_str = format!("{theme_counts:?}");
        let garden_summary = format!(
            "season={} energy={:.1} vitality={:.2} wisdom={:.1}",
            garden.season.as_str(),
            garden.total_energy,
            garden.vitality,
            garden.wisdom_score
        );
        let recent_memories: Vec<String> = self
            .store
            .recent_memories(3)
            .await?
            .into_iter()
            .map(|m| m.narrative)
            .collect();
        let recent_dreams: Vec<String> = self
            .store
            .list_recent_dreams(3)
            .await?
            .into_iter()
            .map(|d| d.insight)
            .collect();

        introspection::inner_voice::generate_thought(
            &self.store,
            &self.bus,
            &self.text_model,
            &mut self.inner_voice_ctx,
            &state,
            &garden_summary,
            &theme_counts_str,
            &recent_memories.join(" | "),
            &recent_dreams.join(" | "),
        )
        .await?;

        introspection::predictions::resolve_pending(&self.store, &self.bus, &mut self.prediction_stats, garden.total_energy)
            .await?;
        introspection::predictions::create_new(&self.store, &living, &garden).await?;

        if self.tick_count % self.config.self_model_every == 0 {
            introspection::self_model::update_self_model(&self.store, &self.bus, &self.text_model, &self.prediction_stats)
                .await?;
        }

        if self.tick_count % self.config.memory_consolidation_every == 0 {
            introspection::memory::consolidate(&self.store).await?;
        }

        Ok(())
    }
}

/// Map a hormone name to the autobiographical memory system's coarser
/// event-type vocabulary. Events with no mapping are not memory-worthy.
fn memory_event_type(hormone_name: &str) -> Option<&'static str> {
    match hormone_name {
        "auto_harvest" => Some("harvest"),
        "auto_compost" => Some("compost"),
        "healing_complete" => Some("healing"),
        "dream_generated" | "lucid_dream" => Some("dream"),
        "dream_planted" | "auto_dream_planted" => Some("dream_planted"),
        "season_change" => Some("season_change"),
        "emergency_winter" => Some("emergency"),
        "quorum_reached" => Some("quorum"),
        "wisdom_milestone" => Some("wisdom"),
        "ethical_violation" => Some("violation"),
        "seed_planted" => Some("seed_planted"),
        _ => None,
    }
}
