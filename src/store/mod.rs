//! PostgreSQL-backed implementation of [`crate::db::Database`].
//!
//! Every call opens (or reuses, via the pool) a single connection, runs
//! one statement or a short run of statements, and returns — no
//! transaction is ever held open across an `.await` that leaves this
//! module (a text-model call, a subprocess spawn). That discipline, not
//! any particular lock manager, is what lets the tick scheduler interleave
//! database phases with slow external calls safely.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use tokio_postgres::{NoTls, Row};

use crate::config::DatabaseConfig;
use crate::db::Database;
use crate::domain::*;
use crate::error::DatabaseError;

refinery::embed_migrations!("migrations");

#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

impl Store {
    /// Connect to PostgreSQL and verify the connection works.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut cfg = PoolConfig::new();
        cfg.url = Some(config.url());
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size,
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        let _ = pool.get().await?;

        Ok(Self { pool })
    }

    /// Run all pending `refinery` migrations embedded at compile time.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let mut conn = self.pool.get().await?;
        migrations::runner()
            .run_async(&mut **conn)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, DatabaseError> {
        Ok(self.pool.get().await?)
    }

    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }
}

fn parse<T: FromStr>(row: &Row, col: &str) -> T
where
    T::Err: std::fmt::Debug,
{
    let raw: String = row.get(col);
    raw.parse::<T>()
        .unwrap_or_else(|e| panic!("corrupt enum column {col}: {raw:?} ({e:?})"))
}

fn row_to_seed(row: &Row) -> Seed {
    Seed {
        id: row.get("id"),
        gardener_id: row.get("gardener_id"),
        raw_text: row.get("raw_text"),
        essence: row.get("essence"),
        embedding: row.get("embedding"),
        themes: row.get("themes"),
        tone_valence: row.get("tone_valence"),
        tone_arousal: row.get("tone_arousal"),
        energy: row.get("energy"),
        ethical_score: row.get("ethical_score"),
        vitality: row.get("vitality"),
        season_born: parse(row, "season_born"),
        version: row.get("version"),
        status: parse(row, "status"),
        is_composted: row.get("is_composted"),
        created_at: row.get("created_at"),
    }
}

fn row_to_sprout(row: &Row) -> Sprout {
    Sprout {
        id: row.get("id"),
        seed_id: row.get("seed_id"),
        parent_id: row.get("parent_id"),
        depth: row.get("depth"),
        label: row.get("label"),
        description: row.get("description"),
        energy: row.get("energy"),
        ethical_score: row.get("ethical_score"),
        pressure: row.get("pressure"),
        resonance: row.get("resonance"),
        warmth: row.get("warmth"),
        status: parse(row, "status"),
    }
}

fn row_to_link(row: &Row) -> SymbioticLink {
    SymbioticLink {
        id: row.get("id"),
        sprout_a_id: row.get("sprout_a_id"),
        sprout_b_id: row.get("sprout_b_id"),
        relationship_type: parse(row, "relationship_type"),
        synergy_score: row.get("synergy_score"),
        nutrient_flow: row.get("nutrient_flow"),
    }
}

fn row_to_dream(row: &Row) -> Dream {
    Dream {
        id: row.get("id"),
        source_seed_ids: row.get("source_seed_ids"),
        insight: row.get("insight"),
        archetype_vector: row.get("archetype_vector"),
        temperature: row.get("temperature"),
        perplexity: row.get("perplexity"),
        planted: row.get("planted"),
        created_at: row.get("created_at"),
    }
}

fn row_to_wound(row: &Row) -> WoundRecord {
    WoundRecord {
        id: row.get("id"),
        wound_type: row.get("wound_type"),
        severity: parse(row, "severity"),
        healing_action: row.get("healing_action"),
        scar_lesson: row.get("scar_lesson"),
        antifragility_gained: row.get("antifragility_gained"),
        healed_at: row.get("healed_at"),
    }
}

fn row_to_agent(row: &Row) -> AgentNode {
    AgentNode {
        id: row.get("id"),
        name: row.get("name"),
        agent_type: parse(row, "agent_type"),
        status: parse(row, "status"),
        parent_id: row.get("parent_id"),
        seed_id: row.get("seed_id"),
        task_description: row.get("task_description"),
        capability_params: row.get("capability_params"),
        context: row.get("context"),
        result: row.get("result"),
        error: row.get("error"),
        spawned_at: row.get("spawned_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        retired_at: row.get("retired_at"),
    }
}

fn row_to_emotional_state(row: &Row) -> EmotionalState {
    EmotionalState {
        id: row.get("id"),
        joy: row.get("joy"),
        curiosity: row.get("curiosity"),
        anxiety: row.get("anxiety"),
        pride: row.get("pride"),
        grief: row.get("grief"),
        wonder: row.get("wonder"),
        dominant_emotion: row.get("dominant_emotion"),
        intensity: row.get("intensity"),
        trigger_event: row.get("trigger_event"),
        created_at: row.get("created_at"),
    }
}

fn row_to_inner_thought(row: &Row) -> InnerThought {
    InnerThought {
        id: row.get("id"),
        thought_type: parse(row, "thought_type"),
        content: row.get("content"),
        emotional_context: row.get("emotional_context"),
        trigger: row.get("trigger"),
        depth: row.get("depth"),
        salience: row.get("salience"),
        created_at: row.get("created_at"),
    }
}

fn row_to_memory(row: &Row) -> EpisodicMemory {
    EpisodicMemory {
        id: row.get("id"),
        narrative: row.get("narrative"),
        event_type: row.get("event_type"),
        emotional_valence: row.get("emotional_valence"),
        emotional_intensity: row.get("emotional_intensity"),
        themes: row.get("themes"),
        related_seed_ids: row.get("related_seed_ids"),
        recall_count: row.get("recall_count"),
        last_recalled: row.get("last_recalled"),
        is_core_memory: row.get("is_core_memory"),
        created_at: row.get("created_at"),
    }
}

fn row_to_prediction(row: &Row) -> Prediction {
    Prediction {
        id: row.get("id"),
        prediction_type: parse(row, "prediction_type"),
        subject_id: row.get("subject_id"),
        predicted_outcome: row.get("predicted_outcome"),
        confidence: row.get("confidence"),
        actual_outcome: row.get("actual_outcome"),
        surprise_score: row.get("surprise_score"),
        resolved: row.get("resolved"),
        created_at: row.get("created_at"),
        resolved_at: row.get("resolved_at"),
    }
}

fn row_to_self_model(row: &Row) -> SelfModelSnapshot {
    SelfModelSnapshot {
        id: row.get("id"),
        harvest_rate: row.get("harvest_rate"),
        compost_rate: row.get("compost_rate"),
        dream_accuracy: row.get("dream_accuracy"),
        theme_affinities: serde_json::from_value(row.get("theme_affinities")).unwrap_or_default(),
        decision_accuracy: serde_json::from_value(row.get("decision_accuracy")).unwrap_or_default(),
        personality_traits: serde_json::from_value(row.get("personality_traits")).unwrap_or_default(),
        bias_warnings: row.get("bias_warnings"),
        identity_narrative: row.get("identity_narrative"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Database for Store {
    async fn get_garden_state(&self) -> Result<GardenState, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one("SELECT * FROM garden_state WHERE id = 'garden'", &[])
            .await?;
        Ok(GardenState {
            id: row.get("id"),
            total_energy: row.get("total_energy"),
            vitality: row.get("vitality"),
            season: parse(&row, "season"),
            tidal_phase: row.get("tidal_phase"),
            cycle_count: row.get("cycle_count"),
            wisdom_score: row.get("wisdom_score"),
            antifragility_score: row.get("antifragility_score"),
            dream_count: row.get("dream_count"),
            soil_richness: row.get("soil_richness"),
            last_pulse: row.get("last_pulse"),
            dampening_level: row.get("dampening_level"),
            false_positive_window: serde_json::from_value(row.get("false_positive_window"))
                .unwrap_or_default(),
        })
    }

    async fn save_garden_state(&self, s: &GardenState) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE garden_state SET total_energy=$1, vitality=$2, season=$3, tidal_phase=$4, \
             cycle_count=$5, wisdom_score=$6, antifragility_score=$7, dream_count=$8, \
             soil_richness=$9, last_pulse=$10, dampening_level=$11, false_positive_window=$12 \
             WHERE id=$13",
            &[
                &s.total_energy,
                &s.vitality,
                &s.season.as_str(),
                &s.tidal_phase,
                &s.cycle_count,
                &s.wisdom_score,
                &s.antifragility_score,
                &s.dream_count,
                &s.soil_richness,
                &s.last_pulse,
                &s.dampening_level,
                &serde_json::to_value(&s.false_positive_window).unwrap_or_default(),
                &s.id,
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_or_create_gardener(&self, id: &str) -> Result<Gardener, DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO gardeners (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
            &[&id],
        )
        .await?;
        let row = conn
            .query_one("SELECT * FROM gardeners WHERE id = $1", &[&id])
            .await?;
        Ok(Gardener {
            id: row.get("id"),
            name: row.get("name"),
            preference_vector: row.get("preference_vector"),
            pheromone_trails: serde_json::from_value(row.get("pheromone_trails")).unwrap_or_default(),
            rhythm_profile: serde_json::from_value(row.get("rhythm_profile")).unwrap_or_default(),
            interaction_count: row.get("interaction_count"),
        })
    }

    async fn save_gardener(&self, g: &Gardener) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE gardeners SET name=$1, preference_vector=$2, pheromone_trails=$3, \
             rhythm_profile=$4, interaction_count=$5 WHERE id=$6",
            &[
                &g.name,
                &g.preference_vector,
                &serde_json::to_value(&g.pheromone_trails)?,
                &serde_json::to_value(&g.rhythm_profile)?,
                &g.interaction_count,
                &g.id,
            ],
        )
        .await?;
        Ok(())
    }

    async fn insert_seed(&self, s: &Seed) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO seeds (id, gardener_id, raw_text, essence, embedding, themes, \
             tone_valence, tone_arousal, energy, ethical_score, vitality, season_born, \
             version, status, is_composted, created_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)",
            &[
                &s.id,
                &s.gardener_id,
                &s.raw_text,
                &s.essence,
                &s.embedding,
                &s.themes,
                &s.tone_valence,
                &s.tone_arousal,
                &s.energy,
                &s.ethical_score,
                &s.vitality,
                &s.season_born.as_str(),
                &s.version,
                &s.status.as_str(),
                &s.is_composted,
                &s.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_seed(&self, id: &str) -> Result<Option<Seed>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn.query_opt("SELECT * FROM seeds WHERE id = $1", &[&id]).await?;
        Ok(row.map(|r| row_to_seed(&r)))
    }

    async fn update_seed(&self, s: &Seed) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE seeds SET essence=$1, embedding=$2, themes=$3, tone_valence=$4, \
             tone_arousal=$5, energy=$6, ethical_score=$7, vitality=$8, version=$9, \
             status=$10, is_composted=$11 WHERE id=$12",
            &[
                &s.essence,
                &s.embedding,
                &s.themes,
                &s.tone_valence,
                &s.tone_arousal,
                &s.energy,
                &s.ethical_score,
                &s.vitality,
                &s.version,
                &s.status.as_str(),
                &s.is_composted,
                &s.id,
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_living_seeds(&self) -> Result<Vec<Seed>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT * FROM seeds WHERE status IN ('planted','growing') AND NOT is_composted",
                &[],
            )
            .await?;
        Ok(rows.iter().map(row_to_seed).collect())
    }

    async fn list_seeds_by_status(&self, status: SeedStatus) -> Result<Vec<Seed>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query("SELECT * FROM seeds WHERE status = $1", &[&status.as_str()])
            .await?;
        Ok(rows.iter().map(row_to_seed).collect())
    }

    async fn list_terminal_seeds(&self, limit: usize) -> Result<Vec<Seed>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT * FROM seeds WHERE status IN ('harvested','composted') \
                 ORDER BY created_at DESC LIMIT $1",
                &[&(limit as i64)],
            )
            .await?;
        Ok(rows.iter().map(row_to_seed).collect())
    }

    async fn insert_sprout(&self, sp: &Sprout) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO sprouts (id, seed_id, parent_id, depth, label, description, energy, \
             ethical_score, pressure, resonance, warmth, status) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
            &[
                &sp.id,
                &sp.seed_id,
                &sp.parent_id,
                &sp.depth,
                &sp.label,
                &sp.description,
                &sp.energy,
                &sp.ethical_score,
                &sp.pressure,
                &sp.resonance,
                &sp.warmth,
                &sp.status.as_str(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_sprout(&self, sp: &Sprout) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE sprouts SET energy=$1, ethical_score=$2, pressure=$3, resonance=$4, \
             warmth=$5, status=$6 WHERE id=$7",
            &[
                &sp.energy,
                &sp.ethical_score,
                &sp.pressure,
                &sp.resonance,
                &sp.warmth,
                &sp.status.as_str(),
                &sp.id,
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_sprouts_for_seed(&self, seed_id: &str) -> Result<Vec<Sprout>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query("SELECT * FROM sprouts WHERE seed_id = $1", &[&seed_id])
            .await?;
        Ok(rows.iter().map(row_to_sprout).collect())
    }

    async fn insert_link(&self, l: &SymbioticLink) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO symbiotic_links (id, sprout_a_id, sprout_b_id, relationship_type, \
             synergy_score, nutrient_flow) VALUES ($1,$2,$3,$4,$5,$6)",
            &[
                &l.id,
                &l.sprout_a_id,
                &l.sprout_b_id,
                &l.relationship_type.as_str(),
                &l.synergy_score,
                &l.nutrient_flow,
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_link(&self, l: &SymbioticLink) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE symbiotic_links SET synergy_score=$1, nutrient_flow=$2 WHERE id=$3",
            &[&l.synergy_score, &l.nutrient_flow, &l.id],
        )
        .await?;
        Ok(())
    }

    async fn list_links(&self) -> Result<Vec<SymbioticLink>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn.query("SELECT * FROM symbiotic_links", &[]).await?;
        Ok(rows.iter().map(row_to_link).collect())
    }

    async fn link_exists(&self, a: &str, b: &str) -> Result<bool, DatabaseError> {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM symbiotic_links WHERE sprout_a_id=$1 AND sprout_b_id=$2)",
                &[&a, &b],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn get_antibody(
        &self,
        pattern_hash: &str,
        dimension: EthicalDimension,
    ) -> Result<Option<EthicalMemory>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT * FROM ethical_memories WHERE pattern_hash=$1 AND dimension=$2",
                &[&pattern_hash, &dimension.as_str()],
            )
            .await?;
        Ok(row.map(|r| EthicalMemory {
            id: r.get("id"),
            pattern_hash: r.get("pattern_hash"),
            dimension: parse(&r, "dimension"),
            strength: r.get("strength"),
            false_positive_count: r.get("false_positive_count"),
        }))
    }

    async fn upsert_antibody(&self, a: &EthicalMemory) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO ethical_memories (id, pattern_hash, dimension, strength, false_positive_count) \
             VALUES ($1,$2,$3,$4,$5) \
             ON CONFLICT (pattern_hash, dimension) DO UPDATE SET strength=$4, false_positive_count=$5",
            &[
                &a.id,
                &a.pattern_hash,
                &a.dimension.as_str(),
                &a.strength,
                &a.false_positive_count,
            ],
        )
        .await?;
        Ok(())
    }

    async fn insert_dream(&self, d: &Dream) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO dreams (id, source_seed_ids, insight, archetype_vector, temperature, \
             perplexity, planted, created_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
            &[
                &d.id,
                &d.source_seed_ids,
                &d.insight,
                &d.archetype_vector,
                &d.temperature,
                &d.perplexity,
                &d.planted,
                &d.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_dream(&self, d: &Dream) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE dreams SET planted=$1 WHERE id=$2",
            &[&d.planted, &d.id],
        )
        .await?;
        Ok(())
    }

    async fn list_recent_dreams(&self, limit: usize) -> Result<Vec<Dream>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT * FROM dreams ORDER BY created_at DESC LIMIT $1",
                &[&(limit as i64)],
            )
            .await?;
        Ok(rows.iter().map(row_to_dream).collect())
    }

    async fn insert_pulse(&self, p: &PulseReport) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO pulse_reports (id, cycle, summary, thriving, struggling, healing, \
             dreaming, emergent, created_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
            &[
                &p.id,
                &p.cycle,
                &p.summary,
                &p.thriving,
                &p.struggling,
                &p.healing,
                &p.dreaming,
                &p.emergent,
                &p.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn insert_wound(&self, w: &WoundRecord) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO wound_records (id, wound_type, severity, healing_action, scar_lesson, \
             antifragility_gained, healed_at) VALUES ($1,$2,$3,$4,$5,$6,$7)",
            &[
                &w.id,
                &w.wound_type,
                &w.severity.as_str(),
                &w.healing_action,
                &w.scar_lesson,
                &w.antifragility_gained,
                &w.healed_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_recent_wounds(&self, limit: usize) -> Result<Vec<WoundRecord>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT * FROM wound_records ORDER BY healed_at DESC LIMIT $1",
                &[&(limit as i64)],
            )
            .await?;
        Ok(rows.iter().map(row_to_wound).collect())
    }

    async fn insert_agent(&self, a: &AgentNode) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO agent_nodes (id, name, agent_type, status, parent_id, seed_id, \
             task_description, capability_params, context, result, error, spawned_at, \
             started_at, completed_at, retired_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
            &[
                &a.id,
                &a.name,
                &a.agent_type.as_str(),
                &a.status.as_str(),
                &a.parent_id,
                &a.seed_id,
                &a.task_description,
                &a.capability_params,
                &a.context,
                &a.result,
                &a.error,
                &a.spawned_at,
                &a.started_at,
                &a.completed_at,
                &a.retired_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_agent(&self, a: &AgentNode) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE agent_nodes SET status=$1, result=$2, error=$3, started_at=$4, \
             completed_at=$5, retired_at=$6, context=$7 WHERE id=$8",
            &[
                &a.status.as_str(),
                &a.result,
                &a.error,
                &a.started_at,
                &a.completed_at,
                &a.retired_at,
                &a.context,
                &a.id,
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_active_agents(&self) -> Result<Vec<AgentNode>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT * FROM agent_nodes WHERE status NOT IN ('completed','retired')",
                &[],
            )
            .await?;
        Ok(rows.iter().map(row_to_agent).collect())
    }

    async fn list_agents_for_seed(&self, seed_id: &str) -> Result<Vec<AgentNode>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query("SELECT * FROM agent_nodes WHERE seed_id = $1", &[&seed_id])
            .await?;
        Ok(rows.iter().map(row_to_agent).collect())
    }

    async fn insert_hormone_log(&self, h: &HormoneLog) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO hormone_log (id, hormone_name, emitter_organ, payload, created_at) \
             VALUES ($1,$2,$3,$4,$5)",
            &[&h.id, &h.hormone_name, &h.emitter_organ, &h.payload, &h.created_at],
        )
        .await?;
        Ok(())
    }

    async fn insert_emotional_state(&self, e: &EmotionalState) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO emotional_states (id, joy, curiosity, anxiety, pride, grief, wonder, \
             dominant_emotion, intensity, trigger_event, created_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
            &[
                &e.id,
                &e.joy,
                &e.curiosity,
                &e.anxiety,
                &e.pride,
                &e.grief,
                &e.wonder,
                &e.dominant_emotion,
                &e.intensity,
                &e.trigger_event,
                &e.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn latest_emotional_state(&self) -> Result<Option<EmotionalState>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT * FROM emotional_states ORDER BY created_at DESC LIMIT 1",
                &[],
            )
            .await?;
        Ok(row.map(|r| row_to_emotional_state(&r)))
    }

    async fn insert_inner_thought(&self, t: &InnerThought) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO inner_thoughts (id, thought_type, content, emotional_context, trigger, \
             depth, salience, created_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
            &[
                &t.id,
                &t.thought_type.as_str(),
                &t.content,
                &t.emotional_context,
                &t.trigger,
                &t.depth,
                &t.salience,
                &t.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn recent_inner_thoughts(&self, limit: usize) -> Result<Vec<InnerThought>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT * FROM inner_thoughts ORDER BY created_at DESC LIMIT $1",
                &[&(limit as i64)],
            )
            .await?;
        Ok(rows.iter().map(row_to_inner_thought).collect())
    }

    async fn insert_memory(&self, m: &EpisodicMemory) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO episodic_memories (id, narrative, event_type, emotional_valence, \
             emotional_intensity, themes, related_seed_ids, recall_count, last_recalled, \
             is_core_memory, created_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
            &[
                &m.id,
                &m.narrative,
                &m.event_type,
                &m.emotional_valence,
                &m.emotional_intensity,
                &m.themes,
                &m.related_seed_ids,
                &m.recall_count,
                &m.last_recalled,
                &m.is_core_memory,
                &m.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_memory(&self, m: &EpisodicMemory) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE episodic_memories SET recall_count=$1, last_recalled=$2, is_core_memory=$3 \
             WHERE id=$4",
            &[&m.recall_count, &m.last_recalled, &m.is_core_memory, &m.id],
        )
        .await?;
        Ok(())
    }

    async fn recent_memories(&self, limit: usize) -> Result<Vec<EpisodicMemory>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT * FROM episodic_memories ORDER BY created_at DESC LIMIT $1",
                &[&(limit as i64)],
            )
            .await?;
        Ok(rows.iter().map(row_to_memory).collect())
    }

    async fn count_memories(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM episodic_memories", &[])
            .await?;
        Ok(row.get(0))
    }

    async fn prune_memories(&self, ids: &[String]) -> Result<(), DatabaseError> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.conn().await?;
        conn.execute("DELETE FROM episodic_memories WHERE id = ANY($1)", &[&ids])
            .await?;
        Ok(())
    }

    async fn insert_prediction(&self, p: &Prediction) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO predictions (id, prediction_type, subject_id, predicted_outcome, \
             confidence, actual_outcome, surprise_score, resolved, created_at, resolved_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
            &[
                &p.id,
                &p.prediction_type.as_str(),
                &p.subject_id,
                &p.predicted_outcome,
                &p.confidence,
                &p.actual_outcome,
                &p.surprise_score,
                &p.resolved,
                &p.created_at,
                &p.resolved_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_prediction(&self, p: &Prediction) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE predictions SET actual_outcome=$1, surprise_score=$2, resolved=$3, \
             resolved_at=$4 WHERE id=$5",
            &[
                &p.actual_outcome,
                &p.surprise_score,
                &p.resolved,
                &p.resolved_at,
                &p.id,
            ],
        )
        .await?;
        Ok(())
    }

    async fn unresolved_predictions(&self) -> Result<Vec<Prediction>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query("SELECT * FROM predictions WHERE NOT resolved", &[])
            .await?;
        Ok(rows.iter().map(row_to_prediction).collect())
    }

    async fn count_unresolved_predictions(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM predictions WHERE NOT resolved", &[])
            .await?;
        Ok(row.get(0))
    }

    async fn insert_self_model_snapshot(&self, s: &SelfModelSnapshot) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO self_model_snapshots (id, harvest_rate, compost_rate, dream_accuracy, \
             theme_affinities, decision_accuracy, personality_traits, bias_warnings, \
             identity_narrative, created_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
            &[
                &s.id,
                &s.harvest_rate,
                &s.compost_rate,
                &s.dream_accuracy,
                &serde_json::to_value(&s.theme_affinities)?,
                &serde_json::to_value(&s.decision_accuracy)?,
                &serde_json::to_value(&s.personality_traits)?,
                &s.bias_warnings,
                &s.identity_narrative,
                &s.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn latest_self_model_snapshot(&self) -> Result<Option<SelfModelSnapshot>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT * FROM self_model_snapshots ORDER BY created_at DESC LIMIT 1",
                &[],
            )
            .await?;
        Ok(row.map(|r| row_to_self_model(&r)))
    }
}

/// Helper re-exported for call sites that need "now" as a `DateTime<Utc>`
/// without importing `chrono` directly.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
