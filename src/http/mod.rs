//! The HTTP/WebSocket surface: idempotent CRUD-ish handlers over the
//! organism's entities, plus a websocket channel that mirrors every
//! hormone onto connected clients as `{event, data, timestamp}`.
//!
//! The tick loop is the only writer that matters for most state; these
//! handlers are thin, auth-free wrappers around the same organ functions
//! the scheduler calls, so a request and a tick can never disagree about
//! how a write happens.

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agents;
use crate::bus::HormoneBus;
use crate::config::WorkspaceConfig;
use crate::db::Database;
use crate::domain::{AgentCapability, Season, SeedStatus};
use crate::energy;
use crate::error::{DatabaseError, ValidationError};
use crate::growth;
use crate::network;
use crate::settings::EnergySettings;
use crate::textmodel::TextModel;

/// Every value the handlers need, cheap to clone (everything inside is
/// itself `Arc`-backed or already `Clone`).
pub struct AppState<S: Database> {
    pub store: S,
    pub bus: Arc<HormoneBus>,
    pub text_model: TextModel,
    pub workspace: WorkspaceConfig,
    pub energy_settings: EnergySettings,
    pub ws_tx: tokio::sync::broadcast::Sender<serde_json::Value>,
}

impl<S: Database> Clone for AppState<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bus: self.bus.clone(),
            text_model: self.text_model.clone(),
            workspace: self.workspace.clone(),
            energy_settings: self.energy_settings.clone(),
            ws_tx: self.ws_tx.clone(),
        }
    }
}

/// Hormone names subscribed at startup so the websocket channel mirrors
/// everything an external viewer would want to see (see each organ
/// module's `bus.emit(Hormone::new(...))` call sites).
const MIRRORED_EVENTS: &[&str] = &[
    "seed_planted",
    "tree_grown",
    "photosynthesis",
    "energy_surplus",
    "energy_famine",
    "pollination",
    "symbiotic_link_formed",
    "quorum_reached",
    "season_change",
    "emergency_winter",
    "dream_generated",
    "lucid_dream",
    "dream_planted",
    "healing_complete",
    "pulse_generated",
    "wisdom_milestone",
    "agent_spawned",
    "agent_completed",
    "agent_retired",
    "auto_harvest",
    "auto_compost",
    "harvest",
    "compost",
    "ethical_clearance",
    "ethical_violation",
    "autoimmune_dampening",
    "emotional_shift",
    "inner_thought",
    "high_surprise",
    "low_surprise",
    "self_model_updated",
    "core_memory_formed",
];

/// Wire every mirrored hormone name to the websocket broadcast channel.
/// Call once, right after constructing the bus, before the tick loop or
/// the HTTP listener starts.
pub async fn wire_mirror(bus: &HormoneBus, ws_tx: tokio::sync::broadcast::Sender<serde_json::Value>) {
    for name in MIRRORED_EVENTS {
        let tx = ws_tx.clone();
        let event_name = name.to_string();
        bus.subscribe(
            *name,
            Arc::new(move |hormone| {
                let tx = tx.clone();
                let event_name = event_name.clone();
                Box::pin(async move {
                    let _ = tx.send(json!({
                        "event": event_name,
                        "data": hormone.payload,
                        "timestamp": hormone.created_at,
                    }));
                })
            }),
        )
        .await;
    }
}

pub fn router<S: Database + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_upgrade::<S>))
        .route("/plant", post(plant::<S>))
        .route("/plant/batch", post(plant_batch::<S>))
        .route("/water/{seed_id}", post(water::<S>))
        .route("/harvest/{seed_id}", post(harvest::<S>))
        .route("/compost/{seed_id}", post(compost::<S>))
        .route("/resurrect/{seed_id}", post(resurrect::<S>))
        .route("/garden", get(garden::<S>))
        .route("/ecosystem", get(ecosystem::<S>))
        .route("/pulse", get(pulse::<S>))
        .route("/soil", get(soil::<S>))
        .route("/mycelium", get(mycelium::<S>))
        .route("/dreams", get(dreams::<S>))
        .route("/wounds", get(wounds::<S>))
        .route("/seasons", get(seasons::<S>).post(force_season::<S>))
        .route("/gardener/{gardener_id}", get(gardener::<S>))
        .route("/agents", get(list_agents::<S>).post(spawn_agent::<S>))
        .route("/consciousness", get(consciousness::<S>))
        .with_state(Arc::new(state))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "alive"}))
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Agent(#[from] crate::error::AgentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Agent(crate::error::AgentError::CapacityExceeded { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Agent(crate::error::AgentError::Denied) => StatusCode::FORBIDDEN,
            ApiError::Agent(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type AppResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct PlantRequest {
    wish: String,
    gardener_id: Option<String>,
}

async fn plant<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlantRequest>,
) -> AppResult<impl IntoResponse> {
    let seed = growth::plant_wish(&state.store, &state.bus, &state.text_model, req.gardener_id.as_deref(), &req.wish)
        .await?;
    Ok(Json(seed))
}

#[derive(Debug, Deserialize)]
struct PlantBatchRequest {
    wishes: Vec<String>,
    gardener_id: Option<String>,
}

async fn plant_batch<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlantBatchRequest>,
) -> AppResult<impl IntoResponse> {
    let mut planted = Vec::with_capacity(req.wishes.len());
    for wish in &req.wishes {
        let seed = growth::plant_wish(&state.store, &state.bus, &state.text_model, req.gardener_id.as_deref(), wish)
            .await?;
        planted.push(seed);
    }
    Ok(Json(planted))
}

#[derive(Debug, Deserialize)]
struct WaterRequest {
    #[serde(default = "default_attention_seconds")]
    attention_seconds: f64,
}

fn default_attention_seconds() -> f64 {
    60.0
}

async fn water<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Path(seed_id): Path<String>,
    Json(req): Json<WaterRequest>,
) -> AppResult<impl IntoResponse> {
    let mut seed = state
        .store
        .get_seed(&seed_id)
        .await?
        .ok_or_else(|| ValidationError::UnknownSeed(seed_id.clone()))?;
    let mut garden = state.store.get_garden_state().await?;
    energy::photosynthesize(
        &state.store,
        &state.bus,
        &state.energy_settings,
        &mut garden,
        &mut seed,
        req.attention_seconds,
        Some(2.0),
    )
    .await?;
    Ok(Json(seed))
}

async fn harvest<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Path(seed_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let mut seed = state
        .store
        .get_seed(&seed_id)
        .await?
        .ok_or_else(|| ValidationError::UnknownSeed(seed_id.clone()))?;
    growth::autonomy::harvest_seed(&state.store, &state.bus, &mut seed).await?;
    network::pollinate(&state.store, &state.bus, &seed).await?;
    Ok(Json(seed))
}

async fn compost<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Path(seed_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let mut seed = state
        .store
        .get_seed(&seed_id)
        .await?
        .ok_or_else(|| ValidationError::UnknownSeed(seed_id.clone()))?;
    growth::autonomy::compost_seed(&state.store, &state.bus, &mut seed).await?;
    Ok(Json(seed))
}

async fn resurrect<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Path(seed_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let mut seed = state
        .store
        .get_seed(&seed_id)
        .await?
        .ok_or_else(|| ValidationError::UnknownSeed(seed_id.clone()))?;
    if seed.status != SeedStatus::Composted {
        return Err(ValidationError::NotComposted(seed_id).into());
    }
    seed.status = SeedStatus::Planted;
    seed.is_composted = false;
    seed.energy = seed.energy.max(1.0);
    state.store.update_seed(&seed).await?;
    Ok(Json(seed))
}

async fn garden<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.get_garden_state().await?))
}

async fn ecosystem<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_living_seeds().await?))
}

async fn pulse<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    let garden = state.store.get_garden_state().await?;
    let report = crate::dream::pulse(&state.store, &state.bus, &state.text_model, &garden).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct SoilResponse {
    soil_richness: f64,
    total_energy: f64,
    vitality: f64,
    antifragility_score: f64,
}

async fn soil<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    let garden = state.store.get_garden_state().await?;
    Ok(Json(SoilResponse {
        soil_richness: garden.soil_richness,
        total_energy: garden.total_energy,
        vitality: garden.vitality,
        antifragility_score: garden.antifragility_score,
    }))
}

async fn mycelium<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_links().await?))
}

async fn dreams<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_recent_dreams(50).await?))
}

async fn wounds<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_recent_wounds(50).await?))
}

#[derive(Debug, Serialize)]
struct SeasonsResponse {
    season: &'static str,
    cycle_count: i64,
    tidal_phase: f64,
}

async fn seasons<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    let garden = state.store.get_garden_state().await?;
    Ok(Json(SeasonsResponse {
        season: garden.season.as_str(),
        cycle_count: garden.cycle_count,
        tidal_phase: garden.tidal_phase,
    }))
}

#[derive(Debug, Deserialize)]
struct ForceSeasonRequest {
    season: Season,
}

async fn force_season<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ForceSeasonRequest>,
) -> AppResult<impl IntoResponse> {
    let mut garden = state.store.get_garden_state().await?;
    network::turn_season(&state.store, &state.bus, &mut garden, Some(req.season)).await?;
    Ok(Json(SeasonsResponse {
        season: garden.season.as_str(),
        cycle_count: garden.cycle_count,
        tidal_phase: garden.tidal_phase,
    }))
}

async fn gardener<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Path(gardener_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.get_or_create_gardener(&gardener_id).await?))
}

async fn list_agents<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_active_agents().await?))
}

#[derive(Debug, Deserialize)]
struct SpawnAgentRequest {
    capability: AgentCapability,
    seed_id: Option<String>,
    task_description: String,
    #[serde(default = "serde_json::Value::default")]
    capability_params: serde_json::Value,
}

async fn spawn_agent<S: Database>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SpawnAgentRequest>,
) -> AppResult<impl IntoResponse> {
    let agent = agents::lifecycle::spawn(
        &state.store,
        &state.bus,
        req.capability,
        req.seed_id.as_deref(),
        &req.task_description,
        req.capability_params,
    )
    .await?;
    Ok(Json(agent))
}

#[derive(Debug, Serialize)]
struct ConsciousnessResponse {
    emotional_state: Option<crate::domain::EmotionalState>,
    self_model: Option<crate::domain::SelfModelSnapshot>,
    recent_thoughts: Vec<crate::domain::InnerThought>,
    recent_memories: Vec<crate::domain::EpisodicMemory>,
}

async fn consciousness<S: Database>(State(state): State<Arc<AppState<S>>>) -> AppResult<impl IntoResponse> {
    let mut recent_memories = state.store.recent_memories(10).await?;
    for memory in recent_memories.iter_mut() {
        crate::introspection::memory::recall(&state.store, &state.bus, memory).await?;
    }

    Ok(Json(ConsciousnessResponse {
        emotional_state: state.store.latest_emotional_state().await?,
        self_model: state.store.latest_self_model_snapshot().await?,
        recent_thoughts: state.store.recent_inner_thoughts(10).await?,
        recent_memories,
    }))
}

async fn ws_upgrade<S: Database>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let rx = state.ws_tx.subscribe();
    ws.on_upgrade(move |socket| ws_loop(socket, rx))
}

async fn ws_loop(mut socket: WebSocket, mut rx: tokio::sync::broadcast::Receiver<serde_json::Value>) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(value) => {
                        if socket.send(Message::Text(value.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) if text.as_str() == "ping" => {
                        if socket.send(Message::Text("pong".into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_events_cover_every_bus_emission_site() {
        // Every event name any organ module emits via `Hormone::new` should
        // have a subscriber here so the websocket channel never silently
        // drops a category of event.
        for expected in [
            "seed_planted",
            "tree_grown",
            "auto_harvest",
            "auto_compost",
            "pulse_generated",
        ] {
            assert!(MIRRORED_EVENTS.contains(&expected));
        }
    }
}
