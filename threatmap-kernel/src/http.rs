/**
 * API REST THREATMAP - Surface HTTP du noyau pour les adaptateurs de présentation
 *
 * RÔLE :
 * Expose la vue courante du feed, la géométrie dérivée (arcs, bornes) et la
 * commande de mitigation. Les adaptateurs tirent (`/threats`, `/threats/{id}/arc`)
 * et ne poussent qu'une seule chose : `POST /threats/{id}/mitigate`.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum avec middleware auth API key (x-api-key, /health exempté)
 * - Les vues sont calculées à la lecture : fraîcheur, couleur, style — rien
 *   n'est stocké pré-dérivé
 * - Les lecteurs reçoivent des clones, jamais de poignée sur la collection
 *
 * SÉCURITÉ :
 * - Header x-api-key obligatoire sur toutes routes sauf /health
 * - Validation côté middleware avant traitement métier
 */

use crate::feed::{is_fresh, SharedFeed, MAX_EVENTS};
use crate::geo::{arc_2d, arc_3d, bounds_for, color_for_severity, path_style_for_kind, GeoBounds, PathStyle, Vec3};
use crate::mitigation::{MitigateOutcome, MitigationCoordinator, MitigationError};
use crate::models::{AttackKind, GeoPoint, Severity, ThreatEvent, ThreatStatus};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{routing::{get, post}, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(serde::Serialize)]
struct ThreatView {
    id: String,
    timestamp: String,       // RFC3339 pour l'API
    kind: AttackKind,
    severity: Severity,
    status: ThreatStatus,
    fresh: bool,             // true si < 10s
    age_seconds: i64,
    source: Option<GeoPoint>,
    target: Option<GeoPoint>,
    confidence: f64,
    analysis: Option<String>,
    mitigation_suggestions: Vec<String>,
    color: &'static str,     // dérivé de la sévérité
    style: PathStyle,        // dérivé de la catégorie
}

fn to_view(e: &ThreatEvent) -> ThreatView {
    let now = OffsetDateTime::now_utc();
    let age = (now - e.timestamp).whole_seconds().max(0);
    ThreatView {
        id: e.id.clone(),
        timestamp: e.timestamp.format(&Rfc3339).unwrap_or_default(),
        kind: e.kind,
        severity: e.severity,
        status: e.status,
        fresh: is_fresh(e, now),
        age_seconds: age,
        source: e.source.clone(),
        target: e.target.clone(),
        confidence: e.confidence,
        analysis: e.analysis.clone(),
        mitigation_suggestions: e.mitigation_suggestions.clone(),
        color: color_for_severity(e.severity),
        style: path_style_for_kind(e.kind),
    }
}

async fn require_api_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    let path = req.uri().path();

    // Health check toujours accessible
    if path.starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var("THREATMAP_API_KEY").unwrap_or_default();
    if expected.is_empty() {
        eprintln!("SECURITY: THREATMAP_API_KEY not set - API access denied");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let ok = req.headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

#[derive(Clone)]
pub struct AppState {
    pub feed: SharedFeed,
    pub coordinator: Arc<MitigationCoordinator>,
    pub started: std::time::Instant,
}

#[derive(serde::Serialize)]
struct KernelHealth {
    uptime_seconds: u64,
    events_tracked: usize,
    fresh_events: usize,
    pending_mitigations: usize,
    capacity: usize,
}

#[derive(Debug, Deserialize)]
struct ArcParams {
    radius: Option<f64>,
}

#[derive(serde::Serialize)]
struct ArcView {
    points: Vec<Vec3>,       // arc 3D (51 échantillons)
    flat: Vec<GeoPoint>,     // courbe 2D pour la carte plate
    color: &'static str,
    style: PathStyle,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/threats", get(get_threats))
        .route("/threats/bounds", get(get_bounds))
        .route("/threats/{id}", get(get_threat))
        .route("/threats/{id}/arc", get(get_threat_arc))
        .route("/threats/{id}/mitigate", post(mitigate_threat))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

// GET /threats (vue courante, newest-first)
async fn get_threats(State(app): State<AppState>) -> Json<Vec<ThreatView>> {
    let list: Vec<ThreatView> = app.feed.lock().current_view().iter().map(to_view).collect();
    Json(list)
}

// GET /threats/:id (détail)
async fn get_threat(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThreatView>, StatusCode> {
    let Some(e) = app.feed.lock().get(&id) else { return Err(StatusCode::NOT_FOUND); };
    Ok(Json(to_view(&e)))
}

// GET /threats/bounds (cadrage 2D ; null si aucune coordonnée)
async fn get_bounds(State(app): State<AppState>) -> Json<Option<GeoBounds>> {
    let view = app.feed.lock().current_view();
    Json(bounds_for(&view))
}

// GET /threats/:id/arc?radius=1.0 (géométrie de rendu)
async fn get_threat_arc(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ArcParams>,
) -> Result<Json<ArcView>, StatusCode> {
    let Some(e) = app.feed.lock().get(&id) else { return Err(StatusCode::NOT_FOUND); };
    // sans les deux extrémités, pas de géométrie (l'événement reste listé)
    let (Some(source), Some(target)) = (e.source.as_ref(), e.target.as_ref()) else {
        return Err(StatusCode::NOT_FOUND);
    };
    let radius = params.radius.unwrap_or(1.0);
    Ok(Json(ArcView {
        points: arc_3d(source, target, radius),
        flat: arc_2d(source, target),
        color: color_for_severity(e.severity),
        style: path_style_for_kind(e.kind),
    }))
}

// POST /threats/:id/mitigate
async fn mitigate_threat(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match app.coordinator.mitigate(&id).await {
        Ok(outcome) => {
            let label = match outcome {
                MitigateOutcome::Confirmed => "confirmed",
                MitigateOutcome::AlreadyGone => "already_gone",
                MitigateOutcome::Unconfirmed => "unconfirmed",
            };
            (StatusCode::OK, Json(serde_json::json!({ "ok": true, "outcome": label })))
        }
        Err(MitigationError::UnknownThreat(_)) => {
            (StatusCode::NOT_FOUND, Json(serde_json::json!({ "ok": false, "message": "unknown threat" })))
        }
        Err(MitigationError::Rejected(message)) => {
            (StatusCode::CONFLICT, Json(serde_json::json!({ "ok": false, "message": message })))
        }
    }
}

// GET /system/health (état du noyau)
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    let now = OffsetDateTime::now_utc();
    let (view, tracked) = {
        let feed = app.feed.lock();
        (feed.current_view(), feed.len())
    };
    Json(KernelHealth {
        uptime_seconds: app.started.elapsed().as_secs(),
        events_tracked: tracked,
        fresh_events: view.iter().filter(|e| is_fresh(e, now)).count(),
        pending_mitigations: app.coordinator.pending_count(),
        capacity: MAX_EVENTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn event(id: &str, age: Duration) -> ThreatEvent {
        ThreatEvent {
            id: id.to_string(),
            timestamp: OffsetDateTime::now_utc() - age,
            kind: AttackKind::Phishing,
            severity: Severity::Critical,
            status: ThreatStatus::Detected,
            source: None,
            target: None,
            confidence: 0.8,
            analysis: None,
            mitigation_suggestions: Vec::new(),
        }
    }

    #[test]
    fn test_view_derives_freshness_and_styling() {
        let fresh = to_view(&event("new", Duration::seconds(2)));
        assert!(fresh.fresh);
        assert_eq!(fresh.color, "#ff3b30"); // critical -> rouge
        assert_eq!(fresh.style, path_style_for_kind(AttackKind::Phishing));

        let old = to_view(&event("old", Duration::seconds(30)));
        assert!(!old.fresh);
        assert!(old.age_seconds >= 30);
    }
}
