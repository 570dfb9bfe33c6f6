/**
 * THREATMAP KERNEL - Point d'entrée principal du noyau de cartographie des menaces
 *
 * RÔLE : Orchestration de tous les modules : config, feed, MQTT, snapshot,
 * mitigation, HTTP. Bootstrap du système complet avec gestion d'erreurs.
 *
 * ARCHITECTURE : Event-driven : flux MQTT + snapshot REST périodique vers un
 * feed borné unique, API REST pour les adaptateurs de présentation.
 * UTILITÉ : Source de vérité unique de la carte des menaces, rien n'est
 * persisté entre deux démarrages.
 */

mod config;
mod feed;
mod geo;
mod http;
mod mitigation;
mod models;
mod mqtt;
mod snapshot;
mod state;

use crate::config::{load_config, KernelConfig};
use crate::feed::ThreatFeed;
use crate::http::AppState;
use crate::mitigation::MitigationCoordinator;
use crate::state::{new_state, Shared};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas

    // feed et conf partagés — construction explicite, pas de singleton ambiant
    let feed = new_state(ThreatFeed::new());
    let cfg_loaded: KernelConfig = load_config().await;
    let cfg: Shared<KernelConfig> = new_state(cfg_loaded.clone());

    // coordinateur de mitigation (parle au backend qui fait autorité)
    let coordinator = Arc::new(MitigationCoordinator::new(feed.clone(), &cfg_loaded.backend));

    // MQTT remplit le feed au fil de l'eau
    mqtt::spawn_mqtt_listener(feed.clone(), cfg.clone());

    // snapshot périodique pour le rattrapage et la resynchronisation
    snapshot::spawn_snapshot_poller(feed.clone(), cfg.clone());

    // fabrique l'état unique pour Axum
    let app_state = AppState {
        feed,
        coordinator,
        started: std::time::Instant::now(),
    };

    // HTTP
    let app = http::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    println!("[kernel] listening on http://{addr}");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
