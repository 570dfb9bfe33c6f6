/**
 * SNAPSHOT POLLER - Récupération périodique du snapshot backend
 *
 * RÔLE : Interroge le backend à intervalle régulier et fusionne le lot
 * dans le feed. Une panne de fetch conserve l'état précédent, sans erreur
 * visible pour l'opérateur.
 */

use crate::config::KernelConfig;
use crate::feed::{SharedFeed, MAX_EVENTS};
use crate::models::ThreatEvent;
use crate::state::Shared;
use anyhow::Result;
use tokio::task;

pub fn spawn_snapshot_poller(feed: SharedFeed, cfg: Shared<KernelConfig>) {
    let (base_url, interval_secs) = {
        let c = cfg.lock();
        (c.backend.base_url.trim_end_matches('/').to_string(), c.poll_interval_seconds)
    };

    task::spawn(async move {
        let client = reqwest::Client::new();
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;
            match fetch_snapshot(&client, &base_url).await {
                Ok(events) => {
                    let count = events.len();
                    feed.lock().load_snapshot(events);
                    println!("[snapshot] merged {} events from backend", count);
                }
                // transport KO : on garde la collection courante telle quelle
                Err(e) => eprintln!("[snapshot] fetch failed: {}", e),
            }
        }
    });
}

/// Récupère le lot d'événements récents. Parsing tolérant : un enregistrement
/// invalide est écarté sans condamner le reste du lot.
async fn fetch_snapshot(client: &reqwest::Client, base_url: &str) -> Result<Vec<ThreatEvent>> {
    let url = format!("{}/threats/recent?limit={}", base_url, MAX_EVENTS);
    let raw: Vec<serde_json::Value> = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let mut events = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<ThreatEvent>(value) {
            Ok(event) => events.push(event),
            Err(e) => eprintln!("[snapshot] dropping malformed record: {}", e),
        }
    }
    Ok(events)
}
