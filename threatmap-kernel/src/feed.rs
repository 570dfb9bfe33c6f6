/**
 * THREAT FEED - Moteur de fusion des événements de menace
 *
 * RÔLE :
 * Vue canonique, bornée et dédupliquée des événements récents, fusionnée
 * depuis deux sources asynchrones : le snapshot REST périodique et le flux
 * MQTT incrémental.
 *
 * FONCTIONNEMENT :
 * - Collection ordonnée newest-first, plafonnée à MAX_EVENTS (éviction queue)
 * - Déduplication par id : ré-ingestion = mise à jour en place
 * - Le statut ne régresse jamais lors d'une fusion (Mitigated local > Detected snapshot)
 * - Fraîcheur calculée à la lecture, pas de bit stocké à invalider
 *
 * UTILITÉ DANS THREATMAP :
 * 🎯 Source de vérité unique pour les adaptateurs de présentation
 * 🎯 Interleaving snapshot/stream sans corruption (les invariants tiennent
 *    quel que soit l'ordre d'arrivée)
 */

use crate::models::{ThreatEvent, ThreatStatus};
use crate::state::Shared;
use time::{Duration, OffsetDateTime};

/// Capacité fixe de la collection de travail.
pub const MAX_EVENTS: usize = 50;

/// Fenêtre pendant laquelle un événement est présenté comme "nouveau".
pub const FRESHNESS_WINDOW: Duration = Duration::seconds(10);

pub struct ThreatFeed {
    events: Vec<ThreatEvent>, // newest-first, len <= MAX_EVENTS
}

pub type SharedFeed = Shared<ThreatFeed>;

impl ThreatFeed {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Remplace la collection par les MAX_EVENTS premiers événements du
    /// snapshot, dans l'ordre fourni par la source. Pour un id déjà connu
    /// localement, le statut le plus avancé est conservé : une mitigation
    /// locale fait autorité face à un snapshot en retard.
    pub fn load_snapshot(&mut self, incoming: Vec<ThreatEvent>) {
        let mut merged: Vec<ThreatEvent> = Vec::with_capacity(MAX_EVENTS);
        for mut event in incoming {
            if event.id.is_empty() {
                continue; // enregistrement malformé, ignoré sans toucher l'existant
            }
            if merged.iter().any(|e| e.id == event.id) {
                continue; // doublon intra-snapshot
            }
            if let Some(local) = self.events.iter().find(|e| e.id == event.id) {
                event.status = event.status.max(local.status);
            }
            merged.push(event);
            if merged.len() == MAX_EVENTS {
                break;
            }
        }
        self.events = merged;
    }

    /// Insère un événement poussé par le flux. Id connu : mise à jour en
    /// place (le flux gagne sur les champs, le statut reste monotone), la
    /// position dans la collection est conservée. Id nouveau : insertion en
    /// tête puis troncature à MAX_EVENTS.
    pub fn ingest_one(&mut self, event: ThreatEvent) {
        if event.id.is_empty() {
            return;
        }
        if let Some(existing) = self.events.iter_mut().find(|e| e.id == event.id) {
            let status = existing.status.max(event.status);
            *existing = event;
            existing.status = status;
            return;
        }
        self.events.insert(0, event);
        self.events.truncate(MAX_EVENTS);
    }

    /// Vue clonée, newest-first, sans effet de bord. Les lecteurs ne
    /// reçoivent jamais de poignée mutable sur la collection canonique.
    pub fn current_view(&self) -> Vec<ThreatEvent> {
        self.events.clone()
    }

    pub fn get(&self, id: &str) -> Option<ThreatEvent> {
        self.events.iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Écrit le statut sans règle de monotonie : réservé au coordinateur de
    /// mitigation, qui est seul habilité à rétrograder un statut (rejet
    /// explicite du backend). Retourne false si l'id est inconnu.
    pub(crate) fn set_status(&mut self, id: &str, status: ThreatStatus) -> bool {
        match self.events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.status = status;
                true
            }
            None => false,
        }
    }
}

/// Fonction pure du temps : vrai tant que l'événement a moins de
/// FRESHNESS_WINDOW. La fraîcheur expire d'elle-même, sans invalidation.
pub fn is_fresh(event: &ThreatEvent, now: OffsetDateTime) -> bool {
    now - event.timestamp < FRESHNESS_WINDOW
}
