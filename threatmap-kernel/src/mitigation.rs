/**
 * MITIGATION COORDINATOR - Réconciliation des actions "mitiger" avec le backend
 *
 * RÔLE :
 * Machine à états par menace : Detected --requête--> Pending --confirmé--> Mitigated,
 * avec deux arêtes de récupération : "Threat not found" (la fenêtre de travail
 * du backend est elle-même bornée, disparu = déjà traité) et panne transport
 * (repli optimiste : l'état local avance sans confirmation).
 *
 * FONCTIONNEMENT :
 * - Avance optimiste : le statut passe à Mitigated dès la requête, Pending
 *   n'est qu'un suivi interne (le statut visible reste binaire)
 * - Rejet métier autre que not-found : retour à Detected + message remonté
 *   tel quel ; une mitigation déjà acquise avant la requête n'est jamais
 *   rétrogradée par un rejet tardif
 * - Pas de retry : la divergence locale/backend en cas de panne est assumée
 * - Deux mitigate() concurrents sur le même id sont permis, dernier écrit
 *   gagne, les deux convergent sur Mitigated
 */

use crate::config::BackendConf;
use crate::feed::SharedFeed;
use crate::models::ThreatStatus;
use crate::state::{new_state, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Sentinelle reconnue dans la réponse backend : l'id n'est plus dans sa
/// fenêtre de travail, on considère la menace traitée.
const NOT_FOUND_MESSAGE: &str = "Threat not found";

#[derive(Debug, PartialEq, Eq)]
pub enum MitigateOutcome {
    /// Le backend a confirmé la mitigation.
    Confirmed,
    /// "Threat not found" : sortie de la fenêtre backend, traité d'office.
    AlreadyGone,
    /// Panne transport : avancé localement sans confirmation (repli assumé).
    Unconfirmed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MitigationError {
    #[error("menace inconnue: {0}")]
    UnknownThreat(String),
    /// Rejet métier du backend, message remonté tel quel à l'opérateur.
    #[error("{0}")]
    Rejected(String),
}

pub type MitigateResult = Result<MitigateOutcome, MitigationError>;

/// Corps envoyé au backend, avec id de corrélation côté client.
#[derive(Debug, Serialize)]
struct MitigateCommand {
    request_id: String,
    threat_id: String,
    timestamp: String,
}

/// Réponse du backend : `ok` + message d'échec éventuel.
#[derive(Debug, Deserialize)]
pub struct MitigateReply {
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
}

pub struct MitigationCoordinator {
    feed: SharedFeed,
    /// ids dont la confirmation est en vol — comptage interne uniquement,
    /// jamais exposé comme troisième statut
    pending: Shared<HashSet<String>>,
    client: reqwest::Client,
    base_url: String,
}

impl MitigationCoordinator {
    pub fn new(feed: SharedFeed, backend: &BackendConf) -> Self {
        Self {
            feed,
            pending: new_state(HashSet::new()),
            client: reqwest::Client::new(),
            base_url: backend.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Déclenche la mitigation d'une menace. L'état visible avance tout de
    /// suite ; la réponse du backend (ou son absence) décide ensuite via
    /// `resolve`, qui ne rétrograde que sur rejet métier explicite.
    pub async fn mitigate(&self, id: &str) -> MitigateResult {
        let prior = match self.feed.lock().get(id) {
            Some(event) => event.status,
            None => return Err(MitigationError::UnknownThreat(id.to_string())),
        };

        // avance optimiste + marquage en vol
        self.feed.lock().set_status(id, ThreatStatus::Mitigated);
        self.pending.lock().insert(id.to_string());

        let reply = self.send_request(id).await;
        let outcome = resolve(&self.feed, id, prior, reply);
        self.pending.lock().remove(id);

        match &outcome {
            Ok(o) => println!("[mitigation] {} -> {:?}", id, o),
            Err(e) => eprintln!("[mitigation] {} rejected: {}", id, e),
        }
        outcome
    }

    async fn send_request(&self, id: &str) -> Result<MitigateReply, reqwest::Error> {
        let command = MitigateCommand {
            request_id: Uuid::new_v4().to_string(),
            threat_id: id.to_string(),
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        };
        self.client
            .post(format!("{}/threats/{}/mitigate", self.base_url, id))
            .json(&command)
            .send()
            .await?
            .json::<MitigateReply>()
            .await
    }
}

/// Applique le verdict du backend à l'état local. Séparé du transport pour
/// rester testable sans réseau. `prior` est le statut d'avant la requête :
/// un rejet ne rétrograde que l'avance optimiste de cette requête, jamais
/// une mitigation déjà acquise (le statut reste monotone vu de l'extérieur).
fn resolve(
    feed: &SharedFeed,
    id: &str,
    prior: ThreatStatus,
    reply: Result<MitigateReply, impl fmt::Display>,
) -> MitigateResult {
    match reply {
        Ok(MitigateReply { ok: true, .. }) => Ok(MitigateOutcome::Confirmed),
        Ok(MitigateReply { ok: false, message }) => {
            let message = message.unwrap_or_else(|| "mitigation refused".to_string());
            if message == NOT_FOUND_MESSAGE {
                // déjà sorti de la fenêtre backend : succès implicite
                Ok(MitigateOutcome::AlreadyGone)
            } else {
                if prior != ThreatStatus::Mitigated {
                    feed.lock().set_status(id, ThreatStatus::Detected);
                }
                Err(MitigationError::Rejected(message))
            }
        }
        Err(e) => {
            eprintln!("[mitigation] transport failure for {}: {}", id, e);
            Ok(MitigateOutcome::Unconfirmed)
        }
    }
}
