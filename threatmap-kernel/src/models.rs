/**
 * MODELS - Types de données des événements de menace
 *
 * RÔLE : Définitions serde des enregistrements reçus du backend (snapshot REST)
 * et du flux MQTT. Un seul type ThreatEvent partagé par les deux sources.
 *
 * CONTRAT : seul `id` est obligatoire. Tout enregistrement sans id est rejeté
 * au parsing ; les champs d'enrichissement manquants prennent leur défaut.
 */

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Sévérité ordonnée : Low < Medium < High < Critical (l'ordre de
/// déclaration porte le Ord dérivé, Low doit rester en tête).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Désérialisation manuelle : une valeur inconnue sur le fil retombe sur
/// Low (échec doux, jamais d'erreur), sans toucher à l'ordre des variantes.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.to_ascii_lowercase().as_str() {
            "medium" => Severity::Medium,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Low,
        })
    }
}

/// Catégorie d'attaque — énumération fermée avec repli `Other`.
/// La catégorie pilote le motif de trait (géométrie), jamais la couleur.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Ddos,
    Ransomware,
    Phishing,
    Malware,
    BruteForce,
    SqlInjection,
    CrossSiteScripting,
    ManInTheMiddle,
    ZeroDay,
    Botnet,
    Spyware,
    Cryptojacking,
    SupplyChain,
    InsiderThreat,
    DataExfiltration,
    #[serde(other)]
    Other,
}

/// Statut visible : deux valeurs seulement. L'état "en vol" d'une mitigation
/// est un suivi interne du coordinateur, pas une troisième valeur ici.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ThreatStatus {
    Detected,
    Mitigated,
}

impl Default for ThreatStatus {
    fn default() -> Self {
        ThreatStatus::Detected
    }
}

/// Point géographique attribué (l'attribution se fait côté backend).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatEvent {
    pub id: String,
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    pub timestamp: OffsetDateTime,
    #[serde(default = "default_kind")]
    pub kind: AttackKind,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub status: ThreatStatus,
    pub source: Option<GeoPoint>,
    pub target: Option<GeoPoint>,
    #[serde(default)]
    pub confidence: f64,
    pub analysis: Option<String>,
    #[serde(default)]
    pub mitigation_suggestions: Vec<String>,
}

fn default_kind() -> AttackKind {
    AttackKind::Other
}

fn default_severity() -> Severity {
    Severity::Low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_without_id_is_rejected() {
        let raw = r#"{"timestamp":"2026-08-29T10:00:00Z","kind":"ddos","severity":"high"}"#;
        assert!(serde_json::from_str::<ThreatEvent>(raw).is_err());
    }

    #[test]
    fn test_unknown_kind_falls_back_to_other() {
        let raw = r#"{"id":"e1","timestamp":"2026-08-29T10:00:00Z","kind":"quantum_hack","source":null,"target":null,"analysis":null}"#;
        let ev: ThreatEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(ev.kind, AttackKind::Other);
        assert_eq!(ev.severity, Severity::Low);
        assert_eq!(ev.status, ThreatStatus::Detected);
    }

    #[test]
    fn test_unknown_severity_falls_back_to_low() {
        let raw = r#"{"id":"e2","timestamp":"2026-08-29T10:00:00Z","severity":"apocalyptic"}"#;
        let ev: ThreatEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(ev.severity, Severity::Low);

        // valeur isolée, y compris avec une casse différente
        assert_eq!(serde_json::from_str::<Severity>(r#""CRITICAL""#).unwrap(), Severity::Critical);
        assert_eq!(serde_json::from_str::<Severity>(r#""weird""#).unwrap(), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_status_never_regresses_with_max() {
        assert_eq!(ThreatStatus::Mitigated.max(ThreatStatus::Detected), ThreatStatus::Mitigated);
        assert_eq!(ThreatStatus::Detected.max(ThreatStatus::Detected), ThreatStatus::Detected);
    }
}
