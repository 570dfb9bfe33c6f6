/**
 * GEO PROJECTION - Transformations géographiques pures pour le rendu
 *
 * RÔLE :
 * Convertit les paires (lat, lon) des événements en géométrie affichable :
 * vecteurs sur sphère, arcs 3D surélevés, courbes 2D, bornes de cadrage.
 * Encodage visuel déterministe : couleur = sévérité, motif de trait = catégorie.
 *
 * FONCTIONNEMENT :
 * - Aucun état, aucune randomisation : mêmes entrées, mêmes sorties
 * - L'arc 3D est une Bézier quadratique dont le point de contrôle s'élève
 *   proportionnellement à la corde (les longs trajets volent plus haut)
 * - Tables de style fermées avec cas par défaut : une valeur inconnue
 *   dégrade en style neutre, jamais en erreur
 */

use crate::models::{GeoPoint, Severity, AttackKind, ThreatEvent};
use serde::Serialize;

/// Nombre d'échantillons par arc (2D comme 3D).
pub const ARC_SAMPLES: usize = 51;

const COLOR_CRITICAL: &str = "#ff3b30"; // rouge
const COLOR_HIGH: &str = "#ff9500";     // orange
const COLOR_MEDIUM: &str = "#ffd60a";   // jaune
const COLOR_LOW: &str = "#0a84ff";      // bleu, également le repli

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    fn scaled(&self, k: f64) -> Vec3 {
        Vec3 { x: self.x * k, y: self.y * k, z: self.z * k }
    }

    fn plus(&self, other: &Vec3) -> Vec3 {
        Vec3 { x: self.x + other.x, y: self.y + other.y, z: self.z + other.z }
    }

    fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Style de tracé d'un arc. La géométrie du trait vient de la catégorie
/// d'attaque ; la couleur vient de la sévérité (clé duale voulue : le motif
/// dit le mécanisme, la couleur dit l'urgence).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStyle {
    pub stroke_weight: f64,
    pub opacity: f64,
    pub dash_pattern: Option<[f64; 2]>, // None = trait plein
}

const DEFAULT_STYLE: PathStyle = PathStyle { stroke_weight: 1.5, opacity: 0.6, dash_pattern: None };

/// Rectangle minimal couvrant les coordonnées source, pour l'auto-cadrage 2D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// Conversion sphérique → cartésien standard.
/// phi = (90 - lat)·π/180, theta = (lon + 180)·π/180.
pub fn project_3d(lat: f64, lon: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lon + 180.0).to_radians();
    Vec3 {
        x: -radius * phi.sin() * theta.cos(),
        y: radius * phi.cos(),
        z: radius * phi.sin() * theta.sin(),
    }
}

/// Arc 3D entre deux points de la sphère : Bézier quadratique de
/// ARC_SAMPLES points, contrôle au-dessus du milieu de corde à une hauteur
/// de 0.3 × longueur de corde, poussé vers l'extérieur.
pub fn arc_3d(source: &GeoPoint, target: &GeoPoint, radius: f64) -> Vec<Vec3> {
    let a = project_3d(source.lat, source.lon, radius);
    let b = project_3d(target.lat, target.lon, radius);
    let chord = a.distance(&b);
    let mid = a.plus(&b).scaled(0.5);

    // points quasi antipodaux : le milieu passe par le centre de la sphère,
    // on pousse alors le contrôle le long de l'axe vertical
    let mid_norm = mid.norm();
    let outward = if mid_norm > 1e-9 {
        mid.scaled(1.0 / mid_norm)
    } else {
        Vec3 { x: 0.0, y: 1.0, z: 0.0 }
    };
    let control = mid.plus(&outward.scaled(0.3 * chord));

    (0..ARC_SAMPLES)
        .map(|i| {
            let t = i as f64 / (ARC_SAMPLES - 1) as f64;
            let u = 1.0 - t;
            // B(t) = u²·a + 2ut·c + t²·b
            a.scaled(u * u)
                .plus(&control.scaled(2.0 * u * t))
                .plus(&b.scaled(t * t))
        })
        .collect()
}

/// Courbe 2D dans le plan lat/lon : Bézier quadratique dont le contrôle est
/// décalé perpendiculairement à la corde de 0.2 × sa longueur.
pub fn arc_2d(source: &GeoPoint, target: &GeoPoint) -> Vec<GeoPoint> {
    let dlat = target.lat - source.lat;
    let dlon = target.lon - source.lon;
    let chord = (dlat * dlat + dlon * dlon).sqrt();
    let mid_lat = (source.lat + target.lat) / 2.0;
    let mid_lon = (source.lon + target.lon) / 2.0;

    // perpendiculaire unitaire (-dlon, dlat)/corde, décalée de 0.2 × corde
    let (ctrl_lat, ctrl_lon) = if chord > 1e-9 {
        (mid_lat - 0.2 * dlon, mid_lon + 0.2 * dlat)
    } else {
        (mid_lat, mid_lon)
    };

    (0..ARC_SAMPLES)
        .map(|i| {
            let t = i as f64 / (ARC_SAMPLES - 1) as f64;
            let u = 1.0 - t;
            GeoPoint {
                lat: u * u * source.lat + 2.0 * u * t * ctrl_lat + t * t * target.lat,
                lon: u * u * source.lon + 2.0 * u * t * ctrl_lon + t * t * target.lon,
                label: None,
            }
        })
        .collect()
}

/// Couleur par sévérité. Table fermée, le bleu de Low sert de repli.
pub fn color_for_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => COLOR_CRITICAL,
        Severity::High => COLOR_HIGH,
        Severity::Medium => COLOR_MEDIUM,
        Severity::Low => COLOR_LOW,
    }
}

/// Motif de trait par catégorie d'attaque. Table fermée, `Other` dégrade
/// sur le style par défaut.
pub fn path_style_for_kind(kind: AttackKind) -> PathStyle {
    match kind {
        AttackKind::Ddos => PathStyle { stroke_weight: 3.0, opacity: 0.9, dash_pattern: None },
        AttackKind::Ransomware => PathStyle { stroke_weight: 2.5, opacity: 0.9, dash_pattern: Some([8.0, 4.0]) },
        AttackKind::Phishing => PathStyle { stroke_weight: 1.5, opacity: 0.7, dash_pattern: Some([2.0, 6.0]) },
        AttackKind::Malware => PathStyle { stroke_weight: 2.0, opacity: 0.8, dash_pattern: Some([6.0, 3.0]) },
        AttackKind::BruteForce => PathStyle { stroke_weight: 2.5, opacity: 0.8, dash_pattern: Some([1.0, 2.0]) },
        AttackKind::SqlInjection => PathStyle { stroke_weight: 1.8, opacity: 0.75, dash_pattern: Some([10.0, 2.0]) },
        AttackKind::CrossSiteScripting => PathStyle { stroke_weight: 1.6, opacity: 0.7, dash_pattern: Some([4.0, 4.0]) },
        AttackKind::ManInTheMiddle => PathStyle { stroke_weight: 2.2, opacity: 0.8, dash_pattern: Some([12.0, 6.0]) },
        AttackKind::ZeroDay => PathStyle { stroke_weight: 3.5, opacity: 1.0, dash_pattern: None },
        AttackKind::Botnet => PathStyle { stroke_weight: 2.0, opacity: 0.75, dash_pattern: Some([3.0, 3.0]) },
        AttackKind::Spyware => PathStyle { stroke_weight: 1.4, opacity: 0.65, dash_pattern: Some([2.0, 8.0]) },
        AttackKind::Cryptojacking => PathStyle { stroke_weight: 1.7, opacity: 0.7, dash_pattern: Some([5.0, 5.0]) },
        AttackKind::SupplyChain => PathStyle { stroke_weight: 2.8, opacity: 0.85, dash_pattern: Some([14.0, 4.0]) },
        AttackKind::InsiderThreat => PathStyle { stroke_weight: 2.0, opacity: 0.8, dash_pattern: Some([7.0, 7.0]) },
        AttackKind::DataExfiltration => PathStyle { stroke_weight: 2.4, opacity: 0.85, dash_pattern: Some([9.0, 3.0]) },
        AttackKind::Other => DEFAULT_STYLE,
    }
}

/// Bornes couvrant les coordonnées source de la vue. Entrée vide (ou sans
/// aucune coordonnée) : None, pas d'erreur.
pub fn bounds_for(events: &[ThreatEvent]) -> Option<GeoBounds> {
    let mut bounds: Option<GeoBounds> = None;
    for point in events.iter().filter_map(|e| e.source.as_ref()) {
        bounds = Some(match bounds {
            None => GeoBounds {
                min_lat: point.lat,
                min_lon: point.lon,
                max_lat: point.lat,
                max_lon: point.lon,
            },
            Some(b) => GeoBounds {
                min_lat: b.min_lat.min(point.lat),
                min_lon: b.min_lon.min(point.lon),
                max_lat: b.max_lat.max(point.lat),
                max_lon: b.max_lon.max(point.lon),
            },
        });
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ThreatStatus, AttackKind};
    use time::OffsetDateTime;

    const TOL: f64 = 1e-9;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint { lat, lon, label: None }
    }

    fn event_at(id: &str, source: Option<GeoPoint>) -> ThreatEvent {
        ThreatEvent {
            id: id.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            kind: AttackKind::Ddos,
            severity: Severity::High,
            status: ThreatStatus::Detected,
            source,
            target: None,
            confidence: 1.0,
            analysis: None,
            mitigation_suggestions: Vec::new(),
        }
    }

    #[test]
    fn test_north_pole_maps_to_y_apex() {
        let v = project_3d(90.0, 0.0, 2.0);
        assert!(v.x.abs() < TOL);
        assert!((v.y - 2.0).abs() < TOL);
        assert!(v.z.abs() < TOL);
    }

    #[test]
    fn test_projection_stays_on_sphere() {
        let radius = 1.0;
        for lat in (-90..=90).step_by(15) {
            for lon in (-180..=180).step_by(30) {
                let v = project_3d(lat as f64, lon as f64, radius);
                assert!(
                    (v.norm() - radius).abs() < 1e-9,
                    "norme hors sphère pour lat={lat} lon={lon}: {}",
                    v.norm()
                );
            }
        }
    }

    #[test]
    fn test_arc_is_deterministic_and_anchored() {
        let paris = point(48.85, 2.35);
        let tokyo = point(35.68, 139.69);
        let first = arc_3d(&paris, &tokyo, 1.0);
        let second = arc_3d(&paris, &tokyo, 1.0);
        assert_eq!(first, second);
        assert_eq!(first.len(), ARC_SAMPLES);

        // extrémités exactement sur les projections des deux villes
        let a = project_3d(paris.lat, paris.lon, 1.0);
        let b = project_3d(tokyo.lat, tokyo.lon, 1.0);
        assert!(first[0].distance(&a) < TOL);
        assert!(first[ARC_SAMPLES - 1].distance(&b) < TOL);
    }

    #[test]
    fn test_longer_chords_fly_higher() {
        // hauteur au sommet = écart entre l'échantillon médian et le milieu
        // de corde ; elle doit croître avec la longueur de corde
        let origin = point(0.0, 0.0);
        let rise = |target: GeoPoint| {
            let arc = arc_3d(&origin, &target, 1.0);
            let a = project_3d(origin.lat, origin.lon, 1.0);
            let b = project_3d(target.lat, target.lon, 1.0);
            let mid = a.plus(&b).scaled(0.5);
            arc[ARC_SAMPLES / 2].distance(&mid)
        };
        assert!(rise(point(0.0, 120.0)) > rise(point(0.0, 20.0)));
    }

    #[test]
    fn test_arc_2d_endpoints_and_count() {
        let s = point(10.0, -30.0);
        let t = point(-20.0, 60.0);
        let curve = arc_2d(&s, &t);
        assert_eq!(curve.len(), ARC_SAMPLES);
        assert!((curve[0].lat - s.lat).abs() < TOL && (curve[0].lon - s.lon).abs() < TOL);
        let last = &curve[ARC_SAMPLES - 1];
        assert!((last.lat - t.lat).abs() < TOL && (last.lon - t.lon).abs() < TOL);
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(color_for_severity(Severity::Critical), "#ff3b30");
        assert_eq!(color_for_severity(Severity::High), "#ff9500");
        assert_eq!(color_for_severity(Severity::Medium), "#ffd60a");
        assert_eq!(color_for_severity(Severity::Low), "#0a84ff");
    }

    #[test]
    fn test_unknown_kind_gets_default_style() {
        assert_eq!(path_style_for_kind(AttackKind::Other), DEFAULT_STYLE);
        // les catégories connues ont chacune leur propre géométrie de trait
        assert_ne!(path_style_for_kind(AttackKind::Ddos), path_style_for_kind(AttackKind::Phishing));
    }

    #[test]
    fn test_bounds_cover_sources_only() {
        let events = vec![
            event_at("a", Some(point(10.0, -50.0))),
            event_at("b", Some(point(-5.0, 20.0))),
            event_at("c", None), // sans coordonnées : exclu du cadrage
        ];
        let b = bounds_for(&events).unwrap();
        assert_eq!(b.min_lat, -5.0);
        assert_eq!(b.max_lat, 10.0);
        assert_eq!(b.min_lon, -50.0);
        assert_eq!(b.max_lon, 20.0);
    }

    #[test]
    fn test_bounds_empty_input_is_none() {
        assert!(bounds_for(&[]).is_none());
        assert!(bounds_for(&[event_at("a", None)]).is_none());
    }
}
