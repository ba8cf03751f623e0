//! Lógica de reconciliación de alertas.
//!
//! Convierte la colección completa de alertas (identificador → registro) en el
//! feed de actividad ordenado y acotado que muestra el panel, junto con los
//! contadores agregados por severidad.


use chrono::{DateTime, Utc};
use crate::fence::domain::{
    ActivityEntry, AlertCounts, AlertMap, Severity, format_relative, severity_color,
};
use crate::system::domain::dashboard_const::ACTIVITY_LIMIT;


/// Reconcilia la colección de alertas en sus dos proyecciones derivadas.
///
/// # Retorno
/// * Feed de actividad: a lo sumo las 10 alertas más recientes, ordenadas por
///   identificador numérico descendente.
/// * Contadores: calculados sobre la colección **completa**, no sobre el feed
///   acotado. Las severidades no reconocidas cuentan solo en el total.
pub fn reconcile(alerts: &AlertMap, now: DateTime<Utc>) -> (Vec<ActivityEntry>, AlertCounts) {

    let mut activity = Vec::with_capacity(alerts.len());
    let mut counts = AlertCounts::default();

    for (id, alert) in alerts {
        activity.push(ActivityEntry {
            id: id.clone(),
            kind: alert.kind.clone(),
            description: alert.message.clone(),
            when: format_relative(&alert.timestamp, now),
            severity: alert.severity.clone(),
            color: severity_color(&alert.severity),
        });

        match Severity::from_label(&alert.severity) {
            Some(Severity::Critical) => counts.critical += 1,
            Some(Severity::Warning) => counts.warning += 1,
            Some(Severity::Info) => counts.info += 1,
            None => {}
        }
        counts.total += 1;
    }

    activity.sort_by(|a, b| numeric_id(&b.id).cmp(&numeric_id(&a.id)));
    activity.truncate(ACTIVITY_LIMIT);

    (activity, counts)
}


fn numeric_id(id: &str) -> i64 {
    id.parse().unwrap_or(0)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::fence::domain::{AlertRecord, SeverityColor};

    fn alert(severity: &str) -> AlertRecord {
        AlertRecord {
            kind: "Test".to_string(),
            message: "mensaje".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            severity: severity.to_string(),
        }
    }

    #[test]
    fn empty_collection_produces_empty_feed_and_zero_counts() {
        let (activity, counts) = reconcile(&AlertMap::new(), Utc::now());
        assert!(activity.is_empty());
        assert_eq!(counts, AlertCounts::default());
    }

    #[test]
    fn feed_is_sorted_descending_and_counts_cover_all_severities() {
        let mut alerts = AlertMap::new();
        alerts.insert("100".to_string(), alert("info"));
        alerts.insert("200".to_string(), alert("critical"));
        alerts.insert("50".to_string(), alert("warning"));

        let (activity, counts) = reconcile(&alerts, Utc::now());

        let ids: Vec<&str> = activity.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["200", "100", "50"]);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.warning, 1);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn feed_is_capped_but_counts_cover_the_whole_collection() {
        let mut alerts = AlertMap::new();
        for id in 0..25 {
            alerts.insert(id.to_string(), alert("info"));
        }

        let (activity, counts) = reconcile(&alerts, Utc::now());

        assert_eq!(activity.len(), ACTIVITY_LIMIT);
        assert_eq!(counts.total, 25);
        assert_eq!(counts.info, 25);
        assert_eq!(activity[0].id, "24");
        assert_eq!(activity[ACTIVITY_LIMIT - 1].id, "15");
    }

    #[test]
    fn unknown_severity_counts_only_toward_total() {
        // comportamiento heredado del dispositivo real: la severidad desconocida
        // no suma a ningún bucket pero sí al total, y se pinta como info
        let mut alerts = AlertMap::new();
        alerts.insert("10".to_string(), alert("notice"));
        alerts.insert("20".to_string(), alert("critical"));

        let (activity, counts) = reconcile(&alerts, Utc::now());

        assert_eq!(counts.total, 2);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.warning + counts.info, 0);
        let unknown = activity.iter().find(|a| a.id == "10").unwrap();
        assert_eq!(unknown.color, SeverityColor::Blue);
    }

    #[test]
    fn non_numeric_ids_sort_last() {
        let mut alerts = AlertMap::new();
        alerts.insert("abc".to_string(), alert("info"));
        alerts.insert("5".to_string(), alert("info"));

        let (activity, _) = reconcile(&alerts, Utc::now());
        assert_eq!(activity[0].id, "5");
        assert_eq!(activity[1].id, "abc");
    }
}
