//! Dominio de la cerca eléctrica y Modelos de Datos.
//!
//! Este módulo define las estructuras de datos fundamentales que se intercambian
//! entre los distintos componentes del sistema: el estado del energizador, las
//! alertas y sus proyecciones derivadas para el panel.
//!


use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};


/// Estado operativo completo del dispositivo de cerca eléctrica.
///
/// Existe una única instancia compartida durante toda la sesión del panel.
/// Se muta por snapshots del store remoto o por el despachador de comandos,
/// siempre campo a campo; nunca se destruye.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FenceState {
    pub energizer_status: bool,
    pub energizer_command: bool,
    pub current_reading: f64,
    pub voltage_reading: f64,
    pub battery_level: f64,
    pub motion_detected: bool,
    pub device_online: bool,
    pub last_update: String,
    pub signal_strength: String,
}


impl FenceState {

    /// Estado inicial del dispositivo al arrancar una sesión.
    pub fn initial() -> Self {
        Self {
            energizer_status: true,
            energizer_command: false,
            current_reading: 2.2,
            voltage_reading: 12.5,
            battery_level: 86.99,
            motion_detected: false,
            device_online: true,
            last_update: Utc::now().to_rfc3339(),
            signal_strength: "4/5".to_string(),
        }
    }
}


/// Actualización parcial del estado de la cerca.
///
/// Espejo campo a campo de [`FenceState`] con todos los campos opcionales.
/// Es la forma en la que viajan tanto los snapshots del store remoto como
/// las mutaciones locales: aplicar un delta fusiona campo por campo sobre
/// el estado previo, y los campos ausentes o malformados se descartan en
/// el borde (fail closed).
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FenceDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energizer_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energizer_command: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_reading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_reading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_detected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<String>,
}


impl FenceDelta {

    /// Construye un delta desde un valor JSON dinámico, campo por campo.
    ///
    /// Los campos desconocidos o con tipo incorrecto se ignoran en lugar de
    /// invalidar el delta completo.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut delta = FenceDelta::default();
        let Some(object) = value.as_object() else {
            return delta;
        };
        for (key, field) in object {
            match key.as_str() {
                "energizer_status" => delta.energizer_status = field.as_bool(),
                "energizer_command" => delta.energizer_command = field.as_bool(),
                "current_reading" => delta.current_reading = field.as_f64(),
                "voltage_reading" => delta.voltage_reading = field.as_f64(),
                "battery_level" => delta.battery_level = field.as_f64(),
                "motion_detected" => delta.motion_detected = field.as_bool(),
                "device_online" => delta.device_online = field.as_bool(),
                "last_update" => delta.last_update = field.as_str().map(str::to_string),
                "signal_strength" => delta.signal_strength = field.as_str().map(str::to_string),
                _ => {}
            }
        }
        delta
    }

    /// Asigna un campo booleano identificado por su nombre de columna en el store.
    ///
    /// Los nombres que no corresponden a un campo booleano del estado se ignoran.
    pub fn set_bool_field(&mut self, field: &str, value: bool) {
        match field {
            "energizer_status" => self.energizer_status = Some(value),
            "energizer_command" => self.energizer_command = Some(value),
            "motion_detected" => self.motion_detected = Some(value),
            "device_online" => self.device_online = Some(value),
            _ => {}
        }
    }

    /// Fusiona el delta sobre el estado previo, campo por campo.
    pub fn apply(&self, state: &mut FenceState) {
        if let Some(v) = self.energizer_status { state.energizer_status = v; }
        if let Some(v) = self.energizer_command { state.energizer_command = v; }
        if let Some(v) = self.current_reading { state.current_reading = v; }
        if let Some(v) = self.voltage_reading { state.voltage_reading = v; }
        if let Some(v) = self.battery_level { state.battery_level = v; }
        if let Some(v) = self.motion_detected { state.motion_detected = v; }
        if let Some(v) = self.device_online { state.device_online = v; }
        if let Some(v) = &self.last_update { state.last_update = v.clone(); }
        if let Some(v) = &self.signal_strength { state.signal_strength = v.clone(); }
    }
}


/// Registro de alerta o actividad del sistema.
///
/// Las alertas se indexan por un identificador derivado del timestamp en
/// milisegundos. Una colisión de identificadores sobreescribe el registro
/// previo en el store; el reconciliador nunca deduplica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: String,
    pub severity: String,
}


impl AlertRecord {

    /// Alerta inicial que marca el arranque del sistema.
    pub fn system_online(timestamp: String) -> Self {
        Self {
            kind: "System Online".to_string(),
            message: "Electric fence system activated successfully".to_string(),
            timestamp,
            severity: "info".to_string(),
        }
    }

    /// Construye un registro desde un valor JSON dinámico del store.
    ///
    /// Los campos ausentes quedan vacíos; un valor que no es objeto se descarta.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            kind: text("type"),
            message: text("message"),
            timestamp: text("timestamp"),
            severity: text("severity"),
        })
    }
}


/// Colección completa de alertas, indexada por identificador.
pub type AlertMap = HashMap<String, AlertRecord>;


/// Severidades reconocidas por los contadores del panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}


impl Severity {

    /// Clasifica una etiqueta de severidad del store.
    ///
    /// Devuelve `None` para etiquetas no reconocidas: esas alertas cuentan
    /// en el total pero no en ningún bucket, igual que en el dispositivo real.
    pub fn from_label(label: &str) -> Option<Severity> {
        match label {
            "critical" => Some(Severity::Critical),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}


/// Token de color con el que el panel dibuja cada alerta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityColor {
    Red,
    Yellow,
    Blue,
}


/// Asigna el color de presentación a una etiqueta de severidad.
///
/// Función pura y total: las etiquetas desconocidas reciben el color de `info`.
pub fn severity_color(label: &str) -> SeverityColor {
    match Severity::from_label(label) {
        Some(Severity::Critical) => SeverityColor::Red,
        Some(Severity::Warning) => SeverityColor::Yellow,
        Some(Severity::Info) | None => SeverityColor::Blue,
    }
}


/// Contadores agregados sobre la colección completa de alertas.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AlertCounts {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}


/// Proyección de solo lectura de una alerta para el feed de actividad.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: String,
    pub kind: String,
    pub description: String,
    pub when: String,
    pub severity: String,
    pub color: SeverityColor,
}


/// Formatea un instante RFC 3339 como tiempo relativo legible.
///
/// # Retorno
/// * `"Just now"`, `"N minute(s) ago"`, `"N hour(s) ago"` o `"N day(s) ago"`.
/// * Los timestamps que no se pueden interpretar se tratan como recientes.
pub fn format_relative(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) else {
        return "Just now".to_string();
    };
    let minutes = now.signed_duration_since(parsed.with_timezone(&Utc)).num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{} minute{} ago", minutes, if minutes > 1 { "s" } else { "" })
    } else if hours < 24 {
        format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
    } else {
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    }
}


static LAST_ALERT_ID: AtomicI64 = AtomicI64::new(0);

/// Genera el próximo identificador de alerta, derivado del timestamp en
/// milisegundos y estrictamente creciente dentro del proceso.
pub fn next_alert_id() -> String {
    let now = Utc::now().timestamp_millis();
    let id = LAST_ALERT_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .map(|last| now.max(last + 1))
        .unwrap_or(now);
    id.to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn delta_merge_changes_only_present_fields() {
        let mut state = FenceState::initial();
        let previous = state.clone();

        let delta = FenceDelta { battery_level: Some(50.0), ..FenceDelta::default() };
        delta.apply(&mut state);

        assert_eq!(state.battery_level, 50.0);
        assert_eq!(state.energizer_status, previous.energizer_status);
        assert_eq!(state.current_reading, previous.current_reading);
        assert_eq!(state.last_update, previous.last_update);
    }

    #[test]
    fn delta_from_value_drops_malformed_fields() {
        let value = serde_json::json!({
            "battery_level": 42.5,
            "energizer_status": "not-a-bool",
            "unknown_field": true,
        });

        let delta = FenceDelta::from_value(&value);

        assert_eq!(delta.battery_level, Some(42.5));
        assert_eq!(delta.energizer_status, None);
    }

    #[test]
    fn severity_color_maps_labels() {
        assert_eq!(severity_color("critical"), SeverityColor::Red);
        assert_eq!(severity_color("warning"), SeverityColor::Yellow);
        assert_eq!(severity_color("info"), SeverityColor::Blue);
        assert_eq!(severity_color("whatever"), SeverityColor::Blue);
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc::now();
        let stamp = |delta: Duration| (now - delta).to_rfc3339();

        assert_eq!(format_relative(&stamp(Duration::seconds(20)), now), "Just now");
        assert_eq!(format_relative(&stamp(Duration::minutes(1)), now), "1 minute ago");
        assert_eq!(format_relative(&stamp(Duration::minutes(5)), now), "5 minutes ago");
        assert_eq!(format_relative(&stamp(Duration::hours(3)), now), "3 hours ago");
        assert_eq!(format_relative(&stamp(Duration::days(2)), now), "2 days ago");
        assert_eq!(format_relative("garbage", now), "Just now");
    }

    #[test]
    fn alert_ids_are_strictly_increasing() {
        let first: i64 = next_alert_id().parse().unwrap();
        let second: i64 = next_alert_id().parse().unwrap();
        assert!(second > first);
    }

    #[test]
    fn alert_record_from_value_tolerates_missing_fields() {
        let value = serde_json::json!({ "type": "Motion Detected" });
        let record = AlertRecord::from_value(&value).unwrap();

        assert_eq!(record.kind, "Motion Detected");
        assert_eq!(record.severity, "");
        assert!(AlertRecord::from_value(&serde_json::json!("plain")).is_none());
    }
}
