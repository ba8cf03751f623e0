//! Dominio del estado de la aplicación.
//!
//! Define el objeto de estado único que posee la tarea de estado, los eventos
//! que lo mutan y el snapshot derivado que consume el panel. Todas las
//! mutaciones pasan por [`AppData::apply`]; después de cada una se publica un
//! snapshot nuevo, de modo que el panel nunca muestra datos viejos.


use chrono::{DateTime, Utc};
use crate::backend::domain::ConnectionState;
use crate::fence::domain::{ActivityEntry, AlertCounts, AlertMap, AlertRecord, FenceDelta, FenceState};
use crate::fence::logic::reconcile;


/// Eventos que mutan el estado de la aplicación.
///
/// Los producen el enlace con el store, el simulador demo, el despachador de
/// comandos y la puerta de sesión; los consume únicamente la tarea de estado.
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// Snapshot de `fence_control`: fusiona campo a campo sobre el estado previo.
    FenceDelta(FenceDelta),
    /// Snapshot de `alerts`: reemplaza la colección completa.
    AlertsReplaced(AlertMap),
    /// Alta local de una alerta (modo demo o registro de actividad).
    AlertAdded { id: String, record: AlertRecord },
    /// Cambio de estado de la conexión con el store.
    Connection(ConnectionState),
    /// El enlace agotó los reintentos automáticos: aviso bloqueante.
    ConnectionFailed(String),
    /// El operador descartó el aviso bloqueante.
    FailureDismissed,
    /// Cierre de sesión: restaura el estado transitorio de la vista.
    SessionReset,
}


/// Snapshot inmutable del estado, listo para dibujar.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub fence: FenceState,
    pub activity: Vec<ActivityEntry>,
    pub counts: AlertCounts,
    pub connection: ConnectionState,
    pub failure: Option<String>,
}


impl RenderSnapshot {

    pub fn initial() -> Self {
        Self {
            fence: FenceState::initial(),
            activity: Vec::new(),
            counts: AlertCounts::default(),
            connection: ConnectionState::Connecting,
            failure: None,
        }
    }
}


/// Estado mutable de la aplicación, propiedad exclusiva de la tarea de estado.
#[derive(Debug)]
pub struct AppData {
    pub fence: FenceState,
    pub alerts: AlertMap,
    pub connection: ConnectionState,
    pub failure: Option<String>,
}


impl AppData {

    pub fn new() -> Self {
        Self {
            fence: FenceState::initial(),
            alerts: AlertMap::new(),
            connection: ConnectionState::Connecting,
            failure: None,
        }
    }

    /// Aplica un evento sobre el estado.
    pub fn apply(&mut self, event: StateEvent) {
        match event {
            StateEvent::FenceDelta(delta) => delta.apply(&mut self.fence),
            StateEvent::AlertsReplaced(alerts) => self.alerts = alerts,
            StateEvent::AlertAdded { id, record } => {
                // una colisión de identificador sobreescribe, nunca duplica
                self.alerts.insert(id, record);
            }
            StateEvent::Connection(connection) => {
                self.connection = connection;
                self.failure = None;
            }
            StateEvent::ConnectionFailed(message) => {
                self.connection = ConnectionState::Offline;
                self.failure = Some(message);
            }
            StateEvent::FailureDismissed => self.failure = None,
            StateEvent::SessionReset => *self = AppData::new(),
        }
    }

    /// Deriva el snapshot de presentación reconciliando las alertas.
    pub fn snapshot(&self, now: DateTime<Utc>) -> RenderSnapshot {
        let (activity, counts) = reconcile(&self.alerts, now);
        RenderSnapshot {
            fence: self.fence.clone(),
            activity,
            counts,
            connection: self.connection,
            failure: self.failure.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn record(severity: &str) -> AlertRecord {
        AlertRecord {
            kind: "Test".to_string(),
            message: "m".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            severity: severity.to_string(),
        }
    }

    #[test]
    fn partial_fence_delta_preserves_the_rest_of_the_state() {
        let mut data = AppData::new();
        let before = data.fence.clone();

        data.apply(StateEvent::FenceDelta(FenceDelta {
            battery_level: Some(50.0),
            ..FenceDelta::default()
        }));

        assert_eq!(data.fence.battery_level, 50.0);
        assert_eq!(data.fence.energizer_status, before.energizer_status);
        assert_eq!(data.fence.voltage_reading, before.voltage_reading);
    }

    #[test]
    fn alerts_snapshot_fully_replaces_and_can_shrink() {
        let mut data = AppData::new();
        let mut big = AlertMap::new();
        big.insert("1".to_string(), record("info"));
        big.insert("2".to_string(), record("info"));
        data.apply(StateEvent::AlertsReplaced(big));
        assert_eq!(data.alerts.len(), 2);

        let mut small = AlertMap::new();
        small.insert("3".to_string(), record("critical"));
        data.apply(StateEvent::AlertsReplaced(small));

        assert_eq!(data.alerts.len(), 1);
        assert!(data.alerts.contains_key("3"));
    }

    #[test]
    fn colliding_alert_ids_overwrite() {
        let mut data = AppData::new();
        data.apply(StateEvent::AlertAdded { id: "9".to_string(), record: record("info") });
        data.apply(StateEvent::AlertAdded { id: "9".to_string(), record: record("critical") });

        assert_eq!(data.alerts.len(), 1);
        assert_eq!(data.alerts["9"].severity, "critical");
    }

    #[test]
    fn connection_events_manage_the_blocking_failure() {
        let mut data = AppData::new();
        data.apply(StateEvent::ConnectionFailed("sin red".to_string()));
        assert_eq!(data.connection, ConnectionState::Offline);
        assert!(data.failure.is_some());

        data.apply(StateEvent::Connection(ConnectionState::Connecting));
        assert!(data.failure.is_none());
        assert_eq!(data.connection, ConnectionState::Connecting);
    }

    #[test]
    fn session_reset_restores_the_initial_state() {
        let mut data = AppData::new();
        data.apply(StateEvent::AlertAdded { id: "1".to_string(), record: record("info") });
        data.apply(StateEvent::Connection(ConnectionState::Online));

        data.apply(StateEvent::SessionReset);

        assert!(data.alerts.is_empty());
        assert_eq!(data.connection, ConnectionState::Connecting);
        let snapshot = data.snapshot(Utc::now());
        assert!(snapshot.activity.is_empty());
        assert_eq!(snapshot.counts.total, 0);
    }
}
