//! Dominio de los comandos de control del dispositivo.
//!
//! Define el conjunto cerrado de comandos que acepta el panel y la tabla fija
//! que asigna a cada comando su registro de actividad (tipo, mensaje y
//! severidad).


use thiserror::Error;
use crate::backend::domain::StoreError;
use crate::fence::domain::AlertRecord;


/// Comandos de control reconocidos por el despachador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    EnergizerCommand,
    EmergencyStop,
    TestMode,
    SystemReset,
    EnergizerStatus,
    DeviceOnline,
}


impl CommandName {

    /// Nombre de la columna bajo `fence_control` donde se escribe el valor.
    pub fn as_field(&self) -> &'static str {
        match self {
            CommandName::EnergizerCommand => "energizer_command",
            CommandName::EmergencyStop => "emergency_stop",
            CommandName::TestMode => "test_mode",
            CommandName::SystemReset => "system_reset",
            CommandName::EnergizerStatus => "energizer_status",
            CommandName::DeviceOnline => "device_online",
        }
    }

    /// Registro de actividad asociado al comando, según la tabla fija.
    ///
    /// # Retorno
    /// * `Some(registro)` para los comandos visibles en el feed.
    /// * `None` para las escrituras de estado puras (`energizer_status`,
    ///   `device_online`), que no dejan actividad.
    pub fn activity(&self, value: bool, timestamp: String) -> Option<AlertRecord> {
        let (kind, message, severity) = match self {
            CommandName::EnergizerCommand => (
                if value { "System Armed" } else { "System Disarmed" }.to_string(),
                format!(
                    "Electric fence system {} remotely",
                    if value { "activated" } else { "deactivated" },
                ),
                "info",
            ),
            CommandName::EmergencyStop => (
                "Emergency Stop".to_string(),
                "Emergency stop activated by operator".to_string(),
                "critical",
            ),
            CommandName::TestMode => (
                "Test Mode".to_string(),
                "System entered test mode for maintenance".to_string(),
                "warning",
            ),
            CommandName::SystemReset => (
                "System Reset".to_string(),
                "System reset completed successfully".to_string(),
                "info",
            ),
            CommandName::EnergizerStatus | CommandName::DeviceOnline => return None,
        };

        Some(AlertRecord {
            kind,
            message,
            timestamp,
            severity: severity.to_string(),
        })
    }
}


/// Errores del despachador de comandos.
///
/// Se propagan al llamador: la interfaz es responsable de revertir el estado
/// optimista y de mostrar el aviso correspondiente.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("fallo de escritura en el store: {0}")]
    Store(#[from] StoreError),

    #[error("la tarea de estado no está disponible")]
    StateUnavailable,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energizer_command_maps_to_armed_or_disarmed() {
        let armed = CommandName::EnergizerCommand.activity(true, "t".to_string()).unwrap();
        assert_eq!(armed.kind, "System Armed");
        assert_eq!(armed.message, "Electric fence system activated remotely");
        assert_eq!(armed.severity, "info");

        let disarmed = CommandName::EnergizerCommand.activity(false, "t".to_string()).unwrap();
        assert_eq!(disarmed.kind, "System Disarmed");
        assert_eq!(disarmed.message, "Electric fence system deactivated remotely");
    }

    #[test]
    fn fixed_table_covers_the_remaining_commands() {
        let stop = CommandName::EmergencyStop.activity(true, "t".to_string()).unwrap();
        assert_eq!(stop.severity, "critical");

        let test = CommandName::TestMode.activity(true, "t".to_string()).unwrap();
        assert_eq!(test.severity, "warning");

        let reset = CommandName::SystemReset.activity(true, "t".to_string()).unwrap();
        assert_eq!(reset.severity, "info");

        assert!(CommandName::EnergizerStatus.activity(true, "t".to_string()).is_none());
        assert!(CommandName::DeviceOnline.activity(true, "t".to_string()).is_none());
    }

    #[test]
    fn field_names_match_the_store_columns() {
        assert_eq!(CommandName::EnergizerCommand.as_field(), "energizer_command");
        assert_eq!(CommandName::EnergizerStatus.as_field(), "energizer_status");
        assert_eq!(CommandName::DeviceOnline.as_field(), "device_online");
    }
}
