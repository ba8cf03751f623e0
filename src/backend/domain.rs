//! Dominio del enlace con el store de datos en tiempo real.
//!
//! Define el estado de conexión observable por el panel, los errores del
//! borde HTTP, los eventos que producen las suscripciones y la política de
//! reintentos acotados.


use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use crate::fence::domain::{AlertMap, FenceDelta};


/// Estado de la conexión con el store remoto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Online,
    Offline,
}


/// Errores del borde con el store remoto.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("error de transporte HTTP: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("respuesta inesperada del store: {0}")]
    Status(reqwest::StatusCode),

    #[error("payload malformado: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("stream de eventos cerrado por el servidor")]
    StreamClosed,
}


/// Eventos ya decodificados que emiten las suscripciones hacia la tarea de enlace.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Snapshot parcial o total de `fence_control`: se fusiona campo a campo.
    FencePut(FenceDelta),
    /// Snapshot de `alerts`: reemplaza la colección completa (puede achicarla).
    AlertsSnapshot(AlertMap),
    /// La suscripción terminó con error; el enlace pasa a offline.
    Closed(String),
}


/// Comandos de control para la tarea de enlace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCommand {
    /// Reintento manual solicitado por el operador: resetea el contador.
    Retry,
    /// Apagado ordenado al cerrar la sesión.
    Shutdown,
}


/// Handle cancelable de una suscripción activa al store.
///
/// Se almacena para poder desprender el listener explícitamente al perder
/// la conexión o al cerrar la sesión.
pub struct Subscription {
    handle: JoinHandle<()>,
}


impl Subscription {

    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Desprende el listener abortando su tarea.
    pub fn detach(self) {
        self.handle.abort();
    }
}


/// Política de reintentos del enlace: demora lineal `intentos × base`,
/// acotada a un máximo de intentos automáticos.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    attempts: u32,
    max_attempts: u32,
    base: Duration,
}


impl RetryPolicy {

    pub fn new(max_attempts: u32, base: Duration) -> Self {
        Self { attempts: 0, max_attempts, base }
    }

    /// Consume un intento y devuelve la demora antes del próximo reintento.
    ///
    /// # Retorno
    /// * `Some(demora)` mientras queden intentos automáticos.
    /// * `None` cuando el presupuesto se agotó: solo queda el reintento manual.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.base * self.attempts)
    }

    /// Reinicia el contador: al llegar a online o ante un reintento manual.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delays_grow_linearly_and_stop_at_the_cap() {
        let mut policy = RetryPolicy::new(5, Duration::from_secs(2));

        let delays: Vec<Option<Duration>> = (0..6).map(|_| policy.next_delay()).collect();

        assert_eq!(delays[0], Some(Duration::from_secs(2)));
        assert_eq!(delays[1], Some(Duration::from_secs(4)));
        assert_eq!(delays[2], Some(Duration::from_secs(6)));
        assert_eq!(delays[3], Some(Duration::from_secs(8)));
        assert_eq!(delays[4], Some(Duration::from_secs(10)));
        assert_eq!(delays[5], None);
    }

    #[test]
    fn manual_reset_restores_the_budget() {
        let mut policy = RetryPolicy::new(5, Duration::from_secs(2));
        while policy.next_delay().is_some() {}
        assert_eq!(policy.next_delay(), None);

        policy.reset();

        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
    }
}
