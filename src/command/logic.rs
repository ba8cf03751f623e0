//! Lógica de despacho de comandos.
//!
//! El despachador escribe el valor del comando en el store remoto (o lo
//! fusiona en el estado local en modo demo), refresca `last_update` y deja
//! el registro de actividad que indica la tabla fija del dominio. Los errores
//! de escritura se propagan al llamador, que es quien decide el rollback de
//! la interfaz.


use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, info};
use crate::command::domain::{CommandError, CommandName};
use crate::context::domain::AppContext;
use crate::fence::domain::{FenceDelta, next_alert_id};
use crate::state::domain::StateEvent;


#[derive(Clone)]
pub struct Dispatcher {
    ctx: AppContext,
    tx_state: mpsc::Sender<StateEvent>,
}


impl Dispatcher {

    pub fn new(ctx: AppContext, tx_state: mpsc::Sender<StateEvent>) -> Self {
        Self { ctx, tx_state }
    }

    /// Despacha un comando de control.
    ///
    /// En modo conectado escribe el campo y `last_update` como dos
    /// operaciones independientes sin orden garantizado entre sí; en modo
    /// demo fusiona ambos campos sobre el estado local. En cualquier caso,
    /// un despacho exitoso deja su registro de actividad.
    pub async fn send_command(&self, command: CommandName, value: bool) -> Result<(), CommandError> {

        info!("Info: enviando comando {} = {}", command.as_field(), value);
        let now = Utc::now().to_rfc3339();

        match &self.ctx.store {
            Some(store) => {
                let bool_value = Value::Bool(value);
                let string_value = Value::String(now);
                let write = store.put_field(command.as_field(), &bool_value);
                let stamp = store.put_field("last_update", &string_value);
                let (write, stamp) = tokio::join!(write, stamp);
                write?;
                stamp?;
            }
            None => {
                let mut delta = FenceDelta::default();
                delta.set_bool_field(command.as_field(), value);
                delta.last_update = Some(now);
                self.tx_state
                    .send(StateEvent::FenceDelta(delta))
                    .await
                    .map_err(|_| CommandError::StateUnavailable)?;
            }
        }

        self.log_activity(command, value).await;
        Ok(())
    }

    /// Registra la actividad de un comando según la tabla fija.
    ///
    /// Dos despachos iguales dejan dos registros independientes: nunca se
    /// deduplica. Un fallo al registrar no interrumpe el flujo del comando.
    pub async fn log_activity(&self, command: CommandName, value: bool) {

        let Some(record) = command.activity(value, Utc::now().to_rfc3339()) else {
            return;
        };
        let id = next_alert_id();

        match &self.ctx.store {
            Some(store) => {
                if let Err(e) = store.put_alert(&id, &record).await {
                    error!("Error: no se pudo registrar la actividad: {}", e);
                }
            }
            None => {
                if self.tx_state.send(StateEvent::AlertAdded { id, record }).await.is_err() {
                    error!("Error: no se pudo enviar la alerta de actividad");
                }
            }
        }
    }

    /// Aplica un delta local tras un comando confirmado (estado optimista).
    pub async fn apply_local(&self, delta: FenceDelta) {
        if self.tx_state.send(StateEvent::FenceDelta(delta)).await.is_err() {
            error!("Error: no se pudo aplicar el estado optimista");
        }
    }
}
