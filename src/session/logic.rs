//! Ciclo de vida de las fuentes de datos de la sesión.
//!
//! Al iniciar sesión se levanta exactamente una fuente de datos: el enlace
//! con el store remoto si hay uno configurado, o el simulador demo si no.
//! Al cerrar sesión la fuente se detiene y se espera su finalización, de
//! modo que no quede ninguna tarea mutando estado que ya nadie observa.


use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};
use crate::backend::domain::LinkCommand;
use crate::backend::logic::start_link;
use crate::context::domain::AppContext;
use crate::simulator::domain::SimCommand;
use crate::simulator::logic::start_simulator;
use crate::state::domain::{RenderSnapshot, StateEvent};


/// Fuente de datos viva de una sesión abierta, con apagado explícito.
pub struct SessionRuntime {
    handle: JoinHandle<()>,
    link_ctrl: Option<mpsc::Sender<LinkCommand>>,
    sim_ctrl: Option<mpsc::Sender<SimCommand>>,
}


impl SessionRuntime {

    /// Arranca la fuente de datos que corresponde al modo configurado.
    pub fn start(ctx: AppContext,
                 tx_state: mpsc::Sender<StateEvent>,
                 render_rx: watch::Receiver<RenderSnapshot>) -> Self {

        if ctx.demo_mode() {
            info!("Info: sesión en modo demo");
            let (sim_tx, sim_rx) = mpsc::channel::<SimCommand>(4);
            let handle = start_simulator(tx_state, sim_rx, render_rx, ctx);
            Self { handle, link_ctrl: None, sim_ctrl: Some(sim_tx) }
        } else {
            info!("Info: sesión con store remoto");
            let (ctrl_tx, ctrl_rx) = mpsc::channel::<LinkCommand>(4);
            let handle = start_link(tx_state, ctrl_rx, ctx);
            Self { handle, link_ctrl: Some(ctrl_tx), sim_ctrl: None }
        }
    }

    /// Reintento manual del enlace. En modo demo no hay nada que reintentar.
    pub async fn retry(&self) {
        if let Some(tx) = &self.link_ctrl {
            if tx.send(LinkCommand::Retry).await.is_err() {
                error!("Error: no se pudo enviar el reintento al enlace");
            }
        }
    }

    /// Detiene la fuente de datos y espera su finalización.
    pub async fn stop(self) {
        info!("Info: cerrando la fuente de datos de la sesión");

        if let Some(tx) = &self.sim_ctrl {
            let _ = tx.send(SimCommand::Stop).await;
        }
        if let Some(tx) = &self.link_ctrl {
            let _ = tx.send(LinkCommand::Shutdown).await;
        }

        if self.handle.await.is_err() {
            error!("Error: la fuente de datos terminó abruptamente");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use crate::backend::domain::ConnectionState;
    use crate::system::domain::System;

    fn demo_ctx() -> AppContext {
        AppContext {
            store: None,
            system: Arc::new(System {
                store_url: None,
                session_file: ".fence_session_test".to_string(),
                operator_name: "op".to_string(),
                demo_tick_secs: 1,
                environment: "test".to_string(),
                rust_log: "info".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn demo_runtime_starts_online_and_stops_cleanly() {
        let (tx, mut rx) = mpsc::channel(50);
        let (_render_tx, render_rx) = watch::channel(RenderSnapshot::initial());

        let runtime = SessionRuntime::start(demo_ctx(), tx, render_rx);

        // primero declara la conexión online, después siembra la alerta demo
        match rx.recv().await.unwrap() {
            StateEvent::Connection(state) => assert_eq!(state, ConnectionState::Online),
            other => panic!("evento inesperado: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            StateEvent::AlertAdded { record, .. } => assert_eq!(record.kind, "System Online"),
            other => panic!("evento inesperado: {:?}", other),
        }

        // el apagado tiene que completar: ninguna tarea queda viva
        tokio::time::timeout(Duration::from_secs(5), runtime.stop())
            .await
            .expect("la fuente de datos no terminó al cerrar la sesión");
    }
}
