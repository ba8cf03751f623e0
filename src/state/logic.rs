use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use crate::state::domain::{AppData, RenderSnapshot, StateEvent};
use crate::system::domain::dashboard_const::SNAPSHOT_REFRESH;


/// Tarea propietaria del estado de la aplicación.
///
/// Es el único punto del sistema que muta `AppData`: recibe eventos del
/// enlace, del simulador, del despachador y de la puerta de sesión, y después
/// de cada mutación publica un snapshot fresco por el canal `watch`. Un tick
/// periódico vuelve a publicar para refrescar los tiempos relativos del feed.
pub async fn state_task(mut rx: mpsc::Receiver<StateEvent>,
                        render_tx: watch::Sender<RenderSnapshot>) {

    info!("Info: tarea de estado creada");

    let mut data = AppData::new();
    let mut refresh = tokio::time::interval(SNAPSHOT_REFRESH);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        data.apply(event);
                        if render_tx.send(data.snapshot(Utc::now())).is_err() {
                            break; // el panel ya no existe
                        }
                    }
                    None => break, // canal cerrado, terminar tarea
                }
            }

            _ = refresh.tick() => {
                if render_tx.send(data.snapshot(Utc::now())).is_err() {
                    break;
                }
            }
        }
    }
    info!("Info: tarea de estado finalizada");
}


/// Inicializa y ejecuta la tarea de estado en segundo plano (tokio task).
pub fn start_state(rx_from_sources: mpsc::Receiver<StateEvent>,
                   render_tx: watch::Sender<RenderSnapshot>) {

    info!("Info: iniciando tarea de estado");
    tokio::spawn(async move {
        state_task(rx_from_sources, render_tx).await;
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::ConnectionState;
    use crate::fence::domain::FenceDelta;

    async fn wait_until<F>(rx: &mut watch::Receiver<RenderSnapshot>, predicate: F)
    where
        F: Fn(&RenderSnapshot) -> bool,
    {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !predicate(&rx.borrow_and_update()) {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("el snapshot esperado nunca se publicó");
    }

    #[tokio::test]
    async fn every_event_publishes_a_fresh_snapshot() {
        let (tx, rx) = mpsc::channel(10);
        let (render_tx, mut render_rx) = watch::channel(RenderSnapshot::initial());
        tokio::spawn(state_task(rx, render_tx));

        tx.send(StateEvent::Connection(ConnectionState::Online)).await.unwrap();
        wait_until(&mut render_rx, |s| s.connection == ConnectionState::Online).await;

        tx.send(StateEvent::FenceDelta(FenceDelta {
            battery_level: Some(12.0),
            ..FenceDelta::default()
        })).await.unwrap();
        wait_until(&mut render_rx, |s| s.fence.battery_level == 12.0).await;
    }
}
