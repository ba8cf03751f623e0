//! Lógica del enlace con el store de datos en tiempo real.
//!
//! Implementa la máquina de estados de conexión del panel:
//! `connecting → online`, `online → offline` (error de suscripción),
//! `offline → connecting` (reintento). Los reintentos automáticos crecen
//! linealmente (`intentos × base`) hasta agotar el presupuesto; a partir de
//! ahí solo el reintento manual del operador reanuda el ciclo. No hay estado
//! terminal: el enlace siempre puede volver a intentar.


use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};
use crate::backend::domain::{ConnectionState, LinkCommand, RetryPolicy, StoreEvent, Subscription};
use crate::context::domain::AppContext;
use crate::state::domain::StateEvent;
use crate::system::domain::backend_const::{EVENT_BUFFER, MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE};


pub async fn link_task(tx: mpsc::Sender<StateEvent>,
                       mut rx_ctrl: mpsc::Receiver<LinkCommand>,
                       ctx: AppContext) {

    let Some(store) = ctx.store.clone() else {
        warn!("Warning: tarea de enlace iniciada sin store configurado");
        return;
    };

    let mut state = ConnectionState::Connecting;
    let mut retry = RetryPolicy::new(MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE);
    let mut subscriptions: Vec<Subscription> = Vec::new();
    let mut inbound: Option<mpsc::Receiver<StoreEvent>> = None;
    let mut last_error = String::new();

    loop {
        match state {
            ConnectionState::Connecting => {
                // limpiar recursos de un ciclo anterior
                detach_all(&mut subscriptions);
                inbound = None;

                notify(&tx, StateEvent::Connection(ConnectionState::Connecting)).await;

                // la siembra inicial también verifica que el store sea alcanzable
                match store.seed_initial_data().await {
                    Ok(()) => {
                        let (ev_tx, ev_rx) = mpsc::channel::<StoreEvent>(EVENT_BUFFER);
                        subscriptions.push(store.subscribe_fence(ev_tx.clone()));
                        subscriptions.push(store.subscribe_alerts(ev_tx));
                        inbound = Some(ev_rx);

                        retry.reset();
                        info!("Info: enlace con el store establecido");
                        notify(&tx, StateEvent::Connection(ConnectionState::Online)).await;
                        state = ConnectionState::Online;
                    }
                    Err(e) => {
                        error!("Error: no se pudo conectar con el store: {}", e);
                        last_error = e.to_string();
                        state = ConnectionState::Offline;
                    }
                }
            }

            ConnectionState::Online => {
                if let Some(events) = inbound.as_mut() {
                    tokio::select! {
                        event = events.recv() => {   // Datos del store (Downstream)
                            match event {
                                Some(StoreEvent::FencePut(delta)) => {
                                    notify(&tx, StateEvent::FenceDelta(delta)).await;
                                }
                                Some(StoreEvent::AlertsSnapshot(alerts)) => {
                                    notify(&tx, StateEvent::AlertsReplaced(alerts)).await;
                                }
                                Some(StoreEvent::Closed(reason)) => {
                                    error!("Error: suscripción cerrada: {}", reason);
                                    last_error = reason;
                                    state = ConnectionState::Offline;
                                }
                                None => {
                                    warn!("Warning: canal de eventos cerrado");
                                    last_error = "event channel closed".to_string();
                                    state = ConnectionState::Offline;
                                }
                            }
                        }

                        command = rx_ctrl.recv() => {   // Control del operador
                            match command {
                                Some(LinkCommand::Retry) => {
                                    info!("Info: reintento manual, reconectando enlace");
                                    retry.reset();
                                    state = ConnectionState::Connecting;
                                }
                                Some(LinkCommand::Shutdown) | None => {
                                    info!("Info: apagando tarea de enlace");
                                    detach_all(&mut subscriptions);
                                    return;
                                }
                            }
                        }
                    }
                } else {
                    warn!("Warning: estado online sin suscripciones válidas, reiniciando...");
                    state = ConnectionState::Connecting;
                }
            }

            ConnectionState::Offline => {
                notify(&tx, StateEvent::Connection(ConnectionState::Offline)).await;
                detach_all(&mut subscriptions);
                inbound = None;

                match retry.next_delay() {
                    Some(delay) => {
                        info!("Info: reintentando conexión ({}/{}) en {:?}",
                              retry.attempts(), retry.max_attempts(), delay);
                        tokio::select! {
                            _ = sleep(delay) => state = ConnectionState::Connecting,
                            command = rx_ctrl.recv() => {
                                match command {
                                    Some(LinkCommand::Retry) => {
                                        retry.reset();
                                        state = ConnectionState::Connecting;
                                    }
                                    Some(LinkCommand::Shutdown) | None => return,
                                }
                            }
                        }
                    }
                    None => {
                        error!("Error: se agotaron los reintentos automáticos del enlace");
                        notify(&tx, StateEvent::ConnectionFailed(
                            format!("Store connection failed: {}", last_error),
                        )).await;

                        // solo el operador puede reanudar el ciclo
                        match rx_ctrl.recv().await {
                            Some(LinkCommand::Retry) => {
                                retry.reset();
                                state = ConnectionState::Connecting;
                            }
                            Some(LinkCommand::Shutdown) | None => return,
                        }
                    }
                }
            }
        }
    }
}


async fn notify(tx: &mpsc::Sender<StateEvent>, event: StateEvent) {
    if tx.send(event).await.is_err() {
        error!("Error: no se pudo enviar el evento a la tarea de estado");
    }
}


fn detach_all(subscriptions: &mut Vec<Subscription>) {
    for subscription in subscriptions.drain(..) {
        subscription.detach();
    }
}


/// Inicializa y ejecuta la tarea de enlace en segundo plano (tokio task).
///
/// # Argumentos
/// * `tx_to_state`: Canal hacia la tarea de estado.
/// * `rx_ctrl`: Canal de control (reintento manual, apagado).
/// * `ctx`: Contexto de la aplicación.
pub fn start_link(tx_to_state: mpsc::Sender<StateEvent>,
                  rx_ctrl: mpsc::Receiver<LinkCommand>,
                  ctx: AppContext) -> JoinHandle<()> {

    info!("Info: iniciando tarea de enlace");
    tokio::spawn(async move {
        link_task(tx_to_state,
                  rx_ctrl,
                  ctx).await;
    })
}
