//! Lógica del simulador de datos demo.
//!
//! Cuando no hay store configurado, esta tarea fabrica la telemetría del
//! dispositivo: en cada tick perturba levemente las lecturas eléctricas,
//! refresca `last_update` y, con baja probabilidad y solo si la cerca está
//! energizada, inyecta una alerta de movimiento en un sector pseudoaleatorio.
//!
//! # Ciclo de Vida
//! El bucle se detiene con [`SimCommand::Stop`] o al cerrarse su canal de
//! control: el cierre de sesión no deja timers vivos.


use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, instrument};
use crate::backend::domain::ConnectionState;
use crate::context::domain::AppContext;
use crate::fence::domain::{AlertRecord, FenceDelta, next_alert_id};
use crate::state::domain::{RenderSnapshot, StateEvent};
use crate::simulator::domain::SimCommand;
use crate::system::domain::simulator_const::{MOTION_PROB, READING_JITTER_PROB, SECTOR_MAX};


/// Ejecuta el bucle principal del simulador.
///
/// # Flujo de Trabajo
/// 1. Declara la conexión online (el modo demo no tiene enlace que esperar)
///    y siembra la alerta de arranque.
/// 2. En cada tick genera un delta de lecturas y, eventualmente, una alerta
///    de movimiento, y los envía a la tarea de estado.
/// 3. Termina al recibir `Stop` o al cerrarse el canal de control.
///
/// # Argumentos
/// * `tx`: Canal hacia la tarea de estado.
/// * `rx_cmd`: Canal de control para detener el bucle.
/// * `render_rx`: Snapshot vigente, para saber si la cerca está energizada.
/// * `ctx`: Configuración global (para leer `demo_tick_secs`).
#[instrument(
    name = "run_simulator_task",
    skip(tx, rx_cmd, render_rx, ctx)
)]
pub async fn run_simulator(tx: mpsc::Sender<StateEvent>,
                           mut rx_cmd: mpsc::Receiver<SimCommand>,
                           render_rx: watch::Receiver<RenderSnapshot>,
                           ctx: AppContext) {

    info!("Info: simulador demo iniciado");

    if tx.send(StateEvent::Connection(ConnectionState::Online)).await.is_err() {
        error!("Error: no se pudo publicar el estado de conexión demo");
        return;
    }
    let seed = AlertRecord::system_online(Utc::now().to_rfc3339());
    if tx.send(StateEvent::AlertAdded { id: next_alert_id(), record: seed }).await.is_err() {
        error!("Error: no se pudo sembrar la alerta inicial demo");
        return;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(ctx.system.demo_tick_secs));
    ticker.tick().await; // el primer tick del interval es inmediato

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let delta = {
                    let mut rng = rand::thread_rng();
                    perturb_readings(&mut rng, Utc::now())
                };
                if tx.send(StateEvent::FenceDelta(delta)).await.is_err() {
                    error!("Error: no se pudo enviar el delta simulado");
                    break;
                }

                let energized = render_rx.borrow().fence.energizer_status;
                let alert = {
                    let mut rng = rand::thread_rng();
                    maybe_motion_alert(&mut rng, energized, Utc::now())
                };
                if let Some(record) = alert {
                    if tx.send(StateEvent::AlertAdded { id: next_alert_id(), record }).await.is_err() {
                        error!("Error: no se pudo enviar la alerta simulada");
                        break;
                    }
                }
            }

            command = rx_cmd.recv() => {
                match command {
                    Some(SimCommand::Stop) | None => break,
                }
            }
        }
    }
    info!("Info: simulador demo detenido");
}


/// Genera el delta de lecturas de un tick.
///
/// Con probabilidad fija perturba corriente y tensión dentro de rangos
/// acotados (redondeadas a un decimal); siempre refresca `last_update`.
pub fn perturb_readings<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> FenceDelta {
    let mut delta = FenceDelta::default();

    if rng.gen_bool(READING_JITTER_PROB) {
        delta.current_reading = Some(round_tenth(2.0 + rng.r#gen::<f64>() * 0.5));
        delta.voltage_reading = Some(round_tenth(12.3 + rng.r#gen::<f64>() * 0.4));
    }
    delta.last_update = Some(now.to_rfc3339());
    delta
}


/// Decide si el tick inyecta una alerta de movimiento.
///
/// Solo puede dispararse con la cerca energizada; el sector afectado se
/// elige al azar entre 1 y [`SECTOR_MAX`].
pub fn maybe_motion_alert<R: Rng>(rng: &mut R, energized: bool, now: DateTime<Utc>) -> Option<AlertRecord> {
    if !energized || !rng.gen_bool(MOTION_PROB) {
        return None;
    }
    let sector = rng.gen_range(1..=SECTOR_MAX);
    Some(AlertRecord {
        kind: "Motion Detected".to_string(),
        message: format!("Motion detected at sector {}", sector),
        timestamp: now.to_rfc3339(),
        severity: "warning".to_string(),
    })
}


fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}


/// Inicializa y ejecuta la tarea del simulador en segundo plano (tokio task).
pub fn start_simulator(tx_to_state: mpsc::Sender<StateEvent>,
                       rx_cmd: mpsc::Receiver<SimCommand>,
                       render_rx: watch::Receiver<RenderSnapshot>,
                       ctx: AppContext) -> JoinHandle<()> {

    info!("Info: iniciando tarea del simulador");
    tokio::spawn(async move {
        run_simulator(tx_to_state,
                      rx_cmd,
                      render_rx,
                      ctx).await;
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn perturbed_readings_stay_inside_their_ranges() {
        let now = Utc::now();
        let mut jittered = 0;

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let delta = perturb_readings(&mut rng, now);

            assert!(delta.last_update.is_some());
            match (delta.current_reading, delta.voltage_reading) {
                (Some(current), Some(voltage)) => {
                    jittered += 1;
                    assert!((2.0..=2.5).contains(&current));
                    assert!((12.3..=12.7).contains(&voltage));
                    // un solo decimal
                    assert!((current * 10.0 - (current * 10.0).round()).abs() < 1e-9);
                    assert!((voltage * 10.0 - (voltage * 10.0).round()).abs() < 1e-9);
                }
                (None, None) => {}
                other => panic!("perturbación incompleta: {:?}", other),
            }
        }
        // con probabilidad 0.3 sobre 200 muestras tiene que haber de ambos
        assert!(jittered > 0 && jittered < 200);
    }

    #[test]
    fn motion_alerts_require_an_energized_fence() {
        let now = Utc::now();
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert!(maybe_motion_alert(&mut rng, false, now).is_none());
        }
    }

    #[test]
    fn motion_alerts_reference_a_valid_sector() {
        let now = Utc::now();
        let mut fired = 0;

        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            if let Some(record) = maybe_motion_alert(&mut rng, true, now) {
                fired += 1;
                assert_eq!(record.kind, "Motion Detected");
                assert_eq!(record.severity, "warning");
                let sector: u32 = record.message
                    .rsplit(' ')
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap();
                assert!((1..=SECTOR_MAX).contains(&sector));
            }
        }
        assert!(fired > 0);
    }
}
