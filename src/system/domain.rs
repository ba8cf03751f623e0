//! Módulo de configuración central y gestión del entorno de ejecución.
//!
//! Este módulo actúa como la fuente única de verdad para la configuración de la aplicación.
//! Se encarga de leer las variables de entorno, establecer valores por defecto seguros
//! y proveer las estructuras necesarias para iniciar los subsistemas (Store remoto,
//! Simulador, Panel, Logging).
//!
//! # Funcionalidades Principales
//! * **Carga de Configuración:** Lee de `.env` en desarrollo y variables de sistema en producción.
//! * **Observabilidad:** Configura `tracing_subscriber` para logs estructurados o legibles.
//! * **Constantes Operativas:** Define tiempos de reconexión, períodos del simulador y
//!   parámetros del panel.
//!


use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};


/// Representa la configuración global del sistema y el estado del entorno.
///
/// Esta estructura centraliza todas las variables de entorno y configuraciones
/// necesarias para iniciar los servicios (Store remoto, Sesión, Logging).
///
#[derive(Debug)]
pub struct System {
    /// URL base del store de datos en tiempo real (ej. `https://panel.example.com/db`).
    /// Si no está definida, el servicio arranca en **modo demo** con datos simulados.
    pub store_url: Option<String>,

    /// Ruta del archivo que persiste el flag de sesión iniciada.
    /// Por defecto: `.fence_session`.
    pub session_file: String,

    /// Nombre del operador mostrado en el encabezado del panel.
    /// Por defecto: `Amaan01`.
    pub operator_name: String,

    /// Período en segundos del tick del simulador de datos demo.
    /// Por defecto: `5` segundos.
    pub demo_tick_secs: u64,

    /// Entorno de ejecución actual (`development`, `staging`, `production`).
    /// Afecta el formato de logs y la carga de archivos `.env`.
    pub environment: String,

    /// Nivel de detalle de los logs (ej. `info`, `debug`, `warn`).
    /// Se autoconfigura según el `environment` si no se especifica.
    pub rust_log: String,
}


impl System {

    /// Carga la configuración desde las variables de entorno.
    ///
    /// # Comportamiento
    /// * Si `ENVIRONMENT` es "development", intenta cargar un archivo `.env`.
    /// * `STORE_URL` es opcional: su ausencia selecciona el modo demo.
    /// * Establece valores por defecto para las variables opcionales.
    ///
    /// # Panics
    /// * Si `DEMO_TICK_SECS` no es un número válido.
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {

        info!("Info: creando objeto system");

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".into());

        if environment == "development" {
            dotenv::dotenv().ok();
        }

        Ok(System {
            store_url: env::var("STORE_URL").ok()
                .filter(|url| !url.trim().is_empty()),

            session_file: env::var("SESSION_FILE")
                .unwrap_or(".fence_session".to_string()),

            operator_name: env::var("OPERATOR_NAME")
                .unwrap_or("Amaan01".to_string()),

            demo_tick_secs: env::var("DEMO_TICK_SECS")
                .unwrap_or("5".to_string())
                .parse()
                .expect("DEMO_TICK_SECS debe ser un número"),

            rust_log: env::var("RUST_LOG")
                .unwrap_or_else(|_| {
                    match environment.as_str() {
                        "development" => "debug".to_string(),
                        "staging" => "info".to_string(),
                        _ => "warn".to_string(),
                    }
                }),

            environment,
        })
    }
}


/// Inicializa el sistema de trazabilidad y logs (Tracing).
///
/// Configura el formato de salida basándose en el entorno:
/// * **Production**: Salida JSON (para logs estructurados en la nube).
/// * **Development/Otros**: Salida "Pretty" (colores y formato legible).
///
/// # Argumentos
/// * `system`: Referencia a la configuración cargada para leer el nivel de log (`rust_log`).
pub fn init_tracing(system: &System) {

    let filter = EnvFilter::try_new(&system.rust_log)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(false);

    if system.environment == "production" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}


/// Constantes de configuración para el enlace con el store remoto.
pub mod backend_const {
    use tokio::time::Duration;
    pub const RECONNECT_BASE: Duration = Duration::from_secs(2);
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    pub const EVENT_BUFFER: usize = 100;
}


/// Constantes de configuración para el simulador de datos demo.
pub mod simulator_const {
    pub const READING_JITTER_PROB: f64 = 0.3;
    pub const MOTION_PROB: f64 = 0.05;
    pub const SECTOR_MAX: u32 = 5;
}


/// Constantes de configuración para el panel de control.
pub mod dashboard_const {
    use tokio::time::Duration;
    pub const TICK: Duration = Duration::from_millis(100);
    pub const NOTICE_VISIBLE: Duration = Duration::from_secs(5);
    pub const ACTIVITY_LIMIT: usize = 10;
    pub const SNAPSHOT_REFRESH: Duration = Duration::from_secs(1);
}
