use crate::channels::domain::Channels;
use crate::command::logic::Dispatcher;
use crate::context::domain::AppContext;
use crate::dashboard::logic::run_dashboard;
use crate::session::domain::SessionStore;
use crate::state::logic::{start_state};
use crate::system::domain::{init_tracing, System};
use tracing::{error, info};

mod backend;
mod channels;
mod command;
mod context;
mod dashboard;
mod fence;
mod session;
mod simulator;
mod state;
mod system;


#[tokio::main]
async fn main() {

    let system = match System::new() {
        Ok(system) => system,
        Err(e) => {
            eprintln!("Error: configuración inválida: {}", e);
            return;
        }
    };
    init_tracing(&system);

    let channels = Channels::new();
    let app_context = match AppContext::new(system) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error: no se pudo crear el cliente del store: {}", e);
            return;
        }
    };

    start_state(channels.state_from_sources,
                channels.state_to_dashboard);

    let dispatcher = Dispatcher::new(app_context.clone(),
                                     channels.sources_to_state.clone());
    let session = SessionStore::new(&app_context.system.session_file);

    if let Err(e) = run_dashboard(app_context,
                                  dispatcher,
                                  channels.sources_to_state,
                                  channels.dashboard_from_state,
                                  session).await {
        error!("Error: el panel terminó con error: {}", e);
    }

    info!("Info: servicio finalizado");
}
