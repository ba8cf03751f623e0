use tokio::sync::{mpsc, watch};
use crate::state::domain::{RenderSnapshot, StateEvent};


pub struct Channels {
    pub sources_to_state: mpsc::Sender<StateEvent>,
    pub state_from_sources: mpsc::Receiver<StateEvent>,

    pub state_to_dashboard: watch::Sender<RenderSnapshot>,
    pub dashboard_from_state: watch::Receiver<RenderSnapshot>,
}


impl Channels {
    pub fn new() -> Channels {
        let (src_to_st, st_from_src) = mpsc::channel::<StateEvent>(200);
        let (st_to_db, db_from_st) = watch::channel(RenderSnapshot::initial());

        Self {
            sources_to_state: src_to_st,
            state_from_sources: st_from_src,
            state_to_dashboard: st_to_db,
            dashboard_from_state: db_from_st,
        }
    }
}
