//! Definición del Contexto de Aplicación (Shared State).
//!
//! Este módulo implementa el patrón de **Estado Compartido** para aplicaciones asíncronas.
//! El `AppContext` actúa como un contenedor de "Inyección de Dependencias" manual,
//! agrupando los recursos que deben ser accesibles por múltiples tareas concurrentes
//! (Store remoto, Configuración).


use std::sync::Arc;
use crate::backend::domain::StoreError;
use crate::backend::repository::RemoteStore;
use crate::system::domain::System;


#[derive(Clone, Debug)]
pub struct AppContext {
    /// Cliente del store remoto. `None` selecciona el modo demo: los datos
    /// se fabrican localmente y los comandos mutan el estado en memoria.
    pub store: Option<RemoteStore>,
    pub system: Arc<System>,
}


impl AppContext {

    pub fn new(system: System) -> Result<Self, StoreError> {
        let system = Arc::new(system);
        let store = match &system.store_url {
            Some(url) => Some(RemoteStore::new(url)?),
            None => None,
        };
        Ok(Self { store, system })
    }

    pub fn demo_mode(&self) -> bool {
        self.store.is_none()
    }
}
