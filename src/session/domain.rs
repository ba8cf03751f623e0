//! Dominio de la sesión del operador.
//!
//! La puerta de sesión compara las credenciales contra el par fijo del panel
//! y persiste un único flag booleano en un archivo marcador, que se lee una
//! sola vez al arrancar para reanudar una sesión abierta. El flag es
//! independiente del estado del dispositivo: cerrar sesión nunca toca los
//! datos del store.


use std::path::PathBuf;


/// Credenciales fijas del panel.
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "password123";

/// Mensaje mostrado (y auto-ocultado) ante credenciales inválidas.
pub const LOGIN_ERROR_MESSAGE: &str = "Invalid username or password. Try admin/password123";


/// Verifica las credenciales contra el par fijo.
pub fn verify_credentials(username: &str, password: &str) -> bool {
    username.trim() == USERNAME && password.trim() == PASSWORD
}


/// Persistencia del flag de sesión iniciada.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}


impl SessionStore {

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lee el flag persistido. Se consulta una vez al arrancar.
    pub async fn is_logged_in(&self) -> bool {
        matches!(tokio::fs::try_exists(&self.path).await, Ok(true))
    }

    /// Marca la sesión como iniciada.
    pub async fn persist(&self) -> std::io::Result<()> {
        tokio::fs::write(&self.path, b"true").await
    }

    /// Limpia el flag. Es idempotente: limpiar una sesión ya cerrada no falla.
    pub async fn clear(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_fixed_pair_passes() {
        assert!(verify_credentials("admin", "password123"));
        assert!(verify_credentials("  admin  ", " password123 "));
        assert!(!verify_credentials("admin", "password"));
        assert!(!verify_credentials("root", "password123"));
        assert!(!verify_credentials("", ""));
    }

    #[tokio::test]
    async fn flag_roundtrip_and_idempotent_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session"));

        assert!(!store.is_logged_in().await);

        store.persist().await.unwrap();
        assert!(store.is_logged_in().await);

        store.clear().await.unwrap();
        assert!(!store.is_logged_in().await);

        // limpiar de nuevo no falla aunque el flag ya no exista
        store.clear().await.unwrap();
    }
}
