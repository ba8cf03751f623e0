//! Dominio de la interfaz del panel.
//!
//! Estado transitorio de la vista: formulario de login, filtro de alertas,
//! confirmaciones pendientes y avisos con vencimiento. Este estado es local
//! a la terminal y se reinicia por completo al cerrar sesión.


use std::time::Instant;
use crate::system::domain::dashboard_const::NOTICE_VISIBLE;


/// Vista activa de la terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Dashboard,
}


/// Campo con foco en el formulario de login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}


impl LoginField {
    pub fn toggle(self) -> Self {
        match self {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        }
    }
}


/// Filtro de presentación del feed de actividad.
///
/// Es puramente visual: no toca el store ni la colección de alertas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFilter {
    All,
    Critical,
    Warning,
    Info,
}


impl AlertFilter {

    pub fn next(self) -> Self {
        match self {
            AlertFilter::All => AlertFilter::Critical,
            AlertFilter::Critical => AlertFilter::Warning,
            AlertFilter::Warning => AlertFilter::Info,
            AlertFilter::Info => AlertFilter::All,
        }
    }

    pub fn matches(&self, severity: &str) -> bool {
        match self {
            AlertFilter::All => true,
            AlertFilter::Critical => severity == "critical",
            AlertFilter::Warning => severity == "warning",
            AlertFilter::Info => severity == "info",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertFilter::All => "ALL",
            AlertFilter::Critical => "CRITICAL",
            AlertFilter::Warning => "WARNING",
            AlertFilter::Info => "INFO",
        }
    }
}


/// Aviso temporal que se auto-oculta tras un tiempo fijo.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub until: Instant,
}


impl Notice {

    pub fn new(text: impl Into<String>, now: Instant) -> Self {
        Self { text: text.into(), until: now + NOTICE_VISIBLE }
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.until
    }
}


/// Comando destructivo a la espera de confirmación explícita.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirm {
    EmergencyStop,
    TestMode,
    SystemReset,
}


impl PendingConfirm {
    pub fn prompt(&self) -> &'static str {
        match self {
            PendingConfirm::EmergencyStop => {
                "Are you sure you want to activate emergency stop? This will immediately shut down the fence system."
            }
            PendingConfirm::TestMode => {
                "Activate test mode? This will temporarily disable normal operations."
            }
            PendingConfirm::SystemReset => {
                "Are you sure you want to reset the system? This will restart all monitoring services."
            }
        }
    }
}


/// Estado transitorio de la vista.
#[derive(Debug)]
pub struct UiState {
    pub view: View,
    pub username: String,
    pub password: String,
    pub focus: LoginField,
    pub login_error: Option<Notice>,
    pub filter: AlertFilter,
    pub confirm: Option<PendingConfirm>,
    pub notice: Option<Notice>,
}


impl UiState {

    pub fn new(view: View) -> Self {
        Self {
            view,
            username: String::new(),
            password: String::new(),
            focus: LoginField::Username,
            login_error: None,
            filter: AlertFilter::All,
            confirm: None,
            notice: None,
        }
    }

    /// Descarta los avisos vencidos.
    pub fn expire_notices(&mut self, now: Instant) {
        if self.login_error.as_ref().is_some_and(|n| n.expired(now)) {
            self.login_error = None;
        }
        if self.notice.as_ref().is_some_and(|n| n.expired(now)) {
            self.notice = None;
        }
    }

    /// Vuelve al login limpiando todo el estado transitorio, incluidos los
    /// campos del formulario.
    pub fn logout(&mut self) {
        *self = UiState::new(View::Login);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn filter_cycles_through_all_options() {
        let mut filter = AlertFilter::All;
        for _ in 0..4 {
            filter = filter.next();
        }
        assert_eq!(filter, AlertFilter::All);
    }

    #[test]
    fn filter_matches_by_severity_label() {
        assert!(AlertFilter::All.matches("critical"));
        assert!(AlertFilter::All.matches("whatever"));
        assert!(AlertFilter::Critical.matches("critical"));
        assert!(!AlertFilter::Critical.matches("info"));
        // una severidad desconocida solo aparece bajo ALL
        assert!(!AlertFilter::Info.matches("whatever"));
    }

    #[test]
    fn notices_expire_after_their_deadline() {
        let now = Instant::now();
        let mut ui = UiState::new(View::Login);
        ui.login_error = Some(Notice::new("bad", now));

        ui.expire_notices(now);
        assert!(ui.login_error.is_some());

        ui.expire_notices(now + NOTICE_VISIBLE + Duration::from_millis(1));
        assert!(ui.login_error.is_none());
    }

    #[test]
    fn logout_clears_the_form_and_the_transient_state() {
        let mut ui = UiState::new(View::Dashboard);
        ui.username = "admin".to_string();
        ui.password = "secret".to_string();
        ui.filter = AlertFilter::Critical;
        ui.confirm = Some(PendingConfirm::SystemReset);

        ui.logout();

        assert_eq!(ui.view, View::Login);
        assert!(ui.username.is_empty());
        assert!(ui.password.is_empty());
        assert_eq!(ui.filter, AlertFilter::All);
        assert!(ui.confirm.is_none());
    }
}
