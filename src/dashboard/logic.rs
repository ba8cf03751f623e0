//! Lógica del panel de control en terminal.
//!
//! El panel corre en la tarea principal: dibuja el snapshot vigente a una
//! cadencia fija y reacciona al teclado del operador. La proyección es pura:
//! lee el snapshot y lo vuelca sobre los paneles; cualquier panel sin
//! espacio suficiente en pantalla se omite en silencio, nunca falla el
//! dibujo completo.
//!
//! # Teclas
//! * Login: `Tab` cambia de campo, `Enter` envía, `Esc` sale.
//! * Panel: `espacio`/`e` energizador, `x` parada de emergencia, `t` modo
//!   test, `r` reinicio del sistema, `f` filtro de alertas, `q` cierra
//!   sesión, `Ctrl+C` sale.


use std::io::{self, IsTerminal, Stdout};
use std::time::Instant;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use crate::backend::domain::ConnectionState;
use crate::command::domain::CommandName;
use crate::command::logic::Dispatcher;
use crate::context::domain::AppContext;
use crate::dashboard::domain::{
    AlertFilter, LoginField, Notice, PendingConfirm, UiState, View,
};
use crate::fence::domain::{ActivityEntry, FenceDelta, SeverityColor, format_relative};
use crate::session::domain::{LOGIN_ERROR_MESSAGE, SessionStore, verify_credentials};
use crate::session::logic::SessionRuntime;
use crate::state::domain::{RenderSnapshot, StateEvent};
use crate::system::domain::dashboard_const::TICK;


enum DashboardFlow {
    Continue,
    Logout,
}


/// Punto de entrada del panel. Toma la terminal, corre el bucle de eventos
/// y la restaura incluso ante un panic.
pub async fn run_dashboard(ctx: AppContext,
                           dispatcher: Dispatcher,
                           tx_state: mpsc::Sender<StateEvent>,
                           mut render_rx: watch::Receiver<RenderSnapshot>,
                           session: SessionStore) -> io::Result<()> {

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(io::Error::other("el panel necesita una terminal (TTY)"));
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &ctx, &dispatcher, &tx_state, &mut render_rx, &session).await;
    restore_terminal(&mut terminal)?;
    result
}


async fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>,
                    ctx: &AppContext,
                    dispatcher: &Dispatcher,
                    tx_state: &mpsc::Sender<StateEvent>,
                    render_rx: &mut watch::Receiver<RenderSnapshot>,
                    session: &SessionStore) -> io::Result<()> {

    // el flag persistido se lee una sola vez, al arrancar
    let resume = session.is_logged_in().await;
    let mut ui = UiState::new(if resume { View::Dashboard } else { View::Login });
    let mut runtime: Option<SessionRuntime> = None;

    if resume {
        info!("Info: sesión previa encontrada, reanudando panel");
        runtime = Some(SessionRuntime::start(ctx.clone(), tx_state.clone(), render_rx.clone()));
    }

    loop {
        ui.expire_notices(Instant::now());
        let snapshot = render_rx.borrow().clone();
        terminal.draw(|frame| render(frame, &ui, &snapshot, ctx))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            break;
        }

        match ui.view {
            View::Login => {
                if key.code == KeyCode::Esc {
                    break;
                }
                if handle_login_key(key.code, &mut ui, session).await {
                    runtime = Some(SessionRuntime::start(
                        ctx.clone(),
                        tx_state.clone(),
                        render_rx.clone(),
                    ));
                }
            }
            View::Dashboard => {
                let flow = handle_dashboard_key(
                    key.code, &mut ui, &snapshot, dispatcher, tx_state, runtime.as_ref(),
                ).await;

                if let DashboardFlow::Logout = flow {
                    info!("Info: cierre de sesión solicitado");
                    if let Some(active) = runtime.take() {
                        active.stop().await;
                    }
                    if let Err(e) = session.clear().await {
                        error!("Error: no se pudo limpiar el flag de sesión: {}", e);
                    }
                    if tx_state.send(StateEvent::SessionReset).await.is_err() {
                        error!("Error: no se pudo reiniciar el estado de la vista");
                    }
                    ui.logout();
                }
            }
        }
    }

    // al salir del proceso tampoco queda nada corriendo
    if let Some(active) = runtime.take() {
        active.stop().await;
    }
    Ok(())
}


/// Procesa una tecla en la vista de login.
///
/// # Retorno
/// * `true` si las credenciales fueron aceptadas y hay que levantar la sesión.
async fn handle_login_key(code: KeyCode, ui: &mut UiState, session: &SessionStore) -> bool {
    match code {
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => ui.focus = ui.focus.toggle(),
        KeyCode::Char(c) => match ui.focus {
            LoginField::Username => ui.username.push(c),
            LoginField::Password => ui.password.push(c),
        },
        KeyCode::Backspace => {
            match ui.focus {
                LoginField::Username => ui.username.pop(),
                LoginField::Password => ui.password.pop(),
            };
        }
        KeyCode::Enter => {
            if verify_credentials(&ui.username, &ui.password) {
                info!("Info: inicio de sesión exitoso");
                if let Err(e) = session.persist().await {
                    error!("Error: no se pudo persistir el flag de sesión: {}", e);
                }
                ui.view = View::Dashboard;
                ui.login_error = None;
                return true;
            }
            info!("Info: intento de login con credenciales inválidas");
            ui.login_error = Some(Notice::new(LOGIN_ERROR_MESSAGE, Instant::now()));
            ui.password.clear();
        }
        _ => {}
    }
    false
}


async fn handle_dashboard_key(code: KeyCode,
                              ui: &mut UiState,
                              snapshot: &RenderSnapshot,
                              dispatcher: &Dispatcher,
                              tx_state: &mpsc::Sender<StateEvent>,
                              runtime: Option<&SessionRuntime>) -> DashboardFlow {

    // el aviso bloqueante captura el teclado: reintento manual o descarte
    if snapshot.failure.is_some() {
        match code {
            KeyCode::Char('r') => {
                if let Some(active) = runtime {
                    active.retry().await;
                }
            }
            KeyCode::Esc => {
                let _ = tx_state.send(StateEvent::FailureDismissed).await;
            }
            KeyCode::Char('q') => return DashboardFlow::Logout,
            _ => {}
        }
        return DashboardFlow::Continue;
    }

    if let Some(pending) = ui.confirm {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                ui.confirm = None;
                execute_confirmed(pending, ui, dispatcher).await;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => ui.confirm = None,
            _ => {}
        }
        return DashboardFlow::Continue;
    }

    match code {
        KeyCode::Char(' ') | KeyCode::Char('e') => {
            toggle_energizer(ui, snapshot, dispatcher).await;
        }
        KeyCode::Char('x') => ui.confirm = Some(PendingConfirm::EmergencyStop),
        KeyCode::Char('t') => ui.confirm = Some(PendingConfirm::TestMode),
        KeyCode::Char('r') => ui.confirm = Some(PendingConfirm::SystemReset),
        KeyCode::Char('f') => ui.filter = ui.filter.next(),
        KeyCode::Char('q') => return DashboardFlow::Logout,
        _ => {}
    }
    DashboardFlow::Continue
}


/// Alterna el energizador con aplicación optimista.
///
/// El estado local solo se toca si la escritura fue aceptada: ante un fallo
/// el toggle visible no cambia (el rollback es no aplicar) y se avisa.
async fn toggle_energizer(ui: &mut UiState, snapshot: &RenderSnapshot, dispatcher: &Dispatcher) {
    let target = !snapshot.fence.energizer_status;

    match dispatcher.send_command(CommandName::EnergizerCommand, target).await {
        Ok(()) => {
            let mut delta = FenceDelta::default();
            delta.energizer_status = Some(target);
            dispatcher.apply_local(delta).await;
        }
        Err(e) => {
            error!("Error: falló el comando del energizador: {}", e);
            ui.notice = Some(Notice::new(
                "Failed to send energizer command. Please check connection.",
                Instant::now(),
            ));
        }
    }
}


async fn execute_confirmed(pending: PendingConfirm, ui: &mut UiState, dispatcher: &Dispatcher) {
    match pending {
        PendingConfirm::EmergencyStop => {
            match dispatcher.send_command(CommandName::EnergizerCommand, false).await {
                Ok(()) => {
                    let mut delta = FenceDelta::default();
                    delta.energizer_status = Some(false);
                    dispatcher.apply_local(delta).await;
                    dispatcher.log_activity(CommandName::EmergencyStop, true).await;
                    ui.notice = Some(Notice::new(
                        "Emergency stop activated. System is now offline.",
                        Instant::now(),
                    ));
                }
                Err(e) => {
                    error!("Error: falló la parada de emergencia: {}", e);
                    ui.notice = Some(Notice::new(
                        "Failed to activate emergency stop. Please check connection.",
                        Instant::now(),
                    ));
                }
            }
        }

        PendingConfirm::TestMode => {
            dispatcher.log_activity(CommandName::TestMode, true).await;
            ui.notice = Some(Notice::new(
                "Test mode activated. System running in test configuration.",
                Instant::now(),
            ));
        }

        PendingConfirm::SystemReset => {
            // dos escrituras independientes, sin orden garantizado entre sí
            let (energizer, device) = tokio::join!(
                dispatcher.send_command(CommandName::EnergizerStatus, true),
                dispatcher.send_command(CommandName::DeviceOnline, true),
            );

            match energizer.and(device) {
                Ok(()) => {
                    let mut delta = FenceDelta::default();
                    delta.energizer_status = Some(true);
                    delta.device_online = Some(true);
                    dispatcher.apply_local(delta).await;
                    dispatcher.log_activity(CommandName::SystemReset, true).await;
                    ui.notice = Some(Notice::new(
                        "System reset completed successfully.",
                        Instant::now(),
                    ));
                }
                Err(e) => {
                    error!("Error: falló el reinicio del sistema: {}", e);
                    ui.notice = Some(Notice::new(
                        "Failed to reset system. Please check connection.",
                        Instant::now(),
                    ));
                }
            }
        }
    }
}


// ---------------------------------------------------------------------------
// Proyección sobre la terminal
// ---------------------------------------------------------------------------

fn render(frame: &mut Frame, ui: &UiState, snapshot: &RenderSnapshot, ctx: &AppContext) {
    match ui.view {
        View::Login => render_login(frame, ui),
        View::Dashboard => render_dashboard(frame, ui, snapshot, ctx),
    }
}


fn render_login(frame: &mut Frame, ui: &UiState) {
    let area = centered_rect(52, 11, frame.area());
    if area.width < 30 || area.height < 9 {
        return;
    }

    let block = Block::default()
        .title(" SecureFence Pro - Operator Login ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let field = |label: &str, value: &str, focused: bool| {
        Line::from(vec![
            Span::styled(
                format!("  {} ", if focused { ">" } else { " " }),
                Style::default().fg(Color::Green),
            ),
            Span::styled(format!("{:<10}", label), Style::default().fg(Color::Gray)),
            Span::styled(value.to_string(), Style::default().fg(Color::White)),
        ])
    };

    let masked: String = "*".repeat(ui.password.chars().count());
    let mut lines = vec![
        Line::from(""),
        field("Username:", &ui.username, ui.focus == LoginField::Username),
        Line::from(""),
        field("Password:", &masked, ui.focus == LoginField::Password),
        Line::from(""),
    ];

    match &ui.login_error {
        Some(notice) => lines.push(Line::from(Span::styled(
            format!("  {}", notice.text),
            Style::default().fg(Color::Red),
        ))),
        None => lines.push(Line::from("")),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Tab: switch field  |  Enter: sign in  |  Esc: exit",
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}


fn render_dashboard(frame: &mut Frame, ui: &UiState, snapshot: &RenderSnapshot, ctx: &AppContext) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // encabezado
            Constraint::Length(1),  // banner de conexión
            Constraint::Length(9),  // paneles de estado
            Constraint::Min(4),     // actividad reciente
            Constraint::Length(2),  // avisos y ayuda de teclas
        ])
        .split(frame.area());

    render_header(frame, outer[0], snapshot, ctx);
    render_connection_banner(frame, outer[1], snapshot);
    render_status_panels(frame, outer[2], snapshot);
    render_activity(frame, outer[3], ui, snapshot);
    render_footer(frame, outer[4], ui);

    if let Some(pending) = ui.confirm {
        render_confirm_modal(frame, pending);
    }
    if let Some(failure) = &snapshot.failure {
        render_failure_modal(frame, failure);
    }
}


fn render_header(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot, ctx: &AppContext) {
    if area.height < 3 {
        return;
    }

    let (status_text, status_color) = match snapshot.connection {
        ConnectionState::Online => ("ONLINE", Color::Green),
        ConnectionState::Offline => ("OFFLINE", Color::Red),
        ConnectionState::Connecting => ("CONNECTING", Color::Yellow),
    };

    let line = Line::from(vec![
        Span::styled(
            format!("  Welcome back, {}", ctx.system.operator_name),
            Style::default().fg(Color::White),
        ),
        Span::styled("  |  ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            Utc::now().format("%H:%M:%S UTC").to_string(),
            Style::default().fg(Color::Gray),
        ),
        Span::styled("  |  ", Style::default().fg(Color::DarkGray)),
        Span::styled(status_text, Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
    ]);

    let block = Block::default()
        .title(" SecureFence Pro ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(line).block(block), area);
}


fn render_connection_banner(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    if area.height < 1 {
        return;
    }
    let text = match snapshot.connection {
        ConnectionState::Online => return, // el banner solo aparece degradado
        ConnectionState::Connecting => "Connecting to the realtime store...",
        ConnectionState::Offline => "Connection Lost - Reconnecting...",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("  {}", text),
            Style::default().fg(Color::Yellow),
        )),
        area,
    );
}


fn render_status_panels(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    if area.height < 3 || area.width < 40 {
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    render_fence_panel(frame, columns[0], snapshot);
    render_power_panel(frame, columns[1], snapshot);
    render_health_panel(frame, columns[2], snapshot);
    render_alert_counts_panel(frame, columns[3], snapshot);
}


fn render_fence_panel(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    if area.height < 3 || area.width < 14 {
        return;
    }

    let active = snapshot.fence.energizer_status;
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            if active { "  FENCE ACTIVE" } else { "  FENCE INACTIVE" },
            Style::default()
                .fg(if active { Color::Green } else { Color::Red })
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            if active { "  ENERGIZED" } else { "  DE-ENERGIZED" },
            Style::default().fg(if active { Color::Green } else { Color::Red }),
        )),
        Line::from(""),
        Line::from(Span::styled(
            if active {
                "  Fence is energized and operational"
            } else {
                "  Fence is de-energized"
            },
            Style::default().fg(Color::Gray),
        )),
    ];

    let block = Block::default()
        .title(" Fence Status ")
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}


fn render_power_panel(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    if area.height < 7 || area.width < 14 {
        return;
    }

    let block = Block::default()
        .title(" Power Monitoring ")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let reading = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<9}", label), Style::default().fg(Color::Gray)),
            Span::styled(value, Style::default().fg(Color::White)),
        ])
    };

    frame.render_widget(
        Paragraph::new(reading("Current:", format!("{} A", snapshot.fence.current_reading))),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(reading("Voltage:", format!("{} V", snapshot.fence.voltage_reading))),
        rows[1],
    );
    frame.render_widget(
        Paragraph::new(reading("Output:", format!("{}kV", snapshot.fence.voltage_reading))),
        rows[2],
    );

    let battery = snapshot.fence.battery_level.round().clamp(0.0, 100.0) as u16;
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(battery_color(battery)))
            .percent(battery)
            .label(format!("Battery {}%", battery)),
        rows[3],
    );
}


fn battery_color(level: u16) -> Color {
    if level < 20 {
        Color::Red
    } else if level < 50 {
        Color::Yellow
    } else {
        Color::Green
    }
}


fn render_health_panel(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    if area.height < 3 || area.width < 14 {
        return;
    }

    let healthy = snapshot.fence.device_online
        && snapshot.connection == ConnectionState::Online;

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Device: ", Style::default().fg(Color::Gray)),
            Span::styled(
                if healthy { "Online" } else { "Offline" },
                Style::default().fg(if healthy { Color::Green } else { Color::Red }),
            ),
        ]),
        Line::from(Span::styled(
            if healthy {
                "  All Systems Operational"
            } else {
                "  System Connection Issues"
            },
            Style::default().fg(if healthy { Color::Green } else { Color::Yellow }),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Updated: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format_relative(&snapshot.fence.last_update, Utc::now()),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Signal: ", Style::default().fg(Color::Gray)),
            Span::styled(
                snapshot.fence.signal_strength.clone(),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let block = Block::default()
        .title(" System Health ")
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}


fn render_alert_counts_panel(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot) {
    if area.height < 3 || area.width < 14 {
        return;
    }

    let counts = &snapshot.counts;
    let count_line = |label: &str, value: usize, color: Color| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", label), Style::default().fg(Color::Gray)),
            Span::styled(value.to_string(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ])
    };

    let lines = vec![
        Line::from(""),
        count_line("Critical:", counts.critical, Color::Red),
        count_line("Warning:", counts.warning, Color::Yellow),
        count_line("Info:", counts.info, Color::Blue),
        Line::from(""),
        count_line(
            "Total:",
            counts.total,
            if counts.total > 0 { Color::White } else { Color::DarkGray },
        ),
    ];

    let block = Block::default()
        .title(" Alerts ")
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}


fn render_activity(frame: &mut Frame, area: Rect, ui: &UiState, snapshot: &RenderSnapshot) {
    if area.height < 3 || area.width < 20 {
        return;
    }

    let visible = visible_activity(&snapshot.activity, ui.filter);
    let block = Block::default()
        .title(format!(
            " Recent Activity ({}) - filter: {} ",
            visible.len(),
            ui.filter.label(),
        ))
        .borders(Borders::ALL);

    if visible.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "  Loading activity data...",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block),
            area,
        );
        return;
    }

    let capacity = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = visible
        .iter()
        .take(capacity)
        .map(|entry| {
            Line::from(vec![
                Span::styled("  ● ", Style::default().fg(severity_paint(entry.color))),
                Span::styled(
                    format!("{:<16}", entry.kind),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled(entry.description.clone(), Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("  ({})", entry.when),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}


/// Aplica el filtro visual al feed ya reconciliado.
fn visible_activity(activity: &[ActivityEntry], filter: AlertFilter) -> Vec<&ActivityEntry> {
    activity
        .iter()
        .filter(|entry| filter.matches(&entry.severity))
        .collect()
}


fn severity_paint(color: SeverityColor) -> Color {
    match color {
        SeverityColor::Red => Color::Red,
        SeverityColor::Yellow => Color::Yellow,
        SeverityColor::Blue => Color::Blue,
    }
}


fn render_footer(frame: &mut Frame, area: Rect, ui: &UiState) {
    if area.height < 2 {
        return;
    }

    let notice_line = match &ui.notice {
        Some(notice) => Line::from(Span::styled(
            format!("  {}", notice.text),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(""),
    };

    let help_line = Line::from(Span::styled(
        "  [space] energizer  [x] emergency stop  [t] test mode  [r] system reset  [f] filter  [q] logout  [Ctrl+C] exit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(vec![notice_line, help_line]), area);
}


fn render_confirm_modal(frame: &mut Frame, pending: PendingConfirm) {
    let area = centered_rect(60, 7, frame.area());
    if area.width < 30 || area.height < 5 {
        return;
    }

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", pending.prompt()),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  [y] confirm    [n] cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}


fn render_failure_modal(frame: &mut Frame, failure: &str) {
    let area = centered_rect(60, 8, frame.area());
    if area.width < 30 || area.height < 6 {
        return;
    }

    let block = Block::default()
        .title(" Connection Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", failure),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  [r] retry connection    [Esc] dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}


fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}


/// Prepara la terminal para el dibujo del panel.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}


/// Restaura la terminal a su estado original.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, severity: &str) -> ActivityEntry {
        ActivityEntry {
            id: id.to_string(),
            kind: "Test".to_string(),
            description: "d".to_string(),
            when: "Just now".to_string(),
            severity: severity.to_string(),
            color: crate::fence::domain::severity_color(severity),
        }
    }

    #[test]
    fn filter_is_display_only_and_preserves_order() {
        let activity = vec![
            entry("300", "critical"),
            entry("200", "info"),
            entry("100", "critical"),
        ];

        let visible = visible_activity(&activity, AlertFilter::Critical);
        let ids: Vec<&str> = visible.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["300", "100"]);

        // el filtro no muta el feed subyacente
        assert_eq!(activity.len(), 3);
        assert_eq!(visible_activity(&activity, AlertFilter::All).len(), 3);
    }

    #[test]
    fn unknown_severities_only_show_under_all() {
        let activity = vec![entry("1", "whatever")];
        assert_eq!(visible_activity(&activity, AlertFilter::All).len(), 1);
        assert!(visible_activity(&activity, AlertFilter::Info).is_empty());
        assert!(visible_activity(&activity, AlertFilter::Critical).is_empty());
    }

    #[test]
    fn centered_rect_never_exceeds_the_available_area() {
        let tiny = Rect { x: 0, y: 0, width: 10, height: 4 };
        let rect = centered_rect(60, 8, tiny);
        assert!(rect.width <= tiny.width);
        assert!(rect.height <= tiny.height);

        let normal = Rect { x: 0, y: 0, width: 100, height: 40 };
        let rect = centered_rect(60, 8, normal);
        assert_eq!(rect.width, 60);
        assert_eq!(rect.x, 20);
    }

    #[test]
    fn battery_gauge_color_tracks_the_level() {
        assert_eq!(battery_color(10), Color::Red);
        assert_eq!(battery_color(35), Color::Yellow);
        assert_eq!(battery_color(87), Color::Green);
    }
}
