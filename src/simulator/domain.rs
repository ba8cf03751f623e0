/// Comandos de control para la tarea del simulador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCommand {
    /// Detiene el bucle de simulación al cerrar la sesión.
    Stop,
}
