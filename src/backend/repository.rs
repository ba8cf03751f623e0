//! Acceso al store de datos en tiempo real.
//!
//! El store es un árbol clave-valor expuesto por HTTPS: las escrituras son
//! `PUT <base>/<ruta>.json` y las lecturas en vivo son suscripciones
//! Server-Sent Events sobre un subárbol (`fence_control` o `alerts`).
//! Cada suscripción corre en su propia tarea y entrega eventos ya
//! decodificados a la tarea de enlace; los payloads que no se pueden
//! interpretar se descartan en este borde.


use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_stream::StreamExt;
use tracing::warn;
use serde_json::Value;
use crate::backend::domain::{StoreError, StoreEvent, Subscription};
use crate::fence::domain::{AlertMap, AlertRecord, FenceDelta, FenceState, next_alert_id};
use crate::system::domain::backend_const::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use chrono::Utc;


#[derive(Clone, Debug)]
pub struct RemoteStore {
    client: reqwest::Client,
    base: String,
}


impl RemoteStore {

    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base, path)
    }

    /// Escribe un valor bajo una ruta del árbol.
    pub async fn put_value(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let response = self.client
            .put(self.node_url(path))
            .json(value)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }
        Ok(())
    }

    /// Escribe un campo individual de `fence_control`.
    pub async fn put_field(&self, field: &str, value: &Value) -> Result<(), StoreError> {
        self.put_value(&format!("fence_control/{}", field), value).await
    }

    /// Agrega una alerta bajo `alerts/<id>`.
    pub async fn put_alert(&self, id: &str, record: &AlertRecord) -> Result<(), StoreError> {
        self.put_value(&format!("alerts/{}", id), &serde_json::to_value(record)?).await
    }

    /// Siembra el estado inicial del dispositivo y la alerta de arranque.
    ///
    /// Se invoca al establecer la conexión; también sirve como verificación
    /// real de alcanzabilidad del store antes de declararse online.
    pub async fn seed_initial_data(&self) -> Result<(), StoreError> {
        let fence = FenceState::initial();
        self.put_value("fence_control", &serde_json::to_value(&fence)?).await?;

        let record = AlertRecord::system_online(Utc::now().to_rfc3339());
        self.put_alert(&next_alert_id(), &record).await
    }

    async fn open_stream(&self, path: &str) -> Result<reqwest::Response, StoreError> {
        let response = self.client
            .get(self.node_url(path))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }
        Ok(response)
    }

    /// Suscribe el subárbol `fence_control` y entrega deltas fusionables.
    pub fn subscribe_fence(&self, tx: mpsc::Sender<StoreEvent>) -> Subscription {
        let store = self.clone();
        Subscription::new(tokio::spawn(async move {
            if let Err(e) = store.fence_stream(&tx).await {
                let _ = tx.send(StoreEvent::Closed(e.to_string())).await;
            }
        }))
    }

    async fn fence_stream(&self, tx: &mpsc::Sender<StoreEvent>) -> Result<(), StoreError> {
        let response = self.open_stream("fence_control").await?;
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = stream.next().await {
            for message in decoder.push(&chunk?) {
                match message.event.as_str() {
                    "put" | "patch" => {
                        match fence_delta_from_sse(&message.data) {
                            Some(delta) => {
                                if tx.send(StoreEvent::FencePut(delta)).await.is_err() {
                                    return Ok(());
                                }
                            }
                            None => warn!("Warning: payload de fence_control malformado, ignorado"),
                        }
                    }
                    "keep-alive" => {}
                    "cancel" | "auth_revoked" => return Err(StoreError::StreamClosed),
                    _ => {}
                }
            }
        }
        Err(StoreError::StreamClosed)
    }

    /// Suscribe el subárbol `alerts` y entrega snapshots completos.
    ///
    /// El listener mantiene una copia sombra de la colección: cada evento del
    /// store la actualiza y el snapshot resultante reemplaza por completo la
    /// colección del panel (último snapshot gana).
    pub fn subscribe_alerts(&self, tx: mpsc::Sender<StoreEvent>) -> Subscription {
        let store = self.clone();
        Subscription::new(tokio::spawn(async move {
            if let Err(e) = store.alerts_stream(&tx).await {
                let _ = tx.send(StoreEvent::Closed(e.to_string())).await;
            }
        }))
    }

    async fn alerts_stream(&self, tx: &mpsc::Sender<StoreEvent>) -> Result<(), StoreError> {
        let response = self.open_stream("alerts").await?;
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut shadow = AlertMap::new();

        while let Some(chunk) = stream.next().await {
            for message in decoder.push(&chunk?) {
                match message.event.as_str() {
                    "put" | "patch" => {
                        match apply_alerts_event(&mut shadow, &message.event, &message.data) {
                            Some(()) => {
                                if tx.send(StoreEvent::AlertsSnapshot(shadow.clone())).await.is_err() {
                                    return Ok(());
                                }
                            }
                            None => warn!("Warning: payload de alerts malformado, ignorado"),
                        }
                    }
                    "keep-alive" => {}
                    "cancel" | "auth_revoked" => return Err(StoreError::StreamClosed),
                    _ => {}
                }
            }
        }
        Err(StoreError::StreamClosed)
    }
}


/// Mensaje crudo del protocolo Server-Sent Events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
}


/// Decodificador incremental del protocolo SSE.
///
/// Acumula bytes tal como llegan del transporte (los chunks pueden cortar una
/// línea en cualquier punto) y emite los mensajes completos delimitados por
/// línea en blanco.
pub struct SseDecoder {
    buffer: String,
    event: String,
    data: String,
}


impl SseDecoder {

    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            event: String::new(),
            data: String::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=pos).collect();
            let line = raw.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.event.is_empty() || !self.data.is_empty() {
                    messages.push(SseMessage {
                        event: std::mem::take(&mut self.event),
                        data: std::mem::take(&mut self.data),
                    });
                }
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(rest.trim());
            }
            // los comentarios (líneas que empiezan con ':') se ignoran
        }
        messages
    }
}


/// Interpreta el payload `{path, data}` de un evento sobre `fence_control`.
fn fence_delta_from_sse(data: &str) -> Option<FenceDelta> {
    let value: Value = serde_json::from_str(data).ok()?;
    let path = value.get("path")?.as_str()?;
    let payload = value.get("data")?;
    Some(scoped_fence_delta(path, payload))
}


/// Convierte un evento con ruta en un delta fusionable.
///
/// Un evento en la raíz trae el objeto completo; un evento en `/<campo>`
/// trae el valor suelto de ese campo.
pub fn scoped_fence_delta(path: &str, payload: &Value) -> FenceDelta {
    if path == "/" {
        FenceDelta::from_value(payload)
    } else {
        let field = path.trim_start_matches('/');
        FenceDelta::from_value(&serde_json::json!({ field: payload }))
    }
}


/// Aplica un evento `{path, data}` de `alerts` sobre la copia sombra.
///
/// * `put` en la raíz: reemplazo total (el snapshot puede achicar la colección).
/// * `patch` en la raíz: fusión de entradas de primer nivel.
/// * Evento en `/<id>`: alta, sobreescritura o baja (payload nulo) individual.
pub fn apply_alerts_event(shadow: &mut AlertMap, event: &str, data: &str) -> Option<()> {
    let value: Value = serde_json::from_str(data).ok()?;
    let path = value.get("path")?.as_str()?;
    let payload = value.get("data")?;

    if path == "/" {
        if event == "put" {
            shadow.clear();
        }
        if let Some(entries) = payload.as_object() {
            for (id, raw) in entries {
                if raw.is_null() {
                    shadow.remove(id);
                } else if let Some(record) = AlertRecord::from_value(raw) {
                    shadow.insert(id.clone(), record);
                }
            }
        }
    } else {
        let id = path.trim_start_matches('/').to_string();
        if payload.is_null() {
            shadow.remove(&id);
        } else if let Some(record) = AlertRecord::from_value(payload) {
            shadow.insert(id, record);
        }
    }
    Some(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_reassembles_messages_split_across_chunks() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.push(b"event: pu").is_empty());
        assert!(decoder.push(b"t\ndata: {\"path\":\"/\",").is_empty());
        let messages = decoder.push(b"\"data\":null}\n\n");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].event, "put");
        assert_eq!(messages[0].data, "{\"path\":\"/\",\"data\":null}");
    }

    #[test]
    fn decoder_handles_several_messages_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let messages = decoder.push(
            b"event: keep-alive\ndata: null\n\nevent: put\ndata: {\"path\":\"/x\",\"data\":1}\n\n",
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].event, "keep-alive");
        assert_eq!(messages[1].event, "put");
    }

    #[test]
    fn root_event_produces_a_full_delta_and_field_event_a_scoped_one() {
        let root = scoped_fence_delta("/", &serde_json::json!({
            "battery_level": 50.0,
            "device_online": false,
        }));
        assert_eq!(root.battery_level, Some(50.0));
        assert_eq!(root.device_online, Some(false));
        assert_eq!(root.energizer_status, None);

        let scoped = scoped_fence_delta("/battery_level", &serde_json::json!(75.5));
        assert_eq!(scoped.battery_level, Some(75.5));
        assert_eq!(scoped.device_online, None);
    }

    #[test]
    fn alerts_put_replaces_and_can_shrink_the_shadow() {
        let mut shadow = AlertMap::new();
        apply_alerts_event(&mut shadow, "put", &serde_json::json!({
            "path": "/",
            "data": {
                "100": { "type": "a", "message": "m", "timestamp": "t", "severity": "info" },
                "200": { "type": "b", "message": "m", "timestamp": "t", "severity": "warning" },
            },
        }).to_string()).unwrap();
        assert_eq!(shadow.len(), 2);

        apply_alerts_event(&mut shadow, "put", &serde_json::json!({
            "path": "/",
            "data": {
                "300": { "type": "c", "message": "m", "timestamp": "t", "severity": "critical" },
            },
        }).to_string()).unwrap();

        assert_eq!(shadow.len(), 1);
        assert!(shadow.contains_key("300"));
    }

    #[test]
    fn alerts_scoped_events_insert_and_remove_single_entries() {
        let mut shadow = AlertMap::new();
        apply_alerts_event(&mut shadow, "put", &serde_json::json!({
            "path": "/100",
            "data": { "type": "a", "message": "m", "timestamp": "t", "severity": "info" },
        }).to_string()).unwrap();
        assert_eq!(shadow.len(), 1);

        apply_alerts_event(&mut shadow, "put", &serde_json::json!({
            "path": "/100",
            "data": null,
        }).to_string()).unwrap();
        assert!(shadow.is_empty());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let mut shadow = AlertMap::new();
        assert!(apply_alerts_event(&mut shadow, "put", "no-es-json").is_none());
        assert!(fence_delta_from_sse("{\"sin_path\": 1}").is_none());
    }
}
