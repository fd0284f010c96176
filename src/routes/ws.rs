// WebSocket selection stream: one resolution in flight per client, newest selection wins.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::aggregator::{self, ResolveError};
use crate::models::CanonicalPayload;
use crate::selection::Selection;
use crate::session::{Resolution, SelectionTracker};
use crate::upstream_repo::Upstream;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

type Settled = (Resolution, Result<CanonicalPayload, ResolveError>);

pub(super) async fn ws_selection<U: Upstream + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<U>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_selection(socket, state).await {
            tracing::info!("Selection stream error: {}", e);
        }
    })
}

fn frame(
    resolution: &Resolution,
    result: Result<CanonicalPayload, ResolveError>,
) -> serde_json::Value {
    match result {
        Ok(payload) => serde_json::json!({
            "selection": resolution.selection,
            "payload": payload,
        }),
        Err(e) => serde_json::json!({
            "selection": resolution.selection,
            "error": e.to_string(),
        }),
    }
}

fn spawn_resolution<U: Upstream + 'static>(
    state: &AppState<U>,
    resolution: Resolution,
    done: mpsc::Sender<Settled>,
) -> JoinHandle<()> {
    let state = state.clone();
    tokio::spawn(async move {
        let result = aggregator::resolve(
            state.upstream.as_ref(),
            &state.config.resolution,
            &resolution.selection,
        )
        .await;
        let _ = done.send((resolution, result)).await;
    })
}

/// Per-connection resolution state: at most one task in flight, results funnelled
/// through one channel and checked against the tracker before they become frames.
struct Dispatcher<U> {
    state: AppState<U>,
    tracker: SelectionTracker,
    done_tx: mpsc::Sender<Settled>,
    done_rx: mpsc::Receiver<Settled>,
    in_flight: Option<JoinHandle<()>>,
}

impl<U: Upstream + 'static> Dispatcher<U> {
    fn new(state: AppState<U>) -> Self {
        let (done_tx, done_rx) = mpsc::channel::<Settled>(4);
        Self {
            state,
            tracker: SelectionTracker::new(),
            done_tx,
            done_rx,
            in_flight: None,
        }
    }

    fn select(&mut self, selection: Selection) {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        let resolution = self.tracker.select(selection);
        self.in_flight = Some(spawn_resolution(&self.state, resolution, self.done_tx.clone()));
    }

    /// Next frame for the current selection. Results that were already queued when a
    /// newer selection came in are dropped here. Cancel-safe.
    async fn next_frame(&mut self) -> Option<serde_json::Value> {
        loop {
            let (resolution, result) = self.done_rx.recv().await?;
            if let Some(result) = resolution.settle(result) {
                return Some(frame(&resolution, result));
            }
        }
    }
}

impl<U> Drop for Dispatcher<U> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

async fn stream_selection<U: Upstream + 'static>(
    socket: WebSocket,
    state: AppState<U>,
) -> anyhow::Result<()> {
    tracing::info!("Client connected to selection stream");
    let (mut sender, mut receiver) = socket.split();
    let mut dispatcher = Dispatcher::new(state);

    // First ping one interval after connect, not immediately.
    let mut ping_interval = tokio::time::interval_at(
        tokio::time::Instant::now() + WS_PING_INTERVAL,
        WS_PING_INTERVAL,
    );
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "selection stream receive failed");
                        break;
                    }
                };
                match serde_json::from_str::<Selection>(text.as_str()) {
                    Ok(selection) => dispatcher.select(selection),
                    Err(e) => {
                        let body = serde_json::json!({ "error": format!("invalid selection: {e}") });
                        let json = serde_json::to_string(&body)?;
                        let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Text(json.into()))).await;
                        if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                            break;
                        }
                    }
                }
            }
            Some(body) = dispatcher.next_frame() => {
                let json = serde_json::to_string(&body)?;
                let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Text(json.into()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::upstream_repo::FetchError;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct Nodes;

    impl Upstream for Nodes {
        async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
            match path {
                "/connections/c1/nodes" => Ok(json!([{"node": "n1", "status": "online"}])),
                "/connections/c2/nodes" => Ok(json!([{"node": "n2", "status": "offline"}])),
                _ => Err(FetchError::Status {
                    path: path.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn dispatcher() -> Dispatcher<Nodes> {
        let config = AppConfig::load_from_str(
            "[server]\nport = 8081\nhost = \"0.0.0.0\"\n[upstream]\nbase_url = \"http://127.0.0.1:9\"\n",
        )
        .unwrap();
        Dispatcher::new(AppState {
            upstream: Arc::new(Nodes),
            config,
        })
    }

    #[tokio::test]
    async fn queued_result_of_superseded_selection_is_dropped() {
        let mut d = dispatcher();
        d.select(Selection::Node("c1:n1".into()));
        // Let the first resolution finish so its result sits in the channel.
        let first = d.in_flight.as_ref().unwrap();
        while !first.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        d.select(Selection::Node("c2:n2".into()));
        let body = d.next_frame().await.unwrap();
        assert_eq!(body["selection"]["id"], "c2:n2");
        assert_eq!(body["payload"]["status"], "crit");

        let more = timeout(Duration::from_millis(100), d.next_frame()).await;
        assert!(more.is_err(), "no frame for the superseded selection");
    }

    #[tokio::test]
    async fn current_selection_yields_its_frame() {
        let mut d = dispatcher();
        d.select(Selection::Node("c1:n1".into()));
        let body = d.next_frame().await.unwrap();
        assert_eq!(body["selection"], json!({"kind": "node", "id": "c1:n1"}));
        assert_eq!(body["payload"]["title"], "n1");
    }
}
