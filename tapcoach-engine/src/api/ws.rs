//! WebSocket transport
//!
//! Each connection runs two tasks: one forwards broadcast coach events to the
//! client as text frames, the other decodes inbound frames and queues them for
//! the control loop. When either side finishes the other is aborted.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tapcoach_common::CoachEvent;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::server::AppContext;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = ctx.events.subscribe();
    info!("WebSocket client connected, total clients: {}", ctx.events.client_count());

    let mut send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if sender.send(event_frame(&event)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let inbound_ctx = ctx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            if matches!(frame, Message::Close(_)) {
                break;
            }
            if let Some(payload) = frame_payload(frame) {
                forward_frame(&inbound_ctx, &payload);
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("WebSocket client disconnected");
}

/// Outbound frame for a coach event
fn event_frame(event: &CoachEvent) -> Message {
    Message::Text(event.to_wire())
}

/// Payload of a data frame; control frames carry none
fn frame_payload(frame: Message) -> Option<Vec<u8>> {
    match frame {
        Message::Text(text) => Some(text.into_bytes()),
        Message::Binary(bytes) => Some(bytes),
        _ => None,
    }
}

/// Queue one inbound frame; malformed frames are dropped
fn forward_frame(ctx: &AppContext, payload: &[u8]) {
    debug!("Received frame: {}", String::from_utf8_lossy(payload));
    if let Err(e) = ctx.submit_frame(payload) {
        warn!("Dropping frame: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_loop::LoopClock;
    use crate::hardware::{LogIndicators, VirtualPads};
    use crate::notifier::EventBroadcaster;
    use crate::session::SessionController;
    use crate::state::SharedState;
    use std::sync::Arc;
    use tapcoach_common::config::TomlConfig;
    use tapcoach_common::{Channel, ConfigUpdate, ControlMessage};
    use tokio::sync::mpsc;

    fn context() -> (AppContext, mpsc::UnboundedReceiver<ControlMessage>) {
        let events = EventBroadcaster::new(8);
        let controller = SessionController::from_config(
            &TomlConfig::default(),
            Arc::new(events.clone()),
            Arc::new(LogIndicators::new()),
        )
        .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = AppContext {
            state: Arc::new(SharedState::new(controller.snapshot())),
            events,
            inbound: tx,
            pads: Arc::new(VirtualPads::new(LoopClock::new(), 30)),
        };
        (ctx, rx)
    }

    #[test]
    fn test_only_well_formed_frames_are_queued() {
        let (ctx, mut rx) = context();

        forward_frame(&ctx, b"not json");
        forward_frame(&ctx, br#"{"bpm":"fast"}"#);
        forward_frame(&ctx, br#"{"bpm":90}"#);

        assert_eq!(
            rx.try_recv().unwrap(),
            ControlMessage::Configure(ConfigUpdate {
                bpm: Some(90),
                ..Default::default()
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_binary_frames_carry_messages_too() {
        let (ctx, mut rx) = context();

        let payload = frame_payload(Message::Binary(br#"{"command":"endSession"}"#.to_vec()));
        forward_frame(&ctx, &payload.unwrap());

        assert_eq!(rx.try_recv().unwrap(), ControlMessage::EndSession);
    }

    #[test]
    fn test_control_frames_have_no_payload() {
        assert_eq!(frame_payload(Message::Ping(vec![1, 2])), None);
        assert_eq!(frame_payload(Message::Pong(Vec::new())), None);
        assert_eq!(
            frame_payload(Message::Text("{}".to_string())),
            Some(b"{}".to_vec())
        );
    }

    #[test]
    fn test_frames_after_loop_shutdown_are_dropped() {
        let (ctx, rx) = context();
        drop(rx);
        // Logged, never panics
        forward_frame(&ctx, br#"{"bpm":90}"#);
        assert!(ctx.submit_frame(br#"{"bpm":90}"#).is_err());
    }

    #[test]
    fn test_events_go_out_as_text_frames() {
        assert_eq!(
            event_frame(&CoachEvent::Beat { ordinal: 2, total: 20 }),
            Message::Text("beat:2/20".to_string())
        );
        assert_eq!(
            event_frame(&CoachEvent::Tap(Channel::Snare)),
            Message::Text("snare".to_string())
        );
    }
}
