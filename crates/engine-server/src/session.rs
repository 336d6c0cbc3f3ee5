//! Per-connection WebSocket I/O.
//!
//! Each session:
//! - registers a bounded outbound buffer with the hub,
//! - spawns a writer task draining that buffer into the socket,
//! - reads text frames and hands them to the dispatcher.
//!
//! The hub holds the only sender for the buffer. When the hub evicts the
//! client the writer sees the channel close and stops, which in turn ends
//! the reader loop.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::hub::HubHandle;
use crate::types::{ClientId, OutboundRx};

pub(crate) async fn run_session(
    socket: WebSocket,
    client_id: ClientId,
    user_id: Option<String>,
    hub: HubHandle,
    dispatcher: Dispatcher,
    buffer: usize,
) {
    info!(client = %client_id, user = ?user_id, "session opened");

    let (sink, mut stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel(buffer);
    hub.register(client_id, user_id, out_tx);

    let mut writer = tokio::spawn(write_loop(client_id, sink, out_rx));

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    dispatcher.handle_text(client_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Binary(_))) => {
                    debug!(client = %client_id, "binary frame ignored");
                }
                // Ping/pong are answered by axum.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(client = %client_id, error = %e, "socket read error");
                    break;
                }
            },
            _ = &mut writer => {
                debug!(client = %client_id, "writer finished");
                break;
            }
        }
    }

    hub.unregister(client_id);
    writer.abort();
    info!(client = %client_id, "session closed");
}

async fn write_loop(
    client_id: ClientId,
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    mut out_rx: OutboundRx,
) {
    while let Some(frame) = out_rx.recv().await {
        if let Err(e) = sink.send(Message::Text(frame.into())).await {
            debug!(client = %client_id, error = %e, "socket write error");
            return;
        }
    }
    // Channel closed: either unregistered or evicted by the hub.
    let _ = sink.close().await;
}
