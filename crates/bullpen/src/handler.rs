//! Per-connection handler: handshake, request routing, and delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version → send HandshakeAck
//!   2. Register with the connection registry and start the writer task
//!   3. Loop: receive envelopes → answer system messages, route requests
//!      to the session engine, report rejections to the caller
//!
//! Everything the server sends after the handshake goes through the
//! connection's outbound queue, so one writer numbers every frame and
//! delivery order matches emission order.

use std::sync::Arc;
use std::time::Instant;

use bullpen_protocol::{
    ClientRequest, Codec, Envelope, PROTOCOL_VERSION, Payload, ProtocolError, SystemMessage,
};
use bullpen_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::BullpenError;
use crate::server::ServerState;

/// Drop guard that unregisters a connection when the handler exits.
///
/// Cleanup happens even if the handler panics. `Drop` is synchronous, so
/// the async unregister runs in a fire-and-forget task.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.registry.unregister(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), BullpenError> {
    let conn_id = conn.id();
    let start = Instant::now();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Handshake ---
    perform_handshake(&conn, &state, &start).await?;
    tracing::info!(%conn_id, "player connected");

    // --- Step 2: Registration and writer ---
    let outbound = state.registry.register(conn_id).await;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };
    let conn = Arc::new(conn);
    tokio::spawn(write_loop(
        Arc::clone(&conn),
        outbound,
        Arc::clone(&state),
        start,
    ));

    // --- Step 3: Message loop ---
    loop {
        let data = match tokio::time::timeout(state.connection_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        if data.len() > state.max_message_bytes {
            let err = ProtocolError::FrameTooLarge {
                size: data.len(),
                limit: state.max_message_bytes,
            };
            tracing::debug!(%conn_id, error = %err, "rejecting oversized frame");
            reply_error(&state, conn_id, 413, err.to_string()).await;
            continue;
        }

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        match envelope.payload {
            Payload::System(msg) => {
                if handle_system_message(&state, conn_id, msg, &start).await {
                    break;
                }
            }
            Payload::Request(request) => {
                handle_request(&state, conn_id, request).await;
            }
            Payload::Event(_) => {
                tracing::debug!(%conn_id, "ignoring event sent by client");
            }
        }
    }

    tracing::info!(%conn_id, "player disconnected");
    // _guard drops here → unregister fires, the outbound queue closes and
    // the writer drains what is left, then closes the socket.
    Ok(())
}

/// Performs the initial handshake: receive Handshake, validate, send Ack.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    start: &Instant,
) -> Result<(), BullpenError> {
    let data = match tokio::time::timeout(state.connection_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let version = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version }) => version,
        _ => {
            send_direct(conn, state, start, error_payload(400, "expected Handshake")).await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be Handshake".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
        send_direct(conn, state, start, error_payload(400, &message)).await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let ack = Payload::System(SystemMessage::HandshakeAck {
        connection_id: conn.id().into_inner(),
        server_time: millis_since(start),
    });
    send_direct(conn, state, start, ack).await
}

/// Handles a system message. Returns `true` if the connection should close.
async fn handle_system_message<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    msg: SystemMessage,
    start: &Instant,
) -> bool {
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            let ack = Payload::System(SystemMessage::HeartbeatAck {
                client_time,
                server_time: millis_since(start),
            });
            state.registry.send_payload(conn_id, ack).await;
        }

        SystemMessage::Disconnect { reason } => {
            tracing::info!(%conn_id, %reason, "client disconnected");
            return true;
        }

        SystemMessage::Handshake { .. } => {
            reply_error(state, conn_id, 400, "already handshaken").await;
        }

        _ => {
            tracing::debug!(%conn_id, "ignoring unexpected system message");
        }
    }

    false
}

/// Routes a game request to the engine. Rejections go back to the caller
/// only.
async fn handle_request<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    request: ClientRequest,
) {
    let action = request.name();
    if let Err(e) = state.engine.handle(conn_id, request).await {
        tracing::debug!(%conn_id, action, error = %e, "request rejected");
        reply_error(state, conn_id, e.code(), e.to_string()).await;
    }
}

/// Drains a connection's outbound queue onto the socket, numbering frames.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: mpsc::UnboundedReceiver<Payload>,
    state: Arc<ServerState<C>>,
    start: Instant,
) {
    let conn_id = conn.id();
    // The handshake ack was frame 0.
    let mut seq: u64 = 1;

    while let Some(payload) = outbound.recv().await {
        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: millis_since(&start),
            payload,
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode envelope");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            if e.is_disconnect() {
                tracing::debug!(%conn_id, error = %e, "peer gone, stopping writer");
            } else {
                tracing::warn!(%conn_id, error = %e, "send failed, stopping writer");
            }
            break;
        }
    }

    let _ = conn.close().await;
}

/// Queues a `SystemMessage::Error` for the caller.
async fn reply_error<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    code: u16,
    message: impl Into<String>,
) {
    state
        .registry
        .send_payload(conn_id, error_payload(code, message))
        .await;
}

fn error_payload(code: u16, message: impl Into<String>) -> Payload {
    Payload::System(SystemMessage::Error {
        code,
        message: message.into(),
    })
}

/// Sends a frame straight to the socket. Only used before the writer task
/// exists, so it is always frame 0.
async fn send_direct<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    start: &Instant,
    payload: Payload,
) -> Result<(), BullpenError> {
    let envelope = Envelope {
        seq: 0,
        timestamp: millis_since(start),
        payload,
    };
    let bytes = state.codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn millis_since(start: &Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
