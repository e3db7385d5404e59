//! Websocket server: accepts browser connections and bridges them to the
//! game engine.

use crate::core::ids::ConnectionId;
use crate::engine::GameEngine;
use crate::events::{EventSink, ServerEvent};
use crate::web::protocol::ClientCommand;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Outbound channels for every live connection. Events queue per connection
/// and drain in order, which is all the transport guarantees the engine
/// needs.
#[derive(Default)]
pub struct ConnectionRegistry {
    senders: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, connection: ConnectionId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(connection, tx);
        rx
    }

    fn unregister(&self, connection: ConnectionId) {
        self.lock().remove(&connection);
    }

    pub fn is_connected(&self, connection: ConnectionId) -> bool {
        self.lock().contains_key(&connection)
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>> {
        match self.senders.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl EventSink for ConnectionRegistry {
    fn send(&self, connection: ConnectionId, event: ServerEvent) {
        if let Some(tx) = self.lock().get(&connection) {
            // A closed channel means the connection is tearing down; the
            // disconnect path cleans up.
            let _ = tx.send(event);
        }
    }
}

/// Binds the listener and serves connections until the process stops.
pub async fn start_server(
    port: u16,
    engine: GameEngine,
    registry: Arc<ConnectionRegistry>,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "arena server listening");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let engine = engine.clone();
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, peer, engine, registry).await {
                        warn!(%peer, %err, "connection error");
                    }
                });
            }
            Err(err) => {
                warn!(%err, "accept error");
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    engine: GameEngine,
    registry: Arc<ConnectionRegistry>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let connection = ConnectionId::new();
    debug!(%peer, %connection, "websocket connected");

    let mut outbound = registry.register(connection);
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Drain engine events to this client, in order.
    let send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%err, "failed to encode event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(command) => dispatch(&engine, connection, command).await,
                Err(err) => {
                    debug!(%connection, %err, "unparseable command");
                    registry.send(
                        connection,
                        ServerEvent::Error {
                            code: "bad_request".to_string(),
                            message: err.to_string(),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    engine.on_disconnect(connection).await;
    registry.unregister(connection);
    send_task.abort();
    debug!(%peer, %connection, "websocket disconnected");

    Ok(())
}

/// Routes one parsed command. Failures become error events on the same
/// connection; nothing here can take the process down.
async fn dispatch(engine: &GameEngine, connection: ConnectionId, command: ClientCommand) {
    let result = match command {
        ClientCommand::Hello { name } => engine
            .register_connection(connection, &name)
            .await
            .map(|_| ()),
        ClientCommand::StartPve => engine.start_pve_battle(connection).await.map(|_| ()),
        ClientCommand::FindMatch => engine.enqueue_for_match(connection).await,
        ClientCommand::Action { session_id, action } => {
            engine.submit_action(connection, session_id, action).await
        }
        ClientCommand::BuyCharacter => engine.buy_character_roll(connection).await,
        ClientCommand::BuyWeapon => engine.buy_weapon_roll(connection).await,
        ClientCommand::Profile => engine.send_profile(connection).await,
        ClientCommand::SpendStatPoint { stat } => {
            engine.spend_stat_point(connection, stat).await
        }
    };

    if let Err(err) = result {
        engine.send_error(connection, &err);
    }
}
