//! Accept loop and per-connection socket pump.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dispatch::{depart, dispatch};
use crate::hub::{Envelope, Hub};
use crate::protocol::{ClientMessage, ServerMessage};

pub async fn run_server(addr: SocketAddr, hub: Arc<Hub>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "server.listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept.failed");
                continue;
            }
        };
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            if let Err(e) = serve(stream, peer, hub).await {
                error!(%peer, error = %e, "connection.failed");
            }
        });
    }
}

/// Pump one socket: client frames go through [`dispatch`], queued server
/// messages go out, until either side closes.
async fn serve(stream: TcpStream, peer: SocketAddr, hub: Arc<Hub>) -> anyhow::Result<()> {
    let (mut sink, mut frames) = accept_async(stream).await?.split();
    let player_id = Uuid::new_v4();
    let mut outbox = hub.connect(player_id);
    info!(%peer, player = %player_id, "connection.opened");

    hub.deliver(vec![Envelope::player(
        player_id,
        ServerMessage::Welcome { player_id },
    )]);

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            Some(msg) = outbox.recv() => {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => break Err(e.into()),
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    break Err(e.into());
                }
            }
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => hub.deliver(dispatch(&hub, player_id, msg)),
                    Err(e) => {
                        warn!(player = %player_id, error = %e, "message.invalid");
                        hub.deliver(vec![Envelope::player(
                            player_id,
                            ServerMessage::Error { message: format!("Malformed message: {e}") },
                        )]);
                    }
                },
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },
        }
    };

    hub.deliver(depart(&hub, player_id));
    hub.disconnect(player_id);
    info!(player = %player_id, "connection.closed");
    result
}
