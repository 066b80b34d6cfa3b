//! Websocket session against one room.
//!
//! Every connection is a fresh join: the server assigns a new identity and
//! replays the room through `welcome`. The local [`Replica`] is rebuilt from
//! that welcome and then follows the broadcast stream.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use strokes::{ClientMessage, OpDraft, Operation, Point, Replica, ServerMessage, Tool};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::CliError;
use crate::backoff::Backoff;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const WELCOME_TIMEOUT: Duration = Duration::from_secs(5);
const ACK_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// CONNECTION
// =============================================================================

pub struct Session {
    stream: WsStream,
    replica: Replica,
}

impl Session {
    /// Connect and wait for the welcome handshake.
    pub async fn connect(ws_url: &str) -> Result<Self, CliError> {
        let (stream, _) = connect_async(ws_url)
            .await
            .map_err(|error| CliError::WsConnect(Box::new(error)))?;
        let mut session = Self { stream, replica: Replica::new() };

        loop {
            if let ServerMessage::Welcome { .. } = session.next_message(WELCOME_TIMEOUT).await? {
                return Ok(session);
            }
        }
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Identity assigned by the server for this connection.
    pub fn client_id(&self) -> &str {
        self.replica.client_id().unwrap_or_default()
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), CliError> {
        let text = strokes::encode(msg)?;
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|error| CliError::WsConnect(Box::new(error)))
    }

    /// Receive the next server message and fold it into the replica.
    /// Undecodable frames are skipped.
    pub async fn next_message(&mut self, timeout: Duration) -> Result<ServerMessage, CliError> {
        let fut = async {
            loop {
                let Some(message) = self.stream.next().await else {
                    return Err(CliError::WsClosed);
                };
                match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                    Message::Text(text) => match strokes::decode_server(text.as_str()) {
                        Ok(msg) => return Ok(msg),
                        Err(error) => eprintln!("skipping server message: {error}"),
                    },
                    Message::Close(_) => return Err(CliError::WsClosed),
                    _ => {}
                }
            }
        };

        let msg = tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| CliError::Timeout)??;
        self.replica.apply(&msg);
        Ok(msg)
    }

    /// Read messages until `pick` accepts one.
    async fn wait_for<T>(&mut self, mut pick: impl FnMut(&ServerMessage) -> Option<T>) -> Result<T, CliError> {
        loop {
            let msg = self.next_message(ACK_TIMEOUT).await?;
            if let Some(found) = pick(&msg) {
                return Ok(found);
            }
        }
    }
}

/// Websocket endpoint for `room` on the server at `base_url`.
pub fn ws_url(base_url: &str, room: &str) -> Result<String, CliError> {
    let mut url = Url::parse(base_url).map_err(|_| CliError::InvalidBaseUrl(base_url.to_owned()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(CliError::InvalidBaseUrl(base_url.to_owned())),
    };
    url.set_scheme(scheme)
        .map_err(|()| CliError::InvalidBaseUrl(base_url.to_owned()))?;
    url.set_path("/ws");
    url.query_pairs_mut().clear().append_pair("room", room);
    Ok(url.into())
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Follow a room forever, reconnecting with backoff after any disconnect.
pub async fn watch(ws_url: &str) -> Result<(), CliError> {
    let mut backoff = Backoff::default();
    loop {
        match Session::connect(ws_url).await {
            Ok(mut session) => {
                backoff.reset();
                eprintln!(
                    "joined as {}: {} visible strokes, {} users",
                    session.client_id(),
                    session.replica().visible().len(),
                    session.replica().users().len()
                );
                let error = follow(&mut session).await;
                eprintln!("disconnected: {error}");
            }
            Err(error) => eprintln!("connect failed: {error}"),
        }

        let delay = backoff.next_delay();
        eprintln!("reconnecting in {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

/// Print room activity until the connection fails. Returns the failure.
async fn follow(session: &mut Session) -> CliError {
    loop {
        // Idle rooms are quiet; only a closed socket ends the watch.
        let msg = match session.next_message(Duration::from_secs(3600)).await {
            Ok(msg) => msg,
            Err(CliError::Timeout) => continue,
            Err(error) => return error,
        };
        let visible = session.replica().visible().len();
        match msg {
            ServerMessage::OpBroadcast { op } => {
                println!("op seq={} id={} by={} visible={visible}", op.seq, op.op_id, op.origin);
            }
            ServerMessage::UndoBroadcast { op_id } => println!("undo id={op_id} visible={visible}"),
            ServerMessage::RedoBroadcast { op } => println!("redo id={} visible={visible}", op.op_id),
            ServerMessage::UserList { users } => {
                let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
                println!("users {}", ids.join(","));
            }
            ServerMessage::Welcome { .. } | ServerMessage::StrokeChunk { .. } | ServerMessage::Cursor { .. } => {}
        }
    }
}

/// Submit one stroke and wait for its canonical broadcast.
pub async fn draw(ws_url: &str, tool: Tool, color: String, width: f64, points: Vec<Point>) -> Result<Operation, CliError> {
    let mut session = Session::connect(ws_url).await?;
    let draft = OpDraft {
        op_id: Uuid::new_v4().to_string(),
        user_id: session.client_id().to_owned(),
        tool,
        color,
        width,
        points,
    };
    let op_id = draft.op_id.clone();

    session.replica.draw_local(draft.clone());
    session.send(&ClientMessage::ClientOp { op: draft }).await?;
    session
        .wait_for(|msg| match msg {
            ServerMessage::OpBroadcast { op } if op.op_id == op_id => Some(op.clone()),
            _ => None,
        })
        .await
}

/// Request an undo and wait for the room to confirm it. The room answers
/// inapplicable requests with silence, which surfaces as a timeout.
pub async fn undo(ws_url: &str, op_id: String) -> Result<(), CliError> {
    let mut session = Session::connect(ws_url).await?;
    session.send(&ClientMessage::Undo { op_id: op_id.clone() }).await?;
    session
        .wait_for(|msg| match msg {
            ServerMessage::UndoBroadcast { op_id: id } if *id == op_id => Some(()),
            _ => None,
        })
        .await
}

/// Request a redo and wait for the restored operation.
pub async fn redo(ws_url: &str, op_id: String) -> Result<Operation, CliError> {
    let mut session = Session::connect(ws_url).await?;
    session.send(&ClientMessage::Redo { op_id: op_id.clone() }).await?;
    session
        .wait_for(|msg| match msg {
            ServerMessage::RedoBroadcast { op } if op.op_id == op_id => Some(op.clone()),
            _ => None,
        })
        .await
}

// =============================================================================
// INPUT PARSING
// =============================================================================

/// Parse `"x,y x,y ..."` into points. At least one point is required.
pub fn parse_points(input: &str) -> Result<Vec<Point>, CliError> {
    let points = input
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| CliError::InvalidPoints(pair.to_owned()))?;
            let x = x.trim().parse::<f64>().map_err(|_| CliError::InvalidPoints(pair.to_owned()))?;
            let y = y.trim().parse::<f64>().map_err(|_| CliError::InvalidPoints(pair.to_owned()))?;
            if !x.is_finite() || !y.is_finite() {
                return Err(CliError::InvalidPoints(pair.to_owned()));
            }
            Ok(Point::new(x, y))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Err(CliError::InvalidPoints(input.to_owned()));
    }
    Ok(points)
}

pub fn parse_tool(input: &str) -> Result<Tool, String> {
    match input {
        "pen" => Ok(Tool::Pen),
        "brush" => Ok(Tool::Brush),
        "eraser" => Ok(Tool::Eraser),
        other => Err(format!("unknown tool `{other}` (expected pen, brush, or eraser)")),
    }
}
