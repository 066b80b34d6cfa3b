mod backoff;
mod session;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use strokes::Tool;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out waiting for the room")]
    Timeout,
    #[error("server returned {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("invalid point list near `{0}`; expected \"x,y x,y ...\"")]
    InvalidPoints(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "inkroom", about = "Inkroom drawing room websocket CLI")]
struct Cli {
    #[arg(long, env = "INKROOM_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    #[arg(long, env = "INKROOM_ROOM", default_value = "default")]
    room: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check server health.
    Ping,
    /// List live rooms.
    Rooms,
    /// Follow a room, reconnecting on disconnect.
    Watch,
    /// Submit one stroke and print its sequence number.
    Draw(DrawArgs),
    /// Undo a stroke by opId.
    Undo { op_id: String },
    /// Redo a stroke by opId.
    Redo { op_id: String },
}

#[derive(Args, Debug)]
struct DrawArgs {
    #[arg(long, default_value = "pen", value_parser = session::parse_tool)]
    tool: Tool,

    #[arg(long, default_value = "#000000")]
    color: String,

    #[arg(long, default_value_t = 2.0)]
    width: f64,

    #[arg(long, help = "Space-separated points, e.g. \"0,0 10,10 20,5\"")]
    points: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ping => run_ping(&cli.url).await,
        Command::Rooms => run_rooms(&cli.url).await,
        Command::Watch => session::watch(&session::ws_url(&cli.url, &cli.room)?).await,
        Command::Draw(args) => {
            let points = session::parse_points(&args.points)?;
            let ws_url = session::ws_url(&cli.url, &cli.room)?;
            let op = session::draw(&ws_url, args.tool, args.color, args.width, points).await?;
            println!("{} seq={}", op.op_id, op.seq);
            Ok(())
        }
        Command::Undo { op_id } => {
            session::undo(&session::ws_url(&cli.url, &cli.room)?, op_id.clone()).await?;
            println!("undone {op_id}");
            Ok(())
        }
        Command::Redo { op_id } => {
            let op = session::redo(&session::ws_url(&cli.url, &cli.room)?, op_id).await?;
            println!("redone {} seq={}", op.op_id, op.seq);
            Ok(())
        }
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

async fn run_rooms(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/api/rooms", base_url.trim_end_matches('/'));
    let response = reqwest::get(url).await?;
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: value.to_string() });
    }
    print_json(&value)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
