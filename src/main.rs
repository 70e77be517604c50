mod api;
mod calc;
mod config;
mod db;
mod drafts;
mod ipc;
mod model;
mod session;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = std::env::var("GRADESHEETD_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    // stdout carries the IPC stream.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = config::load()?;
    init_tracing(cfg.log_json);

    let api = api::ApiClient::new(&cfg.api_base_url)?;
    let mut app = ipc::AppState::new(api);
    if let Some(path) = &cfg.workspace {
        match db::open_db(path) {
            Ok(conn) => {
                app.workspace = Some(path.clone());
                app.db = Some(conn);
            }
            // The client can still pick a workspace later.
            Err(e) => warn!(path = %path.display(), error = %e, "configured workspace unavailable"),
        }
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %cfg.api_base_url,
        "gradesheetd ready"
    );
    let state: ipc::SharedState = Arc::new(Mutex::new(app));

    let (tx, mut rx) = mpsc::unbounded_channel::<serde_json::Value>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(resp) = rx.recv().await {
            let line = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                debug!(error = %e, "unparseable request line");
                let _ = tx.send(serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }));
                continue;
            }
        };

        match ipc::handle_request(&state, req) {
            ipc::Reply::Now(resp) => {
                let _ = tx.send(resp);
            }
            ipc::Reply::Later(pending) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(pending.await);
                });
            }
        }
    }

    // In-flight API calls still answer before exit.
    drop(tx);
    let _ = writer.await;
    Ok(())
}
