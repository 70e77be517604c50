use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Deserialize;

use crate::api::ApiClient;
use crate::session::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub api: ApiClient,
    pub session: Session,
}

impl AppState {
    pub fn new(api: ApiClient) -> Self {
        Self {
            workspace: None,
            db: None,
            api,
            session: Session::default(),
        }
    }
}

pub type SharedState = Arc<Mutex<AppState>>;

pub type PendingReply = Pin<Box<dyn Future<Output = serde_json::Value> + Send + 'static>>;

/// Local methods answer immediately. Methods that call the records API do
/// their checks immediately and answer once the call completes.
pub enum Reply {
    Now(serde_json::Value),
    Later(PendingReply),
}
