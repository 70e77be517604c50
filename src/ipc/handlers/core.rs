use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{Reply, Request, SharedState};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};

fn handle_health(state: &SharedState, req: &Request) -> serde_json::Value {
    let st = state.lock();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": st.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "apiBaseUrl": st.api.base_url(),
        }),
    )
}

fn handle_workspace_select(state: &SharedState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            info!(path = %path.display(), "workspace opened");
            let mut st = state.lock();
            st.workspace = Some(path.clone());
            st.db = Some(conn);
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "workspace open failed");
            err(&req.id, "db_open_failed", format!("{e:?}"), None)
        }
    }
}

fn handle_session_status(state: &SharedState, req: &Request) -> serde_json::Value {
    let st = state.lock();
    let s = &st.session;
    ok(
        &req.id,
        json!({
            "selection": s.selection,
            "rosterLoaded": s.roster.is_some(),
            "unsaved": s.unsaved,
            "loading": s.loading,
            "saving": s.saving,
            "savingAll": s.saving_all,
        }),
    )
}

pub fn try_handle(state: &SharedState, req: &Request) -> Option<Reply> {
    match req.method.as_str() {
        "health" => Some(Reply::Now(handle_health(state, req))),
        "workspace.select" => Some(Reply::Now(handle_workspace_select(state, req))),
        "session.status" => Some(Reply::Now(handle_session_status(state, req))),
        _ => None,
    }
}
