use crate::drafts;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{Reply, Request, SharedState};
use serde_json::json;

fn handle_drafts_list(state: &SharedState, req: &Request) -> serde_json::Value {
    let st = state.lock();
    let Some(conn) = st.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match drafts::list(conn) {
        Ok(entries) => ok(&req.id, json!({ "drafts": entries })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &SharedState, req: &Request) -> Option<Reply> {
    match req.method.as_str() {
        "drafts.list" => Some(Reply::Now(handle_drafts_list(state, req))),
        _ => None,
    }
}
