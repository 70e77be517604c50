use super::{param_bool, RecordView};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{Reply, Request, SharedState};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

fn handle_roster_fetch(state: &SharedState, req: &Request) -> Reply {
    let discard = match param_bool(req, "discardUnsaved") {
        Ok(v) => v.unwrap_or(false),
        Err(e) => return Reply::Now(e.response(&req.id)),
    };
    let (fetch, api) = {
        let mut st = state.lock();
        match st.session.begin_fetch(discard) {
            Ok(f) => (f, st.api.clone()),
            Err(e) => return Reply::Now(HandlerErr::from(e).response(&req.id)),
        }
    };

    let state = Arc::clone(state);
    let id = req.id.clone();
    Reply::Later(Box::pin(async move {
        let result = api.roster(fetch.query).await;
        if let Err(e) = &result {
            error!(key = %fetch.key, error = %e, "roster fetch failed");
        }

        let mut guard = state.lock();
        let st = &mut *guard;
        match st.session.finish_fetch(st.db.as_ref(), &fetch, result) {
            Ok(notice) => {
                info!(key = %fetch.key, "{}", notice.message);
                ok(
                    &id,
                    json!({
                        "key": fetch.key.to_string(),
                        "current": st.session.selection.draft_key() == Some(fetch.key),
                        "notice": notice,
                    }),
                )
            }
            Err(e) => HandlerErr::from(e).response(&id),
        }
    }))
}

fn handle_roster_get(state: &SharedState, req: &Request) -> serde_json::Value {
    let st = state.lock();
    let s = &st.session;
    let roster = s.roster.as_ref().map(|r| {
        json!({
            "turmas": r.subjects,
            "matriculas": r.enrollments.iter().map(RecordView::new).collect::<Vec<_>>(),
        })
    });
    ok(
        &req.id,
        json!({
            "selection": s.selection,
            "subject": s.selected_subject(),
            "roster": roster,
            "unsaved": s.unsaved,
            "loading": s.loading,
        }),
    )
}

pub fn try_handle(state: &SharedState, req: &Request) -> Option<Reply> {
    match req.method.as_str() {
        "roster.fetch" => Some(handle_roster_fetch(state, req)),
        "roster.get" => Some(Reply::Now(handle_roster_get(state, req))),
        _ => None,
    }
}
