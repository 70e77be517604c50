use super::{required_i64, RecordView};
use crate::calc::ScoreField;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{Reply, Request, SharedState};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

fn parse_edit(req: &Request) -> Result<(i64, ScoreField, String), HandlerErr> {
    let record_id = required_i64(req, "recordId")?;
    let field = req
        .params
        .get("field")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params("missing params.field"))?
        .parse::<ScoreField>()?;
    // Grid inputs send text; accept plain numbers too.
    let value = match req.params.get("value") {
        None => return Err(HandlerErr::bad_params("missing params.value")),
        Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(_) => return Err(HandlerErr::bad_params("params.value must be a string")),
    };
    Ok((record_id, field, value))
}

fn handle_grades_edit(state: &SharedState, req: &Request) -> serde_json::Value {
    let (record_id, field, value) = match parse_edit(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let mut guard = state.lock();
    let st = &mut *guard;
    match st.session.edit(st.db.as_ref(), record_id, field, &value) {
        Ok(record) => ok(
            &req.id,
            json!({
                "field": field.name(),
                "record": RecordView::new(record),
                "unsaved": true,
            }),
        ),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_save_record(state: &SharedState, req: &Request) -> Reply {
    let record_id = match required_i64(req, "recordId") {
        Ok(v) => v,
        Err(e) => return Reply::Now(e.response(&req.id)),
    };
    let (record, api) = {
        let mut st = state.lock();
        match st.session.begin_save_record(record_id) {
            Ok(r) => (r, st.api.clone()),
            Err(e) => {
                warn!(record_id, error = %e, "record save refused");
                return Reply::Now(HandlerErr::from(e).response(&req.id));
            }
        }
    };

    let state = Arc::clone(state);
    let id = req.id.clone();
    Reply::Later(Box::pin(async move {
        let result = api.submit(std::slice::from_ref(&record)).await;
        if let Err(e) = &result {
            error!(record_id, error = %e, "record save failed");
        }
        let mut st = state.lock();
        match st.session.finish_save_record(&record, result) {
            Ok(notice) => {
                info!(record_id, "{}", notice.message);
                ok(&id, json!({ "recordId": record_id, "notice": notice }))
            }
            Err(e) => HandlerErr::from(e).response(&id),
        }
    }))
}

fn handle_save_all(state: &SharedState, req: &Request) -> Reply {
    let (save, api) = {
        let mut st = state.lock();
        match st.session.begin_save_all() {
            Ok(s) => (s, st.api.clone()),
            Err(e) => {
                warn!(error = %e, "bulk save refused");
                return Reply::Now(HandlerErr::from(e).response(&req.id));
            }
        }
    };
    if !save.skipped.is_empty() {
        warn!(skipped = ?save.skipped, "records without course/subject link left out of bulk save");
    }

    let state = Arc::clone(state);
    let id = req.id.clone();
    Reply::Later(Box::pin(async move {
        let result = api.submit(&save.records).await;
        if let Err(e) = &result {
            error!(records = save.records.len(), error = %e, "bulk save failed");
        }
        let mut guard = state.lock();
        let st = &mut *guard;
        match st.session.finish_save_all(st.db.as_ref(), &save, result) {
            Ok(outcome) => {
                info!(saved = outcome.saved, "bulk save complete");
                ok(&id, json!(outcome))
            }
            Err(e) => HandlerErr::from(e).response(&id),
        }
    }))
}

pub fn try_handle(state: &SharedState, req: &Request) -> Option<Reply> {
    match req.method.as_str() {
        "grades.edit" => Some(Reply::Now(handle_grades_edit(state, req))),
        "grades.saveRecord" => Some(handle_save_record(state, req)),
        "grades.saveAll" => Some(handle_save_all(state, req)),
        _ => None,
    }
}
