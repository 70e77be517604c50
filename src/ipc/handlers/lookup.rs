use super::{param_i64, required_i64};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{Reply, Request, SharedState};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

fn handle_lookup_load(state: &SharedState, req: &Request) -> Reply {
    let api = state.lock().api.clone();
    let state = Arc::clone(state);
    let id = req.id.clone();
    Reply::Later(Box::pin(async move {
        match api.lookup().await {
            Ok(lookup) => {
                info!(
                    courses = lookup.courses.len(),
                    subjects = lookup.subjects.len(),
                    "lookup data loaded"
                );
                let result = json!({
                    "courses": lookup.courses,
                    "subjects": lookup.subjects,
                });
                state.lock().session.set_lookup(lookup);
                ok(&id, result)
            }
            Err(e) => {
                error!(error = %e, "lookup load failed");
                err(&id, "api_failed", e.to_string(), None)
            }
        }
    }))
}

fn handle_courses_list(state: &SharedState, req: &Request) -> serde_json::Value {
    let st = state.lock();
    ok(&req.id, json!({ "courses": st.session.lookup.courses }))
}

fn handle_subjects_list(state: &SharedState, req: &Request) -> serde_json::Value {
    let course_id = match param_i64(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let st = state.lock();
    let course_id = course_id.unwrap_or(st.session.selection.course_id);
    ok(
        &req.id,
        json!({
            "courseId": course_id,
            "subjects": st.session.subjects_for_course(course_id),
        }),
    )
}

fn handle_selection_set(state: &SharedState, req: &Request) -> serde_json::Value {
    let course_id = match required_i64(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let subject_id = match required_i64(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let mut guard = state.lock();
    let st = &mut *guard;
    let restored = st.session.select(st.db.as_ref(), course_id, subject_id);
    ok(
        &req.id,
        json!({
            "selection": st.session.selection,
            "restoredDraft": restored,
            "rosterLoaded": st.session.roster.is_some(),
            "unsaved": st.session.unsaved,
        }),
    )
}

pub fn try_handle(state: &SharedState, req: &Request) -> Option<Reply> {
    match req.method.as_str() {
        "lookup.load" => Some(handle_lookup_load(state, req)),
        "courses.list" => Some(Reply::Now(handle_courses_list(state, req))),
        "subjects.list" => Some(Reply::Now(handle_subjects_list(state, req))),
        "selection.set" => Some(Reply::Now(handle_selection_set(state, req))),
        _ => None,
    }
}
