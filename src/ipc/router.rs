use super::handlers;
use super::types::{Reply, Request, SharedState};
use crate::ipc::error::err;
use tracing::debug;

pub fn handle_request(state: &SharedState, req: Request) -> Reply {
    debug!(id = %req.id, method = %req.method, "dispatch");
    if let Some(reply) = handlers::core::try_handle(state, &req) {
        return reply;
    }
    if let Some(reply) = handlers::lookup::try_handle(state, &req) {
        return reply;
    }
    if let Some(reply) = handlers::roster::try_handle(state, &req) {
        return reply;
    }
    if let Some(reply) = handlers::grades::try_handle(state, &req) {
        return reply;
    }
    if let Some(reply) = handlers::drafts::try_handle(state, &req) {
        return reply;
    }

    Reply::Now(err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    ))
}
