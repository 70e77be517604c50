pub mod core;
pub mod drafts;
pub mod grades;
pub mod lookup;
pub mod roster;
mod views;

use crate::ipc::error::HandlerErr;
use crate::ipc::types::Request;

pub(crate) use views::RecordView;

fn param_i64(req: &Request, name: &str) -> Result<Option<i64>, HandlerErr> {
    match req.params.get(name) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("params.{name} must be an integer"))),
    }
}

fn required_i64(req: &Request, name: &str) -> Result<i64, HandlerErr> {
    param_i64(req, name)?.ok_or_else(|| HandlerErr::bad_params(format!("missing params.{name}")))
}

fn param_bool(req: &Request, name: &str) -> Result<Option<bool>, HandlerErr> {
    match req.params.get(name) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("params.{name} must be a boolean"))),
    }
}
