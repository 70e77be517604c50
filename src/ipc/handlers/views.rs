use crate::calc::{grade_standing, status_standing, Standing};
use crate::model::EnrollmentRecord;
use serde::Serialize;

/// A record as shown in the grid, with its two standings.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a EnrollmentRecord,
    grade_standing: Standing,
    status_standing: Standing,
}

impl<'a> RecordView<'a> {
    pub(crate) fn new(record: &'a EnrollmentRecord) -> Self {
        Self {
            record,
            grade_standing: grade_standing(record.course_id, record.mf),
            status_standing: status_standing(&record.status),
        }
    }
}
