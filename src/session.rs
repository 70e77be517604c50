//! Grade-entry session: selection, loaded roster and in-flight markers.
//!
//! Network operations are split into `begin_*` (checks, in-flight marking,
//! request capture) and `finish_*` (apply the outcome). Nothing here performs
//! I/O other than the draft store passed in by the caller.

use crate::api::{ApiError, RosterQuery};
use crate::calc::{self, CalcError, ScoreField};
use crate::drafts::{self, DraftKey};
use crate::model::{CourseSubjectClass, EnrollmentRecord, LookupData, Notice, RosterSnapshot};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("select a course and a subject first")]
    SelectionRequired,
    #[error("there are unsaved changes")]
    UnsavedChanges,
    #[error("subject {subject_id} not found for course {course_id}")]
    SubjectNotFound { course_id: i64, subject_id: i64 },
    #[error("no roster loaded")]
    NoRoster,
    #[error("record {0} not found")]
    RecordNotFound(i64),
    #[error("record {0} has no course/subject link")]
    MissingLink(i64),
    #[error("no records have a course/subject link")]
    NoValidRecords,
    #[error("nothing to save")]
    NothingToSave,
    #[error("a save is already in progress")]
    SaveInProgress,
    #[error("a roster fetch is already in progress")]
    FetchInProgress,
    #[error(transparent)]
    Input(#[from] CalcError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    pub fn code(&self) -> &str {
        match self {
            SessionError::SelectionRequired => "selection_required",
            SessionError::UnsavedChanges => "unsaved_changes",
            SessionError::SubjectNotFound { .. } | SessionError::RecordNotFound(_) => "not_found",
            SessionError::NoRoster => "no_roster",
            SessionError::MissingLink(_) | SessionError::NoValidRecords => "validation_failed",
            SessionError::NothingToSave => "nothing_to_save",
            SessionError::SaveInProgress => "save_in_progress",
            SessionError::FetchInProgress => "fetch_in_progress",
            SessionError::Input(e) => e.code.as_str(),
            SessionError::Api(_) => "api_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::Input(e) => e.details.clone(),
            SessionError::RecordNotFound(id) | SessionError::MissingLink(id) => {
                Some(serde_json::json!({ "recordId": id }))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub course_id: i64,
    pub subject_id: i64,
}

impl Selection {
    /// Drafts are only addressable once both ids are chosen.
    pub fn draft_key(&self) -> Option<DraftKey> {
        if self.course_id == 0 || self.subject_id == 0 {
            return None;
        }
        Some(DraftKey::new(self.subject_id, self.course_id))
    }
}

#[derive(Debug, Default)]
pub struct Session {
    pub lookup: LookupData,
    pub selection: Selection,
    pub roster: Option<RosterSnapshot>,
    pub unsaved: bool,
    pub loading: bool,
    pub saving: BTreeSet<i64>,
    pub saving_all: bool,
}

#[derive(Debug, Clone)]
pub struct RosterFetch {
    pub key: DraftKey,
    pub query: RosterQuery,
}

#[derive(Debug, Clone)]
pub struct BulkSave {
    pub key: Option<DraftKey>,
    pub records: Vec<EnrollmentRecord>,
    pub skipped: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSaveOutcome {
    pub saved: usize,
    pub skipped: Vec<i64>,
    pub notices: Vec<Notice>,
}

impl Session {
    pub fn set_lookup(&mut self, lookup: LookupData) {
        self.lookup = lookup;
    }

    /// Subject/class descriptors offered for a course.
    pub fn subjects_for_course(&self, course_id: i64) -> Vec<&CourseSubjectClass> {
        self.lookup
            .subjects
            .iter()
            .filter(|s| s.course_id == course_id)
            .collect()
    }

    pub fn selected_subject(&self) -> Option<&CourseSubjectClass> {
        self.lookup
            .subjects
            .iter()
            .find(|s| s.subject_id == self.selection.subject_id)
    }

    /// Changes the selection and loads the stored draft for it, if any.
    /// Returns whether a draft replaced the in-memory roster.
    pub fn select(&mut self, store: Option<&Connection>, course_id: i64, subject_id: i64) -> bool {
        self.selection = Selection {
            course_id,
            subject_id,
        };
        let (Some(key), Some(conn)) = (self.selection.draft_key(), store) else {
            return false;
        };
        match drafts::load(conn, key) {
            Ok(Some(snapshot)) => {
                self.roster = Some(snapshot);
                self.unsaved = false;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(key = %key, error = %e, "draft read failed");
                false
            }
        }
    }

    pub fn begin_fetch(&mut self, discard_unsaved: bool) -> Result<RosterFetch, SessionError> {
        let Some(key) = self.selection.draft_key() else {
            return Err(SessionError::SelectionRequired);
        };
        if self.loading {
            return Err(SessionError::FetchInProgress);
        }
        if self.unsaved && !discard_unsaved {
            return Err(SessionError::UnsavedChanges);
        }
        let Some(subject) = self.selected_subject() else {
            return Err(SessionError::SubjectNotFound {
                course_id: self.selection.course_id,
                subject_id: self.selection.subject_id,
            });
        };
        let query = RosterQuery {
            course_id: self.selection.course_id,
            subject_id: self.selection.subject_id,
            course_subject_id: subject.course_subject_id,
        };
        self.loading = true;
        Ok(RosterFetch { key, query })
    }

    /// Applies a roster response: derives computed fields, writes the draft
    /// under the key captured at `begin_fetch`, and replaces the in-memory
    /// roster unless the selection moved on meanwhile.
    pub fn finish_fetch(
        &mut self,
        store: Option<&Connection>,
        fetch: &RosterFetch,
        result: Result<RosterSnapshot, ApiError>,
    ) -> Result<Notice, SessionError> {
        self.loading = false;
        let mut snapshot = result?;
        for rec in snapshot.enrollments.iter_mut() {
            calc::derive_all(rec);
        }
        write_draft(store, fetch.key, &snapshot);

        let count = snapshot.enrollments.len();
        if self.selection.draft_key() == Some(fetch.key) {
            self.roster = Some(snapshot);
            self.unsaved = false;
        } else {
            info!(key = %fetch.key, "selection changed during fetch; roster kept as draft only");
        }
        Ok(Notice::success(format!("{count} students loaded")))
    }

    /// Applies one grid edit and writes the whole roster through to the
    /// draft store.
    pub fn edit(
        &mut self,
        store: Option<&Connection>,
        record_id: i64,
        field: ScoreField,
        input: &str,
    ) -> Result<&EnrollmentRecord, SessionError> {
        let course_id = self.selection.course_id;
        let key = self.selection.draft_key();
        let value = calc::clamp_score_input(course_id, input)?;

        let Some(roster) = self.roster.as_mut() else {
            return Err(SessionError::NoRoster);
        };
        let Some(idx) = roster.enrollments.iter().position(|r| r.id == record_id) else {
            return Err(SessionError::RecordNotFound(record_id));
        };
        calc::apply_edit(&mut roster.enrollments[idx], field, value);

        if let Some(key) = key {
            write_draft(store, key, roster);
        }
        self.unsaved = true;
        Ok(&roster.enrollments[idx])
    }

    pub fn record(&self, record_id: i64) -> Option<&EnrollmentRecord> {
        self.roster
            .as_ref()
            .and_then(|r| r.enrollments.iter().find(|e| e.id == record_id))
    }

    /// Marks a record as saving and returns the copy to submit.
    pub fn begin_save_record(&mut self, record_id: i64) -> Result<EnrollmentRecord, SessionError> {
        if self.roster.is_none() {
            return Err(SessionError::NoRoster);
        }
        let Some(rec) = self.record(record_id).cloned() else {
            return Err(SessionError::RecordNotFound(record_id));
        };
        if self.saving.contains(&record_id) {
            return Err(SessionError::SaveInProgress);
        }
        if !rec.has_course_subject_link() {
            return Err(SessionError::MissingLink(record_id));
        }
        self.saving.insert(record_id);
        Ok(rec)
    }

    /// Clears the in-flight marker. The bulk draft is left untouched.
    pub fn finish_save_record(
        &mut self,
        record: &EnrollmentRecord,
        result: Result<(), ApiError>,
    ) -> Result<Notice, SessionError> {
        self.saving.remove(&record.id);
        result?;
        Ok(Notice::success(format!(
            "grades for {} saved",
            record.student_name
        )))
    }

    pub fn begin_save_all(&mut self) -> Result<BulkSave, SessionError> {
        let Some(roster) = self.roster.as_ref().filter(|r| !r.enrollments.is_empty()) else {
            return Err(SessionError::NothingToSave);
        };
        if self.saving_all {
            return Err(SessionError::SaveInProgress);
        }
        let (records, invalid): (Vec<_>, Vec<_>) = roster
            .enrollments
            .iter()
            .cloned()
            .partition(EnrollmentRecord::has_course_subject_link);
        if records.is_empty() {
            return Err(SessionError::NoValidRecords);
        }
        self.saving_all = true;
        Ok(BulkSave {
            key: self.selection.draft_key(),
            records,
            skipped: invalid.iter().map(|r| r.id).collect(),
        })
    }

    /// On success the draft for the key captured at `begin_save_all` is
    /// removed.
    pub fn finish_save_all(
        &mut self,
        store: Option<&Connection>,
        save: &BulkSave,
        result: Result<(), ApiError>,
    ) -> Result<BulkSaveOutcome, SessionError> {
        self.saving_all = false;
        result?;

        if let (Some(key), Some(conn)) = (save.key, store) {
            if let Err(e) = drafts::remove(conn, key) {
                warn!(key = %key, error = %e, "draft removal failed");
            }
        }
        if save.key.is_none() || self.selection.draft_key() == save.key {
            self.unsaved = false;
        }

        let mut notices = Vec::new();
        if !save.skipped.is_empty() {
            notices.push(Notice::warning(format!(
                "{} students skipped: missing course/subject link",
                save.skipped.len()
            )));
        }
        notices.push(Notice::success(format!(
            "{} students saved",
            save.records.len()
        )));
        Ok(BulkSaveOutcome {
            saved: save.records.len(),
            skipped: save.skipped.clone(),
            notices,
        })
    }
}

fn write_draft(store: Option<&Connection>, key: DraftKey, snapshot: &RosterSnapshot) {
    let Some(conn) = store else {
        return;
    };
    if let Err(e) = drafts::put(conn, key, snapshot) {
        warn!(key = %key, error = %e, "draft write failed");
    }
}
