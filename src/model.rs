//! Records exchanged with the records API and stored as drafts.
//!
//! Rust field names are English; the wire names are the API's own.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
}

/// One teachable unit: a subject taught to a class within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSubjectClass {
    #[serde(rename = "curso_id")]
    pub course_id: i64,
    #[serde(rename = "disciplina_id")]
    pub subject_id: i64,
    #[serde(rename = "designacao", default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(rename = "turma_id")]
    pub class_id: i64,
    #[serde(rename = "descricao", default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "id_curso_disciplina")]
    pub course_subject_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: i64,
    #[serde(rename = "id_curso", default, deserialize_with = "null_as_default")]
    pub course_id: i64,
    #[serde(rename = "id_disciplina", default, deserialize_with = "null_as_default")]
    pub subject_id: i64,
    #[serde(rename = "id_turma", default, deserialize_with = "null_as_default")]
    pub class_id: i64,
    #[serde(rename = "nome_aluno", default, deserialize_with = "null_as_default")]
    pub student_name: String,
    #[serde(rename = "numero_aluno", default)]
    pub student_number: Option<i64>,
    #[serde(rename = "situacao", default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(rename = "id_curso_disciplina", default)]
    pub course_subject_id: Option<i64>,

    #[serde(default)]
    pub mac1: Option<f64>,
    #[serde(default)]
    pub npp1: Option<f64>,
    #[serde(default)]
    pub npt1: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mt1: f64,

    #[serde(default)]
    pub mac2: Option<f64>,
    #[serde(default)]
    pub npp2: Option<f64>,
    #[serde(default)]
    pub npt2: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mt2: f64,

    #[serde(default)]
    pub mac3: Option<f64>,
    #[serde(default)]
    pub npp3: Option<f64>,
    #[serde(default)]
    pub npt3: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mt3: f64,

    /// Attendance adjustment.
    #[serde(default)]
    pub mfa: Option<f64>,
    /// Disciplinary adjustment.
    #[serde(default)]
    pub mfd: Option<f64>,
    /// Final grade.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mf: f64,
    #[serde(rename = "ano_curricular", default)]
    pub curricular_year: Option<i64>,
}

/// The API sends `null` for values it has not computed yet; those read as
/// the field's default, same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl EnrollmentRecord {
    /// A record can only be submitted once it links to a course-subject row.
    pub fn has_course_subject_link(&self) -> bool {
        matches!(self.course_subject_id, Some(id) if id != 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupData {
    #[serde(rename = "turmas", default)]
    pub subjects: Vec<CourseSubjectClass>,
    #[serde(rename = "cursos", default)]
    pub courses: Vec<Course>,
}

/// The roster for one (subject, course) selection. This is both the
/// `/turmas` response body and the draft payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    #[serde(rename = "turmas", default)]
    pub subjects: Vec<CourseSubjectClass>,
    #[serde(rename = "matriculas", default)]
    pub enrollments: Vec<EnrollmentRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Success,
    Warning,
}

/// User-facing outcome message attached to a successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}
