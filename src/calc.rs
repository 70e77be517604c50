use crate::model::EnrollmentRecord;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Courses with an id below this grade on a 0..10 scale; the rest use 0..20.
pub const UPPER_SCALE_COURSE_THRESHOLD: i64 = 7;
/// An attendance adjustment strictly between 0 and this value triggers the penalty.
pub const ATTENDANCE_PENALTY_THRESHOLD: f64 = 10.0;
pub const ATTENDANCE_PENALTY_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CalcError {}

pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Integer rounding with halves going up (`2.5 -> 3`, `-2.5 -> -2`).
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Mean of the present, finite values rounded to 2 decimals; 0 when none remain.
pub fn average_of<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count: usize = 0;
    for v in values.into_iter().flatten() {
        if v.is_nan() {
            continue;
        }
        sum += v;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    round_2_decimals(sum / (count as f64))
}

pub fn final_grade(mt1: f64, mt2: f64, mt3: f64, attendance: Option<f64>) -> f64 {
    let graded: Vec<f64> = [mt1, mt2, mt3].into_iter().filter(|m| *m > 0.0).collect();
    if graded.is_empty() {
        return 0.0;
    }
    let mut mean = graded.iter().sum::<f64>() / (graded.len() as f64);
    if let Some(a) = attendance {
        if a > 0.0 && a < ATTENDANCE_PENALTY_THRESHOLD {
            mean *= ATTENDANCE_PENALTY_FACTOR;
        }
    }
    round_half_up(mean)
}

pub fn score_ceiling(course_id: i64) -> f64 {
    if course_id < UPPER_SCALE_COURSE_THRESHOLD {
        10.0
    } else {
        20.0
    }
}

/// Parses a raw score as typed into the grid and clamps it to `[0, ceiling]`.
/// Blank input is a 0.
pub fn clamp_score_input(course_id: i64, input: &str) -> Result<f64, CalcError> {
    let t = input.trim();
    if t.is_empty() {
        return Ok(0.0);
    }
    let v: f64 = t.parse().map_err(|_| {
        CalcError::new("bad_params", "score must be numeric")
            .with_details(serde_json::json!({ "value": input }))
    })?;
    if v.is_nan() {
        return Err(CalcError::new("bad_params", "score must be numeric")
            .with_details(serde_json::json!({ "value": input })));
    }
    Ok(v.clamp(0.0, score_ceiling(course_id)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    First,
    Second,
    Third,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::First, Term::Second, Term::Third];

    pub fn raw_scores(self, r: &EnrollmentRecord) -> [Option<f64>; 3] {
        match self {
            Term::First => [r.mac1, r.npp1, r.npt1],
            Term::Second => [r.mac2, r.npp2, r.npt2],
            Term::Third => [r.mac3, r.npp3, r.npt3],
        }
    }

    fn average_slot(self, r: &mut EnrollmentRecord) -> &mut f64 {
        match self {
            Term::First => &mut r.mt1,
            Term::Second => &mut r.mt2,
            Term::Third => &mut r.mt3,
        }
    }
}

/// Grid columns a user may type into. Term averages and the final grade are
/// derived and never edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Mac1,
    Npp1,
    Npt1,
    Mac2,
    Npp2,
    Npt2,
    Mac3,
    Npp3,
    Npt3,
    Mfa,
    Mfd,
}

impl ScoreField {
    pub fn name(self) -> &'static str {
        match self {
            ScoreField::Mac1 => "mac1",
            ScoreField::Npp1 => "npp1",
            ScoreField::Npt1 => "npt1",
            ScoreField::Mac2 => "mac2",
            ScoreField::Npp2 => "npp2",
            ScoreField::Npt2 => "npt2",
            ScoreField::Mac3 => "mac3",
            ScoreField::Npp3 => "npp3",
            ScoreField::Npt3 => "npt3",
            ScoreField::Mfa => "mfa",
            ScoreField::Mfd => "mfd",
        }
    }

    /// The term average this field feeds, if any.
    pub fn term(self) -> Option<Term> {
        match self {
            ScoreField::Mac1 | ScoreField::Npp1 | ScoreField::Npt1 => Some(Term::First),
            ScoreField::Mac2 | ScoreField::Npp2 | ScoreField::Npt2 => Some(Term::Second),
            ScoreField::Mac3 | ScoreField::Npp3 | ScoreField::Npt3 => Some(Term::Third),
            ScoreField::Mfa | ScoreField::Mfd => None,
        }
    }

    fn slot(self, r: &mut EnrollmentRecord) -> &mut Option<f64> {
        match self {
            ScoreField::Mac1 => &mut r.mac1,
            ScoreField::Npp1 => &mut r.npp1,
            ScoreField::Npt1 => &mut r.npt1,
            ScoreField::Mac2 => &mut r.mac2,
            ScoreField::Npp2 => &mut r.npp2,
            ScoreField::Npt2 => &mut r.npt2,
            ScoreField::Mac3 => &mut r.mac3,
            ScoreField::Npp3 => &mut r.npp3,
            ScoreField::Npt3 => &mut r.npt3,
            ScoreField::Mfa => &mut r.mfa,
            ScoreField::Mfd => &mut r.mfd,
        }
    }
}

impl FromStr for ScoreField {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mac1" => Ok(ScoreField::Mac1),
            "npp1" => Ok(ScoreField::Npp1),
            "npt1" => Ok(ScoreField::Npt1),
            "mac2" => Ok(ScoreField::Mac2),
            "npp2" => Ok(ScoreField::Npp2),
            "npt2" => Ok(ScoreField::Npt2),
            "mac3" => Ok(ScoreField::Mac3),
            "npp3" => Ok(ScoreField::Npp3),
            "npt3" => Ok(ScoreField::Npt3),
            "mfa" => Ok(ScoreField::Mfa),
            "mfd" => Ok(ScoreField::Mfd),
            other => Err(CalcError::new(
                "bad_params",
                "field must be one of: mac1..npt3, mfa, mfd",
            )
            .with_details(serde_json::json!({ "field": other }))),
        }
    }
}

pub fn recompute_term(r: &mut EnrollmentRecord, term: Term) {
    let avg = average_of(term.raw_scores(r));
    *term.average_slot(r) = avg;
}

pub fn recompute_final(r: &mut EnrollmentRecord) {
    r.mf = final_grade(r.mt1, r.mt2, r.mt3, r.mfa);
}

/// Recomputes every derived field of a freshly fetched record.
pub fn derive_all(r: &mut EnrollmentRecord) {
    for term in Term::ALL {
        recompute_term(r, term);
    }
    recompute_final(r);
}

/// Stores an already-clamped value and recomputes only what depends on it.
pub fn apply_edit(r: &mut EnrollmentRecord, field: ScoreField, value: f64) {
    *field.slot(r) = Some(value);
    if let Some(term) = field.term() {
        recompute_term(r, term);
    }
    recompute_final(r);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Standing {
    Approved,
    Recovery,
    Failed,
}

/// Standing implied by the final grade on the course's scale.
pub fn grade_standing(course_id: i64, mf: f64) -> Standing {
    let pass = score_ceiling(course_id) / 2.0;
    if mf >= pass {
        Standing::Approved
    } else if mf > pass - 1.0 {
        Standing::Recovery
    } else {
        Standing::Failed
    }
}

/// Standing implied by the backend's status label.
pub fn status_standing(label: &str) -> Standing {
    match label {
        "Aprovado" => Standing::Approved,
        "Recuperação" => Standing::Recovery,
        _ => Standing::Failed,
    }
}
