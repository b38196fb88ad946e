use std::sync::Arc;

use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::{Validate, ValidationError};

use crate::db::create_assessment;
use crate::debounce::{SubmissionGuard, SubmissionKey};
use crate::error::AppError;
use crate::models::{
    FirstLevelAnswer, MacroTheme, NewAssessment, ReportFilter, SecondLevelAnswer,
};
use crate::questionnaire::Questionnaire;
use crate::report::{Report, generate_report};
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt};

pub type SharedSubmissionGuard = Arc<dyn SubmissionGuard>;

pub const SUBMISSION_CREATED_MESSAGE: &str = "Assessment registered successfully";
pub const SUBMISSION_DUPLICATE_MESSAGE: &str = "Assessment already registered recently";

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
pub struct QuestionnaireResponse {
    pub questionnaire: Vec<MacroTheme>,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct FirstLevelAnswerRequest {
    pub theme_id: i64,
    pub selected: bool,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct SecondLevelAnswerRequest {
    pub sub_theme_id: i64,
    #[validate(range(min = 0, max = 4, message = "Discomfort level must be between 0 and 4"))]
    pub discomfort_level: i64,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct AssessmentRequest {
    #[validate(custom(function = "not_blank", message = "Company is required"))]
    pub company: String,
    #[validate(custom(function = "not_blank", message = "Department is required"))]
    pub department: String,
    #[serde(default)]
    pub role: Option<String>,
    #[validate(nested)]
    pub first_level_answers: Vec<FirstLevelAnswerRequest>,
    #[validate(nested)]
    pub second_level_answers: Vec<SecondLevelAnswerRequest>,
}

impl AssessmentRequest {
    /// Rejects answers that point outside the questionnaire.
    fn check_references(&self, questionnaire: &Questionnaire) -> Result<(), AppError> {
        if let Some(answer) = self
            .first_level_answers
            .iter()
            .find(|a| questionnaire.theme(a.theme_id).is_none())
        {
            return Err(AppError::Validation(format!(
                "Unknown theme id {}",
                answer.theme_id
            )));
        }

        if let Some(answer) = self
            .second_level_answers
            .iter()
            .find(|a| questionnaire.sub_theme(a.sub_theme_id).is_none())
        {
            return Err(AppError::Validation(format!(
                "Unknown sub-theme id {}",
                answer.sub_theme_id
            )));
        }

        Ok(())
    }
}

impl From<AssessmentRequest> for NewAssessment {
    fn from(request: AssessmentRequest) -> Self {
        Self {
            company: request.company.trim().to_string(),
            department: request.department.trim().to_string(),
            role: request
                .role
                .map(|role| role.trim().to_string())
                .filter(|role| !role.is_empty()),
            first_level_answers: request
                .first_level_answers
                .into_iter()
                .map(|a| FirstLevelAnswer {
                    theme_id: a.theme_id,
                    selected: a.selected,
                })
                .collect(),
            second_level_answers: request
                .second_level_answers
                .into_iter()
                .map(|a| SecondLevelAnswer {
                    sub_theme_id: a.sub_theme_id,
                    discomfort_level: a.discomfort_level,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub duplicate: bool,
}

#[get("/questionnaire")]
pub async fn api_get_questionnaire(
    questionnaire: &State<Questionnaire>,
) -> Json<QuestionnaireResponse> {
    Json(QuestionnaireResponse {
        questionnaire: questionnaire.macro_themes().to_vec(),
    })
}

#[post("/assessments", data = "<submission>")]
pub async fn api_submit_assessment(
    submission: Result<Json<AssessmentRequest>, rocket::serde::json::Error<'_>>,
    db: &State<Pool<Sqlite>>,
    questionnaire: &State<Questionnaire>,
    guard: &State<SharedSubmissionGuard>,
) -> Result<Custom<Json<SubmissionResponse>>, ApiError> {
    let validated = submission.validate_custom()?;
    validated.check_references(questionnaire).validate_custom()?;

    let assessment = NewAssessment::from(validated);
    let key = SubmissionKey::new(&assessment.company, &assessment.department);

    if guard.is_duplicate(&key) {
        info!(company = %key.company, department = %key.department, "Ignoring duplicate submission");
        return Ok(Custom(
            Status::Ok,
            Json(SubmissionResponse {
                message: SUBMISSION_DUPLICATE_MESSAGE.to_string(),
                id: None,
                duplicate: true,
            }),
        ));
    }

    let id = create_assessment(db, &assessment).await.validate_custom()?;
    guard.record(key);

    Ok(Custom(
        Status::Created,
        Json(SubmissionResponse {
            message: SUBMISSION_CREATED_MESSAGE.to_string(),
            id: Some(id),
            duplicate: false,
        }),
    ))
}

#[get("/report?<company>&<department>")]
pub async fn api_get_report(
    company: Option<&str>,
    department: Option<&str>,
    db: &State<Pool<Sqlite>>,
    questionnaire: &State<Questionnaire>,
) -> Result<Json<Report>, ApiError> {
    let filter = ReportFilter::new(company, department);
    let report = generate_report(db, questionnaire, filter)
        .await
        .validate_custom()?;

    Ok(Json(report))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
