use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::documents::{DocumentFile, DocumentGenerator};
use super::domain::{AdminId, ApplicationId, ApplicationForm, LessonId, ReviewAction, StudentId};
use super::notifier::Notifier;
use super::portal::{PortalLogin, PortalRegistration};
use super::service::{EnrollmentError, EnrollmentService, PaymentRequest};
use super::store::EnrollmentStore;

/// Router builder exposing the enrollment lifecycle over HTTP.
pub fn enrollment_router<S, N, D>(service: Arc<EnrollmentService<S, N, D>>) -> Router
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<S, N, D>))
        .route("/api/v1/applications", get(list_applications_handler::<S, N, D>))
        .route(
            "/api/v1/applications/:id",
            get(application_handler::<S, N, D>),
        )
        .route(
            "/api/v1/applications/:id/status",
            get(application_status_handler::<S, N, D>),
        )
        .route(
            "/api/v1/applications/:id/review",
            post(review_handler::<S, N, D>),
        )
        .route("/api/v1/students", get(list_students_handler::<S, N, D>))
        .route("/api/v1/students/:id", get(student_handler::<S, N, D>))
        .route(
            "/api/v1/students/:id/status",
            get(student_status_handler::<S, N, D>),
        )
        .route(
            "/api/v1/students/:id/payments",
            post(record_payment_handler::<S, N, D>),
        )
        .route("/api/v1/payments", get(list_payments_handler::<S, N, D>))
        .route(
            "/api/v1/payments/:id/verify",
            post(verify_payment_handler::<S, N, D>),
        )
        .route("/api/v1/lessons", post(schedule_lesson_handler::<S, N, D>))
        .route(
            "/api/v1/lessons/:id/complete",
            post(complete_lesson_handler::<S, N, D>),
        )
        .route(
            "/api/v1/applications/:id/summary",
            get(application_summary_handler::<S, N, D>),
        )
        .route("/api/v1/statistics", get(statistics_handler::<S, N, D>))
        .route("/api/v1/export/:kind", get(export_handler::<S, N, D>))
        .route("/api/v1/portal/register", post(portal_register_handler::<S, N, D>))
        .route("/api/v1/portal/login", post(portal_login_handler::<S, N, D>))
        .route(
            "/api/v1/portal/dashboard",
            post(portal_dashboard_handler::<S, N, D>),
        )
        .with_state(service)
}

fn error_response(error: EnrollmentError) -> Response {
    let status = match &error {
        EnrollmentError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EnrollmentError::NotFound(_) => StatusCode::NOT_FOUND,
        EnrollmentError::Permission(_) => StatusCode::FORBIDDEN,
        EnrollmentError::Conflict { .. } => StatusCode::CONFLICT,
        EnrollmentError::Document(_) | EnrollmentError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
        "code": error.code(),
    });
    (status, axum::Json(payload)).into_response()
}

fn attachment_response(file: DocumentFile) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response()
}

/// Query principal for admin endpoints. Session handling lives outside this
/// service, so callers pass the acting admin id explicitly.
#[derive(Debug, Deserialize)]
pub(crate) struct ReviewerQuery {
    reviewer_id: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusQuery {
    date_of_birth: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewBody {
    reviewer_id: u32,
    action: ReviewAction,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentBody {
    reviewer_id: u32,
    #[serde(flatten)]
    payment: PaymentRequest,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LessonBody {
    reviewer_id: u32,
    student_id: u32,
    instructor_id: u32,
    scheduled_date: NaiveDate,
    scheduled_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LessonCompleteBody {
    reviewer_id: u32,
    #[serde(default)]
    score: Option<u8>,
}

pub(crate) async fn submit_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    axum::Json(form): axum::Json<ApplicationForm>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    match service.submit_application(form, Utc::now().naive_utc()) {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(id): Path<u32>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| service.application(ApplicationId(id), &reviewer));
    match result {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_status_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(number): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    match service.application_status(&number, query.date_of_birth) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(id): Path<u32>,
    axum::Json(body): axum::Json<ReviewBody>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let outcome = service
        .require_admin(AdminId(body.reviewer_id))
        .and_then(|reviewer| {
            service.review(
                ApplicationId(id),
                body.action,
                &reviewer,
                body.notes,
                Utc::now().naive_utc(),
            )
        });
    match outcome {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_summary_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(id): Path<u32>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| service.export_application_summary(ApplicationId(id), &reviewer));
    match result {
        Ok(file) => attachment_response(file),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_applications_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| service.applications(&reviewer));
    match result {
        Ok(applications) => (StatusCode::OK, axum::Json(applications)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_students_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| service.students(&reviewer));
    match result {
        Ok(students) => (StatusCode::OK, axum::Json(students)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn student_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(id): Path<u32>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| service.student(StudentId(id), &reviewer));
    match result {
        Ok(student) => (StatusCode::OK, axum::Json(student)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn student_status_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(number): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    match service.student_status(&number, query.date_of_birth) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_payment_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(id): Path<u32>,
    axum::Json(body): axum::Json<PaymentBody>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(body.reviewer_id))
        .and_then(|receiver| {
            service.record_payment(StudentId(id), body.payment, &receiver, Utc::now().naive_utc())
        });
    match result {
        Ok((payment, student)) => (
            StatusCode::CREATED,
            axum::Json(json!({ "payment": payment, "student": student })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_payments_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| service.payments(&reviewer));
    match result {
        Ok(payments) => (StatusCode::OK, axum::Json(payments)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn verify_payment_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(id): Path<u32>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|verifier| service.verify_payment(super::domain::PaymentId(id), &verifier));
    match result {
        Ok(payment) => (StatusCode::OK, axum::Json(payment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn schedule_lesson_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    axum::Json(body): axum::Json<LessonBody>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(body.reviewer_id))
        .and_then(|scheduler| {
            service.schedule_lesson(
                StudentId(body.student_id),
                AdminId(body.instructor_id),
                body.scheduled_date,
                body.scheduled_time,
                &scheduler,
            )
        });
    match result {
        Ok(lesson) => (StatusCode::CREATED, axum::Json(lesson)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_lesson_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(id): Path<u32>,
    axum::Json(body): axum::Json<LessonCompleteBody>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(body.reviewer_id))
        .and_then(|scheduler| {
            service.complete_lesson(
                LessonId(id),
                body.score,
                &scheduler,
                Utc::now().date_naive(),
            )
        });
    match result {
        Ok((lesson, student)) => (
            StatusCode::OK,
            axum::Json(json!({ "lesson": lesson, "student": student })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn statistics_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| service.statistics(&reviewer));
    match result {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    Path(kind): Path<String>,
    Query(query): Query<ReviewerQuery>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    let result = service
        .require_admin(AdminId(query.reviewer_id))
        .and_then(|reviewer| match kind.as_str() {
            "applications" => service.export_applications(&reviewer),
            "students" => service.export_students(&reviewer),
            "payments" => service.export_payments(&reviewer),
            other => Err(EnrollmentError::Validation(format!(
                "unknown export kind {other}"
            ))),
        });
    match result {
        Ok(file) => attachment_response(file),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn portal_register_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    axum::Json(registration): axum::Json<PortalRegistration>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    match service.register_portal(registration, Utc::now().naive_utc()) {
        Ok(access) => (
            StatusCode::CREATED,
            axum::Json(json!({ "access_code": access.access_code })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn portal_login_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    axum::Json(login): axum::Json<PortalLogin>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    match service.portal_login(&login, Utc::now().naive_utc()) {
        Ok(student_id) => {
            (StatusCode::OK, axum::Json(json!({ "student_id": student_id }))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn portal_dashboard_handler<S, N, D>(
    State(service): State<Arc<EnrollmentService<S, N, D>>>,
    axum::Json(login): axum::Json<PortalLogin>,
) -> Response
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    match service.portal_dashboard(&login, Utc::now().naive_utc()) {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(error) => error_response(error),
    }
}
