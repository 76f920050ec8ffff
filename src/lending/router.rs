use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, LoanStatus, StaffRole};
use super::intake::LoanSubmission;
use super::lifecycle::{LoanAction, TransitionError};
use super::repository::{ApplicationStore, CredentialsNotifier, PeriodStore, StoreError};
use super::service::{LendingError, LoanService};

/// Router builder exposing the loan pipeline and collections endpoints.
pub fn lending_router<S, P, N>(service: Arc<LoanService<S, P, N>>) -> Router
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/loans",
            post(submit_handler::<S, P, N>).get(list_handler::<S, P, N>),
        )
        .route("/api/v1/loans/:id", get(status_handler::<S, P, N>))
        .route("/api/v1/loans/:id/summary", get(summary_handler::<S, P, N>))
        .route(
            "/api/v1/loans/:id/transitions",
            post(transition_handler::<S, P, N>),
        )
        .route(
            "/api/v1/loans/:id/principal",
            put(reprice_handler::<S, P, N>),
        )
        .route(
            "/api/v1/periods/:reference/payments",
            post(payment_handler::<S, P, N>),
        )
        .route("/api/v1/periods/:reference/note", put(note_handler::<S, P, N>))
        .route(
            "/api/v1/collectors/:collector/periods",
            get(collector_handler::<S, P, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub role: StaffRole,
    #[serde(flatten)]
    pub action: LoanAction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepriceRequest {
    pub requested_principal: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NoteRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    pub status: LoanStatus,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn submit_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Json(submission): Json<LoanSubmission>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.submit(submission, today()) {
        Ok(application) => {
            (StatusCode::CREATED, Json(application.status_view())).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Path(id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.get(&ApplicationId(id)) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn summary_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Path(id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.loan_summary(&ApplicationId(id), today()) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.transition(&ApplicationId(id), &request.action, request.role, today()) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reprice_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Path(id): Path<String>,
    Json(request): Json<RepriceRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.reprice(&ApplicationId(id), request.requested_principal) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn payment_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Path(reference): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.post_payment(&reference, request.amount) {
        Ok(period) => (StatusCode::OK, Json(period.view(today()))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn note_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Path(reference): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.set_note(&reference, request.note) {
        Ok(period) => (StatusCode::OK, Json(period.view(today()))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.applications_by_status(query.status) {
        Ok(applications) => {
            let views: Vec<_> = applications
                .iter()
                .map(|application| application.status_view())
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn collector_handler<S, P, N>(
    State(service): State<Arc<LoanService<S, P, N>>>,
    Path(collector): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    P: PeriodStore + 'static,
    N: CredentialsNotifier + 'static,
{
    match service.periods_for_collector(&collector, today()) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Map every rejection onto a status code while preserving the precondition
/// message the core produced.
fn error_response(err: LendingError) -> Response {
    let status = match &err {
        LendingError::Validation(_) | LendingError::Pricing(_) | LendingError::Ledger(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LendingError::Transition(TransitionError::Forbidden { .. }) => StatusCode::FORBIDDEN,
        LendingError::Transition(TransitionError::InvalidSchedule(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LendingError::Transition(TransitionError::InvalidTransition { .. })
        | LendingError::RepriceNotAllowed(_) => StatusCode::CONFLICT,
        LendingError::ApplicationNotFound(_) | LendingError::PeriodNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        LendingError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        LendingError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        LendingError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let body = Json(json!({ "error": err.to_string() }));
    (status, body).into_response()
}
