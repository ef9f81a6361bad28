//! Dispatch endpoints.
//!
//! All endpoints speak JSON and answer 200 on normal responses (including
//! `RETRY` and `ALL_WORK_COMPLETE`), 400 on malformed requests, and 500
//! when an authoritative file fails underneath us.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::dispatch::IssueOutcome;
use crate::protocol::{
    GetWorkRequest, GetWorkResponse, StatusResponse, SubmitRequest, SubmitResponse,
    WorkTimeoutRequest, WorkTimeoutResponse,
};

use super::AppState;

/// Create the dispatch router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/get_work", post(get_work))
        .route("/submit_result", post(submit_result))
        .route("/work_timeout", post(work_timeout))
        .route("/status", get(status))
        .with_state(state)
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal server error" })),
    )
        .into_response()
}

/// `POST /get_work`: issue up to `batch_size` items to the caller.
async fn get_work(
    State(state): State<AppState>,
    payload: Result<Json<GetWorkRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return bad_request("malformed request body");
    };
    if request.batch_size < 1 {
        return bad_request("batch_size must be at least 1");
    }

    let outcome = state
        .with_core(move |tracker| tracker.issue(request.batch_size, Instant::now()))
        .await;
    match outcome {
        Ok(IssueOutcome::Items(items)) => Json(GetWorkResponse::Ok { items }).into_response(),
        Ok(IssueOutcome::Retry { retry_in }) => {
            Json(GetWorkResponse::Retry { retry_in }).into_response()
        }
        Ok(IssueOutcome::AllWorkComplete) => Json(GetWorkResponse::AllWorkComplete).into_response(),
        Err(err) => {
            state.record_fatal(&err);
            internal_error()
        }
    }
}

/// `POST /submit_result`: accept completed results.
async fn submit_result(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return bad_request("malformed request body");
    };

    let items = request.items;
    let accepted = state.with_core(move |tracker| tracker.submit(items)).await;
    match accepted {
        Ok(count) => Json(SubmitResponse::ok(count as u64)).into_response(),
        Err(err) => {
            state.record_fatal(&err);
            internal_error()
        }
    }
}

/// `POST /work_timeout`: change the issuance timeout at runtime.
async fn work_timeout(
    State(state): State<AppState>,
    payload: Result<Json<WorkTimeoutRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return bad_request("malformed request body");
    };
    if request.timeout < 1 {
        return bad_request("timeout must be at least 1 second");
    }

    let timeout = state
        .with_core(move |tracker| tracker.set_work_timeout(request.timeout))
        .await;
    // Wake the sweeper so the new value is applied without waiting out the
    // previous interval.
    state.sweep_wake.notify_one();
    Json(WorkTimeoutResponse::ok(timeout)).into_response()
}

/// `GET /status`: report queue counters.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.with_core(|tracker| tracker.snapshot()).await;
    Json(StatusResponse {
        pending: snapshot.pending,
        issued: snapshot.issued,
        completed: snapshot.completed,
        tombstoned: snapshot.tombstoned,
        input_exhausted: snapshot.input_exhausted,
    })
}
