//! Transfer History HTTP Routes
//!
//! - `/getTransferHistory`: transfers since a start block
//! - `/getTransferHistoryByBlock`: transfers at exactly one block
//!
//! Both accept a GET query string or a POST form. Parameters are checked in
//! order (`code`, `direction`, `account`, then `start` / `block`) and the
//! first problem is reported. Every response is HTTP 200 with the outcome in
//! the body's `Status` field, including requests axum cannot decode. A
//! repeated parameter keeps its first value.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Form, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::HttpError;
use super::verification::VerificationCodes;
use crate::ledger::{Direction, QueryResult, TransferRecord, STATUS_SUCCESS};
use crate::observability::{log_event, Event};
use crate::service::TransferHistoryService;

const REQUEST_ID_HEADER: &str = "x-request-id";

// ==================
// Shared State
// ==================

/// State shared by the history handlers
pub struct HistoryState {
    pub service: Arc<TransferHistoryService>,
    pub codes: VerificationCodes,
}

impl HistoryState {
    pub fn new(service: Arc<TransferHistoryService>, codes: VerificationCodes) -> Self {
        Self { service, codes }
    }
}

// ==================
// Request/Response Types
// ==================

/// Raw request parameters; every field is optional so absence can be
/// reported with its own status code.
#[derive(Debug, Default)]
pub struct HistoryParams {
    pub code: Option<String>,
    pub direction: Option<String>,
    pub account: Option<String>,
    pub start: Option<String>,
    pub block: Option<String>,
}

/// Decoded request pairs, in request order
type RawPairs = Vec<(String, String)>;

struct ValidatedParams {
    direction: Direction,
    account: String,
}

impl HistoryParams {
    /// Collect known parameters from decoded pairs; the first occurrence of
    /// a key wins and unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "code" => &mut params.code,
                "direction" => &mut params.direction,
                "account" => &mut params.account,
                "start" => &mut params.start,
                "block" => &mut params.block,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    fn decoded(pairs: Result<RawPairs, String>) -> Result<Self, HttpError> {
        pairs.map(Self::from_pairs).map_err(|reason| HttpError::InvalidParam {
            name: "request",
            reason,
        })
    }

    fn validate(&self, codes: &VerificationCodes) -> Result<ValidatedParams, HttpError> {
        let code = required(&self.code, "code")?;
        if !codes.contains(code) {
            return Err(HttpError::InvalidVerificationCode);
        }

        let raw = required(&self.direction, "direction")?;
        let value: i64 = raw.parse().map_err(|_| HttpError::InvalidParam {
            name: "direction",
            reason: format!("fail to parse transfer direction {}", raw),
        })?;
        let direction = Direction::from_code(value).ok_or(HttpError::InvalidDirection(value))?;

        let account = required(&self.account, "account")?.to_string();
        Ok(ValidatedParams { direction, account })
    }

    fn block_number(value: &Option<String>, name: &'static str) -> Result<u64, HttpError> {
        let raw = required(value, name)?;
        raw.parse().map_err(|e| HttpError::InvalidParam {
            name,
            reason: format!("fail to parse block param, {}", e),
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, HttpError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(HttpError::MissingParam(name)),
    }
}

/// Body of `/getTransferHistory`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransferHistoryResponse {
    pub status: u16,
    pub msg: String,
    pub head_block_height: String,
    pub max_block_height: String,
    pub list: Vec<TransferRecord>,
}

impl TransferHistoryResponse {
    fn rejected(err: &HttpError) -> Self {
        Self {
            status: err.code(),
            msg: err.to_string(),
            ..Default::default()
        }
    }
}

impl From<QueryResult> for TransferHistoryResponse {
    fn from(result: QueryResult) -> Self {
        match result.error {
            Some(e) => Self {
                status: e.code(),
                msg: e.to_string(),
                ..Default::default()
            },
            None => Self {
                status: STATUS_SUCCESS,
                msg: String::new(),
                head_block_height: result.watermark.to_string(),
                max_block_height: result.max_query_block_height.to_string(),
                list: result.records,
            },
        }
    }
}

/// Body of `/getTransferHistoryByBlock`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockTransferHistoryResponse {
    pub status: u16,
    pub msg: String,
    pub list: Vec<TransferRecord>,
}

impl BlockTransferHistoryResponse {
    fn rejected(err: &HttpError) -> Self {
        Self {
            status: err.code(),
            msg: err.to_string(),
            list: Vec::new(),
        }
    }
}

impl From<QueryResult> for BlockTransferHistoryResponse {
    fn from(result: QueryResult) -> Self {
        match result.error {
            Some(e) => Self {
                status: e.code(),
                msg: e.to_string(),
                list: Vec::new(),
            },
            None => Self {
                status: STATUS_SUCCESS,
                msg: String::new(),
                list: result.records,
            },
        }
    }
}

// ==================
// Routes
// ==================

/// Create transfer history routes
pub fn history_routes(state: Arc<HistoryState>) -> Router {
    Router::new()
        .route(
            "/getTransferHistory",
            get(range_by_query).post(range_by_form),
        )
        .route(
            "/getTransferHistoryByBlock",
            get(block_by_query).post(block_by_form),
        )
        .with_state(state)
}

fn from_query(query: Result<Query<RawPairs>, QueryRejection>) -> Result<HistoryParams, HttpError> {
    HistoryParams::decoded(query.map(|Query(pairs)| pairs).map_err(|e| e.body_text()))
}

fn from_form(form: Result<Form<RawPairs>, FormRejection>) -> Result<HistoryParams, HttpError> {
    HistoryParams::decoded(form.map(|Form(pairs)| pairs).map_err(|e| e.body_text()))
}

async fn range_by_query(
    State(state): State<Arc<HistoryState>>,
    query: Result<Query<RawPairs>, QueryRejection>,
) -> impl IntoResponse {
    transfer_history(&state, from_query(query)).await
}

async fn range_by_form(
    State(state): State<Arc<HistoryState>>,
    form: Result<Form<RawPairs>, FormRejection>,
) -> impl IntoResponse {
    transfer_history(&state, from_form(form)).await
}

async fn block_by_query(
    State(state): State<Arc<HistoryState>>,
    query: Result<Query<RawPairs>, QueryRejection>,
) -> impl IntoResponse {
    transfer_history_by_block(&state, from_query(query)).await
}

async fn block_by_form(
    State(state): State<Arc<HistoryState>>,
    form: Result<Form<RawPairs>, FormRejection>,
) -> impl IntoResponse {
    transfer_history_by_block(&state, from_form(form)).await
}

async fn transfer_history(
    state: &HistoryState,
    params: Result<HistoryParams, HttpError>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4().to_string();

    let checked = params.and_then(|params| {
        let valid = params.validate(&state.codes)?;
        let start = HistoryParams::block_number(&params.start, "start")?;
        Ok((valid, start))
    });
    let body: TransferHistoryResponse = match checked {
        Ok((valid, start)) => state
            .service
            .range_query(start, &valid.account, valid.direction)
            .await
            .into(),
        Err(e) => {
            reject("getTransferHistory", &request_id, &e);
            TransferHistoryResponse::rejected(&e)
        }
    };

    (StatusCode::OK, [(REQUEST_ID_HEADER, request_id)], Json(body))
}

async fn transfer_history_by_block(
    state: &HistoryState,
    params: Result<HistoryParams, HttpError>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4().to_string();

    let checked = params.and_then(|params| {
        let valid = params.validate(&state.codes)?;
        let block = HistoryParams::block_number(&params.block, "block")?;
        Ok((valid, block))
    });
    let body: BlockTransferHistoryResponse = match checked {
        Ok((valid, block)) => state
            .service
            .point_query(block, &valid.account, valid.direction)
            .await
            .into(),
        Err(e) => {
            reject("getTransferHistoryByBlock", &request_id, &e);
            BlockTransferHistoryResponse::rejected(&e)
        }
    };

    (StatusCode::OK, [(REQUEST_ID_HEADER, request_id)], Json(body))
}

fn reject(endpoint: &str, request_id: &str, err: &HttpError) {
    let code = err.code().to_string();
    log_event(
        Event::RequestRejected,
        &[
            ("endpoint", endpoint),
            ("request_id", request_id),
            ("code", &code),
            ("error", &err.to_string()),
        ],
    );
}
