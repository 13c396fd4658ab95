//! HTTP handlers.
//!
//! # Endpoints
//!
//! - `POST /api/procesar`         – run one batch through the pipeline
//! - `GET  /api/datos-procesados` – records persisted so far, by entity
//! - `GET  /api/reporte`          – latest processing report, or with `?tipo=` a
//!   business report (`ventas_por_sucursal`, `stock_actual`, `clientes_potenciales`)
//! - `GET  /api/metricas`         – event counts by type

use crate::report_query::{self, ReportQuery, ReportQueryError};
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use ingest_application::StageError;
use ingest_domain::event::kinds::{self, keys};
use ingest_domain::eventing::EventBus;
use ingest_domain::report::Report;
use ingest_domain::{Event, ProcessedRecord, RawBatch, RecordType, record};
use serde::Serialize;
use std::collections::BTreeMap;

const EVENT_SOURCE: &str = "api";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/procesar", post(process))
        .route("/datos-procesados", get(processed_data))
        .route("/reporte", get(report))
        .route("/metricas", get(metrics))
}

#[derive(Debug, Serialize)]
struct ProcessResponse {
    status: &'static str,
    message: &'static str,
    lote_id: String,
    time: DateTime<Utc>,
}

/// `POST /api/procesar`: process a raw batch.
async fn process(
    State(state): State<AppState>,
    Json(batch): Json<RawBatch>,
) -> Result<impl IntoResponse, ApiError> {
    let batch_id = batch.batch_id.clone();
    state.processor.process_batch(batch).await?;

    if let Some(report) = state.reports.for_batch(&batch_id) {
        announce_report(&state, &report, Some(&batch_id)).await;
    }

    Ok(Json(ProcessResponse {
        status: "success",
        message: "Datos procesados correctamente",
        lote_id: batch_id,
        time: Utc::now(),
    }))
}

/// `GET /api/datos-procesados`
async fn processed_data(
    State(state): State<AppState>,
) -> Json<BTreeMap<RecordType, Vec<ProcessedRecord>>> {
    Json(
        RecordType::ALL
            .into_iter()
            .map(|entity| (entity, state.store.records(entity)))
            .collect(),
    )
}

/// `GET /api/reporte`
async fn report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Report>, ApiError> {
    let Some(kind) = query.tipo.as_deref() else {
        return state.reports.latest().map(Json).ok_or(ApiError::NoReport);
    };

    let report = report_query::build(kind, &query, &state.store)?;
    announce_report(&state, &report, None).await;
    Ok(Json(report))
}

async fn announce_report(state: &AppState, report: &Report, batch_id: Option<&str>) {
    let mut data = record([(keys::REPORT_ID, report.id())]);
    if let Some(batch_id) = batch_id {
        data.insert(keys::BATCH_ID.into(), batch_id.into());
    }
    let event = Event::new(kinds::REPORT_GENERATED, data, EVENT_SOURCE);
    if let Err(err) = state.bus.publish(&event).await {
        tracing::warn!(error = %err, "report observers failed");
    }
}

/// `GET /api/metricas`
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    etapa: Option<&'static str>,
}

#[derive(Debug)]
pub enum ApiError {
    /// A fatal pipeline stage failure.
    Stage(StageError),
    /// No batch has been processed yet.
    NoReport,
    /// The report query could not be satisfied.
    BadQuery(ReportQueryError),
}

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        ApiError::Stage(err)
    }
}

impl From<ReportQueryError> for ApiError {
    fn from(err: ReportQueryError) -> Self {
        ApiError::BadQuery(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Stage(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    status: "error",
                    message: err.to_string(),
                    etapa: Some(err.stage.name()),
                },
            ),
            ApiError::NoReport => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    status: "error",
                    message: "no report available yet".to_string(),
                    etapa: None,
                },
            ),
            ApiError::BadQuery(err) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    status: "error",
                    message: err.to_string(),
                    etapa: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}
