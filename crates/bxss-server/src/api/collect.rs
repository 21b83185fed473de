use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    Extension,
};
use bxss_core::{CollectedReport, ReportBody};
use chrono::Utc;
use tracing::Instrument;

use super::AppState;
use crate::middleware::RequestId;
use crate::pipeline::PipelineError;

/// Body returned for every `/collect` call, whatever happened internally.
pub const ACKNOWLEDGEMENT: &str = "COLLECTED";

/// `POST /collect`: accepts a report from the delivered payload.
///
/// The pipeline runs in its own task and the response waits for it, but its
/// outcome never reaches the caller: failures (including a panic) are
/// logged and the fixed acknowledgement is sent regardless.
pub(super) async fn collect(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, &'static str) {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "report body rejected");
            return (StatusCode::OK, ACKNOWLEDGEMENT);
        }
    };

    let collector = Arc::clone(&state.collector);
    let headers = header_map(&headers);
    let span = tracing::info_span!("collect", request_id = %req_id.0);

    let task = tokio::spawn(
        async move {
            let report = parse_report(&body, headers)?;
            collector.process(report).await
        }
        .instrument(span),
    );

    match task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(request_id = %req_id.0, error = %e, "collection failed"),
        Err(e) => tracing::error!(request_id = %req_id.0, error = %e, "collection task aborted"),
    }

    (StatusCode::OK, ACKNOWLEDGEMENT)
}

/// Parses the body as JSON whatever its content type; the payload posts
/// `text/plain` to avoid a preflight. An empty body is an empty report.
fn parse_report(
    body: &[u8],
    headers: BTreeMap<String, String>,
) -> Result<CollectedReport, PipelineError> {
    let report: ReportBody = if body.iter().all(u8::is_ascii_whitespace) {
        ReportBody::default()
    } else {
        serde_json::from_slice(body)?
    };
    Ok(CollectedReport::from_body(report, headers, Utc::now()))
}

/// Lowercase header names to values, repeated headers joined with `", "`.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), value)
        })
        .collect()
}
