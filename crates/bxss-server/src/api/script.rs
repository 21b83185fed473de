use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bxss_core::{CollectionConfig, PayloadQuery};

use super::AppState;
use crate::payload;

/// `GET /`: the collector script, configured by `n`, `f`, `c` and `b`.
pub(super) async fn render_payload(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(pairs)) => PayloadQuery::from_pairs(&pairs),
        Err(e) => {
            tracing::warn!(error = %e, "unparsable payload query; using defaults");
            PayloadQuery::default()
        }
    };
    let config = CollectionConfig::from_query(&query);

    match payload::render(&config, &state.extract_url) {
        Ok(script) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, payload::CONTENT_TYPE)],
            script,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "payload render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
