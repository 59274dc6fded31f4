//! Drug-interaction lookup endpoints.
//!
//! - `GET /api/interactions?search=&severity=` — browse known interactions
//! - `GET /api/interactions/check?drug_a=&drug_b=` — one pair
//! - `GET /api/patients/:id/interactions?min_severity=` — patient check

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{today, ApiContext};
use crate::db;
use crate::models::enums::InteractionSeverity;
use crate::models::{InteractionListing, InteractionRule};
use crate::safety::{self, PatientInteractionReport};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
    pub severity: Option<InteractionSeverity>,
}

pub async fn search(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<InteractionListing>>, ApiError> {
    let listings = ctx
        .with_db(move |conn| {
            db::search_interactions(conn, query.search.as_deref(), query.severity)
        })
        .await?;
    Ok(Json(listings))
}

#[derive(Deserialize)]
pub struct PairQuery {
    pub drug_a: i64,
    pub drug_b: i64,
}

#[derive(Serialize)]
pub struct PairResponse {
    pub interacts: bool,
    pub rule: Option<InteractionRule>,
}

pub async fn check_pair(
    State(ctx): State<ApiContext>,
    Query(query): Query<PairQuery>,
) -> Result<Json<PairResponse>, ApiError> {
    let rule = ctx
        .with_db(move |conn| safety::check_drug_pair(conn, query.drug_a, query.drug_b))
        .await?;
    Ok(Json(PairResponse {
        interacts: rule
            .as_ref()
            .is_some_and(|r| r.severity != InteractionSeverity::None),
        rule,
    }))
}

#[derive(Deserialize)]
pub struct PatientQuery {
    pub min_severity: Option<InteractionSeverity>,
}

pub async fn for_patient(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<PatientInteractionReport>, ApiError> {
    let min_severity = query.min_severity.unwrap_or(InteractionSeverity::Low);
    let as_of = today();
    let report = ctx
        .with_db(move |conn| {
            safety::check_patient_interactions(conn, patient_id, as_of, min_severity)
        })
        .await?;
    Ok(Json(report))
}
