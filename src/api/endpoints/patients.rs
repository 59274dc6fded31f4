//! Patient allergy endpoints.
//!
//! - `GET /api/patients/:id/allergies` — allergies cross-checked against
//!   active prescriptions
//! - `POST /api/patients/:id/allergies` — register an allergy

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::context::AuthenticatedUser;
use crate::models::{NewPatientAllergy, PatientAllergy};
use crate::safety::{self, AllergyVerification};

pub async fn verify_allergies(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
) -> Result<Json<AllergyVerification>, ApiError> {
    let verification = ctx
        .with_db(move |conn| safety::verify_allergies(conn, patient_id))
        .await?;
    Ok(Json(verification))
}

pub async fn add_allergy(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(patient_id): Path<i64>,
    Json(allergy): Json<NewPatientAllergy>,
) -> Result<(StatusCode, Json<PatientAllergy>), ApiError> {
    let stored = ctx
        .with_request_context(user, move |rc| {
            safety::add_patient_allergy(rc, patient_id, &allergy)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
