//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Identity → 2. Audit logger

use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the pharmacy API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn pharmacy_api_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Identity → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/account/password", post(endpoints::account::change_password))
        .route("/users", post(endpoints::account::create_user))
        .route("/interactions", get(endpoints::interactions::search))
        .route("/interactions/check", get(endpoints::interactions::check_pair))
        .route(
            "/patients/:id/interactions",
            get(endpoints::interactions::for_patient),
        )
        .route(
            "/patients/:id/allergies",
            get(endpoints::patients::verify_allergies).post(endpoints::patients::add_allergy),
        )
        .route(
            "/drugs",
            get(endpoints::inventory::search_drugs).post(endpoints::inventory::register_drug),
        )
        .route("/drugs/:id/lots", get(endpoints::inventory::lots))
        .route("/drugs/:id/stock", get(endpoints::inventory::stock))
        .route("/lots", post(endpoints::inventory::receive_lot))
        .route(
            "/recalls",
            get(endpoints::inventory::recalls).post(endpoints::inventory::register_recall),
        )
        .route("/recalls/:id/close", post(endpoints::inventory::close_recall))
        .route(
            "/storage",
            get(endpoints::storage::list).post(endpoints::storage::create),
        )
        .route("/storage/:id", put(endpoints::storage::update))
        .route("/storage/:id/contents", get(endpoints::storage::contents))
        .route("/alerts/stock", get(endpoints::alerts::stock))
        .route("/dispensation/queue", get(endpoints::dispensation::queue))
        .route("/dispensation", post(endpoints::dispensation::dispense))
        .route(
            "/dispensation/items/:id",
            get(endpoints::dispensation::item_status),
        )
        .route(
            "/administrations",
            post(endpoints::dispensation::record_administration),
        )
        .route(
            "/waste",
            get(endpoints::waste::report).post(endpoints::waste::record),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::identity::require_user))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Local;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::account::{hash_password, PasswordPolicy};
    use crate::db;
    use crate::models::enums::{InteractionSeverity, PrescriptionStatus, Role};
    use crate::models::Patient;

    struct Fixture {
        app: Router,
        admin: i64,
        pharmacist: i64,
        technician: i64,
        nurse: i64,
        patient: i64,
        ctx: ApiContext,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pharmacy.db");
        let conn = db::open_database(&path).unwrap();

        let hash = hash_password("initial-pass", 1_000);
        let user = |name: &str, role| db::insert_user(&conn, name, name, role, &hash).unwrap();
        let admin = user("admin", Role::Administrator);
        let pharmacist = user("pharm", Role::Pharmacist);
        let technician = user("tech", Role::Technician);
        let nurse = user("nurse", Role::Nurse);
        let patient = db::insert_patient(
            &conn,
            &Patient {
                id: 0,
                mrn: "MRN-42".into(),
                first_name: "Iris".into(),
                last_name: "Vega".into(),
                birth_date: None,
            },
        )
        .unwrap();

        let ctx = ApiContext::new(path).with_password_policy(PasswordPolicy {
            min_length: 8,
            iterations: 1_000,
        });
        Fixture {
            app: pharmacy_api_router(ctx.clone()),
            admin,
            pharmacist,
            technician,
            nurse,
            patient,
            ctx,
            _dir: dir,
        }
    }

    impl Fixture {
        async fn send(
            &self,
            method: &str,
            uri: &str,
            user: Option<i64>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(id) = user {
                builder = builder.header("X-User-Id", id.to_string());
            }
            let req = match body {
                Some(body) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let response = self.app.clone().oneshot(req).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn create_drug(&self, name: &str) -> i64 {
            let (status, drug) = self
                .send(
                    "POST",
                    "/api/drugs",
                    Some(self.admin),
                    Some(json!({
                        "commercial_name": name,
                        "active_ingredient": name.to_lowercase(),
                        "atc_code": null,
                        "unit_price": 1.5,
                        "minimum_stock": 0,
                        "maximum_stock": 0
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{drug}");
            drug["id"].as_i64().unwrap()
        }

        async fn receive(&self, drug_id: i64, code: &str, expiration: &str, quantity: i64) -> i64 {
            let (status, lot) = self
                .send(
                    "POST",
                    "/api/lots",
                    Some(self.technician),
                    Some(json!({
                        "drug_id": drug_id,
                        "lot_code": code,
                        "expiration_date": expiration,
                        "quantity": quantity,
                        "received_date": "2024-01-01"
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{lot}");
            lot["id"].as_i64().unwrap()
        }

        /// One active prescription for the patient, dated today.
        fn prescribe(&self, drug_ids: &[i64]) -> Vec<i64> {
            let conn = self.ctx.open_db().unwrap();
            let today = Local::now().date_naive();
            let rx = db::insert_prescription(
                &conn,
                self.patient,
                self.admin,
                today,
                PrescriptionStatus::Active,
            )
            .unwrap();
            drug_ids
                .iter()
                .map(|&d| {
                    db::insert_prescription_item(&conn, rx, d, "1 tab", "daily", None).unwrap()
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let f = fixture();
        let (status, body) = f.send("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["schema_version"], 1);
    }

    #[tokio::test]
    async fn protected_routes_require_active_user() {
        let f = fixture();
        let (status, body) = f.send("GET", "/api/storage", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

        let (status, _) = f.send("GET", "/api/storage", Some(999), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let conn = f.ctx.open_db().unwrap();
        conn.execute("UPDATE users SET active = 0 WHERE id = ?1", [f.nurse])
            .unwrap();
        let (status, _) = f.send("GET", "/api/storage", Some(f.nurse), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = f.send("GET", "/api/storage", Some(f.technician), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_no_store() {
        let f = fixture();
        let req = Request::builder()
            .uri("/api/recalls")
            .header("X-User-Id", f.pharmacist.to_string())
            .body(Body::empty())
            .unwrap();
        let response = f.app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-Request-Id"));
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    }

    #[tokio::test]
    async fn dispensation_flow() {
        let f = fixture();
        let drug = f.create_drug("Metoprolol").await;
        let early = f.receive(drug, "M-1", "2098-01-01", 5).await;
        let late = f.receive(drug, "M-2", "2099-01-01", 10).await;
        let item = f.prescribe(&[drug])[0];

        let (status, queue) = f
            .send("GET", "/api/dispensation/queue", Some(f.pharmacist), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(queue[0]["item_id"], item);
        assert_eq!(queue[0]["available_quantity"], 15);

        // Too much: 409 with the shortfall, nothing written.
        let too_many = json!({"item_id": item, "quantity": 16});
        let (status, err) = f
            .send("POST", "/api/dispensation", Some(f.pharmacist), Some(too_many))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"]["shortfall"]["shortfall"], 1);

        // Nurses cannot dispense.
        let request = json!({"item_id": item, "quantity": 8});
        let (status, _) = f
            .send("POST", "/api/dispensation", Some(f.nurse), Some(request.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, receipt) = f
            .send("POST", "/api/dispensation", Some(f.pharmacist), Some(request))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{receipt}");
        let draws = receipt["allocation"]["draws"].as_array().unwrap();
        assert_eq!(draws[0]["lot_id"], early);
        assert_eq!(draws[0]["quantity"], 5);
        assert_eq!(draws[1]["lot_id"], late);
        assert_eq!(draws[1]["remaining"], 7);
        assert_eq!(receipt["remaining_inventory"], 7);

        let administration = json!({"item_id": item, "notes": null});
        let (status, _) = f
            .send("POST", "/api/administrations", Some(f.nurse), Some(administration))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/dispensation/items/{item}");
        let (_, state) = f.send("GET", &uri, Some(f.nurse), None).await;
        assert_eq!(state["state"], "administered");
    }

    #[tokio::test]
    async fn recall_hides_lot_from_stock() {
        let f = fixture();
        let drug = f.create_drug("Cisplatin").await;
        f.receive(drug, "C-1", "2099-01-01", 4).await;
        f.receive(drug, "C-2", "2099-06-01", 6).await;

        let (status, recall) = f
            .send(
                "POST",
                "/api/recalls",
                Some(f.technician),
                Some(json!({"drug_id": drug, "lot_code": "C-1", "reason": "glass"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{recall}");

        let (status, recall) = f
            .send(
                "POST",
                "/api/recalls",
                Some(f.pharmacist),
                Some(json!({"drug_id": drug, "lot_code": "C-1", "reason": "glass"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(recall["status"], "active");

        let stock_uri = format!("/api/drugs/{drug}/stock");
        let (_, stock) = f.send("GET", &stock_uri, Some(f.nurse), None).await;
        assert_eq!(stock["available_quantity"], 6);
        assert_eq!(stock["drug"]["actual_inventory"], 10);

        let (_, alerts) = f.send("GET", "/api/alerts/stock?days=30", Some(f.nurse), None).await;
        assert_eq!(alerts["recalled_with_stock"][0]["lot_code"], "C-1");

        let close = format!("/api/recalls/{}/close", recall["id"]);
        let (status, closed) = f.send("POST", &close, Some(f.pharmacist), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(closed["status"], "closed");

        let (_, stock) = f.send("GET", &stock_uri, Some(f.nurse), None).await;
        assert_eq!(stock["available_quantity"], 10);
    }

    #[tokio::test]
    async fn safety_checks_over_http() {
        let f = fixture();
        let warfarin = f.create_drug("Warfarin").await;
        let aspirin = f.create_drug("Aspirin").await;
        let amox = f.create_drug("Amoxicillin-Penicillin G").await;
        {
            let conn = f.ctx.open_db().unwrap();
            let high = InteractionSeverity::High;
            db::insert_interaction(&conn, warfarin, aspirin, high, "bleeding", None).unwrap();
        }
        f.prescribe(&[warfarin, aspirin, amox]);

        let uri = format!("/api/interactions/check?drug_a={aspirin}&drug_b={warfarin}");
        let (_, pair) = f.send("GET", &uri, Some(f.nurse), None).await;
        assert_eq!(pair["interacts"], true);
        assert_eq!(pair["rule"]["severity"], "high");

        let uri = format!("/api/interactions/check?drug_a={aspirin}&drug_b={aspirin}");
        let (status, _) = f.send("GET", &uri, Some(f.nurse), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/patients/{}/interactions", f.patient);
        let (_, report) = f.send("GET", &uri, Some(f.pharmacist), None).await;
        assert_eq!(report["pairs_checked"], 3);
        assert_eq!(report["conflicts"].as_array().unwrap().len(), 1);

        let (_, listing) = f
            .send("GET", "/api/interactions?search=warf", Some(f.nurse), None)
            .await;
        assert_eq!(listing.as_array().unwrap().len(), 1);

        let allergen = {
            let conn = f.ctx.open_db().unwrap();
            db::insert_allergen(&conn, "Penicillin", "antibiotic").unwrap()
        };
        let uri = format!("/api/patients/{}/allergies", f.patient);
        let allergy = json!({
            "allergen_id": allergen,
            "severity": "Severe",
            "reaction": "hives",
            "notes": null
        });
        let (status, _) = f
            .send("POST", &uri, Some(f.technician), Some(allergy.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, stored) = f.send("POST", &uri, Some(f.nurse), Some(allergy)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(stored["severity"], "Severe");

        let (_, verification) = f.send("GET", &uri, Some(f.nurse), None).await;
        let conflicts = verification["conflicts"].as_array().unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0]["prescription"]["drug_id"], amox);
        assert_eq!(conflicts[0]["matched_on"], "commercial_name");

        let (status, _) = f.send("GET", "/api/patients/999/allergies", Some(f.nurse), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn storage_and_waste_pages() {
        let f = fixture();
        let (status, location) = f
            .send(
                "POST",
                "/api/storage",
                Some(f.technician),
                Some(json!({
                    "name": "Cold room",
                    "kind": "refrigerated",
                    "capacity": 100,
                    "min_temperature": 2.0,
                    "max_temperature": 8.0,
                    "notes": null
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let storage_id = location["id"].as_i64().unwrap();

        let drug = f.create_drug("Vaccine").await;
        let (status, lot) = f
            .send(
                "POST",
                "/api/lots",
                Some(f.pharmacist),
                Some(json!({
                    "drug_id": drug,
                    "lot_code": "V-9",
                    "expiration_date": "2099-01-01",
                    "quantity": 20,
                    "storage_id": storage_id,
                    "received_date": "2024-01-01"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, contents) = f
            .send("GET", &format!("/api/storage/{storage_id}/contents"), Some(f.nurse), None)
            .await;
        assert_eq!(contents["lots"][0]["lot_code"], "V-9");

        let (status, _) = f
            .send(
                "POST",
                "/api/waste",
                Some(f.technician),
                Some(json!({
                    "lot_id": lot["id"],
                    "quantity": 4,
                    "reason": "damaged",
                    "notes": "dropped"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, report) = f.send("GET", "/api/waste", Some(f.pharmacist), None).await;
        assert_eq!(report["total_quantity"], 4);
        assert_eq!(report["total_cost"], 6.0);

        let (_, storage) = f.send("GET", "/api/storage", Some(f.nurse), None).await;
        assert_eq!(storage[0]["units_stored"], 16);
    }

    #[tokio::test]
    async fn accounts() {
        let f = fixture();
        let (status, _) = f
            .send(
                "POST",
                "/api/account/password",
                Some(f.nurse),
                Some(json!({
                    "current_password": "initial-pass",
                    "new_password": "brand-new-pass",
                    "confirm_password": "brand-new-pass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = f
            .send(
                "POST",
                "/api/account/password",
                Some(f.nurse),
                Some(json!({
                    "current_password": "initial-pass",
                    "new_password": "another-pass",
                    "confirm_password": "another-pass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let new_user = json!({
            "username": "tech2",
            "full_name": "Second Tech",
            "role": "technician",
            "password": "long-enough-pass"
        });
        let (status, _) = f
            .send("POST", "/api/users", Some(f.pharmacist), Some(new_user.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, created) = f.send("POST", "/api/users", Some(f.admin), Some(new_user)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["role"], "technician");
    }
}
