//! # API REST
//!
//! REST API for Kinesio, standing in for the intake forms.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, download headers)
//! - One debounced autosave controller per edited record
//!
//! `PUT /patients/{id}` answers `202 Accepted` as soon as the edit is queued.
//! Reads return the queued edit while it is pending, so a client never sees
//! its own change disappear during the quiet period.

#![warn(rust_2018_idioms)]

use axum::{
    body::Bytes,
    extract::{Path as AxumPath, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use kinesio_core::{
    analysis::{build_request, SYSTEM_INSTRUCTION},
    exports::{backup_export, document_export, spreadsheet_export},
    merge::merge_value,
    record::RecordStatus,
    synthesis::{summarize, Report},
    CoreConfig, DebouncedSaver, ExportFile, PatientError, PatientRecord, PatientResult,
    PatientStore,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    store: PatientStore,
    savers: Arc<Mutex<HashMap<String, DebouncedSaver<PatientStore>>>>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, store: PatientStore) -> Self {
        Self {
            cfg,
            store,
            savers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &PatientStore {
        &self.store
    }

    fn savers(&self) -> MutexGuard<'_, HashMap<String, DebouncedSaver<PatientStore>>> {
        self.savers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn saver(&self, id: &str) -> DebouncedSaver<PatientStore> {
        self.savers()
            .entry(id.to_string())
            .or_insert_with(|| DebouncedSaver::new(self.store.clone(), self.cfg.save_delay()))
            .clone()
    }

    fn pending(&self, id: &str) -> Option<PatientRecord> {
        self.savers().get(id).and_then(DebouncedSaver::pending)
    }

    /// The record as a client should see it: the pending edit, else the stored value.
    fn current(&self, id: &str) -> Option<PatientRecord> {
        self.pending(id).or_else(|| self.store.get(id))
    }

    fn flush(&self, id: &str) -> PatientResult<()> {
        let saver = self.savers().remove(id);
        match saver {
            Some(saver) => saver.flush(),
            None => Ok(()),
        }
    }

    /// Commits every pending edit now. Returns how many commits failed.
    pub fn flush_all(&self) -> usize {
        let savers: Vec<_> = self.savers().drain().collect();
        let mut failures = 0;
        for (id, saver) in savers {
            if let Err(e) = saver.flush() {
                tracing::error!("flush of patient {} failed: {:?}", id, e);
                failures += 1;
            }
        }
        failures
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// One row of the patient list.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientListItem {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
    pub status: String,
}

impl From<&PatientRecord> for PatientListItem {
    fn from(record: &PatientRecord) -> Self {
        let status = match record.status {
            RecordStatus::InProgress => "In Progress",
            RecordStatus::Completed => "Completed",
        };
        Self {
            id: record.id.clone(),
            first_name: record.identity.first_name.clone(),
            last_name: record.identity.last_name.clone(),
            created_at: record.created_at.clone(),
            status: status.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientListItem>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPromptRes {
    pub system_instruction: String,
    pub prompt: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ImportBackupRes {
    pub imported: usize,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        create_patient,
        get_patient,
        update_patient,
        delete_patient,
        patient_summary,
        patient_document,
        patient_spreadsheet,
        analysis_prompt,
        export_backup,
        import_backup,
    ),
    components(schemas(
        HealthRes,
        PatientListItem,
        ListPatientsRes,
        AnalysisPromptRes,
        ImportBackupRes,
    ))
)]
struct ApiDoc;

/// Builds the router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/patients/:id/summary", get(patient_summary))
        .route("/patients/:id/document", get(patient_document))
        .route("/patients/:id/spreadsheet", get(patient_spreadsheet))
        .route("/patients/:id/analysis-prompt", get(analysis_prompt))
        .route("/backup", get(export_backup).post(import_backup))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `addr` until Ctrl-C, then commits pending edits.
pub async fn serve(cfg: Arc<CoreConfig>, addr: &str) -> anyhow::Result<()> {
    serve_with_shutdown(cfg, addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {}", e);
        }
    })
    .await
}

/// Serves the API on `addr` until `shutdown` resolves, then commits pending edits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve_with_shutdown(
    cfg: Arc<CoreConfig>,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let store = PatientStore::open(cfg.clone());
    let state = AppState::new(cfg, store);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Starting Kinesio REST API on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let failures = state.flush_all();
    if failures > 0 {
        anyhow::bail!("{failures} pending edits could not be saved on shutdown");
    }
    tracing::info!("-- Kinesio REST API stopped");
    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Logs `e` and maps it to a status and a short client-facing message.
fn error_response(context: &str, e: PatientError) -> (StatusCode, &'static str) {
    tracing::error!("{} error: {:?}", context, e);
    match e {
        PatientError::NotFound(_) => (StatusCode::NOT_FOUND, "Patient not found"),
        PatientError::ImportRejected(_) => (StatusCode::BAD_REQUEST, "Invalid backup file"),
        PatientError::InvalidInput(_)
        | PatientError::Deserialization(_)
        | PatientError::Id(_)
        | PatientError::Text(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    }
}

fn find(state: &AppState, id: &str) -> Result<PatientRecord, (StatusCode, &'static str)> {
    state
        .current(id)
        .ok_or((StatusCode::NOT_FOUND, "Patient not found"))
}

/// Percent-encodes `value` for an RFC 5987 `filename*` parameter.
fn encode_rfc5987(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn download(file: ExportFile) -> Result<Response, (StatusCode, &'static str)> {
    let ascii: String = file
        .filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        encode_rfc5987(&file.filename)
    );
    let disposition = HeaderValue::from_str(&disposition).map_err(|e| {
        tracing::error!("Invalid download header: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.mime_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Kinesio REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "List of patients", body = ListPatientsRes)
    )
)]
/// List all patients, including edits that are still waiting to be saved.
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<ListPatientsRes> {
    let patients = state
        .store
        .list_all()
        .into_iter()
        .map(|stored| state.pending(&stored.id).unwrap_or(stored))
        .map(|record| PatientListItem::from(&record))
        .collect();
    Json(ListPatientsRes { patients })
}

#[utoipa::path(
    post,
    path = "/patients",
    responses(
        (status = 201, description = "Patient created; body is the full record"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a new patient with placeholder names and persist it immediately.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<PatientRecord>), (StatusCode, &'static str)> {
    match state.store.create() {
        Ok(record) => Ok((StatusCode::CREATED, Json(record))),
        Err(e) => Err(error_response("Create patient", e)),
    }
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The full patient record"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<PatientRecord>, (StatusCode, &'static str)> {
    find(&state, &id).map(Json)
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body(content = Object, description = "Full or partial record; present fields replace current values"),
    responses(
        (status = 202, description = "Edit accepted and scheduled for saving; body is the edited record"),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found")
    )
)]
/// Apply an edit to a patient and schedule it for a debounced save.
///
/// The body is overlaid on the current record, so it may carry only the
/// fields that changed. `id` and `createdAt` cannot be changed.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<PatientRecord>), (StatusCode, &'static str)> {
    if !body.is_object() {
        return Err((StatusCode::BAD_REQUEST, "Body must be a JSON object"));
    }
    if let Some(body_id) = body.get("id") {
        if body_id.as_str() != Some(id.as_str()) {
            return Err((StatusCode::BAD_REQUEST, "Body id does not match path"));
        }
    }

    let current = find(&state, &id)?;
    let current_value = serde_json::to_value(&current)
        .map_err(|e| error_response("Update patient", PatientError::Serialization(e)))?;

    let mut edited: PatientRecord = serde_json::from_value(merge_value(&current_value, &body))
        .map_err(|e| error_response("Update patient", PatientError::Deserialization(e)))?;
    edited.id = current.id;
    edited.created_at = current.created_at;

    state.saver(&id).notify(edited.clone());
    Ok((StatusCode::ACCEPTED, Json(edited)))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Delete a patient permanently.
///
/// A pending edit is committed first so that a late autosave cannot bring the
/// record back.
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    state
        .flush(&id)
        .map_err(|e| error_response("Delete patient", e))?;

    match state.store.remove(&id) {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err((StatusCode::NOT_FOUND, "Patient not found")),
        Err(e) => Err(error_response("Delete patient", e)),
    }
}

#[utoipa::path(
    get,
    path = "/patients/{id}/summary",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Labelled summary sections; empty sections are omitted"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn patient_summary(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Report>, (StatusCode, &'static str)> {
    let record = find(&state, &id)?;
    Ok(Json(summarize(&record, today())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/document",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Word-processor document (HTML)", content_type = "application/msword"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn patient_document(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let record = find(&state, &id)?;
    let file = document_export(&record, today()).map_err(|e| error_response("Document", e))?;
    download(file)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/spreadsheet",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Spreadsheet workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn patient_spreadsheet(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let record = find(&state, &id)?;
    let file =
        spreadsheet_export(&record, today()).map_err(|e| error_response("Spreadsheet", e))?;
    download(file)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/analysis-prompt",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Request that would be sent to the analysis provider", body = AnalysisPromptRes),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
async fn analysis_prompt(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AnalysisPromptRes>, (StatusCode, &'static str)> {
    let record = find(&state, &id)?;
    let request = build_request(&record);
    Ok(Json(AnalysisPromptRes {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt: request.prompt,
    }))
}

#[utoipa::path(
    get,
    path = "/backup",
    responses(
        (status = 200, description = "JSON backup of every patient", content_type = "application/json"),
        (status = 500, description = "Internal server error")
    )
)]
/// Download every patient as a JSON backup. Pending edits are saved first.
///
/// Fails rather than produce a backup missing an edit that could not be saved.
#[axum::debug_handler]
async fn export_backup(State(state): State<AppState>) -> Result<Response, (StatusCode, &'static str)> {
    let failures = state.flush_all();
    if failures > 0 {
        tracing::error!("Export backup error: {} pending edits could not be saved", failures);
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "Pending edits could not be saved"));
    }
    let file = backup_export(&state.store, today()).map_err(|e| error_response("Export backup", e))?;
    download(file)
}

#[utoipa::path(
    post,
    path = "/backup",
    request_body(content = String, description = "Backup file content", content_type = "application/json"),
    responses(
        (status = 200, description = "Backup imported; the previous collection was replaced", body = ImportBackupRes),
        (status = 400, description = "Invalid backup file; nothing was changed")
    )
)]
/// Replace every patient with the contents of a backup file.
///
/// Pending edits are saved first and then overwritten by the import.
#[axum::debug_handler]
async fn import_backup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportBackupRes>, (StatusCode, &'static str)> {
    let text = std::str::from_utf8(&body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Backup must be UTF-8 text"))?;

    state.flush_all();
    let records = state
        .store
        .import(text)
        .map_err(|e| error_response("Import backup", e))?;
    Ok(Json(ImportBackupRes {
        imported: records.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use kinesio_core::storage::{KeyValueStorage, MemoryStorage};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    /// In-memory storage whose writes can be switched off.
    #[derive(Default)]
    struct SwitchableStorage {
        inner: MemoryStorage,
        read_only: AtomicBool,
    }

    impl KeyValueStorage for SwitchableStorage {
        fn get_item(&self, key: &str) -> PatientResult<Option<String>> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> PatientResult<()> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(PatientError::FileWrite(std::io::Error::other("read-only")));
            }
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> PatientResult<()> {
            self.inner.remove_item(key)
        }
    }

    fn test_state() -> AppState {
        let cfg = Arc::new(
            CoreConfig::with_data_dir(PathBuf::from("unused"))
                .expect("CoreConfig::with_data_dir should succeed"),
        );
        let store = PatientStore::in_memory(cfg.clone());
        AppState::new(cfg, store)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");
        app.clone().oneshot(request).await.expect("router should respond")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    async fn create(app: &Router) -> String {
        let response = send(app, "POST", "/patients", None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"]
            .as_str()
            .expect("id should be a string")
            .to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(test_state());
        let response = send(&app, "GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ok"], true);
    }

    #[tokio::test]
    async fn create_then_get_returns_placeholder_record() {
        let app = router(test_state());
        let id = create(&app).await;

        let response = send(&app, "GET", &format!("/patients/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["firstName"], "Nuevo");
        assert_eq!(body["status"], "In Progress");

        let list = json_body(send(&app, "GET", "/patients", None).await).await;
        assert_eq!(list["patients"][0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn unknown_patient_is_not_found() {
        let app = router(test_state());
        for (method, uri) in [
            ("GET", "/patients/nope"),
            ("DELETE", "/patients/nope"),
            ("GET", "/patients/nope/summary"),
            ("GET", "/patients/nope/document"),
        ] {
            let response = send(&app, method, uri, None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn put_is_visible_immediately_and_saved_on_flush() {
        let state = test_state();
        let app = router(state.clone());
        let id = create(&app).await;

        let response = send(
            &app,
            "PUT",
            &format!("/patients/{id}"),
            Some(json!({ "lastName": "Pérez", "firstName": "Juan", "createdAt": "forged" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let edited = json_body(response).await;
        assert_eq!(edited["lastName"], "Pérez");
        assert_ne!(edited["createdAt"], "forged");

        let fetched = json_body(send(&app, "GET", &format!("/patients/{id}"), None).await).await;
        assert_eq!(fetched["firstName"], "Juan");
        let stored = state.store().get(&id).expect("stored record");
        assert_eq!(stored.identity.first_name, "Nuevo");

        assert_eq!(state.flush_all(), 0);
        let stored = state.store().get(&id).expect("stored record");
        assert_eq!(stored.identity.last_name, "Pérez");
        assert_eq!(stored.identity.first_name, "Juan");
    }

    #[tokio::test]
    async fn put_rejects_bad_bodies() {
        let app = router(test_state());
        let id = create(&app).await;
        let uri = format!("/patients/{id}");

        let response = send(&app, "PUT", &uri, Some(json!({ "id": "other" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, "PUT", &uri, Some(json!({ "medications": "none" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, "PUT", &uri, Some(json!(["not", "an", "object"]))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, "PUT", "/patients/missing", Some(json!({}))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_with_pending_edit_does_not_resurrect() {
        let state = test_state();
        let app = router(state.clone());
        let id = create(&app).await;
        let uri = format!("/patients/{id}");

        send(&app, "PUT", &uri, Some(json!({ "lastName": "Pérez" }))).await;
        let response = send(&app, "DELETE", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(state.store().get(&id).is_none());
        let response = send(&app, "GET", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summary_and_prompt_reflect_the_record() {
        let app = router(test_state());
        let id = create(&app).await;
        send(
            &app,
            "PUT",
            &format!("/patients/{id}"),
            Some(json!({ "functionalEvaluation": { "washingBack": { "qualifier": "Dificultad grave" } } })),
        )
        .await;

        let summary =
            json_body(send(&app, "GET", &format!("/patients/{id}/summary"), None).await).await;
        let titles: Vec<&str> = summary["sections"]
            .as_array()
            .expect("sections array")
            .iter()
            .filter_map(|s| s["title"].as_str())
            .collect();
        assert!(titles.contains(&"Evaluación Funcional (Limitaciones en AVD)"));

        let prompt =
            json_body(send(&app, "GET", &format!("/patients/{id}/analysis-prompt"), None).await)
                .await;
        assert!(prompt["prompt"]
            .as_str()
            .expect("prompt text")
            .contains("Lavarse la espalda"));
    }

    #[tokio::test]
    async fn document_download_has_word_headers() {
        let app = router(test_state());
        let id = create(&app).await;
        send(
            &app,
            "PUT",
            &format!("/patients/{id}"),
            Some(json!({ "lastName": "Pérez", "firstName": "Juan" })),
        )
        .await;

        let response = send(&app, "GET", &format!("/patients/{id}/document"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/msword;charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii header");
        assert!(disposition.contains("filename=\"P_rez Juan - "));
        assert!(disposition.contains("filename*=UTF-8''P%C3%A9rez%20Juan%20-%20"));

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    }

    #[tokio::test]
    async fn backup_export_fails_when_a_pending_edit_cannot_be_saved() {
        let cfg = Arc::new(
            CoreConfig::with_data_dir(PathBuf::from("unused"))
                .expect("CoreConfig::with_data_dir should succeed"),
        );
        let storage = Arc::new(SwitchableStorage::default());
        let store = PatientStore::new(cfg.clone(), storage.clone());
        let state = AppState::new(cfg, store);
        let app = router(state.clone());

        let id = create(&app).await;
        let response = send(
            &app,
            "PUT",
            &format!("/patients/{id}"),
            Some(json!({ "lastName": "Pérez" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        storage.read_only.store(true, Ordering::SeqCst);
        let response = send(&app, "GET", "/backup", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        storage.read_only.store(false, Ordering::SeqCst);
        let response = send(&app, "GET", "/backup", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn backup_round_trip_and_rejection() {
        let state = test_state();
        let app = router(state.clone());
        create(&app).await;
        create(&app).await;

        let response = send(&app, "GET", "/backup", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let backup = json_body(response).await;
        assert_eq!(backup.as_array().map(Vec::len), Some(2));

        let response = send(&app, "POST", "/backup", Some(json!({ "not": "a list" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.store().list_all().len(), 2);

        let single = json!([backup[0].clone()]);
        let response = send(&app, "POST", "/backup", Some(single)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["imported"], 1);
        assert_eq!(state.store().list_all().len(), 1);
    }
}
