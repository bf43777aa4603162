//! HTTP request handlers module
//!
//! Operator API handlers: recalculation, baselines, variance, analysis
//! views, project tracking, and the risk register. All routes here sit
//! behind bearer-session authentication; webhook ingress lives in
//! `webhook.rs` and `billing.rs`.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::application::use_cases::{
    AnalyzeProject, GenerateVarianceReport, RecalculateProject, SaveBaseline,
};
use crate::domain::entities::{Project, RiskRecord, RiskStatus};
use crate::domain::repositories::{ProjectRef, ProjectSource};
use crate::error::EngineError;
use crate::infrastructure::github::ensure_fields;
use crate::infrastructure::persistence::SqliteStore;
use crate::web::models::*;
use crate::web::rate_limit::RateLimits;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success("OK"))
}

/// Returns a 429 response when the client exceeded the API limits
fn rate_limited(req: &HttpRequest, limits: &RateLimits) -> Option<HttpResponse> {
    let client = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    if limits.api.check(&client) {
        None
    } else {
        Some(
            HttpResponse::TooManyRequests()
                .json(ApiResponse::<()>::error("rate limit exceeded".to_string())),
        )
    }
}

/// POST /api/installations/{id}/recalculate
pub async fn recalculate(
    req: HttpRequest,
    installation_id: web::Path<i64>,
    body: web::Json<RecalculateRequest>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let request = body.into_inner();
    info!(
        "🌐 [API] POST /installations/{}/recalculate ({}/{})",
        installation_id, request.owner, request.project_number
    );

    let outcome = RecalculateProject::new(&db, source.as_ref().as_ref())
        .execute(
            *installation_id,
            &request.owner,
            request.project_number,
            request.setup_fields,
            Utc::now().date_naive(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

/// POST /api/installations/{id}/save-baseline (Pro)
pub async fn save_baseline(
    req: HttpRequest,
    installation_id: web::Path<i64>,
    body: web::Json<SaveBaselineRequest>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let request = body.into_inner();
    let outcome = SaveBaseline::new(&db, source.as_ref().as_ref())
        .execute(*installation_id, &request.owner, request.project_number)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

/// GET /api/installations/{id}/variance-report (Pro)
pub async fn variance_report(
    req: HttpRequest,
    installation_id: web::Path<i64>,
    query: web::Query<VarianceQuery>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let report = GenerateVarianceReport::new(&db, source.as_ref().as_ref())
        .execute(*installation_id, &query.owner, query.project_number)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// GET /api/installations/{id}/projects/{n}/dependencies
pub async fn dependencies(
    req: HttpRequest,
    path: web::Path<(i64, u64)>,
    query: web::Query<ProjectQuery>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let (installation_id, project_number) = path.into_inner();
    let report = AnalyzeProject::new(&db, source.as_ref().as_ref())
        .dependencies(
            installation_id,
            &query.owner,
            project_number,
            Utc::now().date_naive(),
        )
        .await?;

    info!(
        "✅ [API] dependency graph for {}/{}: {} nodes, {} edges",
        query.owner,
        project_number,
        report.stats.total_items,
        report.stats.total_edges
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// GET /api/installations/{id}/projects/{n}/resources
pub async fn resources(
    req: HttpRequest,
    path: web::Path<(i64, u64)>,
    query: web::Query<ProjectQuery>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let (installation_id, project_number) = path.into_inner();
    let report = AnalyzeProject::new(&db, source.as_ref().as_ref())
        .resources(installation_id, &query.owner, project_number)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// GET /api/installations/{id}/projects/{n}/milestones
pub async fn milestones(
    req: HttpRequest,
    path: web::Path<(i64, u64)>,
    query: web::Query<ProjectQuery>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let (installation_id, project_number) = path.into_inner();
    let report = AnalyzeProject::new(&db, source.as_ref().as_ref())
        .milestones(
            installation_id,
            &query.owner,
            project_number,
            Utc::now().date_naive(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// GET /api/installations/{id}/projects/{n}/risks
pub async fn risks(
    req: HttpRequest,
    path: web::Path<(i64, u64)>,
    query: web::Query<ProjectQuery>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let (installation_id, project_number) = path.into_inner();
    let report = AnalyzeProject::new(&db, source.as_ref().as_ref())
        .risks(
            installation_id,
            &query.owner,
            project_number,
            Utc::now().date_naive(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}

/// POST /api/installations/{id}/projects: start tracking a project
pub async fn track_project(
    req: HttpRequest,
    installation_id: web::Path<i64>,
    body: web::Json<TrackProjectRequest>,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let installation_id = *installation_id;
    let request = body.into_inner();
    if request.owner.trim().is_empty() || request.project_id.trim().is_empty() {
        return Err(EngineError::Validation(
            "owner and projectId are required".to_string(),
        ));
    }

    let installation = db
        .get_installation(installation_id)?
        .ok_or_else(|| EngineError::NotFound(format!("installation {installation_id}")))?;

    let mut project = Project::new(
        installation_id,
        request.owner.clone(),
        request.project_number,
        request.project_id.clone(),
    );
    project.repo = request.repo.clone();
    let project_id = db.upsert_project(&project)?;
    project.id = project_id;

    let mut fields_created = Vec::new();
    if request.setup_fields {
        let project_ref = ProjectRef {
            owner: project.owner.clone(),
            owner_kind: installation.owner_kind,
            project_number: project.project_number,
            project_node_id: project.external_project_id.clone(),
            installation_id,
        };
        let setup =
            ensure_fields(source.as_ref().as_ref(), &project_ref, installation.plan).await?;
        project.field_ids = setup.field_ids;
        fields_created = setup.created;
        db.save_field_ids(project_id, &project.field_ids)?;
    }

    db.record_audit(
        installation_id,
        "project_tracked",
        serde_json::json!({
            "owner": request.owner,
            "projectNumber": request.project_number,
            "fieldsCreated": fields_created,
        }),
    )?;

    info!(
        "✅ [API] now tracking {}/{}",
        request.owner, request.project_number
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "project": project,
        "fieldsCreated": fields_created,
    }))))
}

/// POST /api/installations/{id}/projects/{n}/risks: register a risk
pub async fn create_risk(
    req: HttpRequest,
    path: web::Path<(i64, u64)>,
    body: web::Json<CreateRiskRequest>,
    db: web::Data<Arc<SqliteStore>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let (installation_id, project_number) = path.into_inner();
    let request = body.into_inner();
    if request.title.trim().is_empty() {
        return Err(EngineError::Validation("title is required".to_string()));
    }

    let mut record = RiskRecord {
        id: 0,
        installation_id,
        project_number,
        title: request.title,
        description: request.description,
        severity: request.severity,
        status: RiskStatus::Open,
        owner: request.owner,
        linked_issues: request.linked_issues,
        mitigation_plan: request.mitigation_plan,
        created_at: Utc::now(),
    };
    record.id = db.create_risk(&record)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

/// PUT /api/installations/{id}/settings: atomic whole-object replacement
pub async fn update_settings(
    req: HttpRequest,
    installation_id: web::Path<i64>,
    body: web::Json<crate::domain::entities::InstallationSettings>,
    db: web::Data<Arc<SqliteStore>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let installation_id = *installation_id;
    db.get_installation(installation_id)?
        .ok_or_else(|| EngineError::NotFound(format!("installation {installation_id}")))?;

    let settings = body.into_inner();
    db.update_settings(installation_id, &settings)?;
    db.record_audit(installation_id, "settings_updated", serde_json::json!({}))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(settings)))
}

/// POST /api/installations/{id}/holidays (Pro)
pub async fn add_holiday(
    req: HttpRequest,
    installation_id: web::Path<i64>,
    body: web::Json<HolidayRequest>,
    db: web::Data<Arc<SqliteStore>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let installation_id = *installation_id;
    let installation = db
        .get_installation(installation_id)?
        .ok_or_else(|| EngineError::NotFound(format!("installation {installation_id}")))?;
    if !installation.plan.allows_baselines() {
        return Err(EngineError::PlanGate);
    }

    let request = body.into_inner();
    db.add_holiday(
        installation_id,
        request.date,
        request.name.as_deref(),
        request.recurring,
    )?;
    db.record_audit(
        installation_id,
        "holiday_added",
        serde_json::json!({ "date": request.date.to_string(), "recurring": request.recurring }),
    )?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

/// GET /api/installations/{id}/holidays
pub async fn list_holidays(
    req: HttpRequest,
    installation_id: web::Path<i64>,
    db: web::Data<Arc<SqliteStore>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let holidays: Vec<serde_json::Value> = db
        .list_holidays(*installation_id)?
        .into_iter()
        .map(|(date, recurring)| {
            serde_json::json!({ "date": date.to_string(), "recurring": recurring })
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(holidays)))
}

/// DELETE /api/installations/{id}/holidays/{date}
pub async fn delete_holiday(
    req: HttpRequest,
    path: web::Path<(i64, String)>,
    db: web::Data<Arc<SqliteStore>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let (installation_id, date) = path.into_inner();
    let date = date
        .parse::<chrono::NaiveDate>()
        .map_err(|_| EngineError::Validation(format!("not an ISO date: {date}")))?;

    if !db.remove_holiday(installation_id, date)? {
        return Err(EngineError::NotFound(format!("holiday {date}")));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success("removed")))
}

/// PUT /api/installations/{id}/projects/{n}/risks/{risk_id}/status
pub async fn update_risk_status(
    req: HttpRequest,
    path: web::Path<(i64, u64, i64)>,
    body: web::Json<UpdateRiskStatusRequest>,
    db: web::Data<Arc<SqliteStore>>,
    limits: web::Data<Arc<RateLimits>>,
) -> Result<HttpResponse, EngineError> {
    if let Some(resp) = rate_limited(&req, &limits) {
        return Ok(resp);
    }

    let (_, _, risk_id) = path.into_inner();
    if !db.update_risk_status(risk_id, body.status)? {
        return Err(EngineError::NotFound(format!("risk {risk_id}")));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success("updated")))
}
