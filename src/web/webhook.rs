//! Webhook handling module
//!
//! Signed callbacks from the upstream project service. The handler verifies
//! the HMAC signature over the raw body, acknowledges immediately, and
//! processes the event asynchronously; processing errors are logged and
//! never surfaced to the sender.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::application::use_cases::{AdjustSchedule, RecalculateProject};
use crate::domain::entities::{Installation, OwnerKind};
use crate::domain::repositories::ProjectSource;
use crate::infrastructure::persistence::SqliteStore;
use crate::web::config::AppConfig;
use crate::web::coordinator::RecalcCoordinator;
use crate::web::models::ApiResponse;
use crate::web::rate_limit::RateLimits;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a `sha256=<hex>` signature over the raw body
///
/// Comparison is constant-time; a missing or malformed header fails.
pub fn verify_signature(secret: &str, body: &[u8], signature_header: Option<&str>) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    let Some(hex_signature) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(provided.as_slice()).into()
}

/// POST /api/webhook
pub async fn handle_webhook(
    req: HttpRequest,
    body: web::Bytes,
    db: web::Data<Arc<SqliteStore>>,
    source: web::Data<Arc<dyn ProjectSource>>,
    coordinator: web::Data<Arc<RecalcCoordinator>>,
    config: web::Data<AppConfig>,
    limits: web::Data<Arc<RateLimits>>,
) -> HttpResponse {
    let client = client_key(&req);
    if !limits.webhooks.check(&client) {
        return HttpResponse::TooManyRequests()
            .json(ApiResponse::<()>::error("rate limit exceeded".to_string()));
    }

    let signature = req
        .headers()
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());
    if !verify_signature(&config.webhook_secret, &body, signature) {
        warn!("webhook rejected: bad signature");
        return HttpResponse::Unauthorized()
            .json(ApiResponse::<()>::error("invalid signature".to_string()));
    }

    let event_kind = req
        .headers()
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("webhook payload is not JSON: {}", e);
            return HttpResponse::Ok().json(ApiResponse::success("ignored"));
        }
    };

    // Acknowledge first; the sender never sees processing errors
    let db = db.get_ref().clone();
    let source = source.get_ref().clone();
    let coordinator = coordinator.get_ref().clone();
    tokio::spawn(async move {
        process_event(db, source, coordinator, &event_kind, payload).await;
    });

    HttpResponse::Ok().json(ApiResponse::success("accepted"))
}

fn client_key(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

/// Demultiplexes one event; all failures end here as log lines
async fn process_event(
    db: Arc<SqliteStore>,
    source: Arc<dyn ProjectSource>,
    coordinator: Arc<RecalcCoordinator>,
    event_kind: &str,
    payload: Value,
) {
    let action = payload["action"].as_str().unwrap_or("").to_string();
    debug!("webhook event {} ({})", event_kind, action);

    let result = match event_kind {
        "installation" => handle_installation_event(&db, &action, &payload),
        "issues" => handle_issue_event(&db, &source, &coordinator, &action, &payload),
        "projects_v2_item" => handle_project_item_event(&db, &source, &coordinator, &action, &payload),
        other => {
            debug!("ignoring webhook event kind {}", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("webhook processing failed for {}: {}", event_kind, e);
    }
}

fn handle_installation_event(
    db: &SqliteStore,
    action: &str,
    payload: &Value,
) -> anyhow::Result<()> {
    let installation_id = payload["installation"]["id"]
        .as_i64()
        .ok_or_else(|| anyhow::anyhow!("installation event without id"))?;
    let account = &payload["installation"]["account"];
    let owner_handle = account["login"].as_str().unwrap_or("").to_string();

    match action {
        "created" => {
            let owner_kind = match account["type"].as_str() {
                Some("User") => OwnerKind::User,
                _ => OwnerKind::Organization,
            };
            let installation = Installation::new(installation_id, owner_handle.clone(), owner_kind);
            db.upsert_installation(&installation)?;
            db.record_audit(
                installation_id,
                "installation_created",
                serde_json::json!({ "owner": owner_handle }),
            )?;
            info!("installation {} created for {}", installation_id, owner_handle);
        }
        "deleted" => {
            db.record_audit(
                installation_id,
                "installation_deleted",
                serde_json::json!({ "owner": owner_handle }),
            )?;
            db.delete_installation(installation_id)?;
            info!("installation {} deleted", installation_id);
        }
        "suspend" => {
            db.set_sub_status(installation_id, "suspended")?;
            db.record_audit(installation_id, "installation_suspended", Value::Null)?;
        }
        "unsuspend" => {
            db.set_sub_status(installation_id, "active")?;
            db.record_audit(installation_id, "installation_unsuspended", Value::Null)?;
        }
        other => debug!("ignoring installation action {}", other),
    }
    Ok(())
}

const ISSUE_ACTIONS: [&str; 6] = [
    "closed",
    "reopened",
    "edited",
    "labeled",
    "milestoned",
    "demilestoned",
];

fn handle_issue_event(
    db: &Arc<SqliteStore>,
    source: &Arc<dyn ProjectSource>,
    coordinator: &Arc<RecalcCoordinator>,
    action: &str,
    payload: &Value,
) -> anyhow::Result<()> {
    if !ISSUE_ACTIONS.contains(&action) {
        debug!("ignoring issue action {}", action);
        return Ok(());
    }

    let installation_id = payload["installation"]["id"]
        .as_i64()
        .ok_or_else(|| anyhow::anyhow!("issue event without installation id"))?;
    let issue_number = payload["issue"]["number"].as_u64();
    let closed = action == "closed";

    let projects = db.list_projects_for_installation(installation_id)?;
    for project in projects {
        let key = (installation_id, project.project_number);
        let db = db.clone();
        let source = source.clone();
        let owner = project.owner.clone();
        let project_number = project.project_number;

        coordinator.schedule(key, move || async move {
            let today = Utc::now().date_naive();
            let result = match (closed, issue_number) {
                (true, Some(number)) => {
                    AdjustSchedule::new(&db, source.as_ref())
                        .on_issue_closed(installation_id, &owner, project_number, number, today)
                        .await
                }
                _ => {
                    RecalculateProject::new(&db, source.as_ref())
                        .execute(installation_id, &owner, project_number, false, today)
                        .await
                }
            };
            if let Err(e) = result {
                error!(
                    "scheduled recalculation failed for {}/{}: {}",
                    owner, project_number, e
                );
            }
        });
    }
    Ok(())
}

fn handle_project_item_event(
    db: &Arc<SqliteStore>,
    source: &Arc<dyn ProjectSource>,
    coordinator: &Arc<RecalcCoordinator>,
    action: &str,
    payload: &Value,
) -> anyhow::Result<()> {
    if action != "edited" {
        debug!("ignoring project item action {}", action);
        return Ok(());
    }

    let node_id = payload["projects_v2_item"]["project_node_id"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("project item event without project node id"))?;

    let Some(project) = db.find_project_by_node_id(node_id)? else {
        debug!("project {} is not tracked; ignoring", node_id);
        return Ok(());
    };

    let key = (project.installation_id, project.project_number);
    let db = db.clone();
    let source = source.clone();

    coordinator.schedule(key, move || async move {
        let today = Utc::now().date_naive();
        if let Err(e) = RecalculateProject::new(&db, source.as_ref())
            .execute(
                project.installation_id,
                &project.owner,
                project.project_number,
                false,
                today,
            )
            .await
        {
            error!(
                "scheduled recalculation failed for {}/{}: {}",
                project.owner, project.project_number, e
            );
        }
    });
    Ok(())
}
