//! Billing webhook module
//!
//! Plan transitions driven by billing provider events. The provider's own
//! signature scheme is terminated outside this service; the forwarded
//! callbacks are verified with the shared billing webhook secret.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::entities::PlanTier;
use crate::infrastructure::persistence::SqliteStore;
use crate::web::config::AppConfig;
use crate::web::models::ApiResponse;
use crate::web::rate_limit::RateLimits;
use crate::web::webhook::verify_signature;

/// POST /api/billing/webhook
pub async fn handle_billing_webhook(
    req: HttpRequest,
    body: web::Bytes,
    db: web::Data<Arc<SqliteStore>>,
    config: web::Data<AppConfig>,
    limits: web::Data<Arc<RateLimits>>,
) -> HttpResponse {
    let client = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    if !limits.webhooks.check(&client) {
        return HttpResponse::TooManyRequests()
            .json(ApiResponse::<()>::error("rate limit exceeded".to_string()));
    }

    let signature = req
        .headers()
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());
    if !verify_signature(&config.billing_webhook_secret, &body, signature) {
        warn!("billing webhook rejected: bad signature");
        return HttpResponse::Unauthorized()
            .json(ApiResponse::<()>::error("invalid signature".to_string()));
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("billing payload is not JSON: {}", e);
            return HttpResponse::Ok().json(ApiResponse::success("ignored"));
        }
    };

    if let Err(e) = apply_billing_event(&db, &payload) {
        error!("billing event processing failed: {}", e);
    }

    HttpResponse::Ok().json(ApiResponse::success("accepted"))
}

/// Applies one billing event to the installation plan state machine
///
/// checkout.session.completed moves the installation to pro/active;
/// customer.subscription.updated derives the plan from the subscription
/// status (active or trialing keep pro); customer.subscription.deleted
/// reverts to free/canceled.
pub fn apply_billing_event(db: &SqliteStore, payload: &Value) -> anyhow::Result<()> {
    let event_type = payload["type"].as_str().unwrap_or("");
    let object = &payload["data"]["object"];

    match event_type {
        "checkout.session.completed" => {
            let installation_id = object["client_reference_id"]
                .as_str()
                .and_then(|id| id.parse::<i64>().ok())
                .or_else(|| object["metadata"]["installation_id"].as_i64())
                .ok_or_else(|| anyhow::anyhow!("checkout event without installation reference"))?;

            db.set_plan(installation_id, PlanTier::Pro, Some("active"))?;
            db.set_billing_ids(
                installation_id,
                object["customer"].as_str(),
                object["subscription"].as_str(),
            )?;
            db.record_audit(
                installation_id,
                "plan_upgraded",
                serde_json::json!({ "plan": "pro" }),
            )?;
            info!("installation {} upgraded to pro", installation_id);
        }
        "customer.subscription.updated" => {
            let Some(installation) = lookup_by_customer(db, object)? else {
                return Ok(());
            };
            let status = object["status"].as_str().unwrap_or("unknown");
            let plan = if matches!(status, "active" | "trialing") {
                PlanTier::Pro
            } else {
                PlanTier::Free
            };

            db.set_plan(installation.installation_id, plan, Some(status))?;
            db.record_audit(
                installation.installation_id,
                "plan_updated",
                serde_json::json!({ "plan": plan.as_str(), "status": status }),
            )?;
        }
        "customer.subscription.deleted" => {
            let Some(installation) = lookup_by_customer(db, object)? else {
                return Ok(());
            };
            db.set_plan(installation.installation_id, PlanTier::Free, Some("canceled"))?;
            db.record_audit(
                installation.installation_id,
                "plan_canceled",
                Value::Null,
            )?;
            info!("installation {} reverted to free", installation.installation_id);
        }
        other => debug!("ignoring billing event {}", other),
    }
    Ok(())
}

fn lookup_by_customer(
    db: &SqliteStore,
    object: &Value,
) -> anyhow::Result<Option<crate::domain::entities::Installation>> {
    let Some(customer_id) = object["customer"].as_str() else {
        return Ok(None);
    };
    let installation = db.find_installation_by_billing_customer(customer_id)?;
    if installation.is_none() {
        debug!("billing event for unknown customer {}", customer_id);
    }
    Ok(installation)
}
