use crate::errors::{json_error, ApiError};
use crate::orchestrator::Orchestrator;
use crate::types::{AnalysisRequest, AnalysisResult, HealthSnapshot, UserProfile};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(post_analysis)
        .service(post_quick_check)
        .service(get_capabilities)
        .service(get_history)
        .service(get_stats)
        .service(get_health);
}

fn caller_request_id(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[post("/analysis")]
async fn post_analysis(
    orchestrator: web::Data<Orchestrator>,
    http: HttpRequest,
    payload: web::Json<AnalysisRequest>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = orchestrator
        .request_analysis(payload.into_inner())
        .await
        .map_err(|err| with_caller_id(ApiError::from(err), &http))?;
    Ok(respond_with_result(result, started.elapsed()))
}

#[derive(Debug, Deserialize)]
struct QuickCheckRequest {
    snapshot: HealthSnapshot,
    #[serde(default)]
    profile: UserProfile,
}

#[post("/analysis/quick")]
async fn post_quick_check(
    orchestrator: web::Data<Orchestrator>,
    http: HttpRequest,
    payload: web::Json<QuickCheckRequest>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let QuickCheckRequest { snapshot, profile } = payload.into_inner();
    let result = orchestrator
        .quick_health_check(snapshot, profile)
        .await
        .map_err(|err| with_caller_id(ApiError::from(err), &http))?;
    Ok(respond_with_result(result, started.elapsed()))
}

fn with_caller_id(err: ApiError, http: &HttpRequest) -> ApiError {
    match caller_request_id(http) {
        Some(id) => err.with_request_id(id),
        None => err,
    }
}

fn respond_with_result(result: AnalysisResult, elapsed: Duration) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    response.append_header(("X-Analysis-Id", result.id.clone()));
    response.append_header(("X-Analysis-Method", result.method.as_str()));
    response.append_header(("X-Route", result.decision.route_name()));
    response.append_header((
        "X-Analysis-Cache",
        if result.metrics.cache_hit { "hit" } else { "miss" },
    ));
    response.append_header(("X-Analysis-Latency", format!("{}ms", elapsed.as_millis())));
    response.json(result)
}

#[get("/capabilities")]
async fn get_capabilities(orchestrator: web::Data<Orchestrator>) -> impl Responder {
    HttpResponse::Ok().json(orchestrator.get_capabilities())
}

#[get("/history")]
async fn get_history(orchestrator: web::Data<Orchestrator>) -> impl Responder {
    HttpResponse::Ok().json(orchestrator.history())
}

#[get("/stats")]
async fn get_stats(orchestrator: web::Data<Orchestrator>) -> impl Responder {
    HttpResponse::Ok().json(orchestrator.stats())
}

#[get("/healthz")]
async fn get_health(orchestrator: web::Data<Orchestrator>) -> impl Responder {
    #[derive(Serialize)]
    struct HealthResponse {
        status: &'static str,
        ai_online: bool,
        in_flight: usize,
        timestamp: String,
    }

    let capabilities = orchestrator.get_capabilities();
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        ai_online: capabilities.ai_available,
        in_flight: orchestrator.status().in_flight,
        timestamp: Utc::now().to_rfc3339(),
    })
}
