//! HTTP front door
//!
//! JSON REST surface over the orchestrator: agent management, market and
//! event reads, cycle triggers and the observability endpoints. CORS is
//! open; there is no authentication layer here.

use crate::agent::{Reasoner, StageKind, WorkItem};
use crate::config::AgentSpec;
use crate::observability::metrics::metrics;
use crate::pipeline::{CycleReport, Orchestrator, StageReport};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Shared handle the route handlers close over
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<Orchestrator>,
    pub reasoner: Arc<Reasoner>,
    pub platform_name: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct BannerResponse {
    name: String,
    version: String,
    endpoints: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    id: String,
    stage: String,
}

#[derive(Debug, Serialize)]
struct StageSummary {
    stage: StageKind,
    executions: usize,
    succeeded: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct CycleSummary {
    cycle: u64,
    stages: Vec<StageSummary>,
    total_executions: usize,
    total_failures: usize,
}

#[derive(Debug, Serialize)]
struct ClearedResponse {
    cleared: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    cycles_completed: u64,
    total_agents: usize,
    timestamp: u64,
}

fn summarize_stage(report: &StageReport) -> StageSummary {
    StageSummary {
        stage: report.stage,
        executions: report.executions(),
        succeeded: report.succeeded,
        failed: report.failed,
    }
}

fn summarize_cycle(report: &CycleReport) -> CycleSummary {
    CycleSummary {
        cycle: report.cycle,
        stages: report.stages.iter().map(summarize_stage).collect(),
        total_executions: report.total_executions(),
        total_failures: report.total_failures(),
    }
}

fn error_reply(status: StatusCode, message: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: message,
            timestamp: current_timestamp(),
        }),
        status,
    )
}

fn with_context(
    ctx: ApiContext,
) -> impl Filter<Extract = (ApiContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Build the full route tree
pub fn routes(ctx: ApiContext) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let banner = warp::path::end()
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .map(|ctx: ApiContext| {
            let mut endpoints = HashMap::new();
            endpoints.insert("/api/status".to_string(), "system status snapshot".to_string());
            endpoints.insert("/api/agents".to_string(), "agent roster and creation".to_string());
            endpoints.insert("/api/markets".to_string(), "market registry".to_string());
            endpoints.insert("/api/events".to_string(), "event queue snapshot".to_string());
            endpoints.insert("/api/cycle/run".to_string(), "trigger a full cycle".to_string());
            endpoints.insert("/metrics".to_string(), "platform metrics".to_string());
            endpoints.insert("/health".to_string(), "liveness and basic status".to_string());
            warp::reply::json(&BannerResponse {
                name: ctx.platform_name,
                version: env!("CARGO_PKG_VERSION").to_string(),
                endpoints,
            })
        });

    let status = warp::path!("api" / "status")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .map(|ctx: ApiContext| warp::reply::json(&ctx.orchestrator.system_status()));

    let create_agent = warp::path!("api" / "agents")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .map(|spec: AgentSpec, ctx: ApiContext| {
            match ctx.orchestrator.agents().create(&spec, ctx.reasoner.clone()) {
                Ok(id) => warp::reply::with_status(
                    warp::reply::json(&CreatedResponse {
                        id,
                        stage: spec.stage,
                    }),
                    StatusCode::CREATED,
                ),
                Err(e) => error_reply(StatusCode::BAD_REQUEST, e.to_string()),
            }
        });

    let list_agents = warp::path!("api" / "agents")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .map(|ctx: ApiContext| warp::reply::json(&ctx.orchestrator.agents().list_all()));

    let get_agent = warp::path!("api" / "agents" / String / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .map(|stage: String, id: String, ctx: ApiContext| {
            let stage: StageKind = match stage.parse() {
                Ok(stage) => stage,
                Err(e) => return error_reply(StatusCode::BAD_REQUEST, e.to_string()),
            };
            match ctx.orchestrator.agents().get(stage, &id) {
                Ok(agent) => warp::reply::with_status(
                    warp::reply::json(&agent.core().snapshot()),
                    StatusCode::OK,
                ),
                Err(e) => error_reply(StatusCode::NOT_FOUND, e.to_string()),
            }
        });

    let run_agent = warp::path!("api" / "agents" / String / String / "run")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(
            |stage: String, id: String, item: WorkItem, ctx: ApiContext| async move {
                let stage: StageKind = match stage.parse() {
                    Ok(stage) => stage,
                    Err(e) => {
                        return Ok::<_, Infallible>(error_reply(
                            StatusCode::BAD_REQUEST,
                            e.to_string(),
                        ))
                    }
                };
                match ctx.orchestrator.agents().get(stage, &id) {
                    Ok(agent) => {
                        let record = agent.run_cycle(item).await;
                        Ok(warp::reply::with_status(
                            warp::reply::json(&record),
                            StatusCode::OK,
                        ))
                    }
                    Err(e) => Ok(error_reply(StatusCode::NOT_FOUND, e.to_string())),
                }
            },
        );

    let list_markets = warp::path!("api" / "markets")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .map(|ctx: ApiContext| warp::reply::json(&ctx.orchestrator.markets().list_all()));

    let get_market = warp::path!("api" / "markets" / String)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .map(|id: String, ctx: ApiContext| match ctx.orchestrator.markets().get(&id) {
            Some(market) => {
                warp::reply::with_status(warp::reply::json(&market), StatusCode::OK)
            }
            None => error_reply(
                StatusCode::NOT_FOUND,
                crate::error::PlatformError::MarketNotFound(id).to_string(),
            ),
        });

    let run_cycle = warp::path!("api" / "cycle" / "run")
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and_then(|ctx: ApiContext| async move {
            let report = ctx.orchestrator.run_full_cycle().await;
            Ok::<_, Infallible>(warp::reply::json(&summarize_cycle(&report)))
        });

    let run_stage = warp::path!("api" / "cycle" / String)
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and_then(|stage: String, ctx: ApiContext| async move {
            let stage: StageKind = match stage.parse() {
                Ok(stage) => stage,
                Err(e) => {
                    return Ok::<_, Infallible>(error_reply(
                        StatusCode::BAD_REQUEST,
                        e.to_string(),
                    ))
                }
            };
            let report = ctx.orchestrator.run_stage(stage).await;
            Ok(warp::reply::with_status(
                warp::reply::json(&summarize_stage(&report)),
                StatusCode::OK,
            ))
        });

    let list_events = warp::path!("api" / "events")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .map(|ctx: ApiContext| warp::reply::json(&ctx.orchestrator.events().snapshot()));

    let clear_events = warp::path!("api" / "events")
        .and(warp::delete())
        .and(with_context(ctx.clone()))
        .map(|ctx: ApiContext| {
            let cleared = ctx.orchestrator.events().len();
            ctx.orchestrator.events().clear();
            warp::reply::json(&ClearedResponse { cleared })
        });

    let metrics_route = warp::path!("metrics")
        .and(warp::get())
        .map(|| warp::reply::json(&metrics().get_metrics()));

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_context(ctx))
        .map(|ctx: ApiContext| {
            warp::reply::json(&HealthResponse {
                status: "healthy".to_string(),
                cycles_completed: ctx.orchestrator.cycles_completed(),
                total_agents: ctx.orchestrator.agents().total(),
                timestamp: current_timestamp(),
            })
        });

    banner
        .or(status)
        .or(create_agent)
        .or(list_agents)
        .or(run_agent)
        .or(get_agent)
        .or(list_markets)
        .or(get_market)
        .or(run_cycle)
        .or(run_stage)
        .or(list_events)
        .or(clear_events)
        .or(metrics_route)
        .or(health)
        .with(warp::cors().allow_any_origin())
}

/// Serve the API until the task is dropped or the process exits
pub async fn serve(ctx: ApiContext, host: IpAddr, port: u16) {
    tracing::info!(%host, port, "Starting HTTP server");
    warp::serve(routes(ctx)).run((host, port)).await;
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
