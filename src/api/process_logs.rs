use serde::Deserialize;
use serde_json::json;
use tracing::info;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use super::error::reject;
use super::with_state;
use crate::models::ErrorFilter;
use crate::state::AppState;

#[derive(Deserialize)]
struct ExistsQuery {
    log_id: u64,
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let run = warp::path!("api" / "processlogs" / "process-logs")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(process_logs);

    let listing = warp::path!("api" / "processlogs" / "processed-logs")
        .and(warp::get())
        .and(warp::query::<ErrorFilter>())
        .and(with_state(state.clone()))
        .and_then(processed_logs);

    let exists = warp::path!("api" / "processlogs" / "exists")
        .and(warp::get())
        .and(warp::query::<ExistsQuery>())
        .and(with_state(state.clone()))
        .and_then(processed_log_exists);

    let machines = warp::path!("api" / "processlogs" / "machines")
        .and(warp::get())
        .and(with_state(state))
        .and_then(list_machines);

    run.or(listing)
        .unify()
        .or(exists)
        .unify()
        .or(machines)
        .unify()
        .boxed()
}

async fn process_logs(state: AppState) -> Result<Response, Rejection> {
    info!("Process-logs requested");
    let report = state.processor.run().await.map_err(reject)?;
    Ok(warp::reply::json(&report).into_response())
}

async fn processed_logs(mut filter: ErrorFilter, state: AppState) -> Result<Response, Rejection> {
    // This listing filters by machine id only.
    filter.machine_name = None;
    let rows = state.store.errors(&filter).await.map_err(reject)?;
    Ok(warp::reply::json(&rows).into_response())
}

async fn processed_log_exists(query: ExistsQuery, state: AppState) -> Result<Response, Rejection> {
    let found = state
        .store
        .processed_log_for(query.log_id)
        .await
        .map_err(reject)?;
    let body = match found {
        Some(p) => json!({ "exists": true, "process_id": p.process_id }),
        None => json!({ "exists": false, "process_id": null }),
    };
    Ok(warp::reply::json(&body).into_response())
}

pub(super) async fn list_machines(state: AppState) -> Result<Response, Rejection> {
    let machines = state.store.machines().await.map_err(reject)?;
    Ok(warp::reply::json(&machines).into_response())
}
