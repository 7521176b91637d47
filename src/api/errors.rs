use serde_json::json;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use super::error::{reject, ApiError};
use super::with_state;
use crate::models::{ErrorFilter, ResolvedUpdate};
use crate::state::AppState;

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "errors")
        .and(warp::get())
        .and(warp::query::<ErrorFilter>())
        .and(with_state(state.clone()))
        .and_then(list_errors);

    let update = warp::path!("api" / "errors" / u64)
        .and(warp::patch())
        .and(warp::body::json::<ResolvedUpdate>())
        .and(with_state(state))
        .and_then(update_resolved);

    list.or(update).unify().boxed()
}

async fn list_errors(mut filter: ErrorFilter, state: AppState) -> Result<Response, Rejection> {
    // This listing filters by machine name only.
    filter.machine_id = None;
    let errors = state.store.errors(&filter).await.map_err(reject)?;
    Ok(warp::reply::json(&errors).into_response())
}

async fn update_resolved(
    process_id: u64,
    update: ResolvedUpdate,
    state: AppState,
) -> Result<Response, Rejection> {
    match state
        .store
        .set_resolved(process_id, update.resolved)
        .await
        .map_err(reject)?
    {
        Some(_) => Ok(warp::reply::json(&json!({
            "success": true,
            "message": "Resolved status updated successfully",
        }))
        .into_response()),
        None => Err(reject(ApiError::NotFound("Error log not found".into()))),
    }
}
