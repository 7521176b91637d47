pub mod chat;
pub mod error;
pub mod errors;
pub mod knowledge_base;
pub mod process_logs;

use serde_json::json;
use std::convert::Infallible;
use warp::filters::BoxedFilter;
use warp::http::Method;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::state::AppState;

pub use error::{handle_rejection, ApiError};

pub fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// The full HTTP surface, with CORS, rejection rendering and request tracing applied.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(vec!["content-type", "authorization", "accept"]);

    root(state.clone())
        .or(errors::routes(state.clone()))
        .unify()
        .or(process_logs::routes(state.clone()))
        .unify()
        .or(knowledge_base::routes(state.clone()))
        .unify()
        .or(chat::routes(state))
        .unify()
        .with(cors)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn root(state: AppState) -> BoxedFilter<(Response,)> {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "healthy" })).into_response());

    let test_db = warp::path!("test-db")
        .and(warp::get())
        .and(with_state(state))
        .and_then(test_db);

    health.or(test_db).unify().boxed()
}

async fn test_db(state: AppState) -> Result<Response, Rejection> {
    let body = match state.store.ping().await {
        Ok(()) => json!({ "success": true, "message": "Database connection is working!" }),
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    };
    Ok(warp::reply::json(&body).into_response())
}
