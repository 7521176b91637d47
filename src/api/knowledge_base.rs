use serde::Deserialize;
use serde_json::json;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use super::error::{reject, ApiError};
use super::process_logs::list_machines;
use super::with_state;
use crate::models::{KnowledgeFilter, NewKnowledgeEntry, SolutionUpdate};
use crate::state::AppState;

#[derive(Deserialize)]
struct ExistsQuery {
    content: String,
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "knowledgebase")
        .and(warp::get())
        .and(warp::query::<KnowledgeFilter>())
        .and(with_state(state.clone()))
        .and_then(list_entries);

    let create = warp::path!("api" / "knowledgebase")
        .and(warp::post())
        .and(warp::body::json::<NewKnowledgeEntry>())
        .and(with_state(state.clone()))
        .and_then(create_entry);

    let with_name = warp::path!("api" / "knowledgebase" / "with_name")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(entries_with_machine_name);

    let machines = warp::path!("api" / "knowledgebase" / "machines")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_machines);

    let exists = warp::path!("api" / "knowledgebase" / "exists")
        .and(warp::get())
        .and(warp::query::<ExistsQuery>())
        .and(with_state(state.clone()))
        .and_then(problem_exists);

    let update = warp::path!("api" / "knowledgebase" / u64)
        .and(warp::patch())
        .and(warp::body::json::<SolutionUpdate>())
        .and(with_state(state))
        .and_then(update_solution);

    list.or(create)
        .unify()
        .or(with_name)
        .unify()
        .or(machines)
        .unify()
        .or(exists)
        .unify()
        .or(update)
        .unify()
        .boxed()
}

async fn list_entries(filter: KnowledgeFilter, state: AppState) -> Result<Response, Rejection> {
    let entries: Vec<_> = state
        .store
        .knowledge_entries()
        .await
        .map_err(reject)?
        .into_iter()
        .filter(|e| filter.matches(e))
        .collect();
    Ok(warp::reply::json(&entries).into_response())
}

async fn create_entry(entry: NewKnowledgeEntry, state: AppState) -> Result<Response, Rejection> {
    let machines = state.store.machines().await.map_err(reject)?;
    if !machines.iter().any(|m| m.machine_id == entry.machine_id) {
        return Err(reject(ApiError::BadRequest(format!(
            "Machine {} does not exist",
            entry.machine_id
        ))));
    }
    let created = state.store.insert_knowledge(entry).await.map_err(reject)?;
    Ok(warp::reply::json(&created).into_response())
}

async fn entries_with_machine_name(state: AppState) -> Result<Response, Rejection> {
    let entries: Vec<_> = state
        .store
        .knowledge_entries()
        .await
        .map_err(reject)?
        .into_iter()
        .filter(|e| e.machine_name.is_some())
        .collect();
    Ok(warp::reply::json(&entries).into_response())
}

async fn problem_exists(query: ExistsQuery, state: AppState) -> Result<Response, Rejection> {
    let hits = state
        .store
        .knowledge_by_content(&query.content)
        .await
        .map_err(reject)?;
    let body = match hits.first() {
        Some(entry) => json!({ "exists": true, "knowledge_id": entry.knowledge_id }),
        None => json!({ "exists": false, "knowledge_id": null }),
    };
    Ok(warp::reply::json(&body).into_response())
}

async fn update_solution(
    knowledge_id: u64,
    update: SolutionUpdate,
    state: AppState,
) -> Result<Response, Rejection> {
    match state
        .store
        .update_solution(knowledge_id, &update.solution)
        .await
        .map_err(reject)?
    {
        Some(entry) => Ok(warp::reply::json(&entry).into_response()),
        None => Err(reject(ApiError::NotFound(
            "Knowledge base entry not found".into(),
        ))),
    }
}
