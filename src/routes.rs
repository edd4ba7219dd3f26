use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::metadata::PKG_VERSION;
use crate::storage::Store;
use crate::types::{
    Board, BoardView, BulkRequest, ColumnId, Comment, CommentQuery, MoveRequest, NewComment,
    NewTask, ReactRequest, Reaction, SearchQuery, Task, TaskPatch, Video, VideoQuery,
};

pub struct AppState {
    pub store: Store,
    pub started: Instant,
}

impl AppState {
    pub fn new(store: Store) -> Arc<Self> {
        Arc::new(Self {
            store,
            started: Instant::now(),
        })
    }
}

pub type SharedState = Arc<AppState>;

type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn column(raw: &str) -> ServiceResult<ColumnId> {
    raw.parse().map_err(ServiceError::BadRequest)
}

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": PKG_VERSION,
        "uptimeSeconds": state.started.elapsed().as_secs(),
    }))
}

// videos

pub async fn list_videos(
    State(state): State<SharedState>,
    query: Result<Query<VideoQuery>, QueryRejection>,
) -> ServiceResult<Json<Vec<Video>>> {
    let Query(query) = query?;
    let videos = state
        .store
        .search_videos(&query.q, query.tag.as_deref())
        .await?;
    debug!("listing {} videos", videos.len());
    Ok(Json(videos))
}

pub async fn get_video(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ServiceResult<Json<Video>> {
    Ok(Json(state.store.get_video(&id).await?))
}

pub async fn up_next(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ServiceResult<Json<Vec<Video>>> {
    Ok(Json(state.store.up_next(&id).await?))
}

pub async fn react(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: JsonBody<ReactRequest>,
) -> ServiceResult<Json<Map<String, Value>>> {
    let Json(body) = body?;
    let reaction: Reaction = body
        .reaction
        .parse()
        .map_err(|_| ServiceError::BadRequest("Invalid reaction.".to_string()))?;
    let count = state.store.react(&id, reaction).await?;
    info!("video {id} {} -> {count}", reaction.as_str());

    let mut out = Map::new();
    out.insert(reaction.as_str().to_string(), json!(count));
    Ok(Json(out))
}

// comments

pub async fn list_comments(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    query: Result<Query<CommentQuery>, QueryRejection>,
) -> ServiceResult<Response> {
    let Query(query) = query?;
    if query.threaded {
        let threads = state.store.comment_thread(&id).await?;
        return Ok(Json(threads).into_response());
    }
    let comments = state.store.list_comments(&id).await?;
    Ok(Json(comments).into_response())
}

pub async fn add_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: JsonBody<NewComment>,
) -> ServiceResult<(StatusCode, Json<Comment>)> {
    let Json(body) = body?;
    let comment = state.store.add_comment(&id, &body.author, &body.text).await?;
    info!("comment {} posted on video {id}", comment.id);
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn like_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ServiceResult<Json<Value>> {
    let likes = state.store.like_comment(&id).await?;
    Ok(Json(json!({ "likes": likes })))
}

pub async fn reply(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: JsonBody<NewComment>,
) -> ServiceResult<(StatusCode, Json<Comment>)> {
    let Json(body) = body?;
    let reply = state.store.reply(&id, &body.author, &body.text).await?;
    info!("reply {} posted under {id}", reply.id);
    Ok((StatusCode::CREATED, Json(reply)))
}

// board

pub async fn board(State(state): State<SharedState>) -> ServiceResult<Json<BoardView>> {
    Ok(Json(state.store.board_view().await?))
}

pub async fn replace_board(
    State(state): State<SharedState>,
    body: JsonBody<Value>,
) -> ServiceResult<Json<Board>> {
    let Json(body) = body?;
    let board = state.store.replace_board(Board::from_value(body)?).await?;
    info!("board replaced by import");
    Ok(Json(board))
}

pub async fn reset_board(State(state): State<SharedState>) -> ServiceResult<Json<Board>> {
    let board = state.store.reset_board().await?;
    info!("board reset to default topics");
    Ok(Json(board))
}

pub async fn search_board(
    State(state): State<SharedState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ServiceResult<Json<BTreeMap<ColumnId, Vec<Task>>>> {
    let Query(query) = query?;
    let board = state.store.board().await?;
    Ok(Json(board.search(&query.q)))
}

pub async fn export_csv(State(state): State<SharedState>) -> ServiceResult<impl IntoResponse> {
    let board = state.store.board().await?;
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"ccna-tracker.csv\""),
        ],
        board.to_csv(),
    ))
}

pub async fn add_task(
    State(state): State<SharedState>,
    Path(col): Path<String>,
    body: JsonBody<NewTask>,
) -> ServiceResult<(StatusCode, Json<Task>)> {
    let col = column(&col)?;
    let Json(body) = body?;
    let task = state.store.add_task(col, &body.title).await?;
    info!("task {} added to {col}", task.id);
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<SharedState>,
    Path((col, id)): Path<(String, String)>,
    body: JsonBody<TaskPatch>,
) -> ServiceResult<Json<Task>> {
    let col = column(&col)?;
    let Json(patch) = body?;
    Ok(Json(state.store.update_task(col, &id, patch).await?))
}

pub async fn delete_task(
    State(state): State<SharedState>,
    Path((col, id)): Path<(String, String)>,
) -> ServiceResult<StatusCode> {
    let col = column(&col)?;
    state.store.delete_task(col, &id).await?;
    info!("task {id} deleted from {col}");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_done(
    State(state): State<SharedState>,
    Path((col, id)): Path<(String, String)>,
) -> ServiceResult<Json<Task>> {
    let col = column(&col)?;
    Ok(Json(state.store.toggle_done(col, &id).await?))
}

pub async fn toggle_star(
    State(state): State<SharedState>,
    Path((col, id)): Path<(String, String)>,
) -> ServiceResult<Json<Task>> {
    let col = column(&col)?;
    Ok(Json(state.store.toggle_star(col, &id).await?))
}

pub async fn bulk_set_done(
    State(state): State<SharedState>,
    Path(col): Path<String>,
    body: JsonBody<BulkRequest>,
) -> ServiceResult<Json<Value>> {
    let col = column(&col)?;
    let Json(body) = body?;
    let updated = state.store.bulk_set_done(col, body.done).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn clear_completed(
    State(state): State<SharedState>,
    Path(col): Path<String>,
) -> ServiceResult<Json<Value>> {
    let col = column(&col)?;
    let removed = state.store.clear_completed(col).await?;
    info!("cleared {removed} completed tasks from {col}");
    Ok(Json(json!({ "removed": removed })))
}

pub async fn move_task(
    State(state): State<SharedState>,
    body: JsonBody<MoveRequest>,
) -> ServiceResult<Json<Task>> {
    let Json(body) = body?;
    let to = column(&body.to_column)?;
    let task = state.store.move_task(&body.task_id, to, body.index).await?;
    info!("task {} moved to {to}", task.id);
    Ok(Json(task))
}
