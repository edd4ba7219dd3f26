use chrono::{SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Map;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    Board, BoardView, ColumnId, Comment, CommentMap, CommentThread, Reaction, Task, TaskPatch,
    Video,
};

pub const VIDEOS_FILE: &str = "videos.json";
pub const COMMENTS_FILE: &str = "comments.json";
pub const BOARD_FILE: &str = "board.json";

/// Flat-file JSON store. Each operation reads the whole file, mutates it and
/// writes it back; the mutex serialises those cycles within the process.
pub struct Store {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

fn read_json_sync<T: DeserializeOwned>(path: &Path) -> ServiceResult<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write to a temporary sibling and rename over the target so a crash never
/// leaves a half-written file behind.
fn write_json_sync<T: Serialize>(path: &Path, data: &T) -> ServiceResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = path.with_extension("json.tmp");
    let mut f = File::create(&temp)?;
    let content = serde_json::to_string_pretty(data)?;
    f.write_all(content.as_bytes())?;
    f.sync_all()?;
    fs::rename(temp, path)?;
    Ok(())
}

async fn read_json<T>(path: PathBuf) -> ServiceResult<T>
where
    T: DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || read_json_sync(&path)).await?
}

async fn write_json<T>(path: PathBuf, data: T) -> ServiceResult<()>
where
    T: Serialize + Send + 'static,
{
    tokio::task::spawn_blocking(move || write_json_sync(&path, &data)).await?
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `c<unix-millis>`, bumped past any id already taken.
fn next_comment_id(comments: &CommentMap) -> String {
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let id = format!("c{millis}");
        if !comments.contains_key(&id) {
            return id;
        }
        millis += 1;
    }
}

fn require_author_and_text(author: &str, text: &str) -> ServiceResult<(String, String)> {
    let (author, text) = (author.trim(), text.trim());
    if author.is_empty() || text.is_empty() {
        return Err(ServiceError::BadRequest(
            "Author and text are required.".to_string(),
        ));
    }
    Ok((author.to_string(), text.to_string()))
}

/// Creation order for `c<unix-millis>` ids. Ids without a numeric suffix
/// sort after them, lexicographically.
fn comment_order_key(id: &str) -> (u64, &str) {
    let millis = id
        .strip_prefix('c')
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(u64::MAX);
    (millis, id)
}

/// Top-level ancestor of `comment`, following `parentId` links. Cycles and
/// dangling parents stop the walk at the last known comment.
fn thread_root<'a>(comments: &'a CommentMap, comment: &'a Comment) -> &'a Comment {
    let mut current = comment;
    let mut hops = 0;
    while let Some(parent) = current.parent_id.as_ref().and_then(|p| comments.get(p)) {
        current = parent;
        hops += 1;
        if hops > comments.len() {
            break;
        }
    }
    current
}

/// Groups a video's comments into one-level threads: roots newest first,
/// replies oldest first.
pub fn build_threads(comments: &CommentMap, video_id: &str) -> Vec<CommentThread> {
    let mut roots: Vec<CommentThread> = Vec::new();
    let mut replies: BTreeMap<String, Vec<Comment>> = BTreeMap::new();

    for comment in comments.values().filter(|c| c.video_id == video_id) {
        let root = thread_root(comments, comment);
        if root.id == comment.id {
            roots.push(CommentThread {
                comment: comment.clone(),
                replies: Vec::new(),
            });
        } else {
            replies
                .entry(root.id.clone())
                .or_default()
                .push(comment.clone());
        }
    }

    for thread in &mut roots {
        if let Some(mut list) = replies.remove(&thread.comment.id) {
            list.sort_by(|a, b| (&a.timestamp, &a.id).cmp(&(&b.timestamp, &b.id)));
            thread.replies = list;
        }
    }
    roots.sort_by(|a, b| {
        (&b.comment.timestamp, &b.comment.id).cmp(&(&a.comment.timestamp, &a.comment.id))
    });
    roots
}

impl Store {
    /// Open the store rooted at `data_dir`, seeding any missing file.
    pub async fn open(data_dir: impl Into<PathBuf>) -> ServiceResult<Self> {
        let data_dir = data_dir.into();
        let store = Self {
            data_dir,
            lock: Mutex::new(()),
        };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> ServiceResult<()> {
        let dir = self.data_dir.clone();
        tokio::task::spawn_blocking(move || -> ServiceResult<()> {
            fs::create_dir_all(&dir)?;
            let videos = dir.join(VIDEOS_FILE);
            if !videos.exists() {
                write_json_sync(&videos, &Vec::<Video>::new())?;
            }
            let comments = dir.join(COMMENTS_FILE);
            if !comments.exists() {
                write_json_sync(&comments, &CommentMap::new())?;
            }
            let board = dir.join(BOARD_FILE);
            if !board.exists() {
                write_json_sync(&board, &Board::seeded())?;
            }
            Ok(())
        })
        .await??;
        tracing::debug!("store ready at {}", self.data_dir.display());
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    async fn load_videos(&self) -> ServiceResult<Vec<Video>> {
        read_json(self.path(VIDEOS_FILE)).await
    }

    async fn load_comments(&self) -> ServiceResult<CommentMap> {
        read_json(self.path(COMMENTS_FILE)).await
    }

    async fn load_board(&self) -> ServiceResult<Board> {
        let mut board: Board = read_json(self.path(BOARD_FILE)).await?;
        board.normalize();
        Ok(board)
    }

    // videos

    pub async fn list_videos(&self) -> ServiceResult<Vec<Video>> {
        let _guard = self.lock.lock().await;
        self.load_videos().await
    }

    pub async fn search_videos(&self, query: &str, tag: Option<&str>) -> ServiceResult<Vec<Video>> {
        let videos = self.list_videos().await?;
        Ok(videos.into_iter().filter(|v| v.matches(query, tag)).collect())
    }

    pub async fn get_video(&self, id: &str) -> ServiceResult<Video> {
        self.list_videos()
            .await?
            .into_iter()
            .find(|v| v.id == id)
            .ok_or_else(|| ServiceError::NotFound("Video not found".to_string()))
    }

    pub async fn up_next(&self, id: &str) -> ServiceResult<Vec<Video>> {
        let videos = self.list_videos().await?;
        if !videos.iter().any(|v| v.id == id) {
            return Err(ServiceError::NotFound("Video not found".to_string()));
        }
        Ok(videos.into_iter().filter(|v| v.id != id).collect())
    }

    pub async fn react(&self, video_id: &str, reaction: Reaction) -> ServiceResult<u64> {
        let _guard = self.lock.lock().await;
        let mut videos = self.load_videos().await?;
        let video = videos
            .iter_mut()
            .find(|v| v.id == video_id)
            .ok_or_else(|| ServiceError::NotFound("Video not found.".to_string()))?;
        let counter = match reaction {
            Reaction::Likes => &mut video.likes,
            Reaction::Loves => &mut video.loves,
        };
        *counter += 1;
        let count = *counter;
        write_json(self.path(VIDEOS_FILE), videos).await?;
        Ok(count)
    }

    // comments

    pub async fn list_comments(&self, video_id: &str) -> ServiceResult<Vec<Comment>> {
        let _guard = self.lock.lock().await;
        let comments = self.load_comments().await?;
        let mut list: Vec<Comment> = comments
            .into_values()
            .filter(|c| c.video_id == video_id)
            .collect();
        list.sort_by(|a, b| comment_order_key(&a.id).cmp(&comment_order_key(&b.id)));
        Ok(list)
    }

    pub async fn comment_thread(&self, video_id: &str) -> ServiceResult<Vec<CommentThread>> {
        let _guard = self.lock.lock().await;
        let comments = self.load_comments().await?;
        Ok(build_threads(&comments, video_id))
    }

    /// Stores a top-level comment and bumps the video's counter when the
    /// video exists.
    pub async fn add_comment(&self, video_id: &str, author: &str, text: &str) -> ServiceResult<Comment> {
        let (author, text) = require_author_and_text(author, text)?;
        let _guard = self.lock.lock().await;
        let mut comments = self.load_comments().await?;
        let mut videos = self.load_videos().await?;

        let comment = Comment {
            id: next_comment_id(&comments),
            video_id: video_id.to_string(),
            parent_id: None,
            author,
            text,
            timestamp: now_rfc3339(),
            likes: 0,
            extra: Map::new(),
        };
        comments.insert(comment.id.clone(), comment.clone());

        let video = videos.iter_mut().find(|v| v.id == video_id);
        let touched_video = video.is_some();
        if let Some(video) = video {
            video.comments += 1;
        }

        write_json(self.path(COMMENTS_FILE), comments).await?;
        if touched_video {
            write_json(self.path(VIDEOS_FILE), videos).await?;
        }
        Ok(comment)
    }

    pub async fn like_comment(&self, id: &str) -> ServiceResult<u64> {
        let _guard = self.lock.lock().await;
        let mut comments = self.load_comments().await?;
        let comment = comments
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound("Comment not found.".to_string()))?;
        comment.likes += 1;
        let likes = comment.likes;
        write_json(self.path(COMMENTS_FILE), comments).await?;
        Ok(likes)
    }

    pub async fn reply(&self, parent_id: &str, author: &str, text: &str) -> ServiceResult<Comment> {
        let (author, text) = require_author_and_text(author, text)?;
        let _guard = self.lock.lock().await;
        let mut comments = self.load_comments().await?;
        let parent = comments
            .get(parent_id)
            .ok_or_else(|| ServiceError::NotFound("Parent comment not found.".to_string()))?;

        let reply = Comment {
            id: next_comment_id(&comments),
            video_id: parent.video_id.clone(),
            parent_id: Some(parent_id.to_string()),
            author,
            text,
            timestamp: now_rfc3339(),
            likes: 0,
            extra: Map::new(),
        };
        comments.insert(reply.id.clone(), reply.clone());
        write_json(self.path(COMMENTS_FILE), comments).await?;
        Ok(reply)
    }

    // board

    pub async fn board(&self) -> ServiceResult<Board> {
        let _guard = self.lock.lock().await;
        self.load_board().await
    }

    pub async fn board_view(&self) -> ServiceResult<BoardView> {
        let board = self.board().await?;
        let progress = board.progress();
        Ok(BoardView { board, progress })
    }

    /// Runs `op` against the persisted board and saves the result.
    async fn mutate_board<R, F>(&self, op: F) -> ServiceResult<R>
    where
        F: FnOnce(&mut Board) -> ServiceResult<R>,
    {
        let _guard = self.lock.lock().await;
        let mut board = self.load_board().await?;
        let out = op(&mut board)?;
        write_json(self.path(BOARD_FILE), board).await?;
        Ok(out)
    }

    pub async fn add_task(&self, col: ColumnId, title: &str) -> ServiceResult<Task> {
        self.mutate_board(|b| b.add_task(col, title)).await
    }

    pub async fn update_task(&self, col: ColumnId, id: &str, patch: TaskPatch) -> ServiceResult<Task> {
        self.mutate_board(|b| b.update_task(col, id, patch)).await
    }

    pub async fn delete_task(&self, col: ColumnId, id: &str) -> ServiceResult<Task> {
        self.mutate_board(|b| b.delete_task(col, id)).await
    }

    pub async fn toggle_done(&self, col: ColumnId, id: &str) -> ServiceResult<Task> {
        self.mutate_board(|b| b.toggle_done(col, id)).await
    }

    pub async fn toggle_star(&self, col: ColumnId, id: &str) -> ServiceResult<Task> {
        self.mutate_board(|b| b.toggle_star(col, id)).await
    }

    pub async fn bulk_set_done(&self, col: ColumnId, done: bool) -> ServiceResult<usize> {
        self.mutate_board(|b| Ok(b.bulk_set_done(col, done))).await
    }

    pub async fn clear_completed(&self, col: ColumnId) -> ServiceResult<usize> {
        self.mutate_board(|b| Ok(b.clear_completed(col))).await
    }

    pub async fn move_task(&self, id: &str, to: ColumnId, index: Option<usize>) -> ServiceResult<Task> {
        self.mutate_board(|b| b.move_task(id, to, index)).await
    }

    pub async fn replace_board(&self, mut board: Board) -> ServiceResult<Board> {
        board.normalize();
        self.mutate_board(move |b| {
            *b = board;
            Ok(b.clone())
        })
        .await
    }

    pub async fn reset_board(&self) -> ServiceResult<Board> {
        self.replace_board(Board::seeded()).await
    }
}
