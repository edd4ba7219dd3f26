use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// `views` is rendered verbatim by the front-end, so both a raw count and a
/// preformatted label ("12K views") are valid on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewCount {
    Count(u64),
    Label(String),
}

impl Default for ViewCount {
    fn default() -> Self {
        ViewCount::Count(0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub views: ViewCount,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub loves: u64,
    /// Number of top-level comments posted against this video.
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Fields the backend does not interpret, kept so rewrites are lossless.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Video {
    /// Tutorials page filter: `query` matches the title (case-insensitive) or
    /// any tag containing it; `tag` must match exactly unless it is "all".
    pub fn matches(&self, query: &str, tag: Option<&str>) -> bool {
        let q = query.trim().to_lowercase();
        let matches_search = q.is_empty()
            || self.title.to_lowercase().contains(&q)
            || self.tags.iter().any(|t| t.contains(&q));
        let matches_tag = match tag {
            None | Some("") | Some("all") => true,
            Some(tag) => self.tags.iter().any(|t| t == tag),
        };
        matches_search && matches_tag
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-disk shape of `comments.json`: comments keyed by id.
pub type CommentMap = BTreeMap<String, Comment>;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Likes,
    Loves,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Likes => "likes",
            Reaction::Loves => "loves",
        }
    }
}

impl FromStr for Reaction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "likes" => Ok(Reaction::Likes),
            "loves" => Ok(Reaction::Loves),
            other => Err(format!("unknown reaction '{other}'")),
        }
    }
}

/// The fixed topic columns of the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnId {
    Basic,
    Switching,
    Routing,
    Wlan,
    Asa,
}

impl ColumnId {
    pub const ALL: [ColumnId; 5] = [
        ColumnId::Basic,
        ColumnId::Switching,
        ColumnId::Routing,
        ColumnId::Wlan,
        ColumnId::Asa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnId::Basic => "basic",
            ColumnId::Switching => "switching",
            ColumnId::Routing => "routing",
            ColumnId::Wlan => "wlan",
            ColumnId::Asa => "asa",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ColumnId::Basic => "Basic Configurations",
            ColumnId::Switching => "Switching Technologies",
            ColumnId::Routing => "Routing Technologies",
            ColumnId::Wlan => "WLAN & VoIP Technologies",
            ColumnId::Asa => "Cisco ASA Firewall",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ColumnId::Basic => "bg-blue-100 dark:bg-blue-900/30",
            ColumnId::Switching => "bg-pink-100 dark:bg-pink-900/30",
            ColumnId::Routing => "bg-green-100 dark:bg-green-900/30",
            ColumnId::Wlan => "bg-purple-100 dark:bg-purple-900/30",
            ColumnId::Asa => "bg-orange-100 dark:bg-orange-900/30",
        }
    }

    pub fn from_title(title: &str) -> Option<ColumnId> {
        ColumnId::ALL.into_iter().find(|c| c.title() == title)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnId::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown column: {s}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub color: String,
}

impl From<ColumnId> for Column {
    fn from(id: ColumnId) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            color: id.color().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub starred: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub done: Option<bool>,
    pub starred: Option<bool>,
}

/// Persisted tracker board, same shape as the browser's JSON export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default = "default_columns")]
    pub columns: Vec<Column>,
    pub data: BTreeMap<ColumnId, Vec<Task>>,
}

pub fn default_columns() -> Vec<Column> {
    ColumnId::ALL.into_iter().map(Column::from).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProgress {
    pub column: ColumnId,
    pub total: usize,
    pub done: usize,
    pub percent: u8,
}

#[derive(Clone, Debug, Serialize)]
pub struct BoardView {
    #[serde(flatten)]
    pub board: Board,
    pub progress: Vec<ColumnProgress>,
}

// Request payloads

#[derive(Clone, Debug, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReactRequest {
    #[serde(default)]
    pub reaction: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BulkRequest {
    pub done: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub task_id: String,
    /// Raw column id, validated by the handler.
    pub to_column: String,
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VideoQuery {
    #[serde(default)]
    pub q: String,
    pub tag: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommentQuery {
    #[serde(default)]
    pub threaded: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
