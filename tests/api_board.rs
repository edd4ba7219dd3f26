mod support;

use support::{get, post, send, spawn_app};
use tempfile::tempdir;

#[tokio::test]
async fn board_starts_seeded_with_progress() {
    let tmp = tempdir().expect("tempdir");
    let addr = spawn_app(tmp.path(), serde_json::json!([])).await;

    let board = get(addr, "/api/board").await;
    assert_eq!(board.status, 200);
    let board = board.json();
    assert_eq!(board["columns"].as_array().map(Vec::len), Some(5));
    assert_eq!(board["columns"][3]["title"], "WLAN & VoIP Technologies");
    assert_eq!(board["data"]["routing"].as_array().map(Vec::len), Some(20));
    assert_eq!(board["data"]["asa"][0]["id"], "a1");
    assert_eq!(board["progress"][0]["percent"], 0);
}

#[tokio::test]
async fn tasks_can_be_added_toggled_patched_and_deleted() {
    let tmp = tempdir().expect("tempdir");
    let addr = spawn_app(tmp.path(), serde_json::json!([])).await;

    let created = post(addr, "/api/board/wlan/tasks", r#"{"title":"CAPWAP tunnels"}"#).await;
    assert_eq!(created.status, 201);
    let task_id = created.json()["id"].as_str().expect("id").to_string();

    let board = get(addr, "/api/board").await.json();
    assert_eq!(board["data"]["wlan"][0]["id"], task_id.as_str());

    let done = post(addr, &format!("/api/board/wlan/tasks/{task_id}/done"), "{}").await;
    assert_eq!(done.json()["done"], true);
    let star = post(addr, &format!("/api/board/wlan/tasks/{task_id}/star"), "{}").await;
    assert_eq!(star.json()["starred"], true);

    let patched = send(
        addr,
        "PATCH",
        &format!("/api/board/wlan/tasks/{task_id}"),
        Some(r#"{"notes":"show ap summary"}"#),
    )
    .await;
    assert_eq!(patched.status, 200);
    assert_eq!(patched.json()["notes"], "show ap summary");
    assert_eq!(patched.json()["done"], true);

    let progress = get(addr, "/api/board").await.json()["progress"][3].clone();
    assert_eq!(progress["column"], "wlan");
    assert_eq!(progress["done"], 1);
    assert_eq!(progress["total"], 8);
    assert_eq!(progress["percent"], 13);

    let deleted = send(addr, "DELETE", &format!("/api/board/wlan/tasks/{task_id}"), None).await;
    assert_eq!(deleted.status, 204);
    let gone = send(addr, "DELETE", &format!("/api/board/wlan/tasks/{task_id}"), None).await;
    assert_eq!(gone.status, 404);
    assert_eq!(gone.json()["message"], "Task not found.");

    let bad_column = post(addr, "/api/board/voice/tasks", r#"{"title":"SIP"}"#).await;
    assert_eq!(bad_column.status, 400);
    assert_eq!(bad_column.json()["message"], "Unknown column: voice");

    let empty_title = post(addr, "/api/board/wlan/tasks", r#"{"title":"  "}"#).await;
    assert_eq!(empty_title.status, 400);
}

#[tokio::test]
async fn bulk_clear_and_move_reshape_columns() {
    let tmp = tempdir().expect("tempdir");
    let addr = spawn_app(tmp.path(), serde_json::json!([])).await;

    let bulk = post(addr, "/api/board/asa/bulk", r#"{"done":true}"#).await;
    assert_eq!(bulk.json()["updated"], 8);
    let board = get(addr, "/api/board").await.json();
    assert_eq!(board["progress"][4]["percent"], 100);

    post(addr, "/api/board/asa/tasks/a8/done", "{}").await;
    let cleared = post(addr, "/api/board/asa/clear-completed", "{}").await;
    assert_eq!(cleared.json()["removed"], 7);

    let moved = post(
        addr,
        "/api/board/move",
        r#"{"taskId":"a8","toColumn":"routing","index":0}"#,
    )
    .await;
    assert_eq!(moved.status, 200);
    let board = get(addr, "/api/board").await.json();
    assert_eq!(board["data"]["routing"][0]["id"], "a8");
    assert_eq!(board["data"]["asa"].as_array().map(Vec::len), Some(0));

    let missing = post(addr, "/api/board/move", r#"{"taskId":"zz","toColumn":"basic"}"#).await;
    assert_eq!(missing.status, 404);

    let bad_column = post(addr, "/api/board/move", r#"{"taskId":"b1","toColumn":"voice"}"#).await;
    assert_eq!(bad_column.status, 400);
    assert_eq!(bad_column.json()["message"], "Unknown column: voice");
}

#[tokio::test]
async fn search_export_import_and_reset() {
    let tmp = tempdir().expect("tempdir");
    let addr = spawn_app(tmp.path(), serde_json::json!([])).await;

    let hits = get(addr, "/api/board/search?q=ipv6").await.json();
    assert_eq!(hits["routing"].as_array().map(Vec::len), Some(5));
    assert_eq!(hits["asa"][0]["id"], "a8");
    assert_eq!(hits["basic"].as_array().map(Vec::len), Some(0));

    let csv = get(addr, "/api/board/export.csv").await;
    assert_eq!(csv.status, 200);
    assert!(csv.head.to_lowercase().contains("content-type: text/csv"));
    assert!(csv.body.starts_with("column,title,notes,done\n"));
    assert!(csv.body.contains("Basic Configurations,\"Navigating User Levels\",\"\",0"));

    let imported = send(
        addr,
        "PUT",
        "/api/board",
        Some(r#"{"data":{"basic":[{"id":"x1","title":"Only task","notes":"","done":false}]}}"#),
    )
    .await;
    assert_eq!(imported.status, 200);
    let board = get(addr, "/api/board").await.json();
    assert_eq!(board["data"]["basic"][0]["id"], "x1");
    assert_eq!(board["data"]["switching"].as_array().map(Vec::len), Some(0));

    let lenient = send(
        addr,
        "PUT",
        "/api/board",
        Some(r#"{"data":{"basic":[{"title":"Fresh id"}],"ccnp":[]}}"#),
    )
    .await;
    assert_eq!(lenient.status, 200);
    let board = get(addr, "/api/board").await.json();
    assert_eq!(board["data"]["basic"][0]["title"], "Fresh id");
    assert!(board["data"]["basic"][0]["id"].as_str().is_some_and(|id| id.starts_with('t')));
    assert!(board["data"].get("ccnp").is_none());

    let invalid = send(addr, "PUT", "/api/board", Some(r#"{"columns":[]}"#)).await;
    assert_eq!(invalid.status, 400);
    assert_eq!(invalid.json()["message"], "Invalid JSON file");

    let reset = send(addr, "DELETE", "/api/board", None).await;
    assert_eq!(reset.status, 200);
    let board = get(addr, "/api/board").await.json();
    assert_eq!(board["data"]["basic"].as_array().map(Vec::len), Some(15));
}
