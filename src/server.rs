use std::future::Future;
use std::path::Path;

use axum::{
    Router,
    routing::{get, patch, post},
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder as HyperBuilder,
    service::TowerToHyperService,
};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    cli::ServeArguments,
    error::{ServiceError, ServiceResult},
    routes::{self, AppState, SharedState},
    runtime::RuntimeInfo,
    storage::Store,
};

fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/videos", get(routes::list_videos))
        .route("/api/videos/{id}", get(routes::get_video))
        .route("/api/videos/{id}/up-next", get(routes::up_next))
        .route(
            "/api/videos/{id}/comments",
            get(routes::list_comments).post(routes::add_comment),
        )
        .route("/api/videos/{id}/react", post(routes::react))
        .route("/api/comments/{id}/like", post(routes::like_comment))
        .route("/api/comments/{id}/reply", post(routes::reply))
        .route(
            "/api/board",
            get(routes::board)
                .put(routes::replace_board)
                .delete(routes::reset_board),
        )
        .route("/api/board/search", get(routes::search_board))
        .route("/api/board/export.csv", get(routes::export_csv))
        .route("/api/board/move", post(routes::move_task))
        .route("/api/board/{col}/tasks", post(routes::add_task))
        .route(
            "/api/board/{col}/tasks/{id}",
            patch(routes::update_task).delete(routes::delete_task),
        )
        .route("/api/board/{col}/tasks/{id}/done", post(routes::toggle_done))
        .route("/api/board/{col}/tasks/{id}/star", post(routes::toggle_star))
        .route("/api/board/{col}/bulk", post(routes::bulk_set_done))
        .route(
            "/api/board/{col}/clear-completed",
            post(routes::clear_completed),
        )
}

/// API routes plus the static front-end. Unknown GETs fall back to
/// `index.html`.
pub fn build_router(state: SharedState, static_dir: &Path) -> Router {
    let assets =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    api_routes()
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accept loop driving `app` over hyper until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> ServiceResult<()>
where
    F: Future<Output = ()> + Send,
{
    let service = TowerToHyperService::new(app);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!("HTTP accept error: {e}");
                        continue;
                    }
                };
                let svc = service.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    if let Err(err) = HyperBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        tracing::warn!("HTTP connection error from {peer}: {err}");
                    }
                });
            }
            _ = &mut shutdown => break,
        }
    }
    Ok(())
}

pub async fn start_server(args: ServeArguments) -> ServiceResult<()> {
    args.validate().map_err(ServiceError::FromString)?;
    let addr = args.bind_addr().map_err(ServiceError::FromString)?;
    let data_dir = args.data.resolve();

    info!("Opening store at {}", data_dir.display());
    let store = Store::open(&data_dir).await?;
    let app = build_router(AppState::new(store), &args.static_dir);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::FromString(format!("HTTP listen error on {addr}: {e}")))?;
    let local = listener.local_addr()?;

    let runtime = RuntimeInfo::current(local, &data_dir);
    if let Err(e) = runtime.write(&args.runtime_info_file) {
        tracing::warn!(
            "could not write runtime info to {}: {e}",
            args.runtime_info_file.display()
        );
    }
    info!("Server running on http://{local}");

    let result = serve(listener, app, shutdown_signal()).await;
    RuntimeInfo::remove(&args.runtime_info_file);
    info!("Server shut down");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
