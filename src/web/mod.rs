//! HTTP 진입점: `k=<page>` 쿼리로 페이지를 고른다

pub mod pages;

use crate::api::{show_api, ApiParams};
use crate::db::PoolDb;
use crate::error::CkwebError;
use crate::protocol::Separators;
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use pages::Page;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::{
    self,
    unix::{signal, SignalKind},
};
use tracing::{error, info, warn};

pub const SERVICE_DOWN_BODY: &str = "Web site is currently down";

/// 핸들러가 공유하는 상태
#[derive(Clone)]
pub struct AppState {
    pub db: PoolDb,
    pub separators: Separators,
    /// 존재하면 모든 요청에 이 파일 내용을 돌려준다
    pub maintenance_file: Option<PathBuf>,
}

impl AppState {
    pub fn new(db: PoolDb) -> Self {
        let separators = db.encoder().separators;
        Self {
            db,
            separators,
            maintenance_file: None,
        }
    }

    pub fn with_maintenance_file(mut self, path: Option<PathBuf>) -> Self {
        self.maintenance_file = path;
        self
    }

    async fn maintenance_notice(&self) -> Option<String> {
        let path = self.maintenance_file.as_ref()?;
        tokio::fs::read_to_string(path).await.ok()
    }
}

impl IntoResponse for CkwebError {
    fn into_response(self) -> Response {
        if self.is_service_down() {
            error!("CKPERR: {}", self);
            return (StatusCode::SERVICE_UNAVAILABLE, SERVICE_DOWN_BODY).into_response();
        }

        let status = match self {
            CkwebError::Unauthenticated => StatusCode::UNAUTHORIZED,
            CkwebError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.php", get(index_handler))
        .with_state(Arc::new(state))
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(notice) = state.maintenance_notice().await {
        return (StatusCode::SERVICE_UNAVAILABLE, notice).into_response();
    }

    let inet = peer
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    let name = query.get("k").map(String::as_str).unwrap_or("");

    match Page::from_name(name) {
        Page::Api => api_response(&state, &query, &inet).await,
        page => {
            warn!("page '{}' requested but has no renderer", page.name());
            (StatusCode::NOT_IMPLEMENTED, format!("{}: not available", page.name())).into_response()
        }
    }
}

async fn api_response(state: &AppState, query: &HashMap<String, String>, inet: &str) -> Response {
    let params = ApiParams {
        username: query.get("username").cloned(),
        api: query.get("api").cloned(),
        json: query.get("json").cloned(),
        work: query.get("work").cloned(),
        admin: query.get("admin").cloned(),
    };

    let answer = match show_api(&state.db, &params, inet).await {
        Ok(answer) => answer,
        Err(e) => return e.into_response(),
    };

    let content_type = if answer.is_json() {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };
    match answer.render(&state.separators) {
        Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => e.into_response(),
    }
}

/// HTTP 서버 실행. 종료 신호가 올 때까지 돌아오지 않는다.
pub async fn serve(state: AppState, listen: &str) -> crate::error::Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(listen).await.map_err(|e| {
        CkwebError::ConfigError(format!("Failed to bind {}: {}", listen, e))
    })?;
    info!("Server running on {}", listen);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::protocol::MessageEncoder;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(mock: MockTransport) -> Router {
        let db = PoolDb::new(
            Arc::new(mock),
            MessageEncoder::new(Separators::default(), "php"),
        );
        router(AppState::new(db))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_unknown_page_falls_back_to_index() {
        let (status, body) = get(app(MockTransport::new()), "/index.php?k=nosuch").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body, "index: not available");

        let (status, body) = get(app(MockTransport::new()), "/").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body, "index: not available");
    }

    #[tokio::test]
    async fn test_html_page_not_implemented() {
        let (status, _) = get(app(MockTransport::new()), "/?k=workers").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_api_backend_down_is_503() {
        let (status, body) =
            get(app(MockTransport::new()), "/index.php?k=api&username=a&api=k").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, SERVICE_DOWN_BODY);
    }

    #[tokio::test]
    async fn test_api_json() {
        let mock = MockTransport::new()
            .reply("getatts", "getatts1.1.ok.KAPIKey.str=k")
            .reply("homepage", "home1.1.ok.lastheight=5");
        let (status, body) = get(app(mock), "/index.php?k=api&username=a&api=k&json=y").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(r#"{"lastbc":"","lastheight":"5","#));
    }

    fn shared_app(mock: &Arc<MockTransport>, admin_user: Option<&str>) -> Router {
        let encoder = MessageEncoder::new(Separators::default(), "php")
            .with_admin_user(admin_user.map(str::to_string));
        router(AppState::new(PoolDb::new(mock.clone(), encoder)))
    }

    #[tokio::test]
    async fn test_peer_ip_sent_as_createinet() {
        let mock = Arc::new(MockTransport::new().reply("getatts", "getatts1.1.ok.KAPIKey.str=k"));
        let peer: SocketAddr = "203.0.113.7:51234".parse().unwrap();

        let mut req = Request::builder()
            .uri("/index.php?k=api&username=alice&api=k")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        shared_app(&mock, None).oneshot(req).await.unwrap();

        let sent = mock.sent();
        assert!(sent[0].0.starts_with("getatts."));
        assert!(sent[0].0.ends_with("\tcreateby=alice\tcreateinet=203.0.113.7"));
    }

    #[tokio::test]
    async fn test_admin_param_reaches_ckdb() {
        let mock = Arc::new(MockTransport::new().reply("getatts", "getatts1.1.ok.KAPIKey.str=k"));

        let (status, _) = get(
            shared_app(&mock, Some("Kano")),
            "/index.php?k=api&username=Kano&api=k&admin=bob",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let sent = mock.sent();
        assert!(sent[0].0.ends_with("\tcreateby=Kano\tcreateinet=\tadmin=bob"));

        get(
            shared_app(&mock, Some("Kano")),
            "/index.php?k=api&username=alice&api=k&admin=bob",
        )
        .await;
        let later = mock.sent().split_off(sent.len());
        assert!(!later.is_empty());
        assert!(later.iter().all(|(msg, _)| !msg.contains("admin=")));
    }

    #[tokio::test]
    async fn test_maintenance_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maintenance.txt");
        std::fs::write(&path, "Back soon").unwrap();

        let db = PoolDb::new(
            Arc::new(MockTransport::new()),
            MessageEncoder::new(Separators::default(), "php"),
        );
        let app = router(AppState::new(db).with_maintenance_file(Some(path)));

        let (status, body) = get(app, "/?k=api").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Back soon");
    }
}
