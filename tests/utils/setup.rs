use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use chatrooms::{
    app,
    room::models::UserModel,
    AppState, CurrentUser, EventBus, InMemoryRoomRepository, Role, TokenConfig,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub router: Router,
    pub repo: Arc<InMemoryRoomRepository>,
    pub event_bus: EventBus,
    token_config: TokenConfig,
}

pub struct TestSetupBuilder {
    users: Vec<UserModel>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { users: vec![] }
    }

    pub fn with_user(mut self, id: i64, name: &str, role: Role) -> Self {
        self.users.push(UserModel::new(id, name, role));
        self
    }

    pub fn build(self) -> TestSetup {
        let repo = Arc::new(InMemoryRoomRepository::with_users(self.users));
        let event_bus = EventBus::new(16);
        let token_config = TokenConfig::with_secret("integration-secret".to_string(), 1);
        let state = AppState::new(repo.clone(), token_config.clone(), event_bus.clone());

        TestSetup {
            router: app(state),
            repo,
            event_bus,
            token_config,
        }
    }
}

impl TestSetup {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: &CurrentUser,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = self.token_config.create_token(caller).unwrap();
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token));

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

pub fn caller(id: i64, name: &str, role: Role) -> CurrentUser {
    CurrentUser {
        id,
        username: name.to_string(),
        role,
    }
}
