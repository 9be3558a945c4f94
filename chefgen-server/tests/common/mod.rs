#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chefgen::classify::HeuristicParser;
use chefgen_server::{
    auth::AuthKeys,
    database::Database,
    generation::{Generator, ScriptedBackend},
    routes::{router, AppState},
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const MODELS: [&str; 3] = ["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash"];

pub const PANCAKES: &str = "## **Fluffy Buttermilk Pancakes**\n\n\
**Servings**: 4 people\n\n\
Ingredients:\n\
- 2 cups all-purpose flour\n\
- 2 cups buttermilk\n\
- 2 large eggs\n\n\
Instructions:\n\
1. Whisk everything together.\n";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub backend: Arc<ScriptedBackend>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new(backend: ScriptedBackend) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::connect(dir.path().join("chefgen.db"))
            .await
            .unwrap();
        let backend = Arc::new(backend);
        let generator = Generator::new(
            backend.clone(),
            MODELS.iter().map(|m| m.to_string()).collect(),
        );
        let router = router(AppState {
            db: db.clone(),
            generator,
            parser: Arc::new(HeuristicParser),
            auth: AuthKeys::new(b"test-secret", chrono::Duration::days(7)).with_fast_hashing(),
        });
        Self {
            router,
            db,
            backend,
            _dir: dir,
        }
    }

    /// An app whose first model always answers with [`PANCAKES`].
    pub async fn cooking() -> Self {
        Self::new(ScriptedBackend::new().succeed(MODELS[0], PANCAKES)).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register an account and return its token.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": "Secret123"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Generate the pancake recipe as `token` and return the saved recipe.
    pub async fn generate_pancakes(&self, token: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/recipes/generate",
                Some(token),
                Some(json!({"type": "direct", "prompt": "pancakes", "servings": 4})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["recipe"].clone()
    }
}
