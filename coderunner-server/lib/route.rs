//! Router configuration for the coderunner server.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handler, middleware as app_middleware, state::AppState};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Create a new router with the given state
pub fn create_router(state: AppState) -> Router {
    let body_limit = *state.get_config().get_max_body_size();

    let api = Router::new()
        .route("/execute", post(handler::execute))
        .route("/execute/quick", post(handler::execute_quick))
        .route("/languages", get(handler::languages))
        .route("/status", get(handler::status));

    Router::new()
        .route("/health", get(handler::health))
        .nest("/api", api)
        .fallback(handler::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(app_middleware::logging_middleware))
        .with_state(state)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use coderunner_core::{
        config::RunnerConfig,
        runtime::{MockRuntime, RawOutcome},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    fn router_with(runtime: Arc<MockRuntime>, runner: RunnerConfig) -> Router {
        let config = Config::new(None, None, runner).unwrap();
        create_router(AppState::new(Arc::new(config), runtime))
    }

    fn router(runtime: Arc<MockRuntime>) -> Router {
        router_with(runtime, RunnerConfig::default())
    }

    async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = router.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(router(Arc::new(MockRuntime::echo())), Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "codezy-execution-service");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_languages() {
        let (status, body) =
            send(router(Arc::new(MockRuntime::echo())), Method::GET, "/api/languages", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["languages"],
            json!([
                {"id": "python", "name": "Python", "version": "3.11"},
                {"id": "java", "name": "Java", "version": "17"},
                {"id": "cpp", "name": "C++", "version": "C++17"}
            ])
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) =
            send(router(Arc::new(MockRuntime::echo())), Method::GET, "/api/nope", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "error": "Endpoint not found"}));
    }

    #[test_log::test(tokio::test)]
    async fn test_execute_grades_submission() {
        let runtime = Arc::new(MockRuntime::new(|invocation| {
            let input = String::from_utf8_lossy(&invocation.stdin).to_string();
            let sum: i64 = input
                .split_whitespace()
                .filter_map(|n| n.parse::<i64>().ok())
                .sum();
            Ok(RawOutcome::exited(0, format!("{sum}\n"), ""))
        }));

        let (status, body) = send(
            router(runtime.clone()),
            Method::POST,
            "/api/execute",
            Some(json!({
                "code": "#include <iostream>\nint main() { int a, b; std::cin >> a >> b; std::cout << a + b; }",
                "language": "cpp",
                "testCases": [
                    {"input": "1 2", "expectedOutput": "3"},
                    {"input": "2 2", "expectedOutput": "5", "isHidden": true}
                ],
                "structuralConstraints": [
                    {"type": "Forbidden", "construct": "Loop"}
                ],
                "taskMarks": 20
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["output"], "3");
        assert_eq!(body["maxScore"], 20.0);
        // (0.7 * 1/2 + 0.3 * 1) * 20
        assert_eq!(body["score"], 13.0);
        assert_eq!(body["testCases"]["passed"], 1);
        assert_eq!(body["testCases"]["details"][1]["input"], "[Hidden]");
        assert_eq!(body["structural"]["details"][0]["passed"], true);
        assert!(body["terminal"].as_str().unwrap().contains("13 / 20"));

        let invocations = runtime.invocations();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].spec.get_image(), "codezy-cpp-runner:latest");
    }

    #[tokio::test]
    async fn test_execute_validation() {
        let cases = [
            (
                json!({"language": "python"}),
                "Missing required fields: code and language",
            ),
            (
                json!({"code": "", "language": "python"}),
                "Missing required fields: code and language",
            ),
            (
                json!({"code": "print(1)", "language": "ruby"}),
                "Invalid language. Must be python, java, or cpp",
            ),
            (
                json!({
                    "code": "print(1)",
                    "language": "python",
                    "testCases": [{"expectedOutput": "(", "comparisonMode": "Regex"}]
                }),
                "Test case 0 has an invalid regex pattern",
            ),
        ];

        for (payload, message) in cases {
            let runtime = Arc::new(MockRuntime::echo());
            let (status, body) =
                send(router(runtime.clone()), Method::POST, "/api/execute", Some(payload)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(body["error"].as_str().unwrap().starts_with(message));
            assert!(runtime.invocations().is_empty());
        }
    }

    #[tokio::test]
    async fn test_oversized_source_is_rejected() {
        let runner = RunnerConfig::builder().max_code_size(10).build();
        let (status, body) = send(
            router_with(Arc::new(MockRuntime::echo()), runner),
            Method::POST,
            "/api/execute/quick",
            Some(json!({"code": "print('hello world')", "language": "python"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Code exceeds maximum size of 10 bytes");
    }

    #[tokio::test]
    async fn test_execute_quick() {
        let runtime = Arc::new(MockRuntime::new(|invocation| {
            Ok(RawOutcome::exited(
                1,
                invocation.stdin.clone(),
                "Traceback (most recent call last)",
            ))
        }));

        let (status, body) = send(
            router(runtime),
            Method::POST,
            "/api/execute/quick",
            Some(json!({"code": "raise SystemExit(1)", "language": "python", "input": "hi"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["output"], "hi");
        assert_eq!(body["error"], "Traceback (most recent call last)");
        assert_eq!(body["exitCode"], 1);
    }

    #[tokio::test]
    async fn test_capacity_exhausted_is_503() {
        let runtime = Arc::new(MockRuntime::echo().with_delay(Duration::from_millis(300)));
        let runner = RunnerConfig::builder()
            .max_concurrent(1)
            .max_queued(0)
            .build();
        let app = router_with(runtime, runner);
        let body = json!({"code": "print(input())", "language": "python", "input": "x"});

        let busy = tokio::spawn(send(
            app.clone(),
            Method::POST,
            "/api/execute/quick",
            Some(body.clone()),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, rejected) = send(app.clone(), Method::POST, "/api/execute/quick", Some(body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rejected["success"], false);

        let (status, stats) = send(app, Method::GET, "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["running"], 1);
        assert_eq!(stats["rejected"], 1);

        let (status, done) = busy.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["output"], "x");
    }
}
