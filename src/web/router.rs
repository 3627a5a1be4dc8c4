use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};

use crate::web::{AppState, cors, feedback, journal};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/functions/v1/generate-feedback",
            post(feedback::generate_feedback),
        )
        .route("/api/feedback", post(feedback::generate_feedback))
        .route(
            "/api/entries",
            get(journal::list_entries).post(journal::submit_entry),
        )
        .route("/api/timeline", get(journal::timeline_snapshot))
        .route("/api/timeline/date", put(journal::select_date))
        .route("/api/timeline/history", put(journal::set_history))
        .layer(middleware::from_fn(cors::cors))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use reqwest::{Client, Method};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::{
        feedback::{
            FeedbackAggregator, FeedbackClient, FeedbackError, FeedbackService, HttpFeedbackClient,
            aggregator::tests::{Behaviour, fakes},
        },
        journal::{AiFeedbackSet, EntryType, PerspectiveComment},
    };

    struct DownClient;

    /// Answers with one comment after `delay` of real time.
    struct SlowClient {
        delay: Duration,
    }

    #[async_trait]
    impl FeedbackClient for SlowClient {
        async fn request_feedback(
            &self,
            _content: &str,
            _entry_type: EntryType,
        ) -> Result<AiFeedbackSet, FeedbackError> {
            tokio::time::sleep(self.delay).await;
            Ok(AiFeedbackSet::new(vec![PerspectiveComment::new(
                "Therapist",
                "Take your time.",
            )]))
        }
    }

    #[async_trait]
    impl FeedbackClient for DownClient {
        async fn request_feedback(
            &self,
            _content: &str,
            _entry_type: EntryType,
        ) -> Result<AiFeedbackSet, FeedbackError> {
            Err(FeedbackError::transport("connection refused"))
        }
    }

    fn service(plan: Vec<(u64, Behaviour)>) -> Arc<FeedbackService> {
        Arc::new(FeedbackService::new(FeedbackAggregator::new(
            fakes(plan),
            Duration::from_secs(5),
        )))
    }

    fn healthy() -> Vec<(u64, Behaviour)> {
        vec![
            (20, Behaviour::Reply),
            (5, Behaviour::Reply),
            (15, Behaviour::Reply),
            (1, Behaviour::Reply),
            (10, Behaviour::Reply),
        ]
    }

    async fn spawn_app(state: AppState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.ok();
        });
        format!("http://{addr}")
    }

    async fn spawn_in_process(plan: Vec<(u64, Behaviour)>) -> String {
        let feedback = service(plan);
        spawn_app(AppState::from_parts(feedback.clone(), feedback)).await
    }

    #[tokio::test]
    async fn preflight_gets_empty_permissive_response() {
        let base = spawn_in_process(healthy()).await;

        let response = Client::new()
            .request(Method::OPTIONS, format!("{base}/functions/v1/generate-feedback"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
        assert_eq!(
            response.headers()["access-control-allow-headers"],
            "authorization, x-client-info, apikey, content-type"
        );
        assert!(response.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn feedback_endpoint_returns_every_persona() {
        let base = spawn_in_process(healthy()).await;

        let response = Client::new()
            .post(format!("{base}/functions/v1/generate-feedback"))
            .json(&json!({ "content": "rough day", "type": "feeling" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body: Value = response.json().await.unwrap();
        for field in [
            "therapistFeedback",
            "coachFeedback",
            "expertFeedback",
            "philosopherFeedback",
            "priestFeedback",
        ] {
            assert!(body[field].is_string(), "missing {field}");
        }
    }

    #[tokio::test]
    async fn feedback_endpoint_reports_errors_as_json() {
        let base = spawn_in_process(vec![
            (1, Behaviour::Fail),
            (1, Behaviour::Fail),
            (1, Behaviour::Fail),
            (1, Behaviour::Fail),
            (1, Behaviour::Fail),
        ])
        .await;
        let client = Client::new();

        let invalid = client
            .post(format!("{base}/api/feedback"))
            .json(&json!({ "content": "hi", "type": "rant" }))
            .send()
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        let body: Value = invalid.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("rant"));

        let failed = client
            .post(format!("{base}/api/feedback"))
            .json(&json!({ "content": "hi", "type": "comment" }))
            .send()
            .await
            .unwrap();
        assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(failed.headers()["access-control-allow-origin"], "*");
        let body: Value = failed.json().await.unwrap();
        assert!(body["error"].is_string());

        let malformed = client
            .post(format!("{base}/api/feedback"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn submitted_entry_lands_on_the_timeline() {
        let base = spawn_in_process(vec![
            (3, Behaviour::Fail),
            (1, Behaviour::Reply),
            (2, Behaviour::Fail),
            (5, Behaviour::Reply),
            (1, Behaviour::Fail),
        ])
        .await;
        let client = Client::new();

        let created = client
            .post(format!("{base}/api/entries"))
            .json(&json!({
                "content": "finish the garden plan",
                "type": "plan",
                "date": "2024-03-01T19:30",
                "attachment": "uploads/garden.jpg"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let entry: Value = created.json().await.unwrap();
        assert_eq!(entry["type"], "plan");
        assert_eq!(entry["attachment"], "uploads/garden.jpg");
        let roles: Vec<_> = entry["feedback"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, vec!["Life Coach", "Philosopher"]);

        let snapshot: Value = client
            .get(format!("{base}/api/timeline"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(snapshot["selectedDate"], "2024-03-01");
        assert_eq!(snapshot["showHistory"], true);
        assert_eq!(snapshot["state"], "attached");
        assert_eq!(snapshot["entries"].as_array().unwrap().len(), 1);

        let hidden: Value = client
            .put(format!("{base}/api/timeline/history"))
            .json(&json!({ "show": false }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(hidden["showHistory"], false);

        let elsewhere: Value = client
            .put(format!("{base}/api/timeline/date"))
            .json(&json!({ "date": "2024-03-02" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(elsewhere["showHistory"], false);
        assert!(elsewhere["entries"].as_array().unwrap().is_empty());

        let back: Value = client
            .put(format!("{base}/api/timeline/date"))
            .json(&json!({ "date": "2024-03-01" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(back["showHistory"], true);

        let listed: Value = client
            .get(format!("{base}/api/entries?date=2024-03-01"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_round_trip_stores_nothing() {
        let base = spawn_app(AppState::from_parts(service(healthy()), Arc::new(DownClient))).await;
        let client = Client::new();

        let response = client
            .post(format!("{base}/api/entries"))
            .json(&json!({ "content": "rough day", "type": "feeling", "date": "2024-03-01" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Entry submission failed.");

        let listed: Value = client
            .get(format!("{base}/api/entries?date=2024-03-01"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(listed.as_array().unwrap().is_empty());

        let snapshot: Value = client
            .get(format!("{base}/api/timeline"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(snapshot["state"], "feedbackFailed");
    }

    #[tokio::test]
    async fn timeline_answers_while_feedback_is_pending() {
        let slow = Arc::new(SlowClient {
            delay: Duration::from_millis(1500),
        });
        let base = spawn_app(AppState::from_parts(service(healthy()), slow)).await;
        let client = Client::new();

        let submission = tokio::spawn({
            let client = client.clone();
            let url = format!("{base}/api/entries");
            async move {
                client
                    .post(url)
                    .json(&json!({ "content": "waiting", "type": "comment", "date": "2024-03-01" }))
                    .send()
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;

        let pending: Value = client
            .get(format!("{base}/api/timeline"))
            .timeout(Duration::from_millis(500))
            .send()
            .await
            .expect("snapshot is served during the round-trip")
            .json()
            .await
            .unwrap();
        assert_eq!(pending["state"], "awaitingFeedback");
        assert!(pending["entries"].as_array().unwrap().is_empty());

        let created = submission.await.unwrap().unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let done: Value = client
            .get(format!("{base}/api/timeline"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(done["state"], "attached");
        assert_eq!(done["selectedDate"], "2024-03-01");
    }

    #[tokio::test]
    async fn remote_client_reads_the_feedback_endpoint() {
        let base = spawn_in_process(healthy()).await;
        let remote = HttpFeedbackClient::new(
            format!("{base}/functions/v1/generate-feedback"),
            Duration::from_secs(5),
        )
        .expect("client");

        let feedback = remote
            .request_feedback("rough day", EntryType::Feeling)
            .await
            .unwrap();
        let roles: Vec<_> = feedback.roles().collect();
        assert_eq!(
            roles,
            vec!["Therapist", "Life Coach", "Mental Health Expert", "Philosopher", "Priest"]
        );

        let err = remote
            .request_feedback("   ", EntryType::Feeling)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn blank_entry_is_rejected_up_front() {
        let base = spawn_in_process(healthy()).await;

        let response = Client::new()
            .post(format!("{base}/api/entries"))
            .json(&json!({ "content": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Client::new()
            .get(format!("{base}/api/entries?date=yesterday"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
