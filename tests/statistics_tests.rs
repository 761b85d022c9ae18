// tests/statistics_tests.rs

use omr_backend::{
    config::Config,
    models::scoring_result::{ExamKey, NewScoringResult},
    routes,
    scoring::tier::TierCutoffs,
    state::AppState,
    store::{MemoryStore, ScoringStore},
    utils::jwt::sign_jwt,
};
use std::sync::Arc;

const SECRET: &str = "statistics_test_secret";

async fn spawn_app() -> (String, Arc<MemoryStore>) {
    let config = Config {
        database_url: "memory".to_string(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        default_cutoffs: TierCutoffs {
            safe: 28,
            competitive: 24,
        },
        report_utc_offset_hours: 9,
    };

    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

fn token(participant_id: &str, role: &str) -> String {
    sign_jwt(participant_id, None, role, SECRET, 600).unwrap()
}

/// Inserts one canonical result per score, participants `p0`, `p1`, ... in order.
async fn seed(store: &MemoryStore, subject: &str, exam_round: i32, scores: &[i32]) {
    for (idx, &correct_count) in scores.iter().enumerate() {
        let new = NewScoringResult {
            participant_id: format!("p{idx}"),
            participant_code: Some(format!("S{exam_round}{idx:04}")),
            exam: ExamKey {
                exam_name: "SUMMIT".to_string(),
                exam_round,
                subject: subject.to_string(),
            },
            correct_count,
            total_questions: 40,
            score_percentage: correct_count * 100 / 40,
        };
        store.insert_result(&new, &[]).await.unwrap();
    }
}

async fn set_release(client: &reqwest::Client, address: &str, subject: &str, round: i32, released: bool) {
    let response = client
        .put(format!("{}/api/admin/settings/{}/{}/release", address, subject, round))
        .bearer_auth(token("admin", "admin"))
        .json(&serde_json::json!({ "released": released }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

async fn get_json(client: &reqwest::Client, url: String, bearer: &str) -> serde_json::Value {
    client
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn hidden_statistics_return_not_released() {
    // Arrange
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let scores: Vec<i32> = (0..50).map(|i| 10 + i % 31).collect();
    seed(&store, "tax_law", 2, &scores).await;

    // Act
    let body = get_json(
        &client,
        format!("{}/api/statistics/tax_law/2", address),
        &token("p0", "user"),
    )
    .await;

    // Assert
    assert_eq!(body["status"], "not_released");
    assert!(body["message"].as_str().unwrap().contains("tax_law round 2"));
    assert!(body.get("leaderboard").is_none());

    let weeks = get_json(
        &client,
        format!("{}/api/statistics/tax_law/2/weeks", address),
        &token("p0", "user"),
    )
    .await;
    assert_eq!(weeks["status"], "not_released");
}

#[tokio::test]
async fn release_flip_exposes_leaderboard() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    // 20..=40 twice, then 20..=27: 26 results at or above the safe cutoff
    let scores: Vec<i32> = (0..50).map(|i| 20 + i % 21).collect();
    seed(&store, "tax_law", 2, &scores).await;

    set_release(&client, &address, "tax_law", 2, true).await;

    let body = get_json(
        &client,
        format!("{}/api/statistics/tax_law/2", address),
        &token("p5", "user"),
    )
    .await;
    assert_eq!(body["status"], "released");
    assert_eq!(body["summary"]["count"], 50);
    assert_eq!(body["summary"]["max"], 40);
    assert_eq!(body["summary"]["min"], 20);

    let leaderboard = body["leaderboard"].as_array().unwrap();
    assert_eq!(leaderboard.len(), 15);
    let mut previous_rank = 0;
    for row in leaderboard {
        assert!(row["correct_count"].as_i64().unwrap() >= 28);
        let rank = row["rank"].as_i64().unwrap();
        assert!(rank > previous_rank);
        previous_rank = rank;
        assert!(row.get("participant_id").is_none());
        assert!(row["display_code"].as_str().unwrap().ends_with('*'));
    }

    // p5 scored 25 and is not on the leaderboard, but still sees its standing
    assert!(leaderboard.iter().all(|row| row["is_viewer"] == false));
    let viewer = &body["viewer"];
    assert_eq!(viewer["correct_count"], 25);
    assert_eq!(viewer["tier"], "competitive");

    // Re-hiding withholds it again
    set_release(&client, &address, "tax_law", 2, false).await;
    let body = get_json(
        &client,
        format!("{}/api/statistics/tax_law/2", address),
        &token("p5", "user"),
    )
    .await;
    assert_eq!(body["status"], "not_released");
}

#[tokio::test]
async fn ties_rank_in_load_order() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    seed(&store, "financial_accounting", 1, &[30, 28, 28]).await;
    set_release(&client, &address, "financial_accounting", 1, true).await;

    let body = get_json(
        &client,
        format!("{}/api/statistics/financial_accounting/1", address),
        &token("p1", "user"),
    )
    .await;

    let ranks: Vec<(i64, bool)> = body["leaderboard"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| (row["rank"].as_i64().unwrap(), row["is_viewer"].as_bool().unwrap()))
        .collect();
    assert_eq!(ranks, vec![(1, false), (2, true), (3, false)]);
    assert_eq!(body["viewer"]["rank"], 2);
    assert_eq!(body["viewer"]["percentile"], 67);
    assert_eq!(body["summary"]["mean"], 28.7);
}

#[tokio::test]
async fn admin_preview_ignores_gate_and_cutoffs_apply() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    seed(&store, "tax_law", 3, &[35, 33, 31, 25, 20]).await;

    // Raise the safe cutoff while still hidden
    let response = client
        .put(format!("{}/api/admin/settings/tax_law/3", address))
        .bearer_auth(token("admin", "admin"))
        .json(&serde_json::json!({ "safe_cutoff": 33, "competitive_cutoff": 30 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let preview = get_json(
        &client,
        format!("{}/api/admin/statistics/tax_law/3", address),
        &token("admin", "admin"),
    )
    .await;
    assert_eq!(preview["is_released"], false);
    assert_eq!(preview["statistics"]["leaderboard"].as_array().unwrap().len(), 2);
    let tiers: Vec<&str> = preview["ranked"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["tier"].as_str().unwrap())
        .collect();
    assert_eq!(tiers, vec!["safe", "safe", "competitive", "red_line", "red_line"]);

    // Non-admins cannot preview
    let response = client
        .get(format!("{}/api/admin/statistics/tax_law/3", address))
        .bearer_auth(token("p0", "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn invalid_cutoffs_are_rejected() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/api/admin/settings/tax_law/1", address))
        .bearer_auth(token("admin", "admin"))
        .json(&serde_json::json!({ "safe_cutoff": 20, "competitive_cutoff": 25 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let settings = get_json(
        &client,
        format!("{}/api/admin/settings/tax_law/1", address),
        &token("admin", "admin"),
    )
    .await;
    assert_eq!(settings["safe_cutoff"], 28);
    assert_eq!(settings["competitive_cutoff"], 24);
    assert_eq!(settings["is_released"], false);
}

#[tokio::test]
async fn weeks_and_prefix_filter() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    seed(&store, "tax_law", 2, &[30, 29]).await;
    seed(&store, "tax_law", 7, &[10]).await;
    set_release(&client, &address, "tax_law", 2, true).await;

    let weeks = get_json(
        &client,
        format!("{}/api/statistics/tax_law/2/weeks", address),
        &token("p0", "user"),
    )
    .await;
    assert_eq!(weeks["status"], "released");
    let list = weeks["weeks"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["week"], 1);

    let body = get_json(
        &client,
        format!("{}/api/statistics/tax_law/2?week=1&prefix=S2", address),
        &token("p0", "user"),
    )
    .await;
    assert_eq!(body["summary"]["count"], 2);
    assert_eq!(body["window"]["week"], 1);

    let response = client
        .get(format!("{}/api/statistics/tax_law/2?week=9", address))
        .bearer_auth(token("p0", "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .get(format!("{}/api/statistics/Tax%20Law/2", address))
        .bearer_auth(token("p0", "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
