use axum::http::StatusCode;
use serde_json::json;

use crate::integration::common::{TestApp, setup_test_app};

async fn seed(app: &TestApp) -> (i64, i64) {
    let (_, astronomer) = app
        .post("/astronomers", json!({"first_name": "Galileo", "last_name": "Galilei"}))
        .await;
    let (_, body) = app
        .post("/celestial-bodies", json!({"name": "Jupiter", "type": "planet"}))
        .await;
    (
        astronomer["id"].as_i64().unwrap(),
        body["id"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn one_observation_per_body_per_day() {
    let app = setup_test_app().await;
    let (astronomer_id, body_id) = seed(&app).await;

    let (status, body) = app
        .post(
            "/observations",
            json!({
                "astronomer_id": astronomer_id,
                "celestial_body_id": body_id,
                "observation_date": "2024-01-07T20:00:00Z",
                "duration_hours": 2.5
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["astronomer_name"], "Galileo Galilei");
    assert_eq!(body["celestial_body_name"], "Jupiter");

    let (status, body) = app
        .post(
            "/observations",
            json!({
                "astronomer_id": astronomer_id,
                "celestial_body_id": body_id,
                "observation_date": "2024-01-07T23:30:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");

    let (status, _) = app
        .post(
            "/observations",
            json!({
                "astronomer_id": astronomer_id,
                "celestial_body_id": body_id,
                "observation_date": "2024-01-08T00:30:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn missing_references_are_not_found() {
    let app = setup_test_app().await;
    let (astronomer_id, _) = seed(&app).await;

    let (status, body) = app
        .post(
            "/observations",
            json!({
                "astronomer_id": astronomer_id,
                "celestial_body_id": 777,
                "observation_date": "2024-01-07T20:00:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn deleting_body_cascades_to_observations() {
    let app = setup_test_app().await;
    let (astronomer_id, body_id) = seed(&app).await;
    let (_, observation) = app
        .post(
            "/observations",
            json!({
                "astronomer_id": astronomer_id,
                "celestial_body_id": body_id,
                "observation_date": "2024-01-07T20:00:00Z"
            }),
        )
        .await;
    let observation_id = observation["id"].as_i64().unwrap();

    let (_, observers) = app.get(&format!("/celestial-bodies/{body_id}/observers")).await;
    assert_eq!(observers["observer_count"], 1);
    assert_eq!(observers["observers"][0]["observation_count"], 1);

    assert_eq!(app.delete(&format!("/celestial-bodies/{body_id}")).await, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/observations/{observation_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_list_and_statistics() {
    let app = setup_test_app().await;
    let (astronomer_id, body_id) = seed(&app).await;
    for date in ["2024-01-07T20:00:00Z", "2024-01-10T20:00:00Z"] {
        app.post(
            "/observations",
            json!({
                "astronomer_id": astronomer_id,
                "celestial_body_id": body_id,
                "observation_date": date,
                "location": "Padua"
            }),
        )
        .await;
    }

    let (status, list) = app
        .get(&format!("/observations?astronomer_id={astronomer_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(list[0]["observation_date"], "2024-01-10T20:00:00Z");

    let (_, list) = app
        .get("/observations?start_date=2024-01-09T00:00:00Z")
        .await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let id = list[0]["id"].as_i64().unwrap();
    let (status, updated) = app
        .put(&format!("/observations/{id}"), json!({"notes": "Four moons"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["notes"], "Four moons");
    assert_eq!(updated["location"], "Padua");

    let (_, page) = app
        .get(&format!("/astronomers/{astronomer_id}/observations?limit=1"))
        .await;
    assert_eq!(page["observation_count"], 2);
    assert_eq!(page["observations"].as_array().unwrap().len(), 1);

    let (status, stats) = app.get("/observations/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_observations"], 2);
    assert_eq!(stats["top_astronomers"][0]["name"], "Galileo Galilei");
    assert_eq!(stats["top_celestial_bodies"][0]["observation_count"], 2);

    assert_eq!(app.delete(&format!("/observations/{id}")).await, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/observations/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
