use axum::http::StatusCode;
use serde_json::json;

use crate::integration::common::setup_test_app;

#[tokio::test]
async fn create_get_and_delete_astronomer() {
    let app = setup_test_app().await;

    let (status, body) = app
        .post(
            "/astronomers",
            json!({
                "first_name": "Johannes",
                "last_name": "Kepler",
                "birth_date": "1571-12-27",
                "death_date": "1630-11-15",
                "nationality": "German"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["full_name"], "Johannes Kepler");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = app.get(&format!("/astronomers/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["observation_count"], 0);
    assert_eq!(body["observed_bodies"], json!([]));

    assert_eq!(app.delete(&format!("/astronomers/{id}")).await, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/astronomers/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_name_is_conflict() {
    let app = setup_test_app().await;
    let payload = json!({"first_name": "Edwin", "last_name": "Hubble"});

    let (status, _) = app.post("/astronomers", payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.post("/astronomers", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn death_before_birth_is_rejected_on_merged_record() {
    let app = setup_test_app().await;
    let (_, body) = app
        .post(
            "/astronomers",
            json!({"first_name": "Tycho", "last_name": "Brahe", "birth_date": "1546-12-14"}),
        )
        .await;
    let id = body["id"].as_i64().unwrap();

    let (status, body) = app
        .put(&format!("/astronomers/{id}"), json!({"death_date": "1500-01-01"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "death_date");

    let (status, body) = app
        .put(&format!("/astronomers/{id}"), json!({"death_date": "1601-10-24"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["death_date"], "1601-10-24");
    assert_eq!(body["birth_date"], "1546-12-14");
}

#[tokio::test]
async fn list_filters_and_statistics() {
    let app = setup_test_app().await;
    for (first, last, nationality, active) in [
        ("Vera", "Rubin", "American", false),
        ("Carl", "Sagan", "American", false),
        ("Andrea", "Ghez", "American", true),
        ("Fred", "Hoyle", "British", false),
    ] {
        app.post(
            "/astronomers",
            json!({"first_name": first, "last_name": last, "nationality": nationality, "is_active": active}),
        )
        .await;
    }

    let (status, body) = app
        .get("/astronomers?nationality=American&is_active=false&sort_by=last_name")
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["last_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Rubin", "Sagan"]);

    let (_, body) = app.get("/astronomers?search=hoy").await;
    assert_eq!(body[0]["full_name"], "Fred Hoyle");

    let (status, body) = app.get("/astronomers/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["active"], 1);
    assert_eq!(body["inactive"], 3);
    assert_eq!(body["by_nationality"]["American"], 3);
}

#[tokio::test]
async fn observations_page_for_missing_astronomer_is_not_found() {
    let app = setup_test_app().await;

    let (status, _) = app.get("/astronomers/424242/observations").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/astronomers/not-a-number").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
