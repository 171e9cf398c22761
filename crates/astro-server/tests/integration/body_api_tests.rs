use axum::http::StatusCode;
use serde_json::json;

use crate::integration::common::setup_test_app;

#[tokio::test]
async fn create_body_then_duplicate_is_conflict() {
    let app = setup_test_app().await;

    let (status, body) = app
        .post("/celestial-bodies", json!({"name": "Mars", "type": "planet"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().unwrap() > 0);
    assert_eq!(body["name"], "Mars");
    assert_eq!(body["type"], "planet");
    assert!(body["created_at"].is_string());

    let (status, body) = app
        .post("/celestial-bodies", json!({"name": "Mars", "type": "planet"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn invalid_body_lists_every_field() {
    let app = setup_test_app().await;

    let (status, body) = app
        .post(
            "/celestial-bodies",
            json!({"name": "", "type": "planet", "declination": 120.0, "spectral_class": "G"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"declination"));
    assert!(fields.contains(&"spectral_class"));
}

#[tokio::test]
async fn malformed_json_is_unprocessable() {
    let app = setup_test_app().await;

    let (status, body) = app
        .post("/celestial-bodies", json!({"name": "Vega", "type": "nebula-ish"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn get_after_delete_is_not_found() {
    let app = setup_test_app().await;

    let (_, sun) = app
        .post("/celestial-bodies", json!({"name": "Sun", "type": "star"}))
        .await;
    let id = sun["id"].as_i64().unwrap();

    assert_eq!(app.delete(&format!("/celestial-bodies/{id}")).await, StatusCode::NO_CONTENT);
    let (status, body) = app.get(&format!("/celestial-bodies/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(app.delete(&format!("/celestial-bodies/{id}")).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inverted_distance_range_returns_empty_list() {
    let app = setup_test_app().await;
    app.post(
        "/celestial-bodies",
        json!({"name": "Sirius", "type": "star", "distance_from_earth": 8.6}),
    )
    .await;

    let (status, body) = app
        .get("/celestial-bodies?min_distance=10&max_distance=5")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn out_of_range_limit_is_unprocessable() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/celestial-bodies?limit=101").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "limit");

    let (status, _) = app.get("/celestial-bodies?skip=-1").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.get("/celestial-bodies?limit=abc").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn partial_update_keeps_omitted_fields() {
    let app = setup_test_app().await;
    let (_, sun) = app
        .post(
            "/celestial-bodies",
            json!({"name": "Sun", "type": "star", "mass": 1.989e30, "description": "Our star"}),
        )
        .await;
    let id = sun["id"].as_i64().unwrap();

    let (status, body) = app
        .put(&format!("/celestial-bodies/{id}"), json!({"spectral_class": "G"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spectral_class"], "G");
    assert_eq!(body["mass"], 1.989e30);
    assert_eq!(body["description"], "Our star");

    let (status, body) = app
        .put(&format!("/celestial-bodies/{id}"), json!({"description": null}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["description"].is_null());
    assert_eq!(body["spectral_class"], "G");
}

#[tokio::test]
async fn parent_rules_on_update() {
    let app = setup_test_app().await;
    let (_, sun) = app
        .post("/celestial-bodies", json!({"name": "Sun", "type": "star"}))
        .await;
    let sun_id = sun["id"].as_i64().unwrap();
    let (_, earth) = app
        .post(
            "/celestial-bodies",
            json!({"name": "Earth", "type": "planet", "parent_id": sun_id}),
        )
        .await;
    let earth_id = earth["id"].as_i64().unwrap();
    assert_eq!(earth["parent_name"], "Sun");

    let (status, _) = app
        .put(&format!("/celestial-bodies/{earth_id}"), json!({"parent_id": 999_999}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .put(&format!("/celestial-bodies/{sun_id}"), json!({"parent_id": earth_id}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "parent_id");
}

#[tokio::test]
async fn children_and_observers_routes() {
    let app = setup_test_app().await;
    let (_, sun) = app
        .post("/celestial-bodies", json!({"name": "Sun", "type": "star"}))
        .await;
    let sun_id = sun["id"].as_i64().unwrap();

    let (status, body) = app.get(&format!("/celestial-bodies/{sun_id}/children")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    app.post(
        "/celestial-bodies",
        json!({"name": "Venus", "type": "planet", "parent_id": sun_id}),
    )
    .await;
    let (_, body) = app.get(&format!("/celestial-bodies/{sun_id}/children")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Venus");
    assert_eq!(body[0]["parent_name"], "Sun");
    assert_eq!(body[0]["children_count"], 0);
    assert_eq!(body[0]["observation_count"], 0);

    let (status, _) = app.get("/celestial-bodies/999999/children").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&format!("/celestial-bodies/{sun_id}/observers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["celestial_body"], "Sun");
    assert_eq!(body["observer_count"], 0);

    let (status, _) = app.get("/celestial-bodies/999999/observers").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_skips_existing_names() {
    let app = setup_test_app().await;
    app.post("/celestial-bodies", json!({"name": "Halley", "type": "comet"}))
        .await;

    let (status, body) = app
        .post(
            "/celestial-bodies/batch",
            json!([
                {"name": "Halley", "type": "comet"},
                {"name": "Vesta", "type": "asteroid"},
                {"name": "Vesta", "type": "asteroid"},
                {"name": "Ceres", "type": "asteroid"}
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Vesta", "Ceres"]);
}

#[tokio::test]
async fn advanced_search_filters_and_sorts() {
    let app = setup_test_app().await;
    for (name, kind, distance) in [
        ("Sirius", "star", 8.6),
        ("Vega", "star", 25.0),
        ("Andromeda", "galaxy", 2.5e6),
    ] {
        app.post(
            "/celestial-bodies",
            json!({"name": name, "type": kind, "distance_from_earth": distance}),
        )
        .await;
    }

    let (status, body) = app
        .get("/celestial-bodies/search/advanced?type=star&sort_by=distance_from_earth&sort_order=desc")
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Vega", "Sirius"]);

    let (status, body) = app
        .get("/celestial-bodies/search/advanced?sort_by=name&sort_order=sideways")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "sort_order");

    let (status, body) = app
        .get("/celestial-bodies/search/advanced?sort_by=no_such_column&has_observations=false")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn statistics_on_empty_catalog() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/celestial-bodies/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["by_type"], json!({}));
    assert!(body["distance_statistics"]["average"].is_null());
}
