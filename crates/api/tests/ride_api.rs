mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{bearer, body_json, delete, get, post_json, put_json, test_app};

fn ride_body(seats: i64) -> Value {
    json!({
        "origin": "Lisbon",
        "destination": "Porto",
        "departure_time": (Utc::now() + Duration::days(1)).to_rfc3339(),
        "available_seats": seats,
        "price_per_seat_cents": 1500,
    })
}

#[tokio::test]
async fn create_requires_auth() {
    let (app, _store) = test_app();

    let response = post_json(&app, "/api/v1/rides", None, ride_body(2)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn create_returns_active_ride() {
    let (app, _store) = test_app();
    let driver = Uuid::new_v4();
    let token = bearer(driver);

    let response = post_json(&app, "/api/v1/rides", Some(&token), ride_body(3)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let ride = &body["data"];
    assert_eq!(ride["status"], "ACTIVE");
    assert_eq!(ride["available_seats"], 3);
    assert_eq!(ride["driver_id"], driver.to_string());
    assert_eq!(ride["price_per_seat_cents"], 1500);
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let (app, _store) = test_app();
    let token = bearer(Uuid::new_v4());

    let mut empty_origin = ride_body(2);
    empty_origin["origin"] = json!("");
    let response = post_json(&app, "/api/v1/rides", Some(&token), empty_origin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let mut past_departure = ride_body(2);
    past_departure["departure_time"] = json!((Utc::now() - Duration::hours(1)).to_rfc3339());
    let response = post_json(&app, "/api/v1/rides", Some(&token), past_departure).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut zero_seats = ride_body(0);
    zero_seats["available_seats"] = json!(0);
    let response = post_json(&app, "/api/v1/rides", Some(&token), zero_seats).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_ride_is_404() {
    let (app, _store) = test_app();
    let token = bearer(Uuid::new_v4());

    let response = get(&app, &format!("/api/v1/rides/{}", Uuid::new_v4()), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn update_is_driver_only() {
    let (app, _store) = test_app();
    let driver = bearer(Uuid::new_v4());
    let stranger = bearer(Uuid::new_v4());

    let created = post_json(&app, "/api/v1/rides", Some(&driver), ride_body(2)).await;
    let ride_id = body_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = put_json(
        &app,
        &format!("/api/v1/rides/{ride_id}"),
        Some(&stranger),
        json!({ "origin": "Faro" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

#[tokio::test]
async fn seat_reduction_below_committed_is_409() {
    let (app, _store) = test_app();
    let driver = bearer(Uuid::new_v4());
    let rider = bearer(Uuid::new_v4());

    let created = post_json(&app, "/api/v1/rides", Some(&driver), ride_body(4)).await;
    let ride_id = body_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let joined = post_json(
        &app,
        &format!("/api/v1/rides/{ride_id}/join"),
        Some(&rider),
        json!({ "seats": 3 }),
    )
    .await;
    assert_eq!(joined.status(), StatusCode::CREATED);

    let response = put_json(
        &app,
        &format!("/api/v1/rides/{ride_id}"),
        Some(&driver),
        json!({ "available_seats": 2 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CAPACITY_EXCEEDED");

    // Shrinking down to exactly the committed total is allowed.
    let response = put_json(
        &app,
        &format!("/api/v1/rides/{ride_id}"),
        Some(&driver),
        json!({ "available_seats": 3 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["available_seats"], 3);
}

#[tokio::test]
async fn delete_soft_cancels_the_ride() {
    let (app, _store) = test_app();
    let driver = bearer(Uuid::new_v4());
    let token = bearer(Uuid::new_v4());

    let created = post_json(&app, "/api/v1/rides", Some(&driver), ride_body(2)).await;
    let ride_id = body_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = delete(&app, &format!("/api/v1/rides/{ride_id}"), Some(&driver)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The row survives with status CANCELLED.
    let response = get(&app, &format!("/api/v1/rides/{ride_id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "CANCELLED");

    // Further updates are rejected: the ride is no longer active.
    let response = put_json(
        &app,
        &format!("/api/v1/rides/{ride_id}"),
        Some(&driver),
        json!({ "origin": "Faro" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_STATE");
}

#[tokio::test]
async fn search_matches_route_substrings() {
    let (app, _store) = test_app();
    let driver = bearer(Uuid::new_v4());
    let token = bearer(Uuid::new_v4());

    let mut lisbon = ride_body(2);
    lisbon["origin"] = json!("Lisbon Center");
    post_json(&app, "/api/v1/rides", Some(&driver), lisbon).await;

    let mut faro = ride_body(2);
    faro["origin"] = json!("Faro");
    post_json(&app, "/api/v1/rides", Some(&driver), faro).await;

    let response = get(&app, "/api/v1/rides/search?origin=lisbon", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["origin"], "Lisbon Center");
}

#[tokio::test]
async fn repeated_reads_return_identical_payloads() {
    let (app, _store) = test_app();
    let driver = bearer(Uuid::new_v4());
    let rider = bearer(Uuid::new_v4());

    let created = post_json(&app, "/api/v1/rides", Some(&driver), ride_body(2)).await;
    let ride_id = body_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    post_json(
        &app,
        &format!("/api/v1/rides/{ride_id}/join"),
        Some(&rider),
        json!({ "seats": 1 }),
    )
    .await;

    // Two GETs with no writes in between: ride and participant data must
    // come back identical.
    let first = get(&app, &format!("/api/v1/rides/{ride_id}"), Some(&rider)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;

    let second = get(&app, &format!("/api/v1/rides/{ride_id}"), Some(&rider)).await;
    let second = body_json(second).await;

    assert_eq!(first, second);
    assert_eq!(first["data"]["participants"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn driver_and_rider_listings() {
    let (app, _store) = test_app();
    let driver_id = Uuid::new_v4();
    let rider_id = Uuid::new_v4();
    let driver = bearer(driver_id);
    let rider = bearer(rider_id);

    let created = post_json(&app, "/api/v1/rides", Some(&driver), ride_body(2)).await;
    let ride_id = body_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    post_json(
        &app,
        &format!("/api/v1/rides/{ride_id}/join"),
        Some(&rider),
        json!({ "seats": 1 }),
    )
    .await;

    let response = get(&app, "/api/v1/rides/driver/me", Some(&driver)).await;
    let body = body_json(response).await;
    let mine = body["data"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], ride_id);
    assert_eq!(mine[0]["participants"].as_array().unwrap().len(), 1);

    // The driver has no bookings of their own.
    let response = get(&app, "/api/v1/rides/rider/me", Some(&driver)).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 0);

    let response = get(&app, "/api/v1/rides/rider/me", Some(&rider)).await;
    let body = body_json(response).await;
    let bookings = body["data"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["ride"]["id"], ride_id);
    assert_eq!(bookings[0]["participant"]["status"], "PENDING");
    assert_eq!(bookings[0]["participant"]["seats"], 1);
}
