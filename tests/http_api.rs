use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinema_tickets::cache::memory::MemoryCache;
use cinema_tickets::router;
use cinema_tickets::store::memory::MemoryStore;
use cinema_tickets::testing::{
    issue_token, memory_state, seeded_store, CINEMA_ID, EMPTY_SHOWING_ID, OTHER_USER_ID, PAYMENT_ID, SHOWING_ID,
    USER_ID,
};

async fn app() -> (Router, MemoryStore) {
    let store = seeded_store().await;
    let app = router(memory_state(&store, &MemoryCache::new()));
    (app, store)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn order_body(seats: &[&str]) -> Value {
    json!({
        "price": 150,
        "payment_id": PAYMENT_ID,
        "now_showing_id": SHOWING_ID,
        "cinema_id": CINEMA_ID,
        "seats_map": seats,
    })
}

#[tokio::test]
async fn health_check() {
    let (app, _) = app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let (app, store) = app().await;
    let alice = issue_token(USER_ID, "user");
    let bob = issue_token(OTHER_USER_ID, "user");

    let (status, body) = send(&app, request(Method::POST, "/orders", Some(&alice), Some(order_body(&["A1", "A2"])))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["users_id"], USER_ID);
    assert_eq!(body["data"]["seats_map"], json!(["A1", "A2"]));

    let (status, body) = send(&app, request(Method::POST, "/orders", Some(&bob), Some(order_body(&["A2", "A3"])))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Seat A2 is already sold");
    assert_eq!(store.seat_owner(SHOWING_ID, "A3").await, None);

    let (status, body) = send(&app, request(Method::GET, &format!("/orders/seats/{}", SHOWING_ID), Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    let sold: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["is_sold"] == true)
        .map(|s| s["seat_id"].as_str().unwrap())
        .collect();
    assert_eq!(sold, vec!["A1", "A2"]);

    let (status, body) = send(&app, request(Method::GET, "/orders/history", Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, request(Method::GET, "/orders/history", Some(&bob), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No order history found");
}

#[tokio::test]
async fn rejects_bad_order_input() {
    let (app, store) = app().await;
    let token = issue_token(USER_ID, "user");

    let (status, _) = send(&app, request(Method::POST, "/orders", Some(&token), Some(order_body(&[])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, request(Method::POST, "/orders", Some(&token), Some(order_body(&["Z1"])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid seat selection: seat Z1 does not exist in cinema 3");

    let (status, body) = send(&app, request(Method::POST, "/orders", Some(&token), Some(order_body(&["A1", "A1"])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid seat selection: seat A1 selected more than once");

    let mut wrong_cinema = order_body(&["A1"]);
    wrong_cinema["cinema_id"] = json!(99);
    let (status, body) = send(&app, request(Method::POST, "/orders", Some(&token), Some(wrong_cinema))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, request(Method::POST, "/orders", Some(&token), Some(json!({"price": "lots"})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn requires_a_valid_token_and_role() {
    let (app, _) = app().await;

    let (status, _) = send(&app, request(Method::POST, "/orders", None, Some(order_body(&["A1"])))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request(Method::GET, "/orders/history", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = issue_token(USER_ID, "admin");
    let (status, _) = send(&app, request(Method::POST, "/orders", Some(&admin), Some(order_body(&["A1"])))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let user = issue_token(USER_ID, "user");
    let movie = json!({
        "title": "Heat",
        "director_name": "Michael Mann",
        "duration_minutes": 170,
        "release_date": "1995-12-15",
    });
    let (status, _) = send(&app, request(Method::POST, "/admin/movies", Some(&user), Some(movie))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn seat_map_edge_cases() {
    let (app, _) = app().await;
    let token = issue_token(USER_ID, "user");

    let (status, body) = send(&app, request(Method::GET, "/orders/seats/999", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Showing not found");

    let (status, body) = send(&app, request(Method::GET, &format!("/orders/seats/{}", EMPTY_SHOWING_ID), Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["message"], "No seats configured for this cinema");

    let (status, body) = send(&app, request(Method::GET, "/orders/seats/abc", Some(&token), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn admin_manages_catalog() {
    let (app, _) = app().await;
    let admin = issue_token(1, "admin");

    let (status, body) = send(&app, request(Method::GET, "/movies", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let movie = json!({
        "title": "Heat",
        "director_name": "Michael Mann",
        "duration_minutes": 170,
        "release_date": "1995-12-15",
        "rating": 8.3,
    });
    let (status, body) = send(&app, request(Method::POST, "/admin/movies", Some(&admin), Some(movie))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = send(&app, request(Method::GET, "/movies/popular", None, None)).await;
    assert_eq!(body["data"][0]["title"], "Heat");

    let (status, body) = send(
        &app,
        request(Method::PATCH, &format!("/admin/movies/{}", id), Some(&admin), Some(json!({"title": "Heat (1995)"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Heat (1995)");

    let (_, body) = send(&app, request(Method::GET, &format!("/movies/{}", id), None, None)).await;
    assert_eq!(body["data"]["title"], "Heat (1995)");

    let (status, _) = send(&app, request(Method::DELETE, &format!("/admin/movies/{}", id), Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request(Method::GET, &format!("/movies/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Movie not found");

    let (_, body) = send(&app, request(Method::GET, "/movies", None, None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn movies_filter_by_title_genre_and_page() {
    let (app, _) = app().await;
    let admin = issue_token(1, "admin");
    for (title, genres, released) in [
        ("Heat", vec!["Crime", "Drama"], "1995-12-15"),
        ("Alien", vec!["Horror", "Sci-Fi"], "1979-05-25"),
        ("Aliens", vec!["Action", "Sci-Fi"], "1986-07-18"),
    ] {
        let movie = json!({
            "title": title,
            "director_name": "Someone",
            "duration_minutes": 120,
            "release_date": released,
            "genres": genres,
        });
        let (status, _) = send(&app, request(Method::POST, "/admin/movies", Some(&admin), Some(movie))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, request(Method::GET, "/movies/filter?title=ALIEN", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    let titles: Vec<&str> = body["data"]["movies"].as_array().unwrap().iter().map(|m| m["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Aliens", "Alien"]);

    let (_, body) = send(&app, request(Method::GET, "/movies/filter?genre=Crime,Horror", None, None)).await;
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = send(&app, request(Method::GET, "/movies/filter?page=2&limit=3", None, None)).await;
    assert_eq!(body["data"]["total"], 4);
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["limit"], 3);
    assert_eq!(body["data"]["movies"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["movies"][0]["title"], "Alien");

    let (status, body) = send(&app, request(Method::GET, "/movies/filter?page=first", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn movie_schedule_lists_showings_in_time_order() {
    let (app, _) = app().await;

    let (_, body) = send(&app, request(Method::GET, "/movies", None, None)).await;
    let id = body["data"][0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, request(Method::GET, &format!("/movies/schedule/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], SHOWING_ID);
    assert_eq!(entries[0]["cinema_name"], "Grand Hall");
    assert_eq!(entries[0]["location_name"], "Downtown");
    assert_eq!(entries[0]["show_time"], "19:30:00");
    assert_eq!(entries[1]["id"], EMPTY_SHOWING_ID);
    assert_eq!(entries[1]["cinema_name"], "Studio");

    let (status, body) = send(&app, request(Method::GET, "/movies/schedule/999", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Movie not found");
}
