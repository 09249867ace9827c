use axum::http::{Method, StatusCode};
use integration_tests::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_login_and_read_self() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": "kari",
                "email": "kari@example.com",
                "password": PASSWORD,
                "first_name": "Kari",
                "last_name": "Nordmann",
                "phone_number": "+4799999999",
                "address": { "street_address": "Storgata 1", "postal_code": "0155", "city": "Oslo" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "User created successfully!");
    assert_eq!(body["user"]["username"], "kari");
    assert_eq!(body["user"]["address"]["city"], "Oslo");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let (status, tokens) = app
        .call(
            Method::POST,
            "/api/auth/token",
            None,
            Some(json!({ "username": "kari", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = tokens["access"].as_str().unwrap();

    let (status, me) = app.call(Method::GET, "/api/auth/self", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me, body["user"]);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = TestApp::new();
    app.signup("kari").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "kari", "email": "other@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn registration_fields_are_validated() {
    let app = TestApp::new();
    let cases = [
        (json!({ "username": "", "email": "a@b.no", "password": PASSWORD }), "username"),
        (json!({ "username": "a", "email": "nope", "password": PASSWORD }), "email"),
        (json!({ "username": "a", "email": "a@b.no", "password": "short" }), "password"),
    ];
    for (body, field) in cases {
        let (status, error) = app
            .call(Method::POST, "/api/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["field"], field);
    }
}

#[tokio::test]
async fn wrong_credentials_are_unauthorized() {
    let app = TestApp::new();
    app.signup("kari").await;
    for (username, password) in [("kari", "wrong-password"), ("nobody", PASSWORD)] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/token",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn refresh_issues_a_new_access_token_only_from_refresh_tokens() {
    let app = TestApp::new();
    let kari = app.signup("kari").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh": kari.refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();
    let (status, _) = app.call(Method::GET, "/api/auth/self", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh": kari.access })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/auth/self", Some(&kari.refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_needs_the_current_password() {
    let app = TestApp::new();
    let kari = app.signup("kari").await;

    let (status, error) = app
        .call(
            Method::PUT,
            "/api/auth/self",
            Some(&kari.access),
            Some(json!({ "password": "not-my-password", "first_name": "Hacker" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "password");

    let (status, user) = app
        .call(
            Method::PUT,
            "/api/auth/self",
            Some(&kari.access),
            Some(json!({ "password": PASSWORD, "first_name": "Kari", "phone_number": "12345678" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["first_name"], "Kari");
    assert_eq!(user["phone_number"], "12345678");

    // The confirmation password is not a password change.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/token",
            None,
            Some(json!({ "username": "kari", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn address_updates_are_partial() {
    let app = TestApp::new();
    let kari = app.signup("kari").await;

    let (status, user) = app
        .call(
            Method::PUT,
            "/api/auth/self/address",
            Some(&kari.access),
            Some(json!({ "city": "Bergen" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["address"]["city"], "Bergen");
    assert_eq!(user["address"]["street_address"], "");
}

#[tokio::test]
async fn password_change_round_trip() {
    let app = TestApp::new();
    let kari = app.signup("kari").await;
    let new_password = "an-entirely-new-passphrase";

    let (status, error) = app
        .call(
            Method::PUT,
            "/api/auth/self/password",
            Some(&kari.access),
            Some(json!({ "old_password": "wrong-old-password", "new_password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "old_password");

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/auth/self/password",
            Some(&kari.access),
            Some(json!({ "old_password": PASSWORD, "new_password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let login = |password: &'static str| {
        app.call(
            Method::POST,
            "/api/auth/token",
            None,
            Some(json!({ "username": "kari", "password": password })),
        )
    };
    assert_eq!(login(PASSWORD).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(login(new_password).await.0, StatusCode::OK);
}

#[tokio::test]
async fn public_profile_hides_the_address() {
    let app = TestApp::new();
    let kari = app.signup("kari").await;

    let (status, user) = app.get(&format!("/api/auth/user/{}", kari.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "kari");
    assert!(user.get("address").is_none());

    let (status, _) = app.get("/api/auth/user/777").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
