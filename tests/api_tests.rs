// tests/api_tests.rs

mod common;

use assessment_platform::{config::ReleaseMode, models::user::Role, routes};
use axum::{body::Body, http::Request};
use common::{
    ANSWER_KEY, DEV_TEAM, PASSWORD, answers, create_quiz, create_user, setup, spawn_app, token_for,
    unique_email,
};
use serde_json::{Value, json};
use tower::ServiceExt;

#[tokio::test]
async fn unknown_path_is_404() {
    // Arrange
    let app = setup(ReleaseMode::Aggregate).await;
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = setup(ReleaseMode::Aggregate).await;
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": "Ann",
            "email": "not-an-email",
            "password": "123",
            "team_id": DEV_TEAM,
            "role": "TRAINEE"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_rejects_admin_role_and_duplicate_email() {
    let app = setup(ReleaseMode::Aggregate).await;
    let pool = app.pool.clone();
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    let admin = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": "Eve",
            "email": unique_email(),
            "password": PASSWORD,
            "team_id": DEV_TEAM,
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status().as_u16(), 400);

    create_user(&pool, "taken@example.com", Role::Trainee, Some(DEV_TEAM)).await;
    let duplicate = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": "Tak",
            "email": "taken@example.com",
            "password": PASSWORD,
            "team_id": DEV_TEAM,
            "role": "TRAINEE"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);

    let unknown_team = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": "Nob",
            "email": unique_email(),
            "password": PASSWORD,
            "team_id": 999,
            "role": "TRAINEE"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_team.status().as_u16(), 404);
}

#[tokio::test]
async fn full_assessment_flow() {
    // Arrange
    let app = setup(ReleaseMode::Aggregate).await;
    let pool = app.pool.clone();
    let mailer = app.mailer.clone();
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    let admin = create_user(&pool, "admin@example.com", Role::Admin, None).await;
    let admin_token = token_for(&admin);

    // 1. Register: no token yet, an OTP is mailed
    let registered: Value = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": "Ann",
            "email": "ann@example.com",
            "password": PASSWORD,
            "team_id": DEV_TEAM,
            "role": "trainee"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(registered["requires_2fa"], true);
    assert!(registered["token"].is_null());

    let mail = mailer.wait_for("ann@example.com", 1).await;
    let code = mail[0]
        .body
        .split("Your OTP code is: ")
        .nth(1)
        .unwrap()
        .chars()
        .take(6)
        .collect::<String>();

    // 2. A wrong code is rejected, the right one yields a token once
    let wrong = if code == "000000" { "000001" } else { "000000" };
    let rejected = client
        .post(format!("{}/api/auth/verify-otp", address))
        .json(&json!({ "email": "ann@example.com", "otp": wrong }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status().as_u16(), 401);

    let verified: Value = client
        .post(format!("{}/api/auth/verify-otp", address))
        .json(&json!({ "email": "ann@example.com", "otp": code }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = verified["token"].as_str().unwrap().to_string();
    assert_eq!(verified["role"], "TRAINEE");
    assert_eq!(verified["team_name"], "Development Team 1");

    let replay = client
        .post(format!("{}/api/auth/verify-otp", address))
        .json(&json!({ "email": "ann@example.com", "otp": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status().as_u16(), 401);

    // 3. Admin authors a test
    let created = client
        .post(format!("{}/api/admin/tests", address))
        .bearer_auth(&admin_token)
        .json(&json!({
            "title": "Quiz1",
            "description": "<b>Week 1</b><script>alert(1)</script>",
            "time_limit_minutes": 20,
            "assigned_role": "TRAINEE",
            "assigned_team_id": DEV_TEAM,
            "questions": [
                { "question_text": "Pick A", "options": [
                    { "option_text": "A", "is_correct": true },
                    { "option_text": "D" }
                ]},
                { "question_text": "Pick B and C", "options": [
                    { "option_text": "B", "is_correct": true },
                    { "option_text": "C", "is_correct": true },
                    { "option_text": "E" }
                ]}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let created: Value = created.json().await.unwrap();
    assert!(!created["description"].as_str().unwrap().contains("script"));
    let test_id = created["id"].as_i64().unwrap();

    // 4. Trainee sees it without correctness and submits
    let listed: Value = client
        .get(format!("{}/api/tests", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let test: Value = client
        .get(format!("{}/api/tests/{}", address, test_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(test["questions"][0]["options"][0]["is_correct"].is_null());
    let option_id = |q: usize, o: usize| test["questions"][q]["options"][o]["id"].as_i64().unwrap();
    let question_id = |q: usize| test["questions"][q]["id"].as_i64().unwrap();

    let submitted = client
        .post(format!("{}/api/tests/{}/submit", address, test_id))
        .bearer_auth(&token)
        .json(&answers(&[
            (question_id(0), &[option_id(0, 0)]),
            (question_id(1), &[option_id(1, 0)]),
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status().as_u16(), 201);
    let submitted: Value = submitted.json().await.unwrap();
    assert_eq!(submitted["score"], 1);
    assert_eq!(submitted["total_marks"], 2);

    let again = client
        .post(format!("{}/api/tests/{}/submit", address, test_id))
        .bearer_auth(&token)
        .json(&answers(&[(question_id(0), &[option_id(0, 0)])]))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 409);

    // 5. Trainees cannot reach admin routes
    let forbidden = client
        .post(format!("{}/api/admin/tests/{}/release", address, test_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    // 6. Release, then results and CSV
    let released: Value = client
        .post(format!("{}/api/admin/tests/{}/release", address, test_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(released["outcome"], "aggregated");
    assert_eq!(released["total_submissions"], 1);

    let twice = client
        .post(format!("{}/api/admin/tests/{}/release", address, test_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(twice.status().as_u16(), 400);

    let results: Value = client
        .get(format!("{}/api/results", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results[0]["score"], 1);
    assert!(results[0]["answers"].is_null());

    let csv = client
        .get(format!("{}/api/admin/tests/{}/scores-csv", address, test_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(csv.status().as_u16(), 200);
    assert!(
        csv.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains(&format!("test-scores-{}.csv", test_id))
    );
    let body = csv.text().await.unwrap();
    assert!(body.lines().nth(1).unwrap().contains(",1,2,50.00,"));

    let result_mail = mailer.wait_for("ann@example.com", 2).await;
    assert!(result_mail[1].body.contains("Score: 1 / 2"));
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = setup(ReleaseMode::Aggregate).await;
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    for path in ["/api/tests", "/api/results", "/api/admin/tests"] {
        let response = client.get(format!("{}{}", address, path)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 401, "{}", path);
    }
}

#[tokio::test]
async fn team_lead_sees_only_their_team() {
    let app = setup(ReleaseMode::Aggregate).await;
    let pool = app.pool.clone();
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    let admin = create_user(&pool, "admin@example.com", Role::Admin, None).await;
    let lead = create_user(&pool, "lead@example.com", Role::Tl, Some(DEV_TEAM)).await;
    create_user(&pool, "ann@example.com", Role::Trainee, Some(DEV_TEAM)).await;
    create_user(&pool, "dan@example.com", Role::Trainee, Some(common::DATA_TEAM)).await;
    create_quiz(&pool, "Dev quiz", &admin, DEV_TEAM, Role::Trainee).await;
    create_quiz(&pool, "Data quiz", &admin, common::DATA_TEAM, Role::Trainee).await;

    let tests: Value = client
        .get(format!("{}/api/admin/tests", address))
        .bearer_auth(token_for(&lead))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tests = tests.as_array().unwrap();
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0]["title"], "Dev quiz");
    assert_eq!(tests[0]["questions"][0]["options"][0]["is_correct"], true);

    let users: Value = client
        .get(format!("{}/api/admin/users", address))
        .bearer_auth(token_for(&lead))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(users.as_array().unwrap().iter().all(|u| u["team_id"] == DEV_TEAM));

    let all: Value = client
        .get(format!("{}/api/admin/tests", address))
        .bearer_auth(token_for(&admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn seeded_admin_logs_in_without_otp() {
    let app = setup(ReleaseMode::Aggregate).await;
    assessment_platform::db::seed_admin_user(&app.pool, "root@example.com", PASSWORD)
        .await
        .unwrap();
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    let bad = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": "root@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 401);

    let ok: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": "root@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ok["requires_2fa"], false);
    assert_eq!(ok["role"], "ADMIN");
    assert!(ok["token"].is_string());
}

#[tokio::test]
async fn answer_key_route_serves_plain_text() {
    let app = setup(ReleaseMode::Aggregate).await;
    let admin = create_user(&app.pool, "admin@example.com", Role::Admin, None).await;
    create_quiz(&app.pool, "Quiz1", &admin, DEV_TEAM, Role::Trainee).await;
    let router = routes::create_router(app.state);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/public/answer-key?test_name=Quiz1&key={}", ANSWER_KEY))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"1A2AB");

    let via_header = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/public/answer-key?test_name=Quiz1")
                .header("X-Answer-Key", ANSWER_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(via_header.status().as_u16(), 200);

    let wrong = router
        .oneshot(
            Request::builder()
                .uri("/api/public/answer-key?test_name=Quiz1&key=guess")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_manages_roles_teams_and_submissions() {
    let app = setup(ReleaseMode::Aggregate).await;
    let pool = app.pool.clone();
    let address = spawn_app(app.state).await;
    let client = reqwest::Client::new();

    let admin = create_user(&pool, "admin@example.com", Role::Admin, None).await;
    let ann = create_user(&pool, "ann@example.com", Role::Trainee, Some(DEV_TEAM)).await;
    let quiz = create_quiz(&pool, "Quiz1", &admin, DEV_TEAM, Role::Trainee).await;

    let submitted = client
        .post(format!("{}/api/tests/{}/submit", address, quiz.test_id))
        .bearer_auth(token_for(&ann))
        .json(&answers(&[(quiz.q1, &[quiz.a]), (quiz.q2, &[quiz.b])]))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status().as_u16(), 201);

    let taken: Value = client
        .get(format!("{}/api/admin/tests/{}/submissions", address, quiz.test_id))
        .bearer_auth(token_for(&admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let taken = taken.as_array().unwrap();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0]["user_email"], "ann@example.com");
    assert_eq!(taken[0]["score"], 1);
    assert_eq!(taken[0]["total_marks"], 2);

    let teams: Value = client
        .get(format!("{}/api/admin/teams", address))
        .bearer_auth(token_for(&admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(teams.as_array().unwrap().len(), 5);
    assert_eq!(teams[0]["type"], "DEV");

    let changed: Value = client
        .put(format!("{}/api/admin/users/{}/role", address, ann.id))
        .bearer_auth(token_for(&admin))
        .json(&json!({ "role": "intern" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(changed["role"], "INTERN");
    assert_eq!(changed["team_id"], DEV_TEAM);

    let bad_role = client
        .put(format!("{}/api/admin/users/{}/role", address, ann.id))
        .bearer_auth(token_for(&admin))
        .json(&json!({ "role": "wizard" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_role.status().as_u16(), 400);

    let missing = client
        .put(format!("{}/api/admin/users/9999/role", address))
        .bearer_auth(token_for(&admin))
        .json(&json!({ "role": "TRAINEE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    let forbidden = client
        .get(format!("{}/api/admin/teams", address))
        .bearer_auth(token_for(&ann))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);
}
