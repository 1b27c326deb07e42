//! Contract tests for HttpMemberDirectory against a mock member service.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/api/v1/members` | `list_members_*` |
//! | GET    | `/api/v1/members/{id}` | `get_members_*` |
//! | PUT    | `/api/v1/members/{id}/category` | `set_category_*` |

use memcat_core::{Category, MemberId};
use memcat_directory::{DirectoryConfig, HttpMemberDirectory};
use memcat_engine::{DirectoryError, MemberDirectory};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpMemberDirectory {
    let config = DirectoryConfig::new(&server.uri())
        .unwrap()
        .with_token("test-token");
    HttpMemberDirectory::new(config).unwrap()
}

fn id(s: &str) -> MemberId {
    MemberId::new(s).unwrap()
}

// ── GET /api/v1/members ──────────────────────────────────────────────

#[tokio::test]
async fn list_members_maps_records_and_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/members"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "m1",
                "name": "Ana Souza",
                "email": "ana@example.org",
                "category": "active",
                "birthDate": "1981-05-02",
                "senatorId": "S1"
            },
            {
                "id": "m2",
                "name": "Luis",
                "category": "active",
                "registeredAt": "2026-10-01T10:00:00Z"
            },
            { "id": "m3", "name": "Broken", "category": "" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let members = client(&server).list_members().await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].id, "m1");
    assert_eq!(members[0].senator_id(), Some("S1"));
    assert_eq!(members[1].registered_at.as_deref(), Some("2026-10-01T10:00:00Z"));
}

#[tokio::test]
async fn list_members_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/members"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server).list_members().await.unwrap_err();
    match err {
        DirectoryError::Unavailable(msg) => assert!(msg.contains("503")),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

// ── GET /api/v1/members/{id} ─────────────────────────────────────────

#[tokio::test]
async fn get_members_skips_unknown_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/members/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "m1", "name": "Ana", "category": "active"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/members/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let members = client(&server)
        .get_members(&[id("m1"), id("ghost")])
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, "m1");
}

// ── PUT /api/v1/members/{id}/category ────────────────────────────────

#[tokio::test]
async fn set_category_sends_narrow_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/members/m1/category"))
        .and(body_json(serde_json::json!({ "category": "honorary" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .set_category(&id("m1"), &Category::new("honorary").unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn set_category_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/members/m9/category"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .set_category(&id("m9"), &Category::new("honorary").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, DirectoryError::NotFound(id("m9")));
}

#[tokio::test]
async fn set_category_maps_conflict_to_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/members/m1/category"))
        .respond_with(ResponseTemplate::new(409).set_body_string("record locked"))
        .mount(&server)
        .await;

    let err = client(&server)
        .set_category(&id("m1"), &Category::new("honorary").unwrap())
        .await
        .unwrap_err();
    match err {
        DirectoryError::Rejected { member_id, reason } => {
            assert_eq!(member_id, "m1");
            assert!(reason.contains("record locked"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn set_category_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/members/m1/category"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .set_category(&id("m1"), &Category::new("honorary").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Unavailable(_)));
}
