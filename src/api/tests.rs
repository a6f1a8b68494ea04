use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use super::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use super::create_router;
use crate::manifest::{FileCategory, ManifestBuilder};
use crate::object_store::derive_key;
use crate::storage::models::{DocumentMetadata, DocumentRecord};
use crate::testutil::{test_state, MultipartBody, TEST_BASE_URL};
use crate::AppState;

const STUDENT: (&str, &str) = ("student-1", "student");
const OTHER_STUDENT: (&str, &str) = ("student-2", "student");
const ADMIN: (&str, &str) = ("admin-1", "admin");
const ADVISOR: (&str, &str) = ("advisor-1", "advisor");

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }
}

fn request(method: Method, uri: &str, caller: Option<(&str, &str)>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder
            .header(USER_ID_HEADER, id)
            .header(USER_ROLE_HEADER, role);
    }
    builder
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> TestResponse {
    let response = create_router(Arc::clone(state)).oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

async fn send_multipart(
    state: &Arc<AppState>,
    method: Method,
    uri: &str,
    caller: Option<(&str, &str)>,
    form: MultipartBody,
) -> TestResponse {
    let req = request(method, uri, caller)
        .header(header::CONTENT_TYPE, MultipartBody::content_type())
        .body(Body::from(form.finish()))
        .unwrap();
    send(state, req).await
}

async fn send_json(
    state: &Arc<AppState>,
    method: Method,
    uri: &str,
    caller: Option<(&str, &str)>,
    body: Value,
) -> TestResponse {
    let req = request(method, uri, caller)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(state, req).await
}

async fn get(state: &Arc<AppState>, uri: &str, caller: Option<(&str, &str)>) -> TestResponse {
    send(state, request(Method::GET, uri, caller).body(Body::empty()).unwrap()).await
}

/// Submit a document as STUDENT and return its id.
async fn submit(state: &Arc<AppState>, form: MultipartBody) -> String {
    let res = send_multipart(state, Method::POST, "/documents", Some(STUDENT), form).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&res.body));
    res.json()["data"]["id"].as_str().unwrap().to_string()
}

async fn approve(state: &Arc<AppState>, id: &str) -> TestResponse {
    send_json(
        state,
        Method::PUT,
        &format!("/documents/{id}/approval"),
        Some(ADMIN),
        serde_json::json!({ "approvalStatus": "approved" }),
    )
    .await
}

#[tokio::test]
async fn submission_creates_a_pending_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let form = MultipartBody::new()
        .text("title", "X")
        .file("complete_pdf", "Final Report.pdf", b"%PDF-1.7");
    let id = submit(&state, form).await;

    let res = get(&state, &format!("/documents/{id}"), Some(STUDENT)).await;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.json()["data"];

    assert_eq!(data["view"], "owner");
    assert_eq!(data["approval_status"], "pending");
    assert_eq!(data["is_active"], false);

    let pdfs = data["file_paths"]["complete_pdf"].as_array().unwrap();
    assert_eq!(pdfs.len(), 1);
    assert!(pdfs[0].as_str().unwrap().ends_with("Final_Report.pdf"));
    for category in [
        "complete_doc",
        "article_files",
        "program_files",
        "web_files",
        "poster_files",
        "certificate_files",
        "front_face",
    ] {
        assert_eq!(data["file_paths"][category], serde_json::json!([]), "{category}");
    }

    assert_eq!(data["files"].as_array().unwrap().len(), 1);
    assert_eq!(data["files"][0]["name"], "Final_Report");
}

#[tokio::test]
async fn submission_requires_identity_and_title() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let res = send_multipart(
        &state,
        Method::POST,
        "/documents",
        None,
        MultipartBody::new().text("title", "X"),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["status"], "fail");

    let res = send_multipart(
        &state,
        Method::POST,
        "/documents",
        Some(STUDENT),
        MultipartBody::new().text("abstract", "no title here"),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submission_parses_document_types_and_legacy_names() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let form = MultipartBody::new()
        .text("title", "Soil sensors")
        .text("document_type", "project, article,project")
        .text("advisorName", "Dr. Niran");
    let id = submit(&state, form).await;

    let res = get(&state, &format!("/documents/{id}"), Some(ADVISOR)).await;
    let data = &res.json()["data"];
    assert_eq!(data["view"], "reviewer");
    assert_eq!(data["document_type"], serde_json::json!(["project", "article"]));
    assert_eq!(data["advisor_name"], "Dr. Niran");

    let res = send_multipart(
        &state,
        Method::POST,
        "/documents",
        Some(STUDENT),
        MultipartBody::new()
            .text("title", "Bad")
            .text("document_type", "novel"),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_document_type_parts_accumulate() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    // A multi-select sends one part per chosen tag
    let form = MultipartBody::new()
        .text("title", "Soil sensors")
        .text("document_type", "project")
        .text("documentType", "article");
    let id = submit(&state, form).await;

    let doc = state.db.get_document(&id).unwrap().unwrap();
    let res = get(&state, &format!("/documents/{id}"), Some(ADMIN)).await;
    assert_eq!(
        res.json()["data"]["document_type"],
        serde_json::json!(["project", "article"])
    );
    assert_eq!(doc.metadata.document_type.len(), 2);
}

#[tokio::test]
async fn repeated_scalar_fields_are_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    for form in [
        MultipartBody::new().text("title", "A").text("title", "B"),
        MultipartBody::new()
            .text("title", "A")
            .text("advisor_name", "Dr. Niran")
            .text("advisorName", "Dr. Kanya"),
    ] {
        let res = send_multipart(&state, Method::POST, "/documents", Some(STUDENT), form).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json()["status"], "fail");
    }
    assert!(state.db.get_documents_by_owner(STUDENT.0).unwrap().is_empty());
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let too_big = vec![0u8; state.config.max_upload_size as usize + 1];
    let form = MultipartBody::new()
        .text("title", "Big")
        .file("complete_pdf", "huge.pdf", &too_big);
    let res = send_multipart(&state, Method::POST, "/documents", Some(STUDENT), form).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.json()["status"], "fail");

    assert!(state.db.get_documents_by_owner(STUDENT.0).unwrap().is_empty());
    assert!(state.objects.list_uploads().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_commit_discards_only_this_requests_uploads() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    // Another document already holds every key `a.pdf` can get in the next few seconds
    let now = chrono::Utc::now().timestamp_millis();
    let mut held = ManifestBuilder::new();
    for millis in now..now + 5_000 {
        held.add(
            FileCategory::CompletePdf,
            derive_key(FileCategory::CompletePdf, "a.pdf", millis),
        );
    }
    let holder = DocumentRecord::new(
        "doc-holder".to_string(),
        DocumentMetadata {
            title: "Holder".to_string(),
            ..Default::default()
        },
        held.build(),
        OTHER_STUDENT.0.to_string(),
    );
    state.db.create_document(&holder).unwrap();

    let form = MultipartBody::new()
        .text("title", "Mine")
        .file("front_face", "cover.png", b"png")
        .file("complete_pdf", "a.pdf", b"pdf");
    let res = send_multipart(&state, Method::POST, "/documents", Some(STUDENT), form).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json();
    assert_eq!(body["status"], "error");
    assert!(!body["message"].as_str().unwrap().contains("doc-holder"));

    // Nothing was committed
    assert!(state.db.get_documents_by_owner(STUDENT.0).unwrap().is_empty());

    // The cover is gone; the colliding key is still the holder's
    let remaining = state.objects.list_uploads().await.unwrap();
    assert_eq!(remaining.len(), 1, "{remaining:?}");
    assert!(remaining[0].starts_with("projects/complete_pdf/"));
    assert_eq!(
        state.db.get_document_by_key(&remaining[0]).unwrap().unwrap().id,
        "doc-holder"
    );
}

#[tokio::test]
async fn approval_then_hide() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);
    let id = submit(&state, MultipartBody::new().text("title", "X")).await;

    let res = approve(&state, &id).await;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.json()["data"];
    assert_eq!(data["approval_status"], "approved");
    assert_eq!(data["is_active"], true);
    assert_eq!(data["reviewed_by"], ADMIN.0);

    // Publicly visible now
    let res = get(&state, &format!("/documents/{id}"), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["view"], "public");

    let res = send_json(
        &state,
        Method::PUT,
        &format!("/documents/{id}/toggle-active"),
        Some(ADMIN),
        serde_json::json!({ "isActive": false }),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.json()["data"];
    assert_eq!(data["approval_status"], "approved");
    assert_eq!(data["is_active"], false);

    let res = get(&state, &format!("/documents/{id}"), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = get(&state, &format!("/documents/{id}"), Some(STUDENT)).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn illegal_transitions_conflict() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);
    let id = submit(&state, MultipartBody::new().text("title", "X")).await;

    // Toggling before approval
    let res = send_json(
        &state,
        Method::PUT,
        &format!("/documents/{id}/toggle-active"),
        Some(ADMIN),
        serde_json::json!({ "isActive": true }),
    )
    .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = send_json(
        &state,
        Method::PUT,
        &format!("/documents/{id}/approval"),
        Some(ADMIN),
        serde_json::json!({ "approvalStatus": "rejected" }),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["approval_status"], "rejected");

    // No direct rejected -> approved
    let res = approve(&state, &id).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.json()["status"], "fail");

    let res = send_json(
        &state,
        Method::PUT,
        &format!("/documents/{id}/approval"),
        Some(ADMIN),
        serde_json::json!({ "approvalStatus": "pending" }),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_requires_admin() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);
    let id = submit(&state, MultipartBody::new().text("title", "X")).await;

    let body = serde_json::json!({ "approvalStatus": "approved" });
    let uri = format!("/documents/{id}/approval");

    let res = send_json(&state, Method::PUT, &uri, None, body.clone()).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = send_json(&state, Method::PUT, &uri, Some(STUDENT), body.clone()).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = send_json(&state, Method::PUT, &uri, Some(ADVISOR), body).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = approve(&state, "missing").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_replaces_categories_with_new_files() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let form = MultipartBody::new()
        .text("title", "Draft")
        .text("department", "Physics")
        .file("complete_pdf", "draft.pdf", b"v1")
        .file("poster_files", "cover.psd", b"layers");
    let id = submit(&state, form).await;

    // Rejected documents may be edited and go back to pending
    send_json(
        &state,
        Method::PUT,
        &format!("/documents/{id}/approval"),
        Some(ADMIN),
        serde_json::json!({ "approvalStatus": "rejected" }),
    )
    .await;

    let form = MultipartBody::new()
        .text("title", "Final")
        .text("department", "")
        .file("complete_pdf", "final.pdf", b"v2")
        .file("poster_files", "", b"");
    let res = send_multipart(
        &state,
        Method::PUT,
        &format!("/documents/{id}"),
        Some(STUDENT),
        form,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "{}", String::from_utf8_lossy(&res.body));

    let data = &res.json()["data"];
    assert_eq!(data["title"], "Final");
    assert_eq!(data["department"], Value::Null);
    assert_eq!(data["approval_status"], "pending");

    let pdfs = data["file_paths"]["complete_pdf"].as_array().unwrap();
    assert_eq!(pdfs.len(), 1);
    assert!(pdfs[0].as_str().unwrap().ends_with("final.pdf"));
    let posters = data["file_paths"]["poster_files"].as_array().unwrap();
    assert_eq!(posters.len(), 1);
    assert!(posters[0].as_str().unwrap().ends_with("cover.psd"));
}

#[tokio::test]
async fn edit_is_owner_only_and_refused_once_approved() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);
    let id = submit(&state, MultipartBody::new().text("title", "X")).await;
    let uri = format!("/documents/{id}");

    let res = send_multipart(
        &state,
        Method::PUT,
        &uri,
        Some(OTHER_STUDENT),
        MultipartBody::new().text("title", "Hijacked"),
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send_multipart(
        &state,
        Method::PUT,
        &uri,
        Some(STUDENT),
        MultipartBody::new().text("title", "  "),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    approve(&state, &id).await;
    let res = send_multipart(
        &state,
        Method::PUT,
        &uri,
        Some(STUDENT),
        MultipartBody::new()
            .text("title", "Too late")
            .file("complete_pdf", "late.pdf", b"late"),
    )
    .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    // The refused edit wrote nothing
    assert!(state.objects.list_uploads().await.unwrap().is_empty());
}

#[tokio::test]
async fn download_gating() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let form = MultipartBody::new()
        .text("title", "X")
        .file("complete_pdf", "report.pdf", b"%PDF-report");
    let id = submit(&state, form).await;

    let res = get(&state, &format!("/documents/{id}"), Some(STUDENT)).await;
    let key = res.json()["data"]["file_paths"]["complete_pdf"][0]
        .as_str()
        .unwrap()
        .to_string();

    let res = get(&state, "/download", Some(STUDENT)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = get(
        &state,
        "/download?key=projects/complete_pdf/1-never-issued.pdf",
        Some(ADMIN),
    )
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // Pending documents are not downloadable by the public
    let res = get(&state, &format!("/download?key={key}"), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = get(&state, &format!("/download?key={key}"), Some(STUDENT)).await;
    assert_eq!(res.status, StatusCode::FOUND);
    let location = res.headers[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with(&format!("{TEST_BASE_URL}/objects/{key}?expires=")));

    let path = location.strip_prefix(TEST_BASE_URL).unwrap();
    let res = get(&state, path, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, b"%PDF-report");
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/pdf");

    let tampered = format!("{}x", path);
    let res = get(&state, &tampered, None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let unsigned = format!("/objects/{key}");
    let res = get(&state, &unsigned, None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn download_of_referenced_but_missing_object_is_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let form = MultipartBody::new()
        .text("title", "X")
        .file("front_face", "cover.png", b"png");
    let id = submit(&state, form).await;
    let doc = state.db.get_document(&id).unwrap().unwrap();
    let key = doc.file_paths.front_face[0].clone();

    state.objects.store().delete(&key).await.unwrap();

    let res = get(&state, &format!("/download?key={key}"), Some(ADMIN)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_respects_visibility() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let hidden = submit(&state, MultipartBody::new().text("title", "Hidden draft")).await;
    let public = submit(
        &state,
        MultipartBody::new()
            .text("title", "Published work")
            .text("publish_year", "2024"),
    )
    .await;
    approve(&state, &public).await;

    let res = get(&state, "/documents", None).await;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.json()["data"];
    assert_eq!(data["pagination"]["total"], 1);
    assert_eq!(data["items"][0]["id"], public.as_str());
    assert_eq!(data["items"][0]["view"], "public");

    // Students cannot widen the listing with a status filter
    let res = get(&state, "/documents?status=pending", Some(OTHER_STUDENT)).await;
    assert_eq!(res.json()["data"]["pagination"]["total"], 1);

    let res = get(&state, "/documents?status=pending", Some(ADVISOR)).await;
    let data = &res.json()["data"];
    assert_eq!(data["pagination"]["total"], 1);
    assert_eq!(data["items"][0]["id"], hidden.as_str());

    let res = get(&state, "/documents?search=PUBLISHED&year=2024", Some(ADMIN)).await;
    assert_eq!(res.json()["data"]["pagination"]["total"], 1);

    let res = get(&state, "/documents?limit=0", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = get(&state, "/documents?type=novel", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = get(&state, "/documents/mine", Some(STUDENT)).await;
    assert_eq!(res.json()["data"]["pagination"]["total"], 2);
    let res = get(&state, "/documents/mine", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn archived_documents_leave_public_view() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);
    let id = submit(&state, MultipartBody::new().text("title", "X")).await;
    approve(&state, &id).await;

    let res = send_json(
        &state,
        Method::PUT,
        &format!("/documents/{id}/status"),
        Some(ADMIN),
        serde_json::json!({ "status": "archived" }),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["status"], "archived");

    let res = get(&state, &format!("/documents/{id}"), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_delete_keeps_files_until_swept() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let form = MultipartBody::new()
        .text("title", "X")
        .file("complete_pdf", "report.pdf", b"pdf");
    let id = submit(&state, form).await;
    let kept = submit(
        &state,
        MultipartBody::new()
            .text("title", "Y")
            .file("complete_pdf", "keep.pdf", b"keep"),
    )
    .await;

    let uri = format!("/documents/{id}");
    let res = send(
        &state,
        request(Method::DELETE, &uri, Some(STUDENT))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send(
        &state,
        request(Method::DELETE, &uri, Some(ADMIN))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(get(&state, &uri, Some(ADMIN)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(state.objects.list_uploads().await.unwrap().len(), 2);

    // An unreferenced upload from long ago
    let stale = "projects/complete_pdf/1000-abandoned.pdf".to_string();
    state
        .objects
        .store()
        .put(&stale, bytes::Bytes::from_static(b"old"))
        .await
        .unwrap();

    let sweep = |grace: &str| {
        request(Method::POST, &format!("/admin/orphans/sweep{grace}"), Some(ADMIN))
            .body(Body::empty())
            .unwrap()
    };
    let res = send(&state, sweep("")).await;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.json()["data"];
    assert_eq!(data["scanned"], 3);
    assert_eq!(data["deleted"], 1);
    assert_eq!(data["retained"], 1);
    assert_eq!(data["failed"], 0);

    // A zero grace period is raised to the floor, so the fresh orphan stays
    let res = send(&state, sweep("?grace_seconds=0")).await;
    let data = &res.json()["data"];
    assert_eq!(data["scanned"], 2);
    assert_eq!(data["deleted"], 0);
    assert_eq!(data["retained"], 1);

    let remaining = state.objects.list_uploads().await.unwrap();
    assert!(!remaining.contains(&stale));
    let kept_doc = state.db.get_document(&kept).unwrap().unwrap();
    assert!(remaining.contains(&kept_doc.file_paths.complete_pdf[0]));
    assert_eq!(remaining.len(), 2);
}

#[tokio::test]
async fn sweep_requires_admin() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);

    let req = request(Method::POST, "/admin/orphans/sweep", Some(ADVISOR))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&state, req).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_and_purge() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = test_state(&temp_dir);
    submit(&state, MultipartBody::new().text("title", "X")).await;

    let res = get(&state, "/_internal/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["status"], "ok");

    let req = request(Method::DELETE, "/admin/purge", None)
        .body(Body::empty())
        .unwrap();
    let res = send(&state, req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["documents_deleted"], 1);

    let res = get(&state, "/documents/mine", Some(STUDENT)).await;
    assert_eq!(res.json()["data"]["pagination"]["total"], 0);
}
