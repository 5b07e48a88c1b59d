use std::sync::{Arc, Mutex};

use portal_core::{ResumeFailure, ResumeFile};
use chrono::{TimeZone, Utc};
use portal_engine::{
    load_dashboard, ApiError, ApplicationSource, PortalSettings, ProgressSink,
    ReqwestPortalClient, ResumeApi, ResumeUpload, TransferProgress,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<TransferProgress>>,
}

impl TestSink {
    fn take(&self) -> Vec<TransferProgress> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, progress: TransferProgress) {
        self.events.lock().unwrap().push(progress);
    }
}

fn client_for(server: &MockServer) -> ReqwestPortalClient {
    ReqwestPortalClient::new(PortalSettings {
        base_url: server.uri(),
        upload_chunk_size: 4,
        ..PortalSettings::default()
    })
    .expect("client")
}

fn pdf_upload() -> ResumeUpload {
    ResumeUpload::new("cv.pdf", Some("application/pdf"), b"%PDF-1.7 body".to_vec())
}

#[tokio::test]
async fn lists_resumes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[{"name":"cv.pdf","type":"application/pdf","size":2048,
                 "uploadedAt":"2026-10-16T09:00:00Z"}]"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let resumes = client_for(&server).list_resumes().await.expect("list ok");
    assert_eq!(
        resumes,
        vec![ResumeFile {
            name: "cv.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 2048,
            uploaded_at: "2026-10-16T09:00:00Z".to_string(),
        }]
    );
}

#[tokio::test]
async fn empty_resume_payload_is_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resumes"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let resumes = client_for(&server).list_resumes().await.expect("list ok");
    assert!(resumes.is_empty());
}

#[tokio::test]
async fn list_failure_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resumes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).list_resumes().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
}

#[tokio::test]
async fn applications_come_back_most_recent_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/applied.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[
                {"company":"Old","jobTitle":"Dev","applicationTime":"2026-09-01T10:00:00Z"},
                {"company":"Undated","jobTitle":"Dev"},
                {"company":7,"jobTitle":"Dev"},
                {"company":"New","jobTitle":"Dev","applicationTime":"2026-10-15T10:00:00Z"}
            ]"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let applications = client_for(&server)
        .fetch_applications()
        .await
        .expect("fetch ok");
    let companies: Vec<_> = applications.iter().map(|a| a.company.as_str()).collect();
    assert_eq!(companies, vec!["New", "Old", "Undated"]);
}

#[tokio::test]
async fn dashboard_load_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/applied.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    let err = load_dashboard(&client_for(&server), &now).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, .. }));
}

#[tokio::test]
async fn upload_sends_multipart_field_and_reports_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resumes/upload"))
        .and(body_string_contains("name=\"resume\""))
        .and(body_string_contains("filename=\"cv.pdf\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"ok":true}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let upload = pdf_upload();
    client_for(&server)
        .upload_resume(&upload, sink.clone())
        .await
        .expect("upload ok");

    let events = sink.take();
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|pair| pair[0].sent <= pair[1].sent));
    let last = events.last().unwrap();
    assert_eq!(last.sent, upload.size());
    assert_eq!(last.total, upload.size());
}

#[tokio::test]
async fn upload_error_uses_structured_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resumes/upload"))
        .respond_with(
            ResponseTemplate::new(413)
                .set_body_raw(r#"{"error":"quota exceeded"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_resume(&pdf_upload(), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "quota exceeded");
    assert!(matches!(err, ResumeFailure::Server { status: 413, .. }));
}

#[tokio::test]
async fn upload_error_with_unparseable_body_uses_status_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resumes/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>stack trace</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_resume(&pdf_upload(), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Server error: 500 Internal Server Error");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = ReqwestPortalClient::new(PortalSettings {
        base_url: format!("http://127.0.0.1:{port}"),
        ..PortalSettings::default()
    })
    .expect("client");

    let err = client
        .upload_resume(&pdf_upload(), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ResumeFailure::Transport(
            "Network error. Please check if the server is running.".to_string()
        )
    );
}

#[tokio::test]
async fn delete_encodes_file_name() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/resumes/my%20cv.pdf"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .delete_resume("my cv.pdf")
        .await
        .expect("delete ok");
}

#[tokio::test]
async fn delete_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/resumes/cv.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).delete_resume("cv.pdf").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}
