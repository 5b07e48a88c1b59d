use std::sync::{Arc, Once};
use std::time::Duration;

use portal_core::ResumeFailure;
use portal_engine::{
    PortalSettings, ReqwestPortalClient, ResumeUpload, UploadController, UploadSettings,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTED: &str = r#"[
    {"name":"cv.pdf","type":"application/pdf","size":13,"uploadedAt":"2026-10-16T09:00:00Z"},
    {"name":"older.pdf","type":"application/pdf","size":99,"uploadedAt":"2026-10-01T09:00:00Z"}
]"#;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(portal_logging::initialize_for_tests);
}

fn controller_for(server: &MockServer, settle_delay: Duration) -> UploadController {
    let client = ReqwestPortalClient::new(PortalSettings {
        base_url: server.uri(),
        ..PortalSettings::default()
    })
    .expect("client");
    UploadController::new(Arc::new(client), UploadSettings { settle_delay })
}

async fn mount_list(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/api/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json"))
        .mount(server)
        .await;
}

/// Answers 413 after reading only the start of the request and keeps the socket open.
async fn spawn_early_rejecting_server() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = vec![0u8; 4096];
        let _ = socket.read(&mut head).await.unwrap();

        let body = r#"{"error":"too large"}"#;
        let response = format!(
            "HTTP/1.1 413 Payload Too Large\r\ncontent-type: application/json\r\n\
             content-length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(socket);
    });
    (format!("http://{addr}/"), handle)
}

fn pdf() -> ResumeUpload {
    ResumeUpload::new("cv.pdf", Some("application/pdf"), b"%PDF-1.7 body".to_vec())
}

#[tokio::test]
async fn successful_submit_refreshes_list_and_settles() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resumes/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .expect(1)
        .mount(&server)
        .await;
    mount_list(&server, LISTED).await;

    let controller = Arc::new(controller_for(&server, Duration::from_millis(200)));
    let mut rx = controller.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            seen.push((status.is_uploading, status.progress));
            if !status.is_uploading && status.progress == 0 && seen.len() > 1 {
                break;
            }
        }
        seen
    });

    let status = controller.submit(vec![pdf()]).await;
    assert!(!status.is_uploading);
    assert_eq!(status.progress, 0);
    assert_eq!(status.error, None);
    let names: Vec<_> = status.resumes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["cv.pdf", "older.pdf"]);

    let seen = watcher.await.unwrap();
    assert!(seen.contains(&(true, 100)));
    assert_eq!(seen.last(), Some(&(false, 0)));
}

#[tokio::test]
async fn non_pdf_never_reaches_the_network() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resumes/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::ZERO);
    let status = controller
        .submit(vec![ResumeUpload::new("cv.docx", Some("application/msword"), b"doc".to_vec())])
        .await;

    assert!(!status.is_uploading);
    assert_eq!(
        status.error,
        Some(ResumeFailure::Validation("Please upload a PDF file".to_string()))
    );
}

#[tokio::test]
async fn server_error_surfaces_message_and_resets() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resumes/upload"))
        .respond_with(
            ResponseTemplate::new(413)
                .set_body_raw(r#"{"error":"quota exceeded"}"#, "application/json"),
        )
        .mount(&server)
        .await;
    mount_list(&server, LISTED).await;

    let controller = controller_for(&server, Duration::ZERO);
    let status = controller.submit(vec![pdf()]).await;

    assert!(!status.is_uploading);
    assert_eq!(status.progress, 0);
    assert_eq!(status.error.as_ref().map(ResumeFailure::message), Some("quota exceeded"));
    assert!(status.resumes.is_empty());

    let status = controller.dismiss_error();
    assert_eq!(status.error, None);
}

#[tokio::test]
async fn failed_remove_keeps_list() {
    init_logging();
    let server = MockServer::start().await;
    mount_list(&server, LISTED).await;
    Mock::given(method("DELETE"))
        .and(path("/api/resumes/cv.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::ZERO);
    let before = controller.refresh().await.resumes;
    assert_eq!(before.len(), 2);

    let status = controller.remove("cv.pdf").await;
    assert_eq!(status.resumes, before);
    assert_eq!(
        status.error,
        Some(ResumeFailure::Delete {
            file_name: "cv.pdf".to_string(),
            message: "Failed to delete resume. Please try again.".to_string(),
        })
    );
}

#[tokio::test]
async fn successful_remove_reloads_list() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/resumes/cv.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_list(
        &server,
        r#"[{"name":"older.pdf","type":"application/pdf","size":99,
             "uploadedAt":"2026-10-01T09:00:00Z"}]"#,
    )
    .await;

    let controller = controller_for(&server, Duration::ZERO);
    let status = controller.remove("cv.pdf").await;

    assert_eq!(status.error, None);
    let names: Vec<_> = status.resumes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["older.pdf"]);
}

#[tokio::test]
async fn upload_reads_file_from_disk() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("Resume.PDF");
    std::fs::write(&file_path, b"%PDF-1.4").unwrap();

    let upload = ResumeUpload::from_path(&file_path).await.unwrap();
    assert_eq!(upload.name, "Resume.PDF");
    assert_eq!(upload.mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(upload.size(), 8);
    assert!(upload.candidate().is_pdf());
}

#[tokio::test]
async fn early_rejection_does_not_keep_the_controller_alive() {
    init_logging();
    let (base_url, server) = spawn_early_rejecting_server().await;
    let client = ReqwestPortalClient::new(PortalSettings {
        base_url,
        ..PortalSettings::default()
    })
    .expect("client");
    let controller = UploadController::new(
        Arc::new(client),
        UploadSettings {
            settle_delay: Duration::ZERO,
        },
    );
    let mut rx = controller.subscribe();

    let large = ResumeUpload::new("large.pdf", Some("application/pdf"), vec![b'%'; 32 << 20]);
    let status = tokio::time::timeout(Duration::from_secs(20), controller.submit(vec![large]))
        .await
        .expect("submit settles");
    assert!(!status.is_uploading);
    assert_eq!(status.progress, 0);
    assert_eq!(
        status.error,
        Some(ResumeFailure::Server {
            status: 413,
            message: "too large".to_string(),
        })
    );

    drop(controller);
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while rx.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok(), "status channel outlived the controller");
    server.abort();
}

#[tokio::test]
async fn failed_refresh_empties_list_and_reports() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resumes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::ZERO);
    let status = controller.refresh().await;

    assert!(status.resumes.is_empty());
    assert!(matches!(status.error, Some(ResumeFailure::Transport(_))));
    assert!(status
        .error
        .as_ref()
        .is_some_and(|failure| failure.message().starts_with("Failed to load resumes")));
}
