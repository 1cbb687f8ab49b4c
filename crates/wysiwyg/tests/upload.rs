use std::rc::Rc;

use raytha_wysiwyg::{
    CreateAfterUpload, EditorController, HiddenField, ManualClock, MediaUploadConfig, PresignResponse,
    UploadError, UploadFields, UploadFile, UploadResponse, WysiwygConfig,
};
use serde_json::json;

fn media_config() -> MediaUploadConfig {
    MediaUploadConfig::from_host_values("https://cms.example/", false, "image/*, .pdf ,", 1024)
}

fn controller() -> EditorController {
    EditorController::connect_with_clock(
        &WysiwygConfig::default(),
        HiddenField::new("content", "<p>ab</p>"),
        media_config(),
        Rc::new(ManualClock::new()),
    )
}

#[test]
fn host_values_are_normalized() {
    let config = media_config();

    assert_eq!(config.path_base, "https://cms.example");
    assert_eq!(config.mime_types, vec!["image/*", ".pdf"]);
    assert_eq!(config.max_file_size, Some(1024));
    assert_eq!(MediaUploadConfig::from_host_values("", true, "", 0).max_file_size, None);
}

#[test]
fn endpoints_hang_off_the_path_base() {
    let config = media_config();

    assert_eq!(config.upload_endpoint(), "https://cms.example/raytha/media-items/upload");
    assert_eq!(config.presign_endpoint(), "https://cms.example/raytha/media-items/presign");
    assert_eq!(
        config.create_after_upload_endpoint(),
        "https://cms.example/raytha/media-items/create-after-upload"
    );
    assert_eq!(
        config.object_url("2024/abc.png"),
        "https://cms.example/raytha/media-items/objectkey/2024/abc.png"
    );
}

#[test]
fn restrictions_check_size_then_type() {
    let config = media_config();

    assert_eq!(UploadFile::new("photo.PNG", 100).content_type, "image/png");
    assert!(config.validate(&UploadFile::new("photo.PNG", 100)).is_ok());
    assert!(config.validate(&UploadFile::new("notes.pdf", 10)).is_ok());
    assert!(matches!(
        config.validate(&UploadFile::new("archive.zip", 10)),
        Err(UploadError::TypeNotAllowed { .. })
    ));
    assert_eq!(
        config.validate(&UploadFile::new("big.png", 2048)),
        Err(UploadError::FileTooLarge {
            name: "big.png".into(),
            size: 2048,
            max: 1024,
        })
    );
    assert!(MediaUploadConfig::default().validate(&UploadFile::new("anything.bin", u64::MAX)).is_ok());
}

#[test]
fn wire_bodies_use_camel_case() {
    let response: UploadResponse = serde_json::from_value(json!({ "fields": { "objectKey": "k1" } })).unwrap();
    assert_eq!(response.fields.object_key, "k1");
    assert_eq!(response.fields.id, None);

    let config = media_config();
    let file = UploadFile::new("Photo.JPG", 512);
    assert_eq!(
        serde_json::to_value(config.presign_request(&file)).unwrap(),
        json!({ "filename": "Photo.JPG", "contentType": "image/jpeg", "extension": "jpg" })
    );
}

#[test]
fn missing_object_key_is_an_error() {
    let config = media_config();

    assert_eq!(config.completion("", None), Err(UploadError::MissingObjectKey));
    let completion = config
        .completion_from_response(
            &UploadResponse {
                fields: UploadFields {
                    id: None,
                    object_key: "k1".into(),
                },
            },
            &UploadFile::new("a.png", 1).with_alt_text("An a"),
        )
        .unwrap();
    assert_eq!(completion.url, "https://cms.example/raytha/media-items/objectkey/k1");
    assert_eq!(completion.alt_text.as_deref(), Some("An a"));
}

#[test]
fn controller_reports_restrictions_as_notices() {
    let controller = controller();

    let notice = controller.validate_upload(&UploadFile::new("big.png", 4096)).unwrap_err();

    assert_eq!(notice.title, "File Restriction");
    assert!(notice.text.contains("big.png"));
    assert!(controller.validate_upload(&UploadFile::new("ok.png", 10)).is_ok());
}

#[test]
fn finished_upload_inserts_the_image() {
    let mut controller = controller();
    let file = UploadFile::new("cat.png", 10).with_alt_text("A cat");
    let response = UploadResponse {
        fields: UploadFields {
            id: Some("m1".into()),
            object_key: "cats/cat.png".into(),
        },
    };

    assert_eq!(controller.upload_succeeded(&file, &response), Ok(true));

    let html = controller.source_code();
    assert!(html.contains(r#"<img src="https://cms.example/raytha/media-items/objectkey/cats/cat.png" alt="A cat">"#));
}

#[test]
fn direct_upload_returns_the_registration_body() {
    let mut controller = controller();
    let file = UploadFile::new("doc.pdf", 300);
    let presign = PresignResponse {
        url: "https://bucket.example/put".into(),
        fields: UploadFields {
            id: Some("m2".into()),
            object_key: "docs/doc.pdf".into(),
        },
    };

    let body = controller.direct_upload_succeeded(&file, &presign).unwrap();

    assert_eq!(
        body,
        CreateAfterUpload {
            filename: "doc.pdf".into(),
            content_type: "application/pdf".into(),
            extension: "pdf".into(),
            id: Some("m2".into()),
            object_key: "docs/doc.pdf".into(),
            length: 300,
        }
    );
    assert_eq!(serde_json::to_value(&body).unwrap()["objectKey"], json!("docs/doc.pdf"));
    assert!(controller.source_code().contains("objectkey/docs/doc.pdf"));
}

#[test]
fn failed_uploads_leave_the_document_alone() {
    let mut controller = controller();
    let file = UploadFile::new("cat.png", 10);

    let notice = controller
        .upload_succeeded(&file, &UploadResponse::default())
        .unwrap_err();
    assert_eq!(notice.title, "Upload failed");

    let notice = controller.upload_failed(&file, "network error");
    assert_eq!(notice.to_string(), "Upload failed: network error");
    assert_eq!(controller.source_code(), "<p>ab</p>");
}
