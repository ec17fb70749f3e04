//! Loader tests against generated PDF and text files.

mod common;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::Arc;

use common::*;
use docqa::loader::{load, load_document};
use docqa::pipeline::Pipeline;
use docqa_core::ErrorKind;

/// A PDF with one Helvetica text line per page.
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn farm_pdf(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("weekly-farm-info-28.pdf");
    std::fs::write(&path, pdf_with_pages(&[PAGE_ONE, PAGE_TWO, PAGE_THREE])).unwrap();
    path
}

#[test]
fn test_pdf_pages_are_kept_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let document = load(&farm_pdf(dir.path())).unwrap();

    assert_eq!(document.pages.len(), 3);
    assert_eq!(document.pages[1].number, 2);
    assert!(document.pages[0].text.contains("Weekly farm information"));
    assert!(document.pages[1].text.contains("brown planthopper"));
    assert!(document.pages[2].text.contains("soybeans"));
    assert!(document.pages.iter().all(|p| p.document_id == document.id));
}

#[test]
fn test_same_pdf_bytes_same_id() {
    let dir = tempfile::tempdir().unwrap();
    let a = load(&farm_pdf(dir.path())).unwrap();
    let b = load(&farm_pdf(dir.path())).unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.full_text(), b.full_text());
}

#[test]
fn test_corrupt_pdf_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"not a valid pdf").unwrap();
    assert_eq!(load(&path).unwrap_err().kind(), ErrorKind::Parse);
}

#[test]
fn test_unsupported_extension_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.docx");
    std::fs::write(&path, b"PK").unwrap();
    assert_eq!(load(&path).unwrap_err().kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_load_document_off_thread() {
    let dir = tempfile::tempdir().unwrap();
    let document = load_document(&write_farm_document(dir.path())).await.unwrap();
    assert_eq!(document.pages.len(), 3);
    assert!(document.pages[1].text.starts_with("Crop protection notes."));

    let err = load_document(&dir.path().join("missing.txt")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_answers_from_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&farm_pdf(dir.path()));
    let pipeline = Pipeline::initialize_with(
        &config,
        Arc::new(HashEmbedder::default()),
        Arc::new(ExtractiveGenerator::default()),
    )
    .await
    .unwrap();

    let answer = pipeline.answer(PEST_QUESTION).await.unwrap();
    assert!(answer.contains("brown planthopper"), "unexpected answer: {}", answer);
    assert_eq!(pipeline.build_info().pages, 3);
}
