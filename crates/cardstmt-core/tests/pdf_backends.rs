//! Backends and the full parser over PDFs built in memory.

use std::sync::Arc;

use cardstmt_core::models::config::ExtractionConfig;
use cardstmt_core::pdf::{LopdfBackend, PdfExtractBackend, TextDensityProbe, is_ocr_needed, page_image};
use cardstmt_core::{
    BackendKind, Document, ExtractionCoordinator, ExtractorRegistry, Issuer, IssuerDetector, OcrBackend,
    OcrError, OcrResult, PatternCatalog, PdfConfig, RecognitionEngine, StatementParser, TextBackend, TextBox,
};
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use pretty_assertions::assert_eq;

const HDFC_LINES: [&str; 6] = [
    "HDFC Bank Credit Card Statement",
    "Card No: 5522 60XX XXXX 1234",
    "Statement Date:08/06/2019",
    "Payment Due Date Total Dues Minimum Amount Due",
    "28/06/2019 45,240.00 2,270.00",
    "Reward Points Balance: 1,250",
];

fn save(mut doc: lopdf::Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Single-page PDF with one BT/ET block per line in Helvetica.
fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let y = 750 - 20 * i as i64;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
        operations.push(Operation::new("Td", vec![50.into(), y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    save(doc)
}

/// Single-page PDF holding only an uncompressed 8x8 grayscale image.
fn scanned_pdf() -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let pixels: Vec<u8> = (0..64).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 8,
            "Height" => 8,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        pixels,
    ));
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![500.into(), 0.into(), 0.into(), 700.into(), 40.into(), 80.into()]),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    save(doc)
}

/// Engine that "reads" the HDFC statement off any image.
struct ScriptedEngine;

impl RecognitionEngine for ScriptedEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let boxes = HDFC_LINES
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let y = 30.0 * i as f32;
                TextBox {
                    bbox: [0.0, y, 400.0, y, 400.0, y + 20.0, 0.0, y + 20.0],
                    text: line.to_string(),
                    confidence: 0.95,
                }
            })
            .collect();
        Ok(OcrResult::new(boxes, 3, (image.width(), image.height())))
    }
}

fn scripted_ocr() -> OcrBackend {
    OcrBackend::with_loader(
        1,
        PdfConfig::default(),
        Box::new(|| Ok(Box::new(ScriptedEngine) as Box<dyn RecognitionEngine>)),
    )
}

fn parser() -> StatementParser {
    let catalog = PatternCatalog::embedded().unwrap();
    let config = ExtractionConfig::default();
    let coordinator = ExtractionCoordinator::new(
        Arc::new(LopdfBackend::default()),
        Arc::new(PdfExtractBackend::new()),
        Arc::new(scripted_ocr()),
        Arc::new(TextDensityProbe),
        config.min_text_threshold,
    );
    StatementParser::from_parts(
        coordinator,
        IssuerDetector::from_config(&catalog, &config),
        ExtractorRegistry::from_catalog(&catalog),
    )
}

#[test]
fn test_lopdf_reads_text_pdf() {
    let doc = Document::new("hdfc.pdf", text_pdf(&HDFC_LINES));
    let attempt = LopdfBackend::default().extract(&doc);

    assert!(attempt.success);
    assert_eq!(attempt.backend, BackendKind::Lopdf);
    assert_eq!(attempt.page_count, 1);
    assert_eq!(attempt.byte_size, doc.len());
    assert!(attempt.text.contains("HDFC Bank Credit Card Statement"));
    assert!(attempt.text.contains("45,240.00"));
    assert!(attempt.is_sufficient(100));
}

#[test]
fn test_pdf_extract_reports_its_kind() {
    let doc = Document::new("hdfc.pdf", text_pdf(&HDFC_LINES));
    let attempt = PdfExtractBackend::new().extract(&doc);

    assert_eq!(attempt.backend, BackendKind::PdfExtract);
    assert_eq!(attempt.byte_size, doc.len());
}

#[test]
fn test_probe_on_text_and_scanned_pdfs() {
    let text = Document::new("hdfc.pdf", text_pdf(&HDFC_LINES));
    let short = Document::new("short.pdf", text_pdf(&["Page 1 of 1"]));
    let scanned = Document::new("scan.pdf", scanned_pdf());

    assert!(!is_ocr_needed(&text, 100));
    assert!(is_ocr_needed(&short, 100));
    assert!(is_ocr_needed(&scanned, 100));
}

#[test]
fn test_page_image_decodes_xobject() {
    let (doc, _) = cardstmt_core::pdf::load_document(&scanned_pdf()).unwrap();
    let image = page_image(&doc, 1).unwrap();

    assert_eq!((image.width(), image.height()), (8, 8));
    assert_eq!(image.to_rgba8().get_pixel(1, 0).0, [255, 255, 255, 255]);
}

#[test]
fn test_ocr_backend_reads_scanned_page() {
    let doc = Document::new("scan.pdf", scanned_pdf());
    let attempt = scripted_ocr().extract(&doc);

    assert!(attempt.success);
    assert_eq!(attempt.backend, BackendKind::Ocr);
    assert_eq!(attempt.page_count, 1);
    assert_eq!(attempt.text, HDFC_LINES.join("\n"));
}

#[test]
fn test_parser_on_text_pdf_uses_lopdf() {
    let doc = Document::new("hdfc.pdf", text_pdf(&HDFC_LINES));
    let outcome = parser().parse(&doc, false).unwrap();

    assert_eq!(outcome.issuer, Issuer::Hdfc);
    assert_eq!(outcome.metadata.backend, BackendKind::Lopdf);
    assert!(!outcome.metadata.ocr_used);
    assert_eq!(outcome.fields.total_amount.raw, "45,240.00");
}

#[test]
fn test_parser_on_scanned_pdf_uses_ocr() {
    let doc = Document::new("scan.pdf", scanned_pdf());
    let outcome = parser().parse(&doc, false).unwrap();

    assert_eq!(outcome.issuer, Issuer::Hdfc);
    assert_eq!(outcome.metadata.backend, BackendKind::Ocr);
    assert!(outcome.metadata.ocr_used);
    assert_eq!(outcome.metadata.page_count, 1);
    assert_eq!(outcome.fields.card_number.value.as_deref(), Some("5522 60XX XXXX 1234"));
    assert!(outcome.confidence > 0.9);
}
