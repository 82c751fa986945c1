//! Page text acquisition over in-memory PDFs.

use std::sync::{Arc, Mutex};

use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;

use medbill_core::error::{BillError, DocumentError, OcrError};
use medbill_core::models::config::MedbillConfig;
use medbill_core::{extract_pages, DocumentKind, OcrBackend, PageType, TextAcquirer};

enum FixturePage {
    /// Page with a text layer, one string per line.
    Text(Vec<&'static str>),
    /// Page holding only an image, with the given MediaBox width and height.
    Scanned(i64, i64),
    /// Letter-size page whose image declares a huge size but carries no data.
    OversizedImage,
}

fn build_pdf(pages: &[FixturePage]) -> Vec<u8> {
    build_pdf_with_font(
        pages,
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        },
    )
}

fn build_pdf_with_font(pages: &[FixturePage], font: Dictionary) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(font);

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let (resources, operations, width, height) = match page {
            FixturePage::Text(lines) => {
                let mut ops = vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![50.into(), 700.into()]),
                ];
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        ops.push(Operation::new("Td", vec![0.into(), (-20).into()]));
                    }
                    ops.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                }
                ops.push(Operation::new("ET", vec![]));
                let resources = dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                };
                (resources, ops, 612, 792)
            }
            FixturePage::Scanned(width, height) => {
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 4,
                        "Height" => 4,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![200u8; 16],
                ));
                let ops = vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            (*width).into(),
                            0.into(),
                            0.into(),
                            (*height).into(),
                            0.into(),
                            0.into(),
                        ],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                ];
                let resources = dictionary! {
                    "XObject" => dictionary! { "Im1" => image_id },
                };
                (resources, ops, *width, *height)
            }
            FixturePage::OversizedImage => {
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 70_000,
                        "Height" => 70_000,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    vec![0u8; 12],
                ));
                let ops = vec![Operation::new("Do", vec!["Im1".into()])];
                let resources = dictionary! {
                    "XObject" => dictionary! { "Im1" => image_id },
                };
                (resources, ops, 612, 792)
            }
        };

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
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
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}

/// Reports the size of every image it is asked to read.
#[derive(Default, Clone)]
struct RecordingOcr {
    calls: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl RecordingOcr {
    fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl OcrBackend for RecordingOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let (w, h) = image.dimensions();
        self.calls.lock().unwrap().push((w, h));
        Ok(format!("Scanned charges {}x{}", w, h))
    }
}

struct BlankOcr;

impl OcrBackend for BlankOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Ok(String::new())
    }
}

fn config_at_72_dpi() -> MedbillConfig {
    let mut config = MedbillConfig::default();
    config.pdf.render_dpi = 72;
    config
}

#[test]
fn text_layer_pages_skip_ocr() {
    let pdf = build_pdf(&[FixturePage::Text(vec!["Consultation Fee 500"])]);
    let ocr = RecordingOcr::default();
    let acquirer = TextAcquirer::new(ocr.clone(), &config_at_72_dpi()).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();

    assert_eq!(pages.len(), 1);
    assert!(pages[0].contains("Consultation Fee 500"), "got {:?}", pages[0]);
    assert!(ocr.calls().is_empty());
}

#[test]
fn empty_text_layer_falls_back_to_ocr() {
    let pdf = build_pdf(&[
        FixturePage::Text(vec!["Consultation Fee 500"]),
        FixturePage::Scanned(612, 792),
    ]);
    let ocr = RecordingOcr::default();
    let acquirer = TextAcquirer::new(ocr.clone(), &config_at_72_dpi()).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();

    assert_eq!(ocr.calls(), vec![(612, 792)]);
    assert_eq!(pages.len(), 2);
    assert!(pages[0].contains("Consultation"));
    // the 4x4 scan is rendered to the page size at 72 dpi
    assert_eq!(pages[1], "Scanned charges 612x792");
}

#[test]
fn render_dpi_scales_raster() {
    let pdf = build_pdf(&[FixturePage::Scanned(144, 72)]);
    let mut config = MedbillConfig::default();
    config.pdf.render_dpi = 300;
    let acquirer = TextAcquirer::new(RecordingOcr::default(), &config).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();

    assert_eq!(pages, vec!["Scanned charges 600x300".to_string()]);
}

#[test]
fn parallel_ocr_keeps_page_order() {
    let pdf = build_pdf(&[
        FixturePage::Scanned(100, 100),
        FixturePage::Scanned(200, 100),
        FixturePage::Scanned(300, 100),
        FixturePage::Scanned(400, 100),
        FixturePage::Scanned(500, 100),
    ]);
    let mut config = config_at_72_dpi();
    config.ocr.workers = 2;
    let acquirer = TextAcquirer::new(RecordingOcr::default(), &config).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();

    let expected: Vec<String> = (1..=5)
        .map(|i| format!("Scanned charges {}x100", i * 100))
        .collect();
    assert_eq!(pages, expected);
}

#[test]
fn max_pages_limits_acquisition() {
    let pdf = build_pdf(&[
        FixturePage::Scanned(100, 100),
        FixturePage::Scanned(200, 100),
        FixturePage::Scanned(300, 100),
    ]);
    let mut config = config_at_72_dpi();
    config.pdf.max_pages = 2;
    let acquirer = TextAcquirer::new(RecordingOcr::default(), &config).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();

    assert_eq!(pages.len(), 2);
}

#[test]
fn two_page_bill_end_to_end() {
    let pdf = build_pdf(&[
        FixturePage::Text(vec![
            "CITY HOSPITAL FINAL BILL",
            "Room rent 2 1500 3000",
            "Consultation Fee 500",
            "X-Ray chest 1 800 800",
            "Total 4300",
        ]),
        FixturePage::Scanned(612, 792),
    ]);
    let acquirer = TextAcquirer::new(BlankOcr, &config_at_72_dpi()).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();
    let results = extract_pages(&pages);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].page_type, PageType::FinalBill);
    assert_eq!(results[0].bill_items.len(), 3);
    assert_eq!(results[0].bill_items[1].amount, 500.0);
    assert_eq!(results[1].page_no, "2");
    assert!(results[1].bill_items.is_empty());
}

#[test]
fn font_without_base_font_still_acquires() {
    let font = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
    };
    let pdf = build_pdf_with_font(&[FixturePage::Text(vec!["Syringe 5 10 50"])], font);
    let acquirer = TextAcquirer::new(RecordingOcr::default(), &config_at_72_dpi()).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();

    assert_eq!(pages.len(), 1);
    // either the lopdf text layer or the OCR fallback fills the page
    assert!(!pages[0].trim().is_empty());
}

#[test]
fn oversized_image_renders_blank_page() {
    let pdf = build_pdf(&[FixturePage::OversizedImage]);
    let ocr = RecordingOcr::default();
    let acquirer = TextAcquirer::new(ocr.clone(), &config_at_72_dpi()).unwrap();

    let pages = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap();

    assert_eq!(ocr.calls(), vec![(612, 792)]);
    assert_eq!(pages, vec!["Scanned charges 612x792".to_string()]);
}

#[test]
fn huge_media_box_is_rejected() {
    let pdf = build_pdf(&[FixturePage::Scanned(14_400, 14_400)]);
    let mut config = MedbillConfig::default();
    config.pdf.render_dpi = 300;
    let ocr = RecordingOcr::default();
    let acquirer = TextAcquirer::new(ocr.clone(), &config).unwrap();

    let err = acquirer.acquire_pages(&pdf, DocumentKind::Pdf).unwrap_err();

    assert!(
        matches!(err, BillError::Document(DocumentError::PageTooLarge { page: 1, .. })),
        "got {:?}",
        err
    );
    assert!(ocr.calls().is_empty());
}
