//! Page text acquisition: native PDF text with an OCR fallback.

use std::time::Instant;

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentKind};
use crate::error::{DocumentError, OcrError, Result};
use crate::models::config::{MedbillConfig, OcrFailurePolicy};
use crate::ocr::OcrBackend;
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Turns document bytes into one text blob per page.
pub struct TextAcquirer<O: OcrBackend> {
    ocr: O,
    pool: rayon::ThreadPool,
    workers: usize,
    render_dpi: u32,
    max_pages: usize,
    on_failure: OcrFailurePolicy,
}

impl<O: OcrBackend> TextAcquirer<O> {
    /// Create an acquirer around an OCR backend.
    pub fn new(ocr: O, config: &MedbillConfig) -> Result<Self> {
        let workers = config.ocr.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("medbill-ocr-{}", i))
            .build()
            .map_err(|e| OcrError::WorkerPool(e.to_string()))?;

        Ok(Self {
            ocr,
            pool,
            workers,
            render_dpi: config.pdf.render_dpi,
            max_pages: config.pdf.max_pages,
            on_failure: config.ocr.on_failure,
        })
    }

    /// Acquire page texts from a document.
    pub fn acquire(&self, document: &Document) -> Result<Vec<String>> {
        self.acquire_pages(document.bytes(), document.kind())
    }

    /// Acquire page texts from raw bytes of the declared kind.
    ///
    /// PDF pages whose native text is blank are rasterized and OCR'd; an
    /// image is OCR'd as a single page. Bytes that cannot be opened as the
    /// declared kind are a `DocumentError`.
    pub fn acquire_pages(&self, bytes: &[u8], kind: DocumentKind) -> Result<Vec<String>> {
        let start = Instant::now();
        let pages = match kind {
            DocumentKind::Pdf => self.acquire_pdf(bytes)?,
            DocumentKind::Image => vec![self.acquire_image(bytes)?],
        };
        info!(
            "Acquired {} page(s) from {} in {}ms",
            pages.len(),
            kind,
            start.elapsed().as_millis()
        );
        Ok(pages)
    }

    fn acquire_image(&self, bytes: &[u8]) -> Result<String> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DocumentError::UnreadableImage(e.to_string()))?;
        let result = self.pool.install(|| self.ocr.recognize(&image));
        self.apply_policy(1, result)
    }

    fn acquire_pdf(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let mut pdf = PdfExtractor::new();
        pdf.load(bytes)?;

        let mut page_count = pdf.page_count();
        if self.max_pages > 0 && page_count as usize > self.max_pages {
            debug!("Limiting {} pages to {}", page_count, self.max_pages);
            page_count = self.max_pages as u32;
        }

        let mut texts = Vec::with_capacity(page_count as usize);
        let mut scanned = Vec::new();

        for page in 1..=page_count {
            let text = pdf.extract_page_text(page)?;
            if text.trim().is_empty() {
                scanned.push(page);
            }
            texts.push(text);
        }

        if scanned.is_empty() {
            return Ok(texts);
        }

        debug!("{} of {} pages need OCR: {:?}", scanned.len(), page_count, scanned);

        // Render one batch per round so at most `workers` rasters are alive
        for batch in scanned.chunks(self.workers) {
            let rendered = batch
                .iter()
                .map(|&page| -> Result<(u32, DynamicImage)> {
                    Ok((page, pdf.render_page(page, self.render_dpi)?))
                })
                .collect::<Result<Vec<_>>>()?;

            let recognized: Vec<(u32, std::result::Result<String, OcrError>)> =
                self.pool.install(|| {
                    rendered
                        .par_iter()
                        .map(|(page, image)| (*page, self.ocr.recognize(image)))
                        .collect()
                });

            for (page, result) in recognized {
                texts[(page - 1) as usize] = self.apply_policy(page, result)?;
            }
        }

        Ok(texts)
    }

    fn apply_policy(&self, page: u32, result: std::result::Result<String, OcrError>) -> Result<String> {
        match result {
            Ok(text) => {
                debug!("OCR page {}: {} chars", page, text.len());
                Ok(text)
            }
            Err(e) => match self.on_failure {
                OcrFailurePolicy::Fail => Err(e.into()),
                OcrFailurePolicy::EmptyPage => {
                    warn!("OCR failed on page {}, using empty text: {}", page, e);
                    Ok(String::new())
                }
            },
        }
    }
}
