//! OCR backend: recognizes text in the images embedded in each page.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError, TryLockError};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::{PdfConfig, StatementConfig};
use crate::models::statement::BackendKind;
use crate::pdf::{Document, ExtractionAttempt, TextBackend, load_document, page_image};

/// Contrast boost applied after grayscale conversion.
const CONTRAST_BOOST: f32 = 20.0;

/// A recognized text region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],
    pub text: String,
    pub confidence: f32,
}

impl TextBox {
    /// Axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Result of recognizing one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    pub boxes: Vec<TextBox>,
    /// Box texts joined with newlines, in reading order.
    pub text: String,
    pub processing_time_ms: u64,
    /// Image dimensions (width, height).
    pub image_size: (u32, u32),
}

impl OcrResult {
    pub fn new(boxes: Vec<TextBox>, processing_time_ms: u64, image_size: (u32, u32)) -> Self {
        let mut result = Self {
            boxes,
            text: String::new(),
            processing_time_ms,
            image_size,
        };
        result.sort_by_reading_order();
        result
    }

    /// Sort boxes top-to-bottom, then left-to-right within 20px rows, and
    /// rebuild `text`.
    pub fn sort_by_reading_order(&mut self) {
        self.boxes.sort_by(|a, b| {
            let (ax, ay, _, _) = a.rect();
            let (bx, by, _, _) = b.rect();
            let row_a = (ay / 20.0) as i32;
            let row_b = (by / 20.0) as i32;
            row_a
                .cmp(&row_b)
                .then_with(|| ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
        });

        self.text = self
            .boxes
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
    }
}

/// A loaded recognition model.
pub trait RecognitionEngine: Send {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError>;
}

/// Fixed set of engines shared by concurrent OCR calls.
///
/// A call takes the first idle engine, or waits on one picked round-robin
/// when all are busy.
pub struct EnginePool {
    engines: Vec<Mutex<Box<dyn RecognitionEngine>>>,
    next: AtomicUsize,
}

impl EnginePool {
    pub fn new(engines: Vec<Box<dyn RecognitionEngine>>) -> Result<Self, OcrError> {
        if engines.is_empty() {
            return Err(OcrError::Unavailable("engine pool is empty".to_string()));
        }
        Ok(Self {
            engines: engines.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.engines.len()
    }

    pub fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        for slot in &self.engines {
            match slot.try_lock() {
                Ok(engine) => return engine.recognize(image),
                Err(TryLockError::Poisoned(poisoned)) => return poisoned.into_inner().recognize(image),
                Err(TryLockError::WouldBlock) => continue,
            }
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.engines.len();
        debug!("All OCR engines busy, waiting on engine {}", index);
        let engine = self.engines[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        engine.recognize(image)
    }
}

/// Builds one engine for the pool.
pub type EngineLoader = Box<dyn Fn() -> Result<Box<dyn RecognitionEngine>, OcrError> + Send + Sync>;

/// The OCR text backend.
///
/// Engines load on first use. A load failure is remembered and every
/// later call reports an empty attempt without retrying.
pub struct OcrBackend {
    loader: EngineLoader,
    workers: usize,
    pdf: PdfConfig,
    pool: OnceLock<Result<EnginePool, String>>,
}

impl OcrBackend {
    pub fn with_loader(workers: usize, pdf: PdfConfig, loader: EngineLoader) -> Self {
        Self {
            loader,
            workers: workers.max(1),
            pdf,
            pool: OnceLock::new(),
        }
    }

    /// Backend loading `pure-onnx-ocr` engines from `ocr.model_dir`.
    pub fn from_config(config: &StatementConfig) -> Self {
        #[cfg(feature = "native")]
        let loader: EngineLoader = {
            let ocr = config.ocr.clone();
            Box::new(move || {
                PureOcrEngine::from_config(&ocr).map(|engine| Box::new(engine) as Box<dyn RecognitionEngine>)
            })
        };

        #[cfg(not(feature = "native"))]
        let loader: EngineLoader = Box::new(|| {
            Err(OcrError::Unavailable("built without the `native` feature".to_string()))
        });

        Self::with_loader(config.ocr.workers, config.pdf.clone(), loader)
    }

    fn pool(&self) -> Result<&EnginePool, &str> {
        self.pool
            .get_or_init(|| {
                let engines = (0..self.workers)
                    .map(|_| (self.loader)())
                    .collect::<Result<Vec<_>, _>>()
                    .and_then(EnginePool::new)
                    .map_err(|e| e.to_string())?;
                info!("Loaded {} OCR engines", engines.size());
                Ok(engines)
            })
            .as_ref()
            .map_err(String::as_str)
    }

    fn read(&self, document: &Document, pool: &EnginePool) -> Result<ExtractionAttempt, OcrError> {
        let (doc, _) = load_document(document.bytes()).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(OcrError::InvalidImage("document has no pages".to_string()));
        }

        let mut texts = Vec::new();
        for &number in pages.keys().take(self.pdf.limit(pages.len())) {
            let image = match page_image(&doc, number) {
                Ok(image) => preprocess(&image),
                Err(e) => {
                    debug!("Page {}: {}", number, e);
                    continue;
                }
            };
            match pool.recognize(&image) {
                Ok(result) => {
                    debug!(
                        "Page {}: {} text boxes in {}ms",
                        number,
                        result.boxes.len(),
                        result.processing_time_ms
                    );
                    texts.push(result.text);
                }
                Err(e) => warn!("Page {}: recognition failed: {}", number, e),
            }
        }

        Ok(ExtractionAttempt::from_text(
            BackendKind::Ocr,
            &texts.join("\n\n"),
            pages.len(),
            document.len(),
        ))
    }
}

impl TextBackend for OcrBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ocr
    }

    fn extract(&self, document: &Document) -> ExtractionAttempt {
        let pool = match self.pool() {
            Ok(pool) => pool,
            Err(reason) => {
                warn!("OCR unavailable for {}: {}", document.filename, reason);
                return ExtractionAttempt::failed(self.kind(), document.len());
            }
        };

        match self.read(document, pool) {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!("OCR could not read {}: {}", document.filename, e);
                ExtractionAttempt::failed(self.kind(), document.len())
            }
        }
    }
}

/// Grayscale plus a contrast boost.
fn preprocess(image: &DynamicImage) -> DynamicImage {
    let enhanced = image.grayscale().adjust_contrast(CONTRAST_BOOST);
    DynamicImage::ImageRgb8(enhanced.to_rgb8())
}
