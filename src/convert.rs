//! Conversion pipeline: PDF bytes in, package bytes out.
//!
//! One conversion is a pure function over its input buffer. Batch conversion
//! fans independent documents out over a bounded worker pool; nothing is
//! shared between conversions except the read-only font registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::builder::DocumentBuilder;
use crate::detect::ensure_pdf;
use crate::error::{Error, Result};
use crate::layout::{analyze_page, LayoutThresholds};
use crate::model::{Metadata, Primitive, Warning};
use crate::object::ObjectParser;
use crate::package::write_package;
use crate::style::StyleMapper;

/// Resource ceilings enforced during conversion. Exceeding any of them
/// aborts with [`Error::ResourceExceeded`].
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum input size in bytes.
    pub max_input_bytes: usize,
    /// Maximum page count.
    pub max_pages: u32,
    /// Maximum size of a single embedded image, in bytes.
    pub max_image_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_bytes: 256 * 1024 * 1024,
            max_pages: 5_000,
            max_image_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Cooperative cancellation handle. Clone it, hand one copy to the
/// conversion, and trip it from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Conversion options.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    password: Option<String>,
    limits: Limits,
    thresholds: LayoutThresholds,
    cancel: CancelToken,
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credential for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Layout heuristics tuning.
    pub fn with_thresholds(mut self, thresholds: LayoutThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Token checked between pipeline steps; tripping it makes the
    /// conversion return [`Error::Cancelled`].
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A successful conversion: the finished package plus everything that went
/// sideways on the way there.
#[derive(Debug)]
pub struct Conversion {
    /// Complete output archive bytes.
    pub package: Vec<u8>,
    /// Non-fatal findings, ordered by occurrence.
    pub warnings: Vec<Warning>,
    pub metadata: Metadata,
}

/// Reusable conversion handle carrying a fixed option set.
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn convert(&self, data: &[u8]) -> Result<Conversion> {
        convert_bytes(data, &self.options)
    }

    /// Convert many documents with this converter's options; see
    /// [`convert_batch`].
    pub fn convert_all(&self, inputs: &[Vec<u8>], threads: usize) -> Vec<Result<Conversion>> {
        convert_batch(inputs, &self.options, threads)
    }
}

/// Convert a single PDF byte buffer into a package byte buffer.
pub fn convert_bytes(data: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    if data.len() > options.limits.max_input_bytes {
        return Err(Error::ResourceExceeded(format!(
            "input is {} bytes, limit is {}",
            data.len(),
            options.limits.max_input_bytes
        )));
    }
    ensure_pdf(data)?;
    options.cancel.check()?;

    let mut warnings = Vec::new();
    let parser = ObjectParser::load(data, options.password.as_deref(), &mut warnings)?;
    let page_count = parser.page_count();
    if page_count > options.limits.max_pages {
        return Err(Error::ResourceExceeded(format!(
            "{} pages, limit is {}",
            page_count, options.limits.max_pages
        )));
    }
    let metadata = parser.metadata();
    debug!("loaded document: {} pages, v{}", page_count, metadata.pdf_version);

    // Pages are parsed, analyzed, and dropped one at a time; only the block
    // tree of each page survives, so peak memory does not grow with raster
    // content across pages.
    let mut mapper = StyleMapper::new();
    let mut builder = DocumentBuilder::new(options.thresholds.clone());
    for index in 0..page_count as usize {
        options.cancel.check()?;
        let page = parser.parse_page(index, &mut warnings)?;
        for primitive in &page.primitives {
            if let Primitive::Image(image) = primitive {
                if image.data.len() > options.limits.max_image_bytes {
                    return Err(Error::ResourceExceeded(format!(
                        "image of {} bytes on page {}, limit is {}",
                        image.data.len(),
                        page.number,
                        options.limits.max_image_bytes
                    )));
                }
            }
        }
        let before = warnings.len();
        let analyzed = analyze_page(&page, &options.thresholds, &mut mapper, &mut warnings);
        for warning in warnings.iter_mut().skip(before) {
            if warning.page.is_none() {
                warning.page = Some(page.number);
            }
        }
        builder.push_page(analyzed);
    }

    options.cancel.check()?;
    let document = builder.finish(metadata.clone());
    let package = write_package(&document)?;
    info!(
        "converted {} pages into {} bytes, {} warnings",
        page_count,
        package.len(),
        warnings.len()
    );
    Ok(Conversion {
        package,
        warnings,
        metadata,
    })
}

/// Convert several independent documents in parallel.
///
/// Results come back in input order, one per input, each succeeding or
/// failing on its own. `threads` bounds peak memory; zero means one worker
/// per available core.
pub fn convert_batch(
    inputs: &[Vec<u8>],
    options: &ConvertOptions,
    threads: usize,
) -> Vec<Result<Conversion>> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build();
    let pool = match pool {
        Ok(pool) => pool,
        Err(err) => {
            debug!("worker pool unavailable ({}), converting sequentially", err);
            return inputs
                .iter()
                .map(|data| convert_bytes(data, options))
                .collect();
        }
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    pool.scope(|scope| {
        for (index, data) in inputs.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = convert_bytes(data, options);
                // The receiver outlives the scope.
                let _ = tx.send((index, result));
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<Result<Conversion>>> = Vec::new();
    slots.resize_with(inputs.len(), || None);
    for (index, result) in rx {
        slots[index] = Some(result);
    }
    slots
        .into_iter()
        .map(|slot| slot.unwrap_or(Err(Error::Cancelled)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>\nendobj\n\
4 0 obj\n<< /Length 42 >>\nstream\nBT /F1 12 Tf 72 700 Td (Hello world) Tj ET\nendstream\nendobj\n\
trailer\n<< /Root 1 0 R >>\n"
            .to_vec()
    }

    #[test]
    fn test_convert_minimal_document() {
        let result = convert_bytes(&minimal_pdf(), &ConvertOptions::new()).unwrap();
        assert!(!result.package.is_empty());
        // Zip local file header magic.
        assert_eq!(&result.package[..2], b"PK");
        assert_eq!(result.metadata.page_count, 1);
    }

    #[test]
    fn test_input_size_limit() {
        let options = ConvertOptions::new().with_limits(Limits {
            max_input_bytes: 16,
            ..Default::default()
        });
        let err = convert_bytes(&minimal_pdf(), &options).unwrap_err();
        assert!(matches!(err, Error::ResourceExceeded(_)));
    }

    #[test]
    fn test_page_limit() {
        let options = ConvertOptions::new().with_limits(Limits {
            max_pages: 0,
            ..Default::default()
        });
        let err = convert_bytes(&minimal_pdf(), &options).unwrap_err();
        assert!(matches!(err, Error::ResourceExceeded(_)));
    }

    #[test]
    fn test_not_a_pdf() {
        let err = convert_bytes(b"not a document at all", &ConvertOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }

    #[test]
    fn test_pre_cancelled_conversion() {
        let token = CancelToken::new();
        token.cancel();
        let options = ConvertOptions::new().with_cancel(token);
        let err = convert_bytes(&minimal_pdf(), &options).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_batch_preserves_input_order() {
        let inputs = vec![minimal_pdf(), b"garbage".to_vec(), minimal_pdf()];
        let results = convert_batch(&inputs, &ConvertOptions::new(), 2);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_style_warnings_carry_page_numbers() {
        // An unresolvable font family triggers a substitution warning during
        // style mapping; it must be stamped with the page it came from.
        let pdf = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>\nendobj\n\
4 0 obj\n<< /Length 42 >>\nstream\nBT /F1 12 Tf 72 700 Td (Hello world) Tj ET\nendstream\nendobj\n\
5 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /NoSuchFaceXYZ >>\nendobj\n\
trailer\n<< /Root 1 0 R >>\n";
        let result = convert_bytes(pdf, &ConvertOptions::new()).unwrap();
        let substituted = result
            .warnings
            .iter()
            .find(|w| w.kind == crate::model::WarningKind::FontSubstituted)
            .expect("font substitution warning");
        assert_eq!(substituted.page, Some(1));
    }

    #[test]
    fn test_converter_handle_reuse() {
        let converter = Converter::new(ConvertOptions::new());
        assert!(converter.convert(&minimal_pdf()).is_ok());
        let results = converter.convert_all(&[minimal_pdf(), minimal_pdf()], 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_deterministic_output() {
        let a = convert_bytes(&minimal_pdf(), &ConvertOptions::new()).unwrap();
        let b = convert_bytes(&minimal_pdf(), &ConvertOptions::new()).unwrap();
        assert_eq!(a.package, b.package);
    }
}
