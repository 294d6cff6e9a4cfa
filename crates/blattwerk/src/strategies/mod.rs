//! Conversion strategy registry.
//!
//! Every supported leaf document type maps to one [`ConversionStrategy`].
//! A strategy re-reads its job from the store at the start of the call,
//! converts the document into zero or more PNG entries, emits one
//! notification per page, and persists the accumulated entries with a single
//! store update at the end. All conversion failures are absorbed as failure
//! reasons on the job; nothing here returns an error to the orchestrator.

mod raster;
#[cfg(feature = "pdf")]
mod pdf;
mod tiff;

pub use raster::RasterStrategy;
#[cfg(feature = "pdf")]
pub use pdf::PdfStrategy;
pub use tiff::TiffStrategy;

use crate::formats::FileType;
use crate::notify::{NotificationEvent, SharedSink};
use crate::store::JobStore;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

pub const ERROR_IN_JPG_TO_PNG_CONVERSION: &str = "ERROR_IN_JPG_TO_PNG_CONVERSION";
pub const ERROR_IN_PNG_TO_PNG_CONVERSION: &str = "ERROR_IN_PNG_TO_PNG_CONVERSION";
pub const ERROR_IN_TIFF_TO_PNG_CONVERSION: &str = "ERROR_IN_TIFF_TO_PNG_CONVERSION";
pub const ERROR_IN_PDF_TO_PNG_CONVERSION: &str = "ERROR_IN_PDF_TO_PNG_CONVERSION";
pub const ERROR_UNSUPPORTED_FILE_TYPE: &str = "UNSUPPORTED_FILE_TYPE";

/// Shared collaborators handed to every strategy call.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<JobStore>,
    pub sink: SharedSink,
}

/// One leaf-document conversion.
///
/// `event` carries the document-level fields (job id, document name and
/// path, position within the job); the strategy derives per-page events
/// from it.
pub trait ConversionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, content: &[u8], event: &NotificationEvent, ctx: &PipelineContext);
}

static REGISTRY: Lazy<HashMap<FileType, Arc<dyn ConversionStrategy>>> = Lazy::new(|| {
    let mut registry: HashMap<FileType, Arc<dyn ConversionStrategy>> = HashMap::new();
    registry.insert(FileType::Jpg, Arc::new(RasterStrategy::jpg()));
    registry.insert(FileType::Png, Arc::new(RasterStrategy::png()));
    registry.insert(FileType::Tiff, Arc::new(TiffStrategy));
    #[cfg(feature = "pdf")]
    registry.insert(FileType::Pdf, Arc::new(PdfStrategy));
    registry
});

/// Resolve the strategy registered for a document type, if any.
pub fn strategy_for(file_type: FileType) -> Option<Arc<dyn ConversionStrategy>> {
    REGISTRY.get(&file_type).cloned()
}

/// Encode a decoded raster image as canonical PNG bytes.
pub(crate) fn encode_png(image: &image::DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_document_types() {
        assert!(strategy_for(FileType::Jpg).is_some());
        assert!(strategy_for(FileType::Png).is_some());
        assert!(strategy_for(FileType::Tiff).is_some());
        assert!(strategy_for(FileType::Zip).is_none());
        assert!(strategy_for(FileType::Gzip).is_none());
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_registry_includes_pdf() {
        assert!(strategy_for(FileType::Pdf).is_some());
    }

    #[test]
    fn test_encode_png_roundtrip() {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30])));
        let bytes = encode_png(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
    }
}
