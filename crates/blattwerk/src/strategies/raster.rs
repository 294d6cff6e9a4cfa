//! Single-frame raster conversion (JPG, PNG).
//!
//! Decodes the document with `image` and re-encodes it as canonical PNG so
//! that every job entry carries the same format, including inputs that were
//! already PNG.

use super::{ConversionStrategy, PipelineContext, ERROR_IN_JPG_TO_PNG_CONVERSION, ERROR_IN_PNG_TO_PNG_CONVERSION};
use crate::formats::OUTPUT_EXTENSION;
use crate::notify::NotificationEvent;
use image::ImageFormat;

pub struct RasterStrategy {
    name: &'static str,
    format: ImageFormat,
    failure_key: &'static str,
}

impl RasterStrategy {
    pub fn jpg() -> Self {
        Self {
            name: "jpg-to-png",
            format: ImageFormat::Jpeg,
            failure_key: ERROR_IN_JPG_TO_PNG_CONVERSION,
        }
    }

    pub fn png() -> Self {
        Self {
            name: "png-to-png",
            format: ImageFormat::Png,
            failure_key: ERROR_IN_PNG_TO_PNG_CONVERSION,
        }
    }

    fn convert(&self, content: &[u8]) -> Result<(Vec<u8>, u32, u32), image::ImageError> {
        let decoded = image::load_from_memory_with_format(content, self.format)?;
        let png = super::encode_png(&decoded)?;
        Ok((png, decoded.width(), decoded.height()))
    }
}

impl ConversionStrategy for RasterStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, content: &[u8], event: &NotificationEvent, ctx: &PipelineContext) {
        let Some(mut job) = ctx.store.find_by_id(event.job_id) else {
            tracing::error!(job_id = %event.job_id, "job record vanished before conversion");
            return;
        };
        let destination = job.notify_destination.clone();

        match self.convert(content) {
            Ok((png, width, height)) => {
                let entry_name = format!("{}.{}", event.document_name, OUTPUT_EXTENSION);
                job.add_extracted_entry(entry_name.clone(), png.clone());
                ctx.sink
                    .notify(destination.as_deref(), &event.with_page(0, 1, entry_name, width, height, &png));
            }
            Err(error) => {
                tracing::warn!(job_id = %event.job_id, document = %event.document_path, %error, "raster conversion failed");
                job.add_failure_reason(self.failure_key, format!("{}: {}", event.document_path, error));
                ctx.sink.notify(destination.as_deref(), &event.with_empty_page(0, 1));
            }
        }

        if !ctx.store.update(job) {
            tracing::error!(job_id = %event.job_id, "failed to persist conversion result, job missing");
        }
    }
}
