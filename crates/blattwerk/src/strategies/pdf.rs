//! PDF page rendering via Pdfium.
//!
//! Every page is rasterized at a fixed 200 DPI and stored as one PNG entry.
//! A page that fails to render produces an empty-content notification and a
//! per-page failure reason; remaining pages are still rendered. A document
//! that cannot be opened (or a missing Pdfium library) yields a single
//! document-level failure reason and no entries.

use super::{ConversionStrategy, PipelineContext, ERROR_IN_PDF_TO_PNG_CONVERSION};
use crate::formats::{OUTPUT_EXTENSION, RENDER_DPI};
use crate::notify::NotificationEvent;
use image::DynamicImage;
use pdfium_render::prelude::*;

const PDF_POINTS_PER_INCH: f32 = 72.0;

pub struct PdfStrategy;

fn render_page(document: &PdfDocument, page_index: u16) -> Result<DynamicImage, String> {
    let page = document
        .pages()
        .get(page_index)
        .map_err(|e| format!("page {} not found: {}", page_index, e))?;

    let scale = RENDER_DPI as f32 / PDF_POINTS_PER_INCH;
    let config = PdfRenderConfig::new()
        .set_target_width(((page.width().value * scale) as i32).max(1))
        .set_target_height(((page.height().value * scale) as i32).max(1))
        .rotate_if_landscape(PdfPageRenderRotation::None, false);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| format!("failed to render page {}: {}", page_index, e))?;

    Ok(DynamicImage::ImageRgb8(bitmap.as_image().into_rgb8()))
}

impl ConversionStrategy for PdfStrategy {
    fn name(&self) -> &'static str {
        "pdf-to-png"
    }

    fn extract(&self, content: &[u8], event: &NotificationEvent, ctx: &PipelineContext) {
        let Some(mut job) = ctx.store.find_by_id(event.job_id) else {
            tracing::error!(job_id = %event.job_id, "job record vanished before conversion");
            return;
        };
        let destination = job.notify_destination.clone();

        let fail_document = |job: &mut crate::types::Job, error: String| {
            tracing::warn!(job_id = %event.job_id, document = %event.document_path, %error, "pdf rendering failed");
            job.add_failure_reason(
                ERROR_IN_PDF_TO_PNG_CONVERSION,
                format!("{}: {}", event.document_path, error),
            );
            ctx.sink.notify(destination.as_deref(), &event.with_empty_page(0, 0));
        };

        match Pdfium::bind_to_system_library() {
            Ok(bindings) => {
                let pdfium = Pdfium::new(bindings);
                let loaded = pdfium.load_pdf_from_byte_slice(content, None);
                match loaded {
                    Ok(document) => {
                        let page_count = document.pages().len() as usize;
                        for index in 0..page_count {
                            match render_page(&document, index as u16)
                                .and_then(|image| super::encode_png(&image).map(|png| (image, png)).map_err(|e| e.to_string()))
                            {
                                Ok((image, png)) => {
                                    let entry_name = format!("{}_{}.{}", event.document_name, index, OUTPUT_EXTENSION);
                                    job.add_extracted_entry(entry_name.clone(), png.clone());
                                    ctx.sink.notify(
                                        destination.as_deref(),
                                        &event.with_page(index, page_count, entry_name, image.width(), image.height(), &png),
                                    );
                                }
                                Err(error) => {
                                    tracing::warn!(job_id = %event.job_id, document = %event.document_path, page = index, %error, "pdf page rendering failed");
                                    job.add_failure_reason(
                                        ERROR_IN_PDF_TO_PNG_CONVERSION,
                                        format!("{} page {}: {}", event.document_path, index, error),
                                    );
                                    ctx.sink
                                        .notify(destination.as_deref(), &event.with_empty_page(index, page_count));
                                }
                            }
                        }
                    }
                    Err(error) => fail_document(&mut job, error.to_string()),
                }
            }
            Err(error) => fail_document(&mut job, format!("pdfium unavailable: {}", error)),
        }

        if !ctx.store.update(job) {
            tracing::error!(job_id = %event.job_id, "failed to persist conversion result, job missing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemorySink;
    use crate::store::JobStore;
    use crate::types::Job;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_garbage_pdf_records_failure_without_entries() {
        let sink = Arc::new(MemorySink::new());
        let ctx = PipelineContext {
            store: Arc::new(JobStore::new()),
            sink: sink.clone(),
        };
        let id = Uuid::new_v4();
        assert!(ctx.store.insert(Job::new(id)));
        let event = NotificationEvent::for_document(id, "broken", "broken.pdf", 0, 1, serde_json::Value::Null);

        // Fails on the binding path or the document-load path; either way the
        // job records one failure reason and no entries.
        PdfStrategy.extract(b"%PDF- this is not a real document", &event, &ctx);

        let job = ctx.store.find_by_id(id).unwrap();
        assert!(job.extracted_entries().is_empty());
        let reason = job.failure_reasons().get(ERROR_IN_PDF_TO_PNG_CONVERSION).unwrap();
        assert!(reason.contains("broken.pdf"));
        assert_eq!(sink.len(), 1);
        assert!(sink.events()[0].1.page_content.is_empty());
    }
}
