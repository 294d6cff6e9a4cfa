//! Multi-frame TIFF conversion.
//!
//! Every frame of the image is decoded and re-encoded as its own PNG entry.
//! A frame that cannot be decoded produces an empty-content notification and
//! a failure reason naming the frame; the remaining frames are still
//! converted.

use super::{ConversionStrategy, PipelineContext, ERROR_IN_TIFF_TO_PNG_CONVERSION};
use crate::formats::OUTPUT_EXTENSION;
use crate::notify::NotificationEvent;
use image::DynamicImage;
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

pub struct TiffStrategy;

/// Decode every frame up front so notifications can carry the real frame
/// count. A mid-stream decoder error ends the walk; frames already decoded
/// are kept.
fn decode_frames(content: &[u8]) -> Result<Vec<Result<DynamicImage, String>>, String> {
    let mut decoder = Decoder::new(Cursor::new(content)).map_err(|e| e.to_string())?;
    let mut frames = Vec::new();

    loop {
        frames.push(decode_current_frame(&mut decoder));

        if !decoder.more_images() {
            break;
        }
        if let Err(error) = decoder.next_image() {
            frames.push(Err(error.to_string()));
            break;
        }
    }

    Ok(frames)
}

fn decode_current_frame(decoder: &mut Decoder<Cursor<&[u8]>>) -> Result<DynamicImage, String> {
    let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
    let color_type = decoder.colortype().map_err(|e| e.to_string())?;
    let result = decoder.read_image().map_err(|e| e.to_string())?;

    let image = match (color_type, result) {
        (ColorType::Gray(8), DecodingResult::U8(data)) => {
            image::GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        (ColorType::GrayA(8), DecodingResult::U8(data)) => {
            image::GrayAlphaImage::from_raw(width, height, data).map(DynamicImage::ImageLumaA8)
        }
        (ColorType::RGB(8), DecodingResult::U8(data)) => {
            image::RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        }
        (ColorType::RGBA(8), DecodingResult::U8(data)) => {
            image::RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8)
        }
        (ColorType::Gray(16), DecodingResult::U16(data)) => {
            image::ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLuma16)
        }
        (ColorType::RGB(16), DecodingResult::U16(data)) => {
            image::ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgb16)
        }
        (other, _) => return Err(format!("unsupported TIFF color type {:?}", other)),
    };

    image.ok_or_else(|| "frame buffer size mismatch".to_string())
}

impl ConversionStrategy for TiffStrategy {
    fn name(&self) -> &'static str {
        "tiff-to-png"
    }

    fn extract(&self, content: &[u8], event: &NotificationEvent, ctx: &PipelineContext) {
        let Some(mut job) = ctx.store.find_by_id(event.job_id) else {
            tracing::error!(job_id = %event.job_id, "job record vanished before conversion");
            return;
        };
        let destination = job.notify_destination.clone();

        let frames = match decode_frames(content) {
            Ok(frames) => frames,
            Err(error) => {
                tracing::warn!(job_id = %event.job_id, document = %event.document_path, %error, "tiff decoding failed");
                job.add_failure_reason(
                    ERROR_IN_TIFF_TO_PNG_CONVERSION,
                    format!("{}: {}", event.document_path, error),
                );
                ctx.sink.notify(destination.as_deref(), &event.with_empty_page(0, 0));
                if !ctx.store.update(job) {
                    tracing::error!(job_id = %event.job_id, "failed to persist conversion result, job missing");
                }
                return;
            }
        };

        let page_count = frames.len();
        for (index, frame) in frames.into_iter().enumerate() {
            let converted = frame.and_then(|image| {
                super::encode_png(&image)
                    .map(|png| (image.width(), image.height(), png))
                    .map_err(|e| e.to_string())
            });
            match converted {
                Ok((width, height, png)) => {
                    let entry_name = format!("{}_{}.{}", event.document_name, index, OUTPUT_EXTENSION);
                    job.add_extracted_entry(entry_name.clone(), png.clone());
                    ctx.sink.notify(
                        destination.as_deref(),
                        &event.with_page(index, page_count, entry_name, width, height, &png),
                    );
                }
                Err(error) => {
                    tracing::warn!(job_id = %event.job_id, document = %event.document_path, frame = index, %error, "tiff frame conversion failed");
                    job.add_failure_reason(
                        ERROR_IN_TIFF_TO_PNG_CONVERSION,
                        format!("{} frame {}: {}", event.document_path, index, error),
                    );
                    ctx.sink
                        .notify(destination.as_deref(), &event.with_empty_page(index, page_count));
                }
            }
        }

        if !ctx.store.update(job) {
            tracing::error!(job_id = %event.job_id, "failed to persist conversion result, job missing");
        }
    }
}
