//! End-to-end pipeline tests through the public service API.

use blattwerk::strategies::{ERROR_IN_TIFF_TO_PNG_CONVERSION, ERROR_UNSUPPORTED_FILE_TYPE};
use blattwerk::{
    ExtractionService, FileType, JobStatus, MemorySink, RequestContent, ServiceConfig,
};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::ZipWriter;

fn service_with_sink() -> (Arc<ExtractionService>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let config = ServiceConfig {
        workers: 4,
        queue_capacity: 16,
    };
    (Arc::new(ExtractionService::new(&config, sink.clone())), sink)
}

fn png_bytes(shade: u8) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 4, image::Rgb([shade, shade, shade])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        for (name, data) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

fn build_tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar_bytes = Cursor::new(Vec::new());
    {
        let mut tar = tar::Builder::new(&mut tar_bytes);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(data.len() as u64);
            header.set_cksum();
            tar.append(&header, *data).unwrap();
        }
        tar.finish().unwrap();
    }

    let mut gz = Vec::new();
    {
        let mut encoder = flate2::write::GzEncoder::new(&mut gz, flate2::Compression::default());
        encoder.write_all(&tar_bytes.into_inner()).unwrap();
        encoder.finish().unwrap();
    }
    gz
}

async fn run_job(service: &ExtractionService, file_type: FileType, payload: Vec<u8>) -> blattwerk::Job {
    let job = service.prepare(None, None).unwrap();
    service
        .submit(job.id(), RequestContent::new(file_type, payload))
        .await
        .unwrap();
    wait_for_terminal(service, job.id()).await
}

async fn wait_for_terminal(service: &ExtractionService, job_id: Uuid) -> blattwerk::Job {
    for _ in 0..400 {
        if let Some(job) = service.retrieve(job_id) {
            if job.status != JobStatus::InProgress {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {} did not reach a terminal state in time", job_id);
}

#[tokio::test]
async fn test_nested_archive_keeps_first_three_levels() {
    let (service, _sink) = service_with_sink();

    let level4 = build_zip(&[("deepest.png", &png_bytes(40))]);
    let level3 = build_zip(&[("l3.png", &png_bytes(30)), ("level4.zip", &level4)]);
    let level2 = build_zip(&[("l2.png", &png_bytes(20)), ("level3.zip", &level3)]);
    let level1 = build_zip(&[("l1.png", &png_bytes(10)), ("level2.zip", &level2)]);

    let job = run_job(&service, FileType::Zip, level1).await;

    assert_eq!(job.status, JobStatus::Done);
    let entries = job.extracted_entries();
    assert_eq!(entries.len(), 3);
    assert!(entries.contains_key("l1_png.png"));
    assert!(entries.contains_key("level2_zip_l2_png.png"));
    assert!(entries.contains_key("level2_zip_level3_zip_l3_png.png"));
    assert!(!entries.keys().any(|k| k.contains("deepest")));
}

#[tokio::test]
async fn test_multi_entry_aggregate_is_exact_zip() {
    let (service, _sink) = service_with_sink();
    let payload = build_zip(&[
        ("a.png", &png_bytes(1)),
        ("b.png", &png_bytes(2)),
        ("c.png", &png_bytes(3)),
    ]);

    let job = run_job(&service, FileType::Zip, payload).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.response_type.as_deref(), Some("application/zip"));

    let bundle = job.aggregated_result.clone().unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(bundle)).unwrap();
    assert_eq!(zip.len(), 3);
    for index in 0..zip.len() {
        let mut file = zip.by_index(index).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        assert_eq!(&bytes, &job.extracted_entries()[file.name()]);
    }
}

#[tokio::test]
async fn test_single_entry_passes_through_unwrapped() {
    let (service, _sink) = service_with_sink();
    let png = png_bytes(128);

    let job = run_job(&service, FileType::Png, png).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.response_type.as_deref(), Some("image/png"));
    let result = job.aggregated_result.clone().unwrap();
    assert_eq!(&result, &job.extracted_entries()["document.png"]);

    let reloaded = image::load_from_memory(&result).unwrap();
    assert_eq!(reloaded.width(), 4);
}

#[tokio::test]
async fn test_tar_gz_round_trip() {
    let (service, _sink) = service_with_sink();
    let payload = build_tar_gz(&[("scans/first.png", &png_bytes(5)), ("scans/second.png", &png_bytes(6))]);

    let job = run_job(&service, FileType::Gzip, payload).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.extracted_entries().len(), 2);
    assert!(job.extracted_entries().contains_key("scans_first_png.png"));
}

#[tokio::test]
async fn test_corrupt_document_never_sinks_the_job() {
    let (service, _sink) = service_with_sink();
    let payload = build_zip(&[("good.png", &png_bytes(77)), ("broken.tiff", b"not really a tiff")]);

    let job = run_job(&service, FileType::Zip, payload).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.extracted_entries().len(), 1);
    assert!(job.extracted_entries().contains_key("good_png.png"));
    assert_eq!(job.failure_reasons().len(), 1);
    let reason = job.failure_reasons().get(ERROR_IN_TIFF_TO_PNG_CONVERSION).unwrap();
    assert!(reason.contains("broken.tiff"));
}

#[tokio::test]
async fn test_partial_frame_failure_keeps_surviving_entries() {
    let (service, sink) = service_with_sink();

    // Frame 1 uses a color layout the converter does not handle; frames 0
    // and 2 convert normally.
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = tiff::encoder::TiffEncoder::new(&mut cursor).unwrap();
        let rgb = vec![100u8; 2 * 2 * 3];
        encoder
            .write_image::<tiff::encoder::colortype::RGB8>(2, 2, &rgb)
            .unwrap();
        let rgba16 = vec![1000u16; 2 * 2 * 4];
        encoder
            .write_image::<tiff::encoder::colortype::RGBA16>(2, 2, &rgba16)
            .unwrap();
        encoder
            .write_image::<tiff::encoder::colortype::RGB8>(2, 2, &rgb)
            .unwrap();
    }

    let job = run_job(&service, FileType::Tiff, cursor.into_inner()).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.extracted_entries().len(), 2);
    assert!(job.extracted_entries().contains_key("document_0.png"));
    assert!(job.extracted_entries().contains_key("document_2.png"));

    assert_eq!(job.failure_reasons().len(), 1);
    let reason = job.failure_reasons().get(ERROR_IN_TIFF_TO_PNG_CONVERSION).unwrap();
    assert!(reason.contains("frame 1"));

    // The failed frame still produced an empty-content notification.
    assert!(sink
        .events()
        .iter()
        .any(|(_, event)| event.page_index == 1 && event.page_content.is_empty()));
}

#[tokio::test]
async fn test_unknown_entry_notified_and_skipped() {
    let (service, sink) = service_with_sink();
    let payload = build_zip(&[("mystery.xyz", b"???"), ("ok.png", &png_bytes(9))]);

    let job = run_job(&service, FileType::Zip, payload).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.extracted_entries().len(), 1);
    let reason = job.failure_reasons().get(ERROR_UNSUPPORTED_FILE_TYPE).unwrap();
    assert!(reason.contains("mystery.xyz"));

    // The skipped entry still produced a (empty-content) notification.
    let events = sink.events();
    assert!(events
        .iter()
        .any(|(_, event)| event.document_path == "mystery.xyz" && event.page_content.is_empty()));
}

#[tokio::test]
async fn test_page_notifications_ascend_within_a_document() {
    let (service, sink) = service_with_sink();

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = tiff::encoder::TiffEncoder::new(&mut cursor).unwrap();
        for n in 0..3u8 {
            let pixels = vec![n * 10; 2 * 2 * 3];
            encoder
                .write_image::<tiff::encoder::colortype::RGB8>(2, 2, &pixels)
                .unwrap();
        }
    }

    let job = run_job(&service, FileType::Tiff, cursor.into_inner()).await;
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.extracted_entries().len(), 3);

    let indices: Vec<usize> = sink
        .events()
        .iter()
        .filter(|(_, event)| event.job_id == job.id())
        .map(|(_, event)| event.page_index)
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_meta_info_travels_with_notifications() {
    let (service, sink) = service_with_sink();
    let job = service.prepare(Some("{\"source\": \"scanner-2\"}"), Some("queue://done".into())).unwrap();
    service
        .submit(job.id(), RequestContent::new(FileType::Png, png_bytes(50)))
        .await
        .unwrap();
    wait_for_terminal(&service, job.id()).await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    let (destination, event) = &events[0];
    assert_eq!(destination.as_deref(), Some("queue://done"));
    assert_eq!(event.meta["source"], "scanner-2");
}

#[tokio::test]
async fn test_many_parallel_jobs_stay_isolated() {
    let (service, _sink) = service_with_sink();

    let mut expectations = Vec::new();
    for n in 1..=8usize {
        let entries: Vec<(String, Vec<u8>)> = (0..n).map(|i| (format!("p{}.png", i), png_bytes(i as u8))).collect();
        let refs: Vec<(&str, &[u8])> = entries.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
        let payload = build_zip(&refs);

        let job = service.prepare(None, None).unwrap();
        service
            .submit(job.id(), RequestContent::new(FileType::Zip, payload))
            .await
            .unwrap();
        expectations.push((job.id(), n));
    }

    for (job_id, expected) in expectations {
        let job = wait_for_terminal(&service, job_id).await;
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.extracted_entries().len(), expected);
    }
}

#[cfg(feature = "pdf")]
#[tokio::test]
async fn test_garbage_pdf_finishes_done_with_failure_reason() {
    let (service, _sink) = service_with_sink();

    let job = run_job(&service, FileType::Pdf, b"%PDF-1.4 garbage".to_vec()).await;

    // Corrupt documents never sink the job, whether pdfium is installed or not.
    assert_eq!(job.status, JobStatus::Done);
    assert!(job.extracted_entries().is_empty());
    assert!(job.aggregated_result.is_none());
    assert_eq!(job.failure_reasons().len(), 1);
}
