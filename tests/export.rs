mod common;

use std::io::{Cursor, Read};

use common::{MockDetector, det, jpeg_upload, png_upload};
use dfu_detect::{
  batch::Batch,
  model::{DetectParams, LabelMap},
  output::{
    ANNOTATIONS_ENTRY, Draw, ExportError, IMAGE_MIME, archive::annotations_csv, export,
    image_download,
  },
};

fn processed_batch(detector: &mut MockDetector, uploads: Vec<dfu_detect::input::Upload>) -> Batch {
  let params = DetectParams::default();
  let mut batch = Batch::default();
  batch.accept_uploads(uploads, &params);
  let reports = batch.process_pending(detector, &Draw::default(), &LabelMap::default(), &params);
  assert!(reports.iter().all(|r| r.result.is_ok()));
  batch
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
  let mut entry = archive.by_name(name).expect("entry exists");
  let mut bytes = Vec::new();
  entry.read_to_end(&mut bytes).unwrap();
  bytes
}

#[test]
fn csv_row_has_two_decimal_coordinates() {
  let mut detector = MockDetector::new().with((64, 64), vec![det([10.0, 10.0, 50.0, 50.0], 0.91)]);
  let batch = processed_batch(&mut detector, vec![png_upload("a.jpg", 64, 64)]);

  let csv = String::from_utf8(annotations_csv(&batch).unwrap()).unwrap();
  let lines: Vec<&str> = csv.lines().collect();
  assert_eq!(lines, vec!["filename,xmin,ymin,xmax,ymax", "a.jpg,10.00,10.00,50.00,50.00"]);
}

#[test]
fn csv_rows_follow_batch_then_detector_order() {
  let mut detector = MockDetector::new()
    .with(
      (80, 60),
      vec![det([1.0, 2.0, 3.0, 4.0], 0.95), det([40.126, 20.0, 70.0, 50.5], 0.6)],
    )
    .with((64, 64), vec![det([5.0, 5.0, 15.0, 15.0], 0.8)]);
  let batch = processed_batch(
    &mut detector,
    vec![png_upload("second.png", 64, 64), png_upload("first.png", 80, 60)],
  );

  let csv = String::from_utf8(annotations_csv(&batch).unwrap()).unwrap();
  let lines: Vec<&str> = csv.lines().collect();
  assert_eq!(
    lines,
    vec![
      "filename,xmin,ymin,xmax,ymax",
      "second.png,5.00,5.00,15.00,15.00",
      "first.png,1.00,2.00,3.00,4.00",
      "first.png,40.13,20.00,70.00,50.50",
    ]
  );
}

#[test]
fn archive_holds_one_jpeg_per_upload_and_the_csv() {
  let mut detector = MockDetector::new().with((64, 64), vec![det([10.0, 10.0, 50.0, 50.0], 0.91)]);
  let batch = processed_batch(
    &mut detector,
    vec![png_upload("a.jpg", 64, 64), jpeg_upload("b.png", 32, 16)],
  );

  let bytes = export(&batch, 90).unwrap();
  let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
  assert_eq!(archive.len(), 3);

  let names: Vec<String> = archive.file_names().map(str::to_string).collect();
  for name in ["a.jpg", "b.png", ANNOTATIONS_ENTRY] {
    assert!(names.iter().any(|n| n == name), "missing {name}");
  }

  let b = read_entry(&mut archive, "b.png");
  assert_eq!(image::guess_format(&b).unwrap(), image::ImageFormat::Jpeg);
  assert_eq!(image::load_from_memory(&b).unwrap().width(), 32);
}

#[test]
fn batch_without_detections_still_exports() {
  let mut detector = MockDetector::new();
  let batch = processed_batch(
    &mut detector,
    vec![png_upload("one.png", 20, 20), png_upload("two.png", 30, 30)],
  );

  let bytes = export(&batch, 90).unwrap();
  let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
  assert_eq!(archive.len(), 3);

  let csv = String::from_utf8(read_entry(&mut archive, ANNOTATIONS_ENTRY)).unwrap();
  assert_eq!(csv.lines().collect::<Vec<_>>(), vec!["filename,xmin,ymin,xmax,ymax"]);
}

#[test]
fn unprocessed_batch_is_refused() {
  let params = DetectParams::default();
  let mut batch = Batch::default();
  batch.accept_uploads(vec![png_upload("a.png", 10, 10), png_upload("b.png", 12, 12)], &params);

  match export(&batch, 90) {
    Err(ExportError::Incomplete { missing }) => assert_eq!(missing, vec!["a.png", "b.png"]),
    other => panic!("unexpected result: {other:?}"),
  }
}

#[test]
fn empty_batch_is_refused() {
  assert!(matches!(export(&Batch::default(), 90), Err(ExportError::EmptyBatch)));
}

#[test]
fn single_image_download_is_a_prefixed_jpeg() {
  let mut detector = MockDetector::new().with((64, 64), vec![det([10.0, 10.0, 50.0, 50.0], 0.91)]);
  let batch = processed_batch(&mut detector, vec![png_upload("foot.png", 64, 64)]);

  let download = image_download(batch.result("foot.png").unwrap(), 90).unwrap();
  assert_eq!(download.file_name, "detected_foot.png");
  assert_eq!(download.mime, IMAGE_MIME);
  assert_eq!(
    image::guess_format(&download.bytes).unwrap(),
    image::ImageFormat::Jpeg
  );
}
