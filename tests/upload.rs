mod common;

use common::{encode, solid_image};
use dfu_detect::{
  FromUrl,
  input::{Upload, read_files},
};
use image::ImageFormat;
use url::Url;

#[test]
fn upload_from_path_uses_the_file_name() -> anyhow::Result<()> {
  let dir = tempfile::TempDir::new()?;
  let path = dir.path().join("left-heel.png");
  std::fs::write(&path, encode(&solid_image(12, 8), ImageFormat::Png))?;

  let upload = Upload::from_path(&path)?;
  assert_eq!(upload.name(), "left-heel.png");
  assert_eq!(upload.decode()?.dimensions(), (12, 8));
  Ok(())
}

#[test]
fn upload_from_image_url() -> anyhow::Result<()> {
  let dir = tempfile::TempDir::new()?;
  let path = dir.path().join("toe.bmp");
  std::fs::write(&path, encode(&solid_image(5, 5), ImageFormat::Bmp))?;

  let url = Url::from_file_path(&path).expect("absolute path");
  let url = Url::parse(&format!("image://{}", url.path()))?;
  let upload = Upload::from_url(&url)?;
  assert_eq!(upload.name(), "toe.bmp");
  assert_eq!(upload.decode()?.dimensions(), (5, 5));
  Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
  let dir = tempfile::TempDir::new().unwrap();
  assert!(Upload::from_path(dir.path().join("nope.jpg")).is_err());
}

#[test]
fn unreadable_files_are_returned_with_their_reason() -> anyhow::Result<()> {
  let dir = tempfile::TempDir::new()?;
  let present = dir.path().join("a.png");
  std::fs::write(&present, encode(&solid_image(4, 4), ImageFormat::Png))?;

  let (uploads, failures) = read_files(&[present, dir.path().join("missing.jpg")]);
  assert_eq!(uploads.len(), 1);
  assert_eq!(uploads[0].name(), "a.png");
  assert_eq!(failures.len(), 1);
  assert_eq!(failures[0].name, "missing.jpg");
  assert!(!failures[0].reason.is_empty());
  Ok(())
}
