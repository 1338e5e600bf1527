// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/output.rs - 下载与导出
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::io::Cursor;

use image::{RgbImage, codecs::jpeg::JpegEncoder};
use thiserror::Error;

use crate::batch::AnnotatedImage;

pub mod archive;
pub mod draw;
pub mod table;

pub use self::archive::{ANNOTATIONS_ENTRY, CSV_HEADER, export};
pub use self::draw::{ColorPolicy, Draw, DrawError};
pub use self::table::DetectionTable;

pub const ARCHIVE_MIME: &str = "application/zip";
pub const IMAGE_MIME: &str = "image/jpeg";
pub const ARCHIVE_NAME: &str = "dfu-detections.zip";
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum ExportError {
  #[error("批次为空，没有可导出的图像")]
  EmptyBatch,
  #[error("以下图像尚未完成检测: {}", .missing.join(", "))]
  Incomplete { missing: Vec<String> },
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("压缩包错误: {0}")]
  ZipError(#[from] zip::result::ZipError),
  #[error("CSV 错误: {0}")]
  CsvError(#[from] csv::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 可供下载的文件：文件名、MIME 类型与内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
  pub file_name: String,
  pub mime: &'static str,
  pub bytes: Vec<u8>,
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ExportError> {
  let mut bytes = Vec::new();
  JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality).encode_image(image)?;
  Ok(bytes)
}

/// 单张标注图像的下载，文件名为 `detected_<原文件名>`
pub fn image_download(annotated: &AnnotatedImage, quality: u8) -> Result<Download, ExportError> {
  Ok(Download {
    file_name: format!("detected_{}", annotated.name()),
    mime: IMAGE_MIME,
    bytes: encode_jpeg(annotated.image(), quality)?,
  })
}
