// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/output/archive.rs - 批次导出为 zip 压缩包
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

use std::io::{Cursor, Write};

use tracing::{info, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
  batch::Batch,
  output::{ExportError, encode_jpeg},
};

pub const ANNOTATIONS_ENTRY: &str = "annotations.csv";
pub const CSV_HEADER: [&str; 5] = ["filename", "xmin", "ymin", "xmax", "ymax"];

/// 生成标注 CSV：按批次顺序，每个检测框一行，坐标保留两位小数
pub fn annotations_csv(batch: &Batch) -> Result<Vec<u8>, ExportError> {
  let mut writer = csv::WriterBuilder::new()
    .terminator(csv::Terminator::Any(b'\n'))
    .from_writer(Vec::new());
  writer.write_record(CSV_HEADER)?;

  for annotated in batch.results() {
    for det in annotated.detections() {
      let [x_min, y_min, x_max, y_max] = det.bbox();
      writer.write_record([
        annotated.name().to_string(),
        format!("{:.2}", x_min),
        format!("{:.2}", y_min),
        format!("{:.2}", x_max),
        format!("{:.2}", y_max),
      ])?;
    }
  }

  writer.into_inner().map_err(|e| ExportError::IoError(e.into_error()))
}

/// 将完整批次导出为 zip：每张图像一个 JPEG 条目（与原文件同名），外加 annotations.csv
///
/// 批次中任一上传尚无结果时拒绝导出。
pub fn export(batch: &Batch, jpeg_quality: u8) -> Result<Vec<u8>, ExportError> {
  if batch.is_empty() {
    return Err(ExportError::EmptyBatch);
  }
  if !batch.is_complete() {
    let missing: Vec<String> = batch.pending().map(str::to_string).collect();
    warn!("拒绝导出未完成的批次，缺少: {:?}", missing);
    return Err(ExportError::Incomplete { missing });
  }

  let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
  let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
  let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  for annotated in batch.results() {
    zip.start_file(annotated.name(), stored)?;
    zip.write_all(&encode_jpeg(annotated.image(), jpeg_quality)?)?;
  }

  zip.start_file(ANNOTATIONS_ENTRY, deflated)?;
  zip.write_all(&annotations_csv(batch)?)?;

  let bytes = zip.finish()?.into_inner();
  info!("导出 {} 张图像，压缩包大小 {} 字节", batch.len(), bytes.len());
  Ok(bytes)
}
