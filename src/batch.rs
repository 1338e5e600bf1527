// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/batch.rs - 批量上传与检测结果汇总
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

use std::collections::BTreeSet;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  input::{Upload, UploadError, UploadFailure},
  model::{DetectParams, Detection, Detector, DetectorError, LabelMap},
  output::draw::Draw,
};

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("图像读取失败: {0}")]
  Upload(#[from] UploadError),
  #[error("检测失败: {0}")]
  Detector(#[from] DetectorError),
}

/// 一次检测的产物：标注后的图像副本、来源文件名与绘制所用的检测结果
///
/// 创建后不再修改；重新检测会生成新的实例。
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
  name: String,
  image: RgbImage,
  detections: Vec<Detection>,
  params: DetectParams,
}

impl AnnotatedImage {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn detections(&self) -> &[Detection] {
    &self.detections
  }

  pub fn params(&self) -> &DetectParams {
    &self.params
  }
}

/// 对单个上传执行一次检测并绘制结果
pub fn process<D: Detector + ?Sized>(
  upload: &Upload,
  detector: &mut D,
  draw: &Draw,
  labels: &LabelMap,
  params: &DetectParams,
) -> Result<AnnotatedImage, ProcessError> {
  let image = upload.decode()?;
  debug!(
    "{}: {}x{}，使用模型 {}",
    upload.name(),
    image.width(),
    image.height(),
    detector.name()
  );

  let now = std::time::Instant::now();
  let detections = detector.predict(&image, params)?;
  info!(
    "{}: 检测到 {} 个溃疡区域，耗时: {:.2?}",
    upload.name(),
    detections.len(),
    now.elapsed()
  );

  let image = draw.annotate(&image, &detections, labels);
  Ok(AnnotatedImage {
    name: upload.name().to_string(),
    image,
    detections,
    params: *params,
  })
}

/// 单张图像的处理报告
#[derive(Debug)]
pub struct ProcessReport {
  pub name: String,
  pub result: Result<usize, ProcessError>,
}

/// 一次上传的结果摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
  pub accepted: Vec<String>,
  pub duplicates: Vec<String>,
  pub failed: Vec<UploadFailure>,
  pub invalidated: bool,
}

#[derive(Debug, Clone)]
struct BatchEntry {
  upload: Upload,
  result: Option<AnnotatedImage>,
  failure: Option<String>,
}

/// 按上传顺序保存的图像与检测结果
///
/// 每个结果都挂在对应的上传项上，因此结果文件名总是上传文件名的子集。
/// 读取失败的文件也属于批次：它们没有结果，批次因此无法导出。
#[derive(Debug, Clone, Default)]
pub struct Batch {
  entries: Vec<BatchEntry>,
  unreadable: Vec<UploadFailure>,
}

impl Batch {
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty() && self.unreadable.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|entry| entry.upload.name())
  }

  /// 已完成的检测结果，按上传顺序
  pub fn results(&self) -> impl Iterator<Item = &AnnotatedImage> {
    self.entries.iter().filter_map(|entry| entry.result.as_ref())
  }

  pub fn result(&self, name: &str) -> Option<&AnnotatedImage> {
    self
      .entries
      .iter()
      .find(|entry| entry.upload.name() == name)
      .and_then(|entry| entry.result.as_ref())
  }

  /// 读取失败与检测失败的文件及原因
  pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
    let unreadable = self
      .unreadable
      .iter()
      .map(|failure| (failure.name.as_str(), failure.reason.as_str()));
    let failed = self
      .entries
      .iter()
      .filter_map(|entry| entry.failure.as_deref().map(|f| (entry.upload.name(), f)));
    unreadable.chain(failed)
  }

  /// 尚无检测结果的文件名，包括读取失败的文件
  pub fn pending(&self) -> impl Iterator<Item = &str> {
    self
      .entries
      .iter()
      .filter(|entry| entry.result.is_none())
      .map(|entry| entry.upload.name())
      .chain(self.unreadable.iter().map(|failure| failure.name.as_str()))
  }

  pub fn is_complete(&self) -> bool {
    !self.is_empty() && self.pending().next().is_none()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
    self.unreadable.clear();
  }

  /// 丢弃所有检测结果与失败记录，保留上传
  pub fn invalidate(&mut self) -> bool {
    let mut dropped = false;
    for entry in self.entries.iter_mut() {
      dropped |= entry.result.take().is_some();
      dropped |= entry.failure.take().is_some();
    }
    dropped
  }

  /// 接收一组新上传
  pub fn accept_uploads(&mut self, uploads: Vec<Upload>, params: &DetectParams) -> UploadSummary {
    self.accept(uploads, Vec::new(), params)
  }

  /// 接收一组新上传，连同读取失败的文件
  ///
  /// 文件名集合变化，或已有结果使用的阈值与当前阈值不同时，先丢弃全部旧结果。
  /// 同名文件只保留第一个。
  pub fn accept(
    &mut self,
    uploads: Vec<Upload>,
    unreadable: Vec<UploadFailure>,
    params: &DetectParams,
  ) -> UploadSummary {
    let mut summary = UploadSummary::default();
    let mut seen = BTreeSet::new();
    let mut incoming = Vec::with_capacity(uploads.len());
    for upload in uploads {
      if seen.insert(upload.name().to_string()) {
        summary.accepted.push(upload.name().to_string());
        incoming.push(upload);
      } else {
        summary.duplicates.push(upload.name().to_string());
      }
    }
    for failure in unreadable {
      if seen.insert(failure.name.clone()) {
        summary.failed.push(failure);
      } else {
        summary.duplicates.push(failure.name);
      }
    }

    let previous: BTreeSet<&str> = self
      .names()
      .chain(self.unreadable.iter().map(|failure| failure.name.as_str()))
      .collect();
    let names_changed = previous != seen.iter().map(String::as_str).collect::<BTreeSet<&str>>();
    let params_changed = self.results().any(|result| result.params() != params);

    let mut old = std::mem::take(&mut self.entries);
    self.unreadable = summary.failed.clone();
    if names_changed || params_changed {
      summary.invalidated = old.iter().any(|entry| entry.result.is_some() || entry.failure.is_some());
      old.clear();
    }

    self.entries = incoming
      .into_iter()
      .map(|upload| {
        // 同名且内容不变时沿用已有结果
        let kept = old
          .iter_mut()
          .find(|entry| entry.upload == upload)
          .and_then(|entry| entry.result.take());
        BatchEntry {
          upload,
          result: kept,
          failure: None,
        }
      })
      .collect();

    info!(
      "接收 {} 个上传，重复 {} 个，读取失败 {} 个，旧结果{}",
      summary.accepted.len(),
      summary.duplicates.len(),
      summary.failed.len(),
      if summary.invalidated { "已清除" } else { "保留" }
    );
    summary
  }

  /// 逐张处理尚无结果的上传；单张失败只记录，不影响其余图像
  pub fn process_pending<D: Detector + ?Sized>(
    &mut self,
    detector: &mut D,
    draw: &Draw,
    labels: &LabelMap,
    params: &DetectParams,
  ) -> Vec<ProcessReport> {
    let mut reports = Vec::new();
    for entry in self.entries.iter_mut().filter(|entry| entry.result.is_none()) {
      let name = entry.upload.name().to_string();
      match process(&entry.upload, detector, draw, labels, params) {
        Ok(annotated) => {
          let count = annotated.detections().len();
          entry.result = Some(annotated);
          entry.failure = None;
          reports.push(ProcessReport {
            name,
            result: Ok(count),
          });
        }
        Err(e) => {
          error!("{}: {}", name, e);
          entry.failure = Some(e.to_string());
          reports.push(ProcessReport {
            name,
            result: Err(e),
          });
        }
      }
    }
    reports
  }
}
