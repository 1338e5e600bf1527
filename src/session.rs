// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/session.rs - 会话状态与事件处理
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  batch::{Batch, ProcessReport, UploadSummary},
  input::{Upload, read_files},
  model::{DetectParams, Detector, LabelMap, ModelCatalog, ModelLoader, ModelSpec, ThresholdError},
  output::{
    ARCHIVE_MIME, ARCHIVE_NAME, DEFAULT_JPEG_QUALITY, Download, ExportError, archive,
    draw::Draw, image_download,
  },
};

#[derive(Error, Debug)]
pub enum SessionError {
  #[error(transparent)]
  Threshold(#[from] ThresholdError),
  #[error("模型不可用，无法检测，请检查模型路径: {path}")]
  ModelUnavailable { path: String },
  #[error("模型列表中没有 {name}，可选: {available}")]
  UnknownModel { name: String, available: String },
  #[error("尚未上传图像")]
  NothingUploaded,
  #[error("批次中没有图像 {0}")]
  UnknownImage(String),
  #[error("图像 {0} 尚未完成检测")]
  NotProcessed(String),
  #[error("导出失败: {0}")]
  Export(#[from] ExportError),
}

struct ModelSource<D> {
  catalog: ModelCatalog,
  loader: Box<dyn ModelLoader<D>>,
}

/// 检测所需的外部协作者：模型、绘制器、标签表与 JPEG 质量
///
/// 模型加载失败时仍可构造，此时上传与阈值调整照常可用，检测请求会报告模型路径。
pub struct Pipeline<D> {
  detector: Option<D>,
  model_name: String,
  model_path: String,
  source: Option<ModelSource<D>>,
  draw: Draw,
  labels: LabelMap,
  jpeg_quality: u8,
}

impl<D> Pipeline<D> {
  fn with_detector(detector: Option<D>, model_path: String) -> Self {
    Self {
      detector,
      model_name: model_path.clone(),
      model_path,
      source: None,
      draw: Draw::default(),
      labels: LabelMap::default(),
      jpeg_quality: DEFAULT_JPEG_QUALITY,
    }
  }

  /// 固定使用一个已加载的检测器
  pub fn new(detector: D, model_path: impl Into<String>) -> Self {
    Self::with_detector(Some(detector), model_path.into())
  }

  pub fn unavailable(model_path: impl Into<String>) -> Self {
    Self::with_detector(None, model_path.into())
  }

  /// 从模型列表加载默认模型，之后可通过 [`Event::SelectModel`] 切换
  pub fn load(catalog: ModelCatalog, loader: impl ModelLoader<D> + 'static) -> Self {
    let spec = catalog.default_model().clone();
    let mut pipeline = Self::with_detector(None, spec.path().to_string());
    pipeline.source = Some(ModelSource {
      catalog,
      loader: Box::new(loader),
    });
    pipeline.activate(&spec);
    pipeline
  }

  /// 切换到模型列表中的另一个模型；返回当前模型是否发生变化
  ///
  /// 已加载的同名模型不会重新加载。加载失败时模型变为不可用，并记录路径。
  pub fn select_model(&mut self, name: &str) -> Result<bool, SessionError> {
    let spec = self
      .source
      .as_ref()
      .and_then(|source| source.catalog.get(name))
      .cloned()
      .ok_or_else(|| SessionError::UnknownModel {
        name: name.to_string(),
        available: self.model_names().join(", "),
      })?;

    if spec.name() == self.model_name && self.detector.is_some() {
      return Ok(false);
    }
    self.activate(&spec);
    Ok(true)
  }

  fn activate(&mut self, spec: &ModelSpec) {
    self.model_name = spec.name().to_string();
    self.model_path = spec.path().to_string();
    // 先释放旧模型
    self.detector = None;

    let Some(source) = &self.source else {
      return;
    };
    match source.loader.load(spec) {
      Ok(detector) => {
        info!("当前模型: {} ({})", self.model_name, self.model_path);
        self.detector = Some(detector);
      }
      Err(e) => error!("模型 {} 加载失败: {}", self.model_name, e),
    }
  }

  pub fn model_names(&self) -> Vec<&str> {
    match &self.source {
      Some(source) => source.catalog.names().collect(),
      None => vec![self.model_name.as_str()],
    }
  }

  pub fn model_name(&self) -> &str {
    &self.model_name
  }


  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn with_labels(mut self, labels: LabelMap) -> Self {
    self.labels = labels;
    self
  }

  pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
    self.jpeg_quality = quality.clamp(1, 100);
    self
  }

  pub fn is_available(&self) -> bool {
    self.detector.is_some()
  }

  pub fn model_path(&self) -> &str {
    &self.model_path
  }
}

/// 前端产生的事件
#[derive(Debug, Clone)]
pub enum Event {
  Upload(Vec<Upload>),
  /// 从本地路径读取上传；读取失败的文件记入批次
  UploadFiles(Vec<PathBuf>),
  SelectModel(String),
  SetConfidence(f32),
  SetIou(f32),
  Detect,
  DownloadImage(String),
  Export,
  Clear,
}

/// 事件处理结果
#[derive(Debug)]
pub enum Outcome {
  Uploaded(UploadSummary),
  ThresholdChanged {
    params: DetectParams,
    invalidated: bool,
  },
  ModelSelected {
    name: String,
    path: String,
    available: bool,
    invalidated: bool,
  },
  Processed(Vec<ProcessReport>),
  Download(Download),
  Cleared,
  Rejected(SessionError),
}

/// 单个用户会话：当前批次与当前阈值
///
/// 由事件循环独占持有，每次事件处理后返回新的会话值。
#[derive(Debug, Clone, Default)]
pub struct Session {
  batch: Batch,
  params: DetectParams,
}

impl Session {
  pub fn new(params: DetectParams) -> Self {
    Self {
      batch: Batch::default(),
      params,
    }
  }

  pub fn batch(&self) -> &Batch {
    &self.batch
  }

  pub fn params(&self) -> &DetectParams {
    &self.params
  }

  pub fn handle<D: Detector>(mut self, event: Event, pipeline: &mut Pipeline<D>) -> (Self, Outcome) {
    let outcome = match event {
      Event::Upload(uploads) => Ok(self.upload(uploads)),
      Event::UploadFiles(paths) => Ok(self.upload_files(&paths)),
      Event::SelectModel(name) => self.select_model(&name, pipeline),
      Event::SetConfidence(confidence) => self
        .params
        .with_confidence(confidence)
        .map(|params| self.set_params(params))
        .map_err(SessionError::from),
      Event::SetIou(iou) => self
        .params
        .with_iou(iou)
        .map(|params| self.set_params(params))
        .map_err(SessionError::from),
      Event::Detect => self.detect(pipeline),
      Event::DownloadImage(name) => self.download_image(&name, pipeline),
      Event::Export => self.export(pipeline),
      Event::Clear => {
        self.batch.clear();
        Ok(Outcome::Cleared)
      }
    };

    let outcome = outcome.unwrap_or_else(|e| {
      warn!("请求被拒绝: {}", e);
      Outcome::Rejected(e)
    });
    (self, outcome)
  }

  fn upload(&mut self, uploads: Vec<Upload>) -> Outcome {
    Outcome::Uploaded(self.batch.accept_uploads(uploads, &self.params))
  }

  fn upload_files(&mut self, paths: &[PathBuf]) -> Outcome {
    let (uploads, unreadable) = read_files(paths);
    Outcome::Uploaded(self.batch.accept(uploads, unreadable, &self.params))
  }

  fn select_model<D>(&mut self, name: &str, pipeline: &mut Pipeline<D>) -> Result<Outcome, SessionError> {
    // 其他模型得到的结果已过期
    let invalidated = pipeline.select_model(name)? && self.batch.invalidate();
    Ok(Outcome::ModelSelected {
      name: pipeline.model_name().to_string(),
      path: pipeline.model_path().to_string(),
      available: pipeline.is_available(),
      invalidated,
    })
  }

  fn set_params(&mut self, params: DetectParams) -> Outcome {
    let invalidated = if params != self.params {
      info!(
        "阈值变更: 置信度 {:.2}, IoU {:.2}",
        params.confidence(),
        params.iou()
      );
      self.params = params;
      self.batch.invalidate()
    } else {
      false
    };
    Outcome::ThresholdChanged {
      params: self.params,
      invalidated,
    }
  }

  fn detect<D: Detector>(&mut self, pipeline: &mut Pipeline<D>) -> Result<Outcome, SessionError> {
    if self.batch.is_empty() {
      return Err(SessionError::NothingUploaded);
    }
    let Some(detector) = pipeline.detector.as_mut() else {
      return Err(SessionError::ModelUnavailable {
        path: pipeline.model_path.clone(),
      });
    };

    let reports = self
      .batch
      .process_pending(detector, &pipeline.draw, &pipeline.labels, &self.params);
    Ok(Outcome::Processed(reports))
  }

  fn download_image<D>(&self, name: &str, pipeline: &Pipeline<D>) -> Result<Outcome, SessionError> {
    if !self.batch.names().any(|n| n == name) {
      return Err(SessionError::UnknownImage(name.to_string()));
    }
    let annotated = self
      .batch
      .result(name)
      .ok_or_else(|| SessionError::NotProcessed(name.to_string()))?;
    Ok(Outcome::Download(image_download(annotated, pipeline.jpeg_quality)?))
  }

  fn export<D>(&self, pipeline: &Pipeline<D>) -> Result<Outcome, SessionError> {
    let bytes = archive::export(&self.batch, pipeline.jpeg_quality)?;
    Ok(Outcome::Download(Download {
      file_name: ARCHIVE_NAME.to_string(),
      mime: ARCHIVE_MIME,
      bytes,
    }))
  }
}
