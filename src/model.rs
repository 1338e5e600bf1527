// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/model.rs - 检测模型与检测结果定义
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

use image::RgbImage;
use thiserror::Error;

mod catalog;
mod labels;
mod nms;
pub use self::catalog::{CatalogError, ModelCatalog, ModelSpec};
pub use self::labels::{LabelFallback, LabelMap, LabelMapError};
pub use self::nms::suppress;

#[cfg(feature = "model_onnx")]
mod onnx_yolo;
#[cfg(feature = "model_onnx")]
pub use self::onnx_yolo::{DEFAULT_INPUT_SIZE, OnnxYolo, OnnxYoloBuilder, OnnxYoloLoader};

pub const DEFAULT_CONFIDENCE: f32 = 0.40;
pub const DEFAULT_IOU: f32 = 0.45;

/// 单个检测结果，像素坐标 [x_min, y_min, x_max, y_max]
///
/// 构造时校验边框与置信度，之后不可修改。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  bbox: [f32; 4],
  score: f32,
  class_id: u32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
  #[error("边框无效: {0:?}")]
  InvalidBox([f32; 4]),
  #[error("置信度超出 [0, 1]: {0}")]
  InvalidScore(f32),
}

impl Detection {
  pub fn new(bbox: [f32; 4], score: f32, class_id: u32) -> Result<Self, DetectionError> {
    let [x_min, y_min, x_max, y_max] = bbox;
    if !bbox.iter().all(|v| v.is_finite()) || x_min >= x_max || y_min >= y_max {
      return Err(DetectionError::InvalidBox(bbox));
    }
    if !(0.0..=1.0).contains(&score) {
      return Err(DetectionError::InvalidScore(score));
    }
    Ok(Self {
      bbox,
      score,
      class_id,
    })
  }

  pub fn bbox(&self) -> [f32; 4] {
    self.bbox
  }

  pub fn score(&self) -> f32 {
    self.score
  }

  pub fn class_id(&self) -> u32 {
    self.class_id
  }

  pub fn area(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]) * (self.bbox[3] - self.bbox[1])
  }

  pub fn iou(&self, other: &Detection) -> f32 {
    let x_min = self.bbox[0].max(other.bbox[0]);
    let y_min = self.bbox[1].max(other.bbox[1]);
    let x_max = self.bbox[2].min(other.bbox[2]);
    let y_max = self.bbox[3].min(other.bbox[3]);

    let intersection = if x_max > x_min && y_max > y_min {
      (x_max - x_min) * (y_max - y_min)
    } else {
      0.0
    };
    let union = self.area() + other.area() - intersection;

    if union > 0.0 { intersection / union } else { 0.0 }
  }
}

/// 推理参数：置信度阈值与 NMS IoU 阈值，均在 [0, 1] 内
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectParams {
  confidence: f32,
  iou: f32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
  #[error("{name} 阈值超出 [0, 1]: {value}")]
  OutOfRange { name: &'static str, value: f32 },
}

fn check_threshold(name: &'static str, value: f32) -> Result<f32, ThresholdError> {
  if (0.0..=1.0).contains(&value) {
    Ok(value)
  } else {
    Err(ThresholdError::OutOfRange { name, value })
  }
}

impl Default for DetectParams {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE,
      iou: DEFAULT_IOU,
    }
  }
}

impl DetectParams {
  pub fn new(confidence: f32, iou: f32) -> Result<Self, ThresholdError> {
    Ok(Self {
      confidence: check_threshold("confidence", confidence)?,
      iou: check_threshold("iou", iou)?,
    })
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn iou(&self) -> f32 {
    self.iou
  }

  pub fn with_confidence(self, confidence: f32) -> Result<Self, ThresholdError> {
    Self::new(confidence, self.iou)
  }

  pub fn with_iou(self, iou: f32) -> Result<Self, ThresholdError> {
    Self::new(self.confidence, iou)
  }
}

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("无法加载模型，请检查路径 {path}: {reason}")]
  Load { path: String, reason: String },
  #[error("模型路径必须使用 {expected} 方案，实际为 {found}")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
  #[error("推理失败: {0}")]
  Inference(String),
}

/// 外部检测模型的调用接口
///
/// 对同一模型和输入应返回相同结果。阈值过滤与 NMS 由实现负责。
pub trait Detector {
  fn name(&self) -> &str;

  fn predict(
    &mut self,
    image: &RgbImage,
    params: &DetectParams,
  ) -> Result<Vec<Detection>, DetectorError>;
}

/// 按模型列表中的条目创建检测器，用于启动和运行中切换模型
pub trait ModelLoader<D> {
  fn load(&self, spec: &ModelSpec) -> Result<D, DetectorError>;
}

impl<D, F> ModelLoader<D> for F
where
  F: Fn(&ModelSpec) -> Result<D, DetectorError>,
{
  fn load(&self, spec: &ModelSpec) -> Result<D, DetectorError> {
    self(spec)
  }
}
