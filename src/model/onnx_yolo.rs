// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/model/onnx_yolo.rs - ONNX YOLOv8 检测模型
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

use image::{RgbImage, imageops::FilterType};
use ort::{session::Session, value::Tensor};
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectParams, Detection, Detector, DetectorError, ModelLoader, ModelSpec, suppress},
};

pub const DEFAULT_INPUT_SIZE: u32 = 640;
const ONNX_YOLO_BOX_CHANNELS: usize = 4;
const ONNX_YOLO_INTRA_THREADS: usize = 4;

pub struct OnnxYoloBuilder {
  model_path: String,
  input_size: u32,
}

impl FromUrlWithScheme for OnnxYoloBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxYoloBuilder {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectorError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    Ok(OnnxYoloBuilder {
      model_path: url.path().to_string(),
      input_size: DEFAULT_INPUT_SIZE,
    })
  }
}

impl OnnxYoloBuilder {
  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn build(self) -> Result<OnnxYolo, DetectorError> {
    let load_error = |reason: String| DetectorError::Load {
      path: self.model_path.clone(),
      reason,
    };

    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path).map_err(|e| load_error(e.to_string()))?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let session = Session::builder()
      .and_then(|builder| builder.with_intra_threads(ONNX_YOLO_INTRA_THREADS))
      .and_then(|builder| builder.commit_from_memory(&model_data))
      .map_err(|e| load_error(e.to_string()))?;
    info!("模型加载完成");

    Ok(OnnxYolo {
      session,
      input_size: self.input_size,
    })
  }
}

/// 按模型列表条目加载 ONNX 模型
#[derive(Debug, Clone, Copy)]
pub struct OnnxYoloLoader {
  input_size: u32,
}

impl Default for OnnxYoloLoader {
  fn default() -> Self {
    Self {
      input_size: DEFAULT_INPUT_SIZE,
    }
  }
}

impl OnnxYoloLoader {
  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }
}

impl ModelLoader<OnnxYolo> for OnnxYoloLoader {
  fn load(&self, spec: &ModelSpec) -> Result<OnnxYolo, DetectorError> {
    info!("加载模型 {}", spec.name());
    OnnxYoloBuilder::from_url(spec.url())?
      .input_size(self.input_size)
      .build()
  }
}

/// 导出为 ONNX 的 YOLOv8 检测模型，输出形状为 [1, 4 + 类别数, 候选数]
pub struct OnnxYolo {
  session: Session,
  input_size: u32,
}

impl Detector for OnnxYolo {
  fn name(&self) -> &str {
    "onnx-yolov8"
  }

  fn predict(
    &mut self,
    image: &RgbImage,
    params: &DetectParams,
  ) -> Result<Vec<Detection>, DetectorError> {
    let size = self.input_size as usize;
    let resized = image::imageops::resize(image, self.input_size, self.input_size, FilterType::Triangle);

    // NCHW，归一化到 [0, 1]
    let plane = size * size;
    let mut input = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
      let idx = y as usize * size + x as usize;
      input[idx] = pixel[0] as f32 / 255.0;
      input[plane + idx] = pixel[1] as f32 / 255.0;
      input[2 * plane + idx] = pixel[2] as f32 / 255.0;
    }

    let inference = |e: ort::Error| DetectorError::Inference(e.to_string());
    let tensor = Tensor::from_array((vec![1i64, 3, size as i64, size as i64], input)).map_err(inference)?;

    debug!("执行模型推理");
    let outputs = self.session.run(ort::inputs![tensor]).map_err(inference)?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(inference)?;
    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

    let scale = (
      image.width() as f32 / self.input_size as f32,
      image.height() as f32 / self.input_size as f32,
    );
    let candidates = decode_candidates(&dims, data, scale, image.dimensions())?;
    debug!("候选框数量: {}", candidates.len());

    Ok(suppress(candidates, params))
  }
}

fn decode_candidates(
  dims: &[usize],
  data: &[f32],
  (sx, sy): (f32, f32),
  (width, height): (u32, u32),
) -> Result<Vec<Detection>, DetectorError> {
  let &[1, channels, num] = dims else {
    return Err(DetectorError::Inference(format!("模型输出形状无效: {:?}", dims)));
  };
  if channels <= ONNX_YOLO_BOX_CHANNELS || data.len() != channels * num {
    return Err(DetectorError::Inference(format!(
      "模型输出形状无效: {:?}, 数据长度 {}",
      dims,
      data.len()
    )));
  }

  let at = |c: usize, i: usize| data[c * num + i];
  let mut candidates = Vec::new();
  for i in 0..num {
    let (class_id, score) = (ONNX_YOLO_BOX_CHANNELS..channels)
      .map(|c| (c - ONNX_YOLO_BOX_CHANNELS, at(c, i)))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
    let bbox = [
      ((cx - w / 2.0) * sx).clamp(0.0, width as f32),
      ((cy - h / 2.0) * sy).clamp(0.0, height as f32),
      ((cx + w / 2.0) * sx).clamp(0.0, width as f32),
      ((cy + h / 2.0) * sy).clamp(0.0, height as f32),
    ];

    // 裁剪后退化的框直接丢弃
    if let Ok(det) = Detection::new(bbox, score.clamp(0.0, 1.0), class_id as u32) {
      candidates.push(det);
    }
  }
  Ok(candidates)
}
