#![allow(dead_code)]

use std::{cell::Cell, collections::HashMap, io::Cursor, rc::Rc};

use dfu_detect::{
  input::Upload,
  model::{DetectParams, Detection, Detector, DetectorError, suppress},
};
use image::{ImageFormat, Rgb, RgbImage};

/// 按图像尺寸返回预设候选框的检测器，经阈值过滤与 NMS 后输出
pub struct MockDetector {
  by_size: HashMap<(u32, u32), Vec<Detection>>,
  calls: Rc<Cell<usize>>,
}

impl MockDetector {
  pub fn new() -> Self {
    Self {
      by_size: HashMap::new(),
      calls: Rc::new(Cell::new(0)),
    }
  }

  pub fn with(mut self, size: (u32, u32), detections: Vec<Detection>) -> Self {
    self.by_size.insert(size, detections);
    self
  }

  pub fn calls(&self) -> Rc<Cell<usize>> {
    self.calls.clone()
  }
}

impl Detector for MockDetector {
  fn name(&self) -> &str {
    "mock"
  }

  fn predict(
    &mut self,
    image: &RgbImage,
    params: &DetectParams,
  ) -> Result<Vec<Detection>, DetectorError> {
    self.calls.set(self.calls.get() + 1);
    let candidates = self
      .by_size
      .get(&image.dimensions())
      .cloned()
      .unwrap_or_default();
    Ok(suppress(candidates, params))
  }
}

/// 每次调用都失败的检测器
pub struct BrokenDetector;

impl Detector for BrokenDetector {
  fn name(&self) -> &str {
    "broken"
  }

  fn predict(&mut self, _: &RgbImage, _: &DetectParams) -> Result<Vec<Detection>, DetectorError> {
    Err(DetectorError::Inference("tensor shape mismatch".to_string()))
  }
}

pub fn det(bbox: [f32; 4], score: f32) -> Detection {
  Detection::new(bbox, score, 0).expect("valid detection")
}

pub fn solid_image(width: u32, height: u32) -> RgbImage {
  RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
  let mut bytes = Vec::new();
  image
    .write_to(&mut Cursor::new(&mut bytes), format)
    .expect("Failed to encode test image");
  bytes
}

pub fn png_upload(name: &str, width: u32, height: u32) -> Upload {
  Upload::new(name, encode(&solid_image(width, height), ImageFormat::Png))
}

pub fn jpeg_upload(name: &str, width: u32, height: u32) -> Upload {
  Upload::new(name, encode(&solid_image(width, height), ImageFormat::Jpeg))
}

pub fn corrupt_upload(name: &str) -> Upload {
  Upload::new(name, b"this is not an image at all".to_vec())
}
