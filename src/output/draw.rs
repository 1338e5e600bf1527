// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::{path::Path, str::FromStr};

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;

use crate::model::{Detection, LabelMap};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（无字体时的估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_TEXT_HORIZONTAL_PADDING: i32 = 4;
const BOX_LINE_WIDTH: i32 = 2;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

// 内置默认字体
const DEFAULT_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// 定性调色板，按检测框在列表中的序号循环取色
pub const PALETTE: [[u8; 3]; 20] = [
  [0xFF, 0x38, 0x38],
  [0xFF, 0x9D, 0x97],
  [0xFF, 0x70, 0x1F],
  [0xFF, 0xB2, 0x1D],
  [0xCF, 0xD2, 0x31],
  [0x48, 0xF9, 0x0A],
  [0x92, 0xCC, 0x17],
  [0x3D, 0xDB, 0x86],
  [0x1A, 0x93, 0x34],
  [0x00, 0xD4, 0xBB],
  [0x2C, 0x99, 0xA8],
  [0x00, 0xC2, 0xFF],
  [0x34, 0x45, 0x93],
  [0x64, 0x73, 0xFF],
  [0x00, 0x18, 0xEC],
  [0x84, 0x38, 0xFF],
  [0x52, 0x00, 0x85],
  [0xCB, 0x38, 0xFF],
  [0xFF, 0x95, 0xC8],
  [0xFF, 0x37, 0xC7],
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
  #[error("颜色格式无效: {0}，应为 palette 或 #rrggbb")]
  InvalidColor(String),
}

/// 检测框配色策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPolicy {
  /// 所有检测框使用同一颜色
  Fixed([u8; 3]),
  #[default]
  Palette,
}

impl ColorPolicy {
  pub fn color_for(&self, index: usize) -> Rgb<u8> {
    match self {
      ColorPolicy::Fixed(color) => Rgb(*color),
      ColorPolicy::Palette => Rgb(PALETTE[index % PALETTE.len()]),
    }
  }
}

impl FromStr for ColorPolicy {
  type Err = DrawError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("palette") {
      return Ok(ColorPolicy::Palette);
    }

    let invalid = || DrawError::InvalidColor(s.to_string());
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
      return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok(ColorPolicy::Fixed([channel(0)?, channel(2)?, channel(4)?]))
  }
}

pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontArc>,
  color: ColorPolicy,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font: FontArc::try_from_slice(DEFAULT_FONT).ok(),
      color: ColorPolicy::default(),
    }
  }
}

impl Draw {
  pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, DrawError> {
    let data = std::fs::read(path)?;
    Ok(FontArc::try_from_vec(data)?)
  }

  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_color(mut self, color: ColorPolicy) -> Self {
    self.color = color;
    self
  }

  /// 内置字体解析失败时为 false，此时标签只绘制背景
  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 在输入图像的副本上绘制所有检测框，输入图像不变
  pub fn annotate(&self, image: &RgbImage, detections: &[Detection], labels: &LabelMap) -> RgbImage {
    let mut canvas = image.clone();
    for (index, det) in detections.iter().enumerate() {
      let label = format!("{} {:.2}", labels.label(det.class_id()), det.score());
      self.draw_bbox_with_label(&mut canvas, &det.bbox(), &label, self.color.color_for(index));
    }
    canvas
  }

  fn label_size(&self, label: &str) -> (i32, i32) {
    match &self.font {
      Some(font) => {
        let (w, _) = text_size(PxScale::from(self.font_size), font, label);
        (w as i32 + LABEL_TEXT_HORIZONTAL_PADDING, self.label_text_height)
      }
      None => (
        (label.chars().count() as f32 * self.label_char_width) as i32,
        self.label_text_height,
      ),
    }
  }

  // bbox 为像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(&self, image: &mut RgbImage, bbox: &[f32; 4], label: &str, color: Rgb<u8>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 标签背景在边框上方，超出顶部时贴边
    let (text_width, text_height) = self.label_size(label);
    let label_x = x_min;
    let label_y = (y_min - text_height).max(0);
    let label_width = text_width.min(w - label_x);
    let label_height = text_height.min(h - label_y);

    if label_width > 0 && label_height > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width as u32, label_height as u32);
      draw_filled_rect_mut(image, rect, color);
    }

    // 边框加粗为 2 像素
    for t in 0..BOX_LINE_WIDTH {
      let (bw, bh) = (x_max - x_min + 1 - 2 * t, y_max - y_min + 1 - 2 * t);
      if bw <= 0 || bh <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(bw as u32, bh as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    if let Some(font) = &self.font
      && label_width > 0
      && label_height > 0
    {
      draw_text_mut(
        image,
        TEXT_COLOR,
        label_x + LABEL_TEXT_HORIZONTAL_PADDING / 2,
        label_y + self.label_text_vertical_padding,
        PxScale::from(self.font_size),
        font,
        label,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_color_policies() {
    assert_eq!("palette".parse::<ColorPolicy>().unwrap(), ColorPolicy::Palette);
    assert_eq!(
      "#0000ff".parse::<ColorPolicy>().unwrap(),
      ColorPolicy::Fixed([0, 0, 255])
    );
    assert!("blue".parse::<ColorPolicy>().is_err());
    assert!("#12345".parse::<ColorPolicy>().is_err());
  }

  #[test]
  fn palette_wraps_around() {
    let policy = ColorPolicy::Palette;
    assert_eq!(policy.color_for(0), policy.color_for(PALETTE.len()));
    assert_ne!(policy.color_for(0), policy.color_for(1));
  }

  #[test]
  fn default_draw_embeds_a_font() {
    assert!(Draw::default().has_font());
  }

  #[test]
  fn fixed_color_ignores_index() {
    let policy = ColorPolicy::Fixed([1, 2, 3]);
    assert_eq!(policy.color_for(0), policy.color_for(7));
  }
}
