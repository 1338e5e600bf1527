// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/output/table.rs - 检测结果表格
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

use std::fmt;

use crate::model::Detection;

const COLUMNS: [&str; 5] = ["xmin", "ymin", "xmax", "ymax", "confidence"];

/// 单张图像检测结果的展示表格，数值保留两位小数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionTable {
  rows: Vec<[String; 5]>,
}

impl DetectionTable {
  pub fn new(detections: &[Detection]) -> Self {
    let rows = detections
      .iter()
      .map(|det| {
        let [x_min, y_min, x_max, y_max] = det.bbox();
        [x_min, y_min, x_max, y_max, det.score()].map(|v| format!("{:.2}", v))
      })
      .collect();
    Self { rows }
  }

  pub fn rows(&self) -> &[[String; 5]] {
    &self.rows
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

impl fmt::Display for DetectionTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.rows.is_empty() {
      return writeln!(f, "未检测到溃疡");
    }

    let widths: Vec<usize> = COLUMNS
      .iter()
      .enumerate()
      .map(|(i, col)| {
        self
          .rows
          .iter()
          .map(|row| row[i].len())
          .chain(std::iter::once(col.len()))
          .max()
          .unwrap_or(0)
      })
      .collect();

    for (col, width) in COLUMNS.iter().zip(&widths) {
      write!(f, "{:>width$}  ", col, width = *width)?;
    }
    writeln!(f)?;
    for row in &self.rows {
      for (cell, width) in row.iter().zip(&widths) {
        write!(f, "{:>width$}  ", cell, width = *width)?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}
