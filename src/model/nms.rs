// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/model/nms.rs - 置信度过滤与非极大值抑制
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

use crate::model::{DetectParams, Detection};

/// 按置信度阈值过滤候选框，再做逐类别的非极大值抑制
///
/// 结果按置信度从高到低排列；同类别中与已保留框 IoU 超过阈值的候选被丢弃。
pub fn suppress(candidates: Vec<Detection>, params: &DetectParams) -> Vec<Detection> {
  let mut candidates: Vec<Detection> = candidates
    .into_iter()
    .filter(|det| det.score() >= params.confidence())
    .collect();
  candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));

  let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
  for det in candidates {
    let overlapped = kept
      .iter()
      .any(|k| k.class_id() == det.class_id() && k.iou(&det) > params.iou());
    if !overlapped {
      kept.push(det);
    }
  }
  kept
}
