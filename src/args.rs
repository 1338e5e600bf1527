// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

use dfu_detect::{
  model::{DEFAULT_CONFIDENCE, DEFAULT_INPUT_SIZE, DEFAULT_IOU, ModelSpec},
  output::{ColorPolicy, DEFAULT_JPEG_QUALITY},
};

/// DFU Detect 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 可选模型，名称=地址，可重复；第一个为默认模型，例如 yolov8n=onnx:weights/yolov8n.onnx
  #[arg(
    long,
    value_name = "NAME=URL",
    default_values = ["yolov8n=onnx:weights/yolov8n.onnx", "yolov8x=onnx:weights/yolov8x.onnx"]
  )]
  pub model: Vec<ModelSpec>,

  /// 启动时使用的模型名称，默认为第一个模型
  #[arg(long, value_name = "NAME")]
  pub select: Option<String>,

  /// 模型输入尺寸
  #[arg(long, default_value_t = DEFAULT_INPUT_SIZE, value_name = "PIXELS")]
  pub input_size: u32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU, value_name = "THRESHOLD")]
  pub iou: f32,

  /// 检测框颜色：palette 或 #rrggbb
  #[arg(long, default_value = "palette", value_name = "COLOR")]
  pub color: ColorPolicy,

  /// 类别标签 JSON 文件，例如 {"0": "DFU"}
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 未登记类别显示为 "class <id>" 而不是 "None"
  #[arg(long)]
  pub numeric_labels: bool,

  /// 标签文字字体（TTF/OTF）
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 导出 JPEG 质量 (1 - 100)
  #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_name = "QUALITY")]
  pub jpeg_quality: u8,

  /// 输入图像；给出时以非交互方式处理并导出
  #[arg(long, value_name = "FILE")]
  pub input: Vec<PathBuf>,

  /// 导出的压缩包路径，默认按时间命名
  #[arg(long, value_name = "FILE")]
  pub output: Option<PathBuf>,
}
