// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/command.rs - 交互命令解析
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

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
  #[error("未知命令: {0}，输入 help 查看帮助")]
  Unknown(String),
  #[error("用法: {0}")]
  Usage(&'static str),
  #[error("数值无效: {0}")]
  InvalidNumber(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Upload(Vec<PathBuf>),
  Confidence(f32),
  Iou(f32),
  Model(Option<String>),
  Detect,
  Table,
  Save { name: String, path: PathBuf },
  Export(Option<PathBuf>),
  Clear,
  Status,
  Help,
  Quit,
}

pub const HELP: &str = "\
upload <文件>...      上传图像（替换当前批次）
confidence <0-1>      设置置信度阈值
iou <0-1>             设置 NMS IoU 阈值
model [名称]          列出或切换模型
detect                检测尚未处理的图像
table                 显示检测结果表格
save <文件名> <路径>  保存单张标注图像
export [路径]         导出 zip 压缩包
clear                 清空批次
status                显示当前状态
help                  显示帮助
quit                  退出";

fn number(value: Option<&str>, usage: &'static str) -> Result<f32, CommandError> {
  let value = value.ok_or(CommandError::Usage(usage))?;
  value
    .parse()
    .map_err(|_| CommandError::InvalidNumber(value.to_string()))
}

impl std::str::FromStr for Command {
  type Err = CommandError;

  fn from_str(line: &str) -> Result<Self, Self::Err> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
      return Err(CommandError::Usage("help"));
    };
    let rest: Vec<&str> = words.collect();

    match head.to_ascii_lowercase().as_str() {
      "upload" if !rest.is_empty() => Ok(Command::Upload(rest.into_iter().map(PathBuf::from).collect())),
      "upload" => Err(CommandError::Usage("upload <文件>...")),
      "confidence" => Ok(Command::Confidence(number(rest.first().copied(), "confidence <0-1>")?)),
      "iou" => Ok(Command::Iou(number(rest.first().copied(), "iou <0-1>")?)),
      "model" => Ok(Command::Model(rest.first().map(|name| name.to_string()))),
      "detect" => Ok(Command::Detect),
      "table" => Ok(Command::Table),
      "save" => match rest.as_slice() {
        [name, path] => Ok(Command::Save {
          name: name.to_string(),
          path: PathBuf::from(path),
        }),
        _ => Err(CommandError::Usage("save <文件名> <路径>")),
      },
      "export" => Ok(Command::Export(rest.first().map(PathBuf::from))),
      "clear" => Ok(Command::Clear),
      "status" => Ok(Command::Status),
      "help" | "?" => Ok(Command::Help),
      "quit" | "exit" => Ok(Command::Quit),
      other => Err(CommandError::Unknown(other.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_upload_paths() {
    let cmd: Command = "upload a.jpg b.png".parse().unwrap();
    assert_eq!(
      cmd,
      Command::Upload(vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")])
    );
  }

  #[test]
  fn parses_thresholds() {
    assert_eq!("confidence 0.5".parse(), Ok(Command::Confidence(0.5)));
    assert_eq!(
      "iou x".parse::<Command>(),
      Err(CommandError::InvalidNumber("x".to_string()))
    );
    assert!("confidence".parse::<Command>().is_err());
  }

  #[test]
  fn export_path_is_optional() {
    assert_eq!("export".parse(), Ok(Command::Export(None)));
    assert_eq!(
      "export out.zip".parse(),
      Ok(Command::Export(Some(PathBuf::from("out.zip"))))
    );
  }

  #[test]
  fn model_name_is_optional() {
    assert_eq!("model".parse(), Ok(Command::Model(None)));
    assert_eq!(
      "model yolov8x".parse(),
      Ok(Command::Model(Some("yolov8x".to_string())))
    );
  }

  #[test]
  fn unknown_command_is_reported() {
    assert_eq!(
      "launch".parse::<Command>(),
      Err(CommandError::Unknown("launch".to_string()))
    );
  }
}
