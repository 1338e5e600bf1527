// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/model/labels.rs - 类别标签映射
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

use std::{borrow::Cow, collections::BTreeMap, path::Path};

use thiserror::Error;

const NONE_LABEL: &str = "None";

/// 未登记类别的标签策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelFallback {
  /// 显示为 "None"
  #[default]
  None,
  /// 显示为 "class <id>"
  Numeric,
}

#[derive(Error, Debug)]
pub enum LabelMapError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("类别编号无效: {0}")]
  InvalidClassId(String),
}

/// 类别编号到标签文本的映射，进程启动时确定，之后只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
  names: BTreeMap<u32, String>,
  fallback: LabelFallback,
}

impl Default for LabelMap {
  fn default() -> Self {
    Self::new([(0, "DFU".to_string())], LabelFallback::default())
  }
}

impl LabelMap {
  pub fn new(names: impl IntoIterator<Item = (u32, String)>, fallback: LabelFallback) -> Self {
    Self {
      names: names.into_iter().collect(),
      fallback,
    }
  }

  pub fn with_fallback(mut self, fallback: LabelFallback) -> Self {
    self.fallback = fallback;
    self
  }

  /// 解析形如 `{"0": "DFU", "1": "UPD"}` 的 JSON 对象
  pub fn from_json(text: &str) -> Result<Self, LabelMapError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(text)?;
    let names = raw
      .into_iter()
      .map(|(id, name)| {
        id.trim()
          .parse::<u32>()
          .map(|id| (id, name))
          .map_err(|_| LabelMapError::InvalidClassId(id))
      })
      .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(Self {
      names,
      fallback: LabelFallback::default(),
    })
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelMapError> {
    let text = std::fs::read_to_string(path)?;
    Self::from_json(&text)
  }

  pub fn label(&self, class_id: u32) -> Cow<'_, str> {
    match self.names.get(&class_id) {
      Some(name) => Cow::Borrowed(name.as_str()),
      None => match self.fallback {
        LabelFallback::None => Cow::Borrowed(NONE_LABEL),
        LabelFallback::Numeric => Cow::Owned(format!("class {}", class_id)),
      },
    }
  }
}
