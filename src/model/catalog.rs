// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/model/catalog.rs - 可选模型列表
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

use std::{collections::BTreeSet, path::Path, str::FromStr};

use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
  #[error("模型地址无效: {0}")]
  InvalidUrl(String),
  #[error("无法从 {0} 推断模型名称，请使用 名称=地址 形式")]
  MissingName(String),
  #[error("模型名称重复: {0}")]
  DuplicateName(String),
  #[error("模型列表为空")]
  Empty,
}

/// 一个可选模型：名称与加载地址，例如 yolov8n=onnx:weights/yolov8n.onnx
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
  name: String,
  url: Url,
}

impl ModelSpec {
  pub fn new(name: impl Into<String>, url: Url) -> Self {
    Self {
      name: name.into(),
      url,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  /// 模型文件路径，用于加载失败时的提示
  pub fn path(&self) -> &str {
    self.url.path()
  }
}

impl FromStr for ModelSpec {
  type Err = CatalogError;

  /// 接受 `名称=地址` 或单独的地址；后者以文件名（去掉扩展名）为名称
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let (name, url) = match s.split_once('=') {
      Some((name, url)) if !name.contains(':') => (Some(name.trim()), url.trim()),
      _ => (None, s),
    };
    let url = Url::parse(url).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", url, e)))?;

    let name = match name {
      Some(name) if !name.is_empty() => name.to_string(),
      Some(_) => return Err(CatalogError::MissingName(s.to_string())),
      None => Path::new(url.path())
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| CatalogError::MissingName(s.to_string()))?
        .to_string(),
    };
    Ok(Self { name, url })
  }
}

/// 启动时确定的模型列表，第一项为默认模型
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
  models: Vec<ModelSpec>,
}

impl ModelCatalog {
  pub fn new(models: Vec<ModelSpec>) -> Result<Self, CatalogError> {
    if models.is_empty() {
      return Err(CatalogError::Empty);
    }
    let mut seen = BTreeSet::new();
    for model in &models {
      if !seen.insert(model.name()) {
        return Err(CatalogError::DuplicateName(model.name().to_string()));
      }
    }
    Ok(Self { models })
  }

  pub fn default_model(&self) -> &ModelSpec {
    // new 保证非空
    &self.models[0]
  }

  pub fn get(&self, name: &str) -> Option<&ModelSpec> {
    self.models.iter().find(|model| model.name() == name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.models.iter().map(ModelSpec::name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_named_entry() {
    let spec: ModelSpec = "yolov8x=onnx:weights/yolov8x.onnx".parse().unwrap();
    assert_eq!(spec.name(), "yolov8x");
    assert_eq!(spec.url().scheme(), "onnx");
    assert_eq!(spec.path(), "weights/yolov8x.onnx");
  }

  #[test]
  fn bare_url_is_named_after_the_file() {
    let spec: ModelSpec = "onnx:///opt/models/best.onnx".parse().unwrap();
    assert_eq!(spec.name(), "best");
    assert_eq!(spec.path(), "/opt/models/best.onnx");
  }

  #[test]
  fn rejects_bad_entries() {
    assert!(matches!("yolo=not a url".parse::<ModelSpec>(), Err(CatalogError::InvalidUrl(_))));
    assert!(matches!("=onnx:a.onnx".parse::<ModelSpec>(), Err(CatalogError::MissingName(_))));
  }

  #[test]
  fn catalog_requires_unique_names() {
    let a: ModelSpec = "a=onnx:a.onnx".parse().unwrap();
    let b: ModelSpec = "a=onnx:b.onnx".parse().unwrap();
    assert_eq!(ModelCatalog::new(vec![]), Err(CatalogError::Empty));
    assert_eq!(
      ModelCatalog::new(vec![a.clone(), b]),
      Err(CatalogError::DuplicateName("a".to_string()))
    );

    let catalog = ModelCatalog::new(vec![a]).unwrap();
    assert_eq!(catalog.default_model().name(), "a");
    assert!(catalog.get("b").is_none());
  }
}
