// 该文件是 DFU Detect （足部溃疡检测） 项目的一部分。
// src/input.rs - 上传图像输入
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

use std::{
  io::Cursor,
  path::{Path, PathBuf},
};

use image::{ImageFormat, ImageReader, RgbImage};
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub const SUPPORTED_FORMATS: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Bmp];

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("URI scheme mismatch: expected '{expected}', found '{found}'")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
  #[error("I/O error reading {path}: {source}")]
  IoError {
    path: String,
    source: std::io::Error,
  },
  #[error("{name} has no file name")]
  MissingName { name: String },
  #[error("{name} is not a supported image format")]
  UnsupportedFormat { name: String },
  #[error("{name} could not be decoded: {source}")]
  DecodeError {
    name: String,
    source: image::ImageError,
  },
}

/// 未能读取的上传文件：文件名与原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
  pub name: String,
  pub reason: String,
}

/// 用户上传的一个文件：文件名加原始字节，解码推迟到检测时
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
  name: String,
  bytes: Vec<u8>,
}

impl FromUrlWithScheme for Upload {
  const SCHEME: &'static str = "image";
}

impl FromUrl for Upload {
  type Error = UploadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(UploadError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    Self::from_path(url.path())
  }
}

impl Upload {
  pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
    Self {
      name: name.into(),
      bytes,
    }
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
    let path = path.as_ref();
    let name = path
      .file_name()
      .and_then(|name| name.to_str())
      .ok_or_else(|| UploadError::MissingName {
        name: path.display().to_string(),
      })?
      .to_string();
    let bytes = std::fs::read(path).map_err(|source| UploadError::IoError {
      path: path.display().to_string(),
      source,
    })?;
    Ok(Self { name, bytes })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// 读取本地路径或 image:///path/to/foot.jpg 形式的地址
  pub fn from_source(source: &Path) -> Result<Self, UploadError> {
    let url = source
      .to_str()
      .and_then(|s| Url::parse(s).ok())
      .filter(|url| url.scheme() == Self::SCHEME);
    match url {
      Some(url) => Self::from_url(&url),
      None => Self::from_path(source),
    }
  }

  /// 按内容识别格式并解码为 RGB 图像，每次调用都返回新的缓冲区
  pub fn decode(&self) -> Result<RgbImage, UploadError> {
    let reader = ImageReader::new(Cursor::new(&self.bytes))
      .with_guessed_format()
      .map_err(|source| UploadError::IoError {
        path: self.name.clone(),
        source,
      })?;

    match reader.format() {
      Some(format) if SUPPORTED_FORMATS.contains(&format) => {}
      _ => {
        return Err(UploadError::UnsupportedFormat {
          name: self.name.clone(),
        });
      }
    }

    let image = reader.decode().map_err(|source| UploadError::DecodeError {
      name: self.name.clone(),
      source,
    })?;
    Ok(image.to_rgb8())
  }
}

/// 逐个读取上传文件；读取失败的文件不会丢弃，而是连同原因一并返回
pub fn read_files(sources: &[PathBuf]) -> (Vec<Upload>, Vec<UploadFailure>) {
  let mut uploads = Vec::with_capacity(sources.len());
  let mut failures = Vec::new();
  for source in sources {
    match Upload::from_source(source) {
      Ok(upload) => uploads.push(upload),
      Err(e) => {
        error!("{}", e);
        let name = source
          .file_name()
          .and_then(|name| name.to_str())
          .map(str::to_string)
          .unwrap_or_else(|| source.display().to_string());
        failures.push(UploadFailure {
          name,
          reason: e.to_string(),
        });
      }
    }
  }
  (uploads, failures)
}
