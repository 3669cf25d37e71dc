// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 配置解析
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

use std::str::FromStr;

use thiserror::Error;
use tracing::error;
use url::Url;

use crate::crop::CropError;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("JSON 错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("缺少参数: {0}")]
  MissingParameter(&'static str),
  #[error("参数 {name} 的值 '{value}' 无效")]
  InvalidParameter { name: &'static str, value: String },
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("配置无效: {0}")]
  Crop(#[from] CropError),
}

pub fn check_scheme(url: &Url, expected: &'static str) -> Result<(), ConfigError> {
  if url.scheme() != expected {
    error!("URI 方案不匹配: 期望 '{}', 实际 '{}'", expected, url.scheme());
    return Err(ConfigError::SchemeMismatch {
      expected,
      actual: url.scheme().to_string(),
    });
  }
  Ok(())
}

/// 取查询参数并解析；同名参数以最后一个为准
pub fn query_param<T: FromStr>(url: &Url, name: &'static str) -> Result<Option<T>, ConfigError> {
  let Some(value) = url
    .query_pairs()
    .filter(|(key, _)| key == name)
    .map(|(_, value)| value.into_owned())
    .last()
  else {
    return Ok(None);
  };

  value
    .parse()
    .map(Some)
    .map_err(|_| ConfigError::InvalidParameter { name, value })
}

pub fn required_param<T: FromStr>(url: &Url, name: &'static str) -> Result<T, ConfigError> {
  query_param(url, name)?.ok_or(ConfigError::MissingParameter(name))
}
