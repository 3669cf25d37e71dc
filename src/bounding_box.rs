// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bounding_box.rs - 边界框定义
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
use std::str::FromStr;

use ndarray::Axis;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::Tensor;

#[derive(Error, Debug)]
#[error("未知的边界框格式: {0}")]
pub struct UnknownBoundingBoxFormat(pub String);

/// 边界框坐标的排列方式（像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundingBoxFormat {
  /// [x_min, y_min, x_max, y_max]
  Xyxy,
  /// [y_min, x_min, y_max, x_max]
  Yxyx,
  /// [x_min, y_min, width, height]
  Xywh,
  /// [x_center, y_center, width, height]
  CenterXywh,
}

impl BoundingBoxFormat {
  pub fn as_str(&self) -> &'static str {
    match self {
      BoundingBoxFormat::Xyxy => "xyxy",
      BoundingBoxFormat::Yxyx => "yxyx",
      BoundingBoxFormat::Xywh => "xywh",
      BoundingBoxFormat::CenterXywh => "center_xywh",
    }
  }

  /// 转为 `[x_min, y_min, x_max, y_max]`
  pub fn to_xyxy(&self, coords: [f32; 4]) -> [f32; 4] {
    let [a, b, c, d] = coords;
    match self {
      BoundingBoxFormat::Xyxy => [a, b, c, d],
      BoundingBoxFormat::Yxyx => [b, a, d, c],
      BoundingBoxFormat::Xywh => [a, b, a + c, b + d],
      BoundingBoxFormat::CenterXywh => [a - c / 2.0, b - d / 2.0, a + c / 2.0, b + d / 2.0],
    }
  }
}

impl fmt::Display for BoundingBoxFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BoundingBoxFormat {
  type Err = UnknownBoundingBoxFormat;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "xyxy" => Ok(BoundingBoxFormat::Xyxy),
      "yxyx" => Ok(BoundingBoxFormat::Yxyx),
      "xywh" => Ok(BoundingBoxFormat::Xywh),
      "center_xywh" => Ok(BoundingBoxFormat::CenterXywh),
      _ => Err(UnknownBoundingBoxFormat(s.to_string())),
    }
  }
}

/// 一组边界框及其标签
///
/// `boxes` 为 `(num_boxes, 4)` 或 `(batch, num_boxes, 4)`，
/// `labels` 与之对应，形状由调用方决定，变换时原样保留。
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxes {
  pub boxes: Tensor,
  pub labels: Tensor,
}

impl BoundingBoxes {
  pub fn new(boxes: Tensor, labels: Tensor) -> Self {
    Self { boxes, labels }
  }

  pub fn is_batched(&self) -> bool {
    self.boxes.ndim() == 3
  }

  /// 单样本加一个批次维度
  pub fn expand_batch(self) -> Self {
    Self {
      boxes: self.boxes.insert_axis(Axis(0)),
      labels: self.labels.insert_axis(Axis(0)),
    }
  }

  /// 去掉长度为 1 的批次维度
  pub fn squeeze_batch(self) -> Self {
    Self {
      boxes: self.boxes.index_axis_move(Axis(0), 0),
      labels: self.labels.index_axis_move(Axis(0), 0),
    }
  }

  /// 按行迭代坐标，批次维度被展平
  pub fn iter_coords(&self) -> impl Iterator<Item = [f32; 4]> + '_ {
    let last = self.boxes.ndim().saturating_sub(1);
    self
      .boxes
      .lanes(Axis(last))
      .into_iter()
      .filter(|lane| lane.len() == 4)
      .map(|lane| [lane[0], lane[1], lane[2], lane[3]])
  }
}
