// 该文件是 Shanan （山南西风） 项目的一部分。
// src/crop.rs - 裁剪模块
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

use thiserror::Error;

use crate::frame::StaticShape;

mod applier;
mod planner;
mod random_crop;

pub use self::applier::CropApplier;
pub use self::planner::{CropPlanner, Transformation};
pub use self::random_crop::{RandomCrop, RandomCropConfig};

#[derive(Error, Debug)]
pub enum CropError {
  #[error("RandomCrop 要求输入的高和宽完全已知, 实际形状: {0:?}")]
  InvalidShape(StaticShape),
  #[error("裁剪尺寸必须为正整数, 实际为 {height}x{width}")]
  InvalidConfig { height: usize, width: usize },
  #[error("张量维数不匹配: 期望 {expected}, 实际 {actual}")]
  RankMismatch { expected: &'static str, actual: usize },
  #[error("裁剪窗口越界: {axis} 轴起点 {start} + 长度 {size} > {len}")]
  OutOfBounds {
    axis: &'static str,
    start: usize,
    size: usize,
    len: usize,
  },
  #[error("边界框最后一维必须为 4, 实际为 {0}")]
  BoxChannels(usize),
}
