// 该文件是 Shanan （山南西风） 项目的一部分。
// src/crop/planner.rs - 裁剪窗口规划
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

use tracing::{debug, warn};

use crate::{crop::CropError, frame::DataFormat, seed::SeedGenerator};

/// 一个批次共享的裁剪起点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transformation {
  pub h_start: usize,
  pub w_start: usize,
}

impl Transformation {
  pub fn new(h_start: usize, w_start: usize) -> Self {
    Self { h_start, w_start }
  }
}

impl From<(usize, usize)> for Transformation {
  fn from((h_start, w_start): (usize, usize)) -> Self {
    Self { h_start, w_start }
  }
}

/// 根据输入尺寸和训练标志决定裁剪起点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlanner {
  height: usize,
  width: usize,
  data_format: DataFormat,
}

impl CropPlanner {
  pub fn new(height: usize, width: usize, data_format: DataFormat) -> Self {
    Self {
      height,
      width,
      data_format,
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn data_format(&self) -> DataFormat {
    self.data_format
  }

  /// 取出输入的 `(height, width)`，任一未知即报错
  pub fn spatial_dims(&self, input_shape: &[Option<usize>]) -> Result<(usize, usize), CropError> {
    let invalid = || CropError::InvalidShape(input_shape.to_vec());
    let (h_axis, w_axis) = self
      .data_format
      .spatial_axes(input_shape.len())
      .ok_or_else(invalid)?;

    match (input_shape[h_axis], input_shape[w_axis]) {
      (Some(height), Some(width)) => Ok((height, width)),
      _ => Err(invalid()),
    }
  }

  /// 训练模式且输入在两个方向上都大于目标时随机取起点，否则取保持目标宽高比的中心窗口。
  pub fn plan(
    &self,
    input_shape: &[Option<usize>],
    training: bool,
    rng: &mut SeedGenerator,
  ) -> Result<Transformation, CropError> {
    let (input_height, input_width) = self.spatial_dims(input_shape)?;

    if training && input_height > self.height && input_width > self.width {
      // 先高后宽，顺序决定了同一种子下的结果
      let h_start = random_offset(rng, input_height - self.height);
      let w_start = random_offset(rng, input_width - self.width);
      let transformation = Transformation::new(h_start, w_start);
      debug!(
        "随机裁剪: 输入 {}x{}, 目标 {}x{}, 起点 {:?}",
        input_height, input_width, self.height, self.width, transformation
      );
      return Ok(transformation);
    }

    if training {
      warn!(
        "输入 {}x{} 不大于目标 {}x{}, 训练时退化为中心裁剪",
        input_height, input_width, self.height, self.width
      );
    }

    let (crop_height, crop_width) = self.center_window(input_height, input_width);
    let transformation = Transformation::new(
      (input_height - crop_height) / 2,
      (input_width - crop_width) / 2,
    );
    debug!(
      "中心裁剪: 输入 {}x{}, 窗口 {}x{}, 起点 {:?}",
      input_height, input_width, crop_height, crop_width, transformation
    );
    Ok(transformation)
  }

  /// 与目标宽高比一致的最大窗口 `(crop_height, crop_width)`
  ///
  /// 窗口大小不一定等于目标大小；切片仍按目标大小进行，缩放由调用方负责。
  pub fn center_window(&self, input_height: usize, input_width: usize) -> (usize, usize) {
    let crop_height = (input_width as f64 * self.height as f64 / self.width as f64) as usize;
    let crop_height = crop_height.min(input_height).max(1);
    let crop_width = (input_height as f64 * self.width as f64 / self.height as f64) as usize;
    let crop_width = crop_width.min(input_width).max(1);
    (crop_height, crop_width)
  }
}

/// 在 `[0, max_offset]` 上取整数：连续均匀采样后截断
fn random_offset(rng: &mut SeedGenerator, max_offset: usize) -> usize {
  truncate_offset(rng.uniform(0.0, (max_offset + 1) as f32), max_offset)
}

fn truncate_offset(sample: f32, max_offset: usize) -> usize {
  // (n + 1) 乘以略小于 1 的采样值时，f32 乘积可能舍入为 n + 1
  (sample as usize).min(max_offset)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn shape(dims: &[usize]) -> Vec<Option<usize>> {
    dims.iter().copied().map(Some).collect()
  }

  #[test]
  fn random_offsets_stay_in_range() {
    let planner = CropPlanner::new(50, 40, DataFormat::ChannelsLast);
    let mut rng = SeedGenerator::new(1234);
    for _ in 0..500 {
      let t = planner.plan(&shape(&[4, 80, 90, 3]), true, &mut rng).unwrap();
      assert!(t.h_start <= 30, "{t:?}");
      assert!(t.w_start <= 50, "{t:?}");
    }
  }

  #[test]
  fn truncated_offset_never_reaches_upper_bound() {
    assert_eq!(truncate_offset(0.0, 0), 0);
    assert_eq!(truncate_offset(2.999, 2), 2);
    assert_eq!(truncate_offset(3.0, 2), 2);

    // 小于 1 的最大 f32 采样值
    let below_one = 1.0f32 - f32::EPSILON / 2.0;
    for max_offset in [1usize, 99, 4095, 16_777_216, 16_777_218, 33_554_434] {
      let upper = (max_offset + 1) as f32;
      assert!(truncate_offset(below_one * upper, max_offset) <= max_offset);
      assert_eq!(truncate_offset(upper, max_offset), max_offset);
    }
  }

  #[test]
  fn random_offsets_cover_both_ends() {
    let planner = CropPlanner::new(8, 8, DataFormat::ChannelsLast);
    let mut rng = SeedGenerator::new(99);
    let mut seen = [false; 3];
    for _ in 0..500 {
      let t = planner.plan(&shape(&[1, 10, 10, 1]), true, &mut rng).unwrap();
      seen[t.h_start] = true;
    }
    assert_eq!(seen, [true; 3]);
  }

  #[test]
  fn same_seed_reproduces_plan() {
    let planner = CropPlanner::new(32, 32, DataFormat::ChannelsFirst);
    let input = shape(&[2, 3, 128, 96]);
    let mut a = SeedGenerator::new(2024);
    let mut b = SeedGenerator::new(2024);
    for _ in 0..10 {
      assert_eq!(
        planner.plan(&input, true, &mut a).unwrap(),
        planner.plan(&input, true, &mut b).unwrap()
      );
    }
  }

  #[test]
  fn inference_uses_center_window() {
    let planner = CropPlanner::new(50, 50, DataFormat::ChannelsLast);
    let mut rng = SeedGenerator::new(0);
    assert_eq!(planner.center_window(100, 200), (100, 100));
    let t = planner.plan(&shape(&[1, 100, 200, 3]), false, &mut rng).unwrap();
    assert_eq!(t, Transformation::new(0, 50));
  }

  #[test]
  fn center_window_keeps_target_aspect() {
    let planner = CropPlanner::new(30, 60, DataFormat::ChannelsLast);
    // 宽 100 -> 高 50，高 80 -> 宽 160 截到 100
    assert_eq!(planner.center_window(80, 100), (50, 100));
    let mut rng = SeedGenerator::new(0);
    let t = planner.plan(&shape(&[80, 100, 3]), false, &mut rng).unwrap();
    assert_eq!(t, Transformation::new(15, 0));
  }

  #[test]
  fn center_window_is_at_least_one_pixel() {
    let planner = CropPlanner::new(1, 1000, DataFormat::ChannelsLast);
    assert_eq!(planner.center_window(10, 10), (1, 10));
  }

  #[test]
  fn small_training_input_falls_back_to_center() {
    let planner = CropPlanner::new(64, 64, DataFormat::ChannelsLast);
    let mut rng = SeedGenerator::new(5);
    let before = rng.clone().uniform(0.0, 1.0);
    let t = planner.plan(&shape(&[1, 64, 200, 3]), true, &mut rng).unwrap();
    assert_eq!(t, Transformation::new(0, 68));
    // 中心裁剪不消耗随机数
    assert_eq!(rng.uniform(0.0, 1.0), before);
  }

  #[test]
  fn unknown_spatial_dims_are_rejected() {
    let planner = CropPlanner::new(8, 8, DataFormat::ChannelsLast);
    let mut rng = SeedGenerator::new(0);
    let err = planner
      .plan(&[Some(1), None, Some(16), Some(3)], true, &mut rng)
      .unwrap_err();
    assert!(matches!(err, CropError::InvalidShape(ref s) if s[1].is_none()));

    let planner = CropPlanner::new(8, 8, DataFormat::ChannelsFirst);
    assert!(planner.plan(&[Some(1), Some(3), Some(16), None], false, &mut rng).is_err());
    assert!(planner.plan(&[Some(16)], false, &mut rng).is_err());
  }
}
