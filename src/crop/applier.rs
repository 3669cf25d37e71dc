// 该文件是 Shanan （山南西风） 项目的一部分。
// src/crop/applier.rs - 将裁剪窗口应用到图像、掩码与边界框
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

use ndarray::{Axis, Slice};

use crate::{
  bounding_box::BoundingBoxes,
  crop::{CropError, Transformation},
  frame::{DataFormat, StaticShape, Tensor},
};

const IMAGE_RANK: usize = 4;
const BOX_COORDS: usize = 4;

/// 按固定的目标大小切片；同一个 [`Transformation`] 作用于所有数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropApplier {
  height: usize,
  width: usize,
  data_format: DataFormat,
}

impl CropApplier {
  pub fn new(height: usize, width: usize, data_format: DataFormat) -> Self {
    Self {
      height,
      width,
      data_format,
    }
  }

  /// 从 `(h_start, w_start)` 切出 `(height, width)` 窗口，批次与通道维不变
  pub fn apply_to_images(
    &self,
    images: &Tensor,
    transformation: &Transformation,
  ) -> Result<Tensor, CropError> {
    if images.ndim() != IMAGE_RANK {
      return Err(CropError::RankMismatch {
        expected: "4",
        actual: images.ndim(),
      });
    }
    let (h_axis, w_axis) = self
      .data_format
      .spatial_axes(IMAGE_RANK)
      .ok_or(CropError::RankMismatch {
        expected: "4",
        actual: images.ndim(),
      })?;

    let Transformation { h_start, w_start } = *transformation;
    check_bounds("height", h_start, self.height, images.len_of(Axis(h_axis)))?;
    check_bounds("width", w_start, self.width, images.len_of(Axis(w_axis)))?;

    let window = images.slice_each_axis(|axis| {
      let index = axis.axis.index();
      if index == h_axis {
        Slice::from(h_start..h_start + self.height)
      } else if index == w_axis {
        Slice::from(w_start..w_start + self.width)
      } else {
        Slice::from(..)
      }
    });

    Ok(window.to_owned())
  }

  /// 掩码与图像使用完全相同的切片，保证像素对齐
  pub fn apply_to_segmentation_masks(
    &self,
    masks: &Tensor,
    transformation: &Transformation,
  ) -> Result<Tensor, CropError> {
    self.apply_to_images(masks, transformation)
  }

  pub fn apply_to_labels(&self, labels: Tensor, _transformation: &Transformation) -> Tensor {
    labels
  }

  /// 坐标通道 0/2 减去 `h_start`，1/3 减去 `w_start`，再截断到不小于 0。
  /// 超出窗口的框不会被删除。
  pub fn apply_to_bounding_boxes(
    &self,
    bounding_boxes: BoundingBoxes,
    transformation: &Transformation,
  ) -> Result<BoundingBoxes, CropError> {
    let BoundingBoxes { mut boxes, labels } = bounding_boxes;
    let rank = boxes.ndim();
    if rank != 2 && rank != 3 {
      return Err(CropError::RankMismatch {
        expected: "2 or 3",
        actual: rank,
      });
    }
    let coords = boxes.len_of(Axis(rank - 1));
    if coords != BOX_COORDS {
      return Err(CropError::BoxChannels(coords));
    }

    let h_start = transformation.h_start as f32;
    let w_start = transformation.w_start as f32;
    for mut row in boxes.lanes_mut(Axis(rank - 1)) {
      row[0] = (row[0] - h_start).max(0.0);
      row[1] = (row[1] - w_start).max(0.0);
      row[2] = (row[2] - h_start).max(0.0);
      row[3] = (row[3] - w_start).max(0.0);
    }

    Ok(BoundingBoxes { boxes, labels })
  }

  /// 静态形状推断：空间维替换为目标大小
  pub fn compute_output_shape(&self, input_shape: &[Option<usize>]) -> Result<StaticShape, CropError> {
    let (h_axis, w_axis) = self
      .data_format
      .spatial_axes(input_shape.len())
      .ok_or(CropError::RankMismatch {
        expected: "3 or 4",
        actual: input_shape.len(),
      })?;

    let mut output_shape = input_shape.to_vec();
    output_shape[h_axis] = Some(self.height);
    output_shape[w_axis] = Some(self.width);
    Ok(output_shape)
  }
}

fn check_bounds(axis: &'static str, start: usize, size: usize, len: usize) -> Result<(), CropError> {
  if start + size > len {
    return Err(CropError::OutOfBounds {
      axis,
      start,
      size,
      len,
    });
  }
  Ok(())
}
