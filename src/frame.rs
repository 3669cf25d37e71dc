// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 张量布局与帧转换
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

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 工作精度下的张量
pub type Tensor = ArrayD<f32>;

/// 静态形状，`None` 表示该维度未知
pub type StaticShape = Vec<Option<usize>>;

#[cfg(feature = "image")]
const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("未知的数据布局: {0}")]
  UnknownDataFormat(String),
  #[error("期望 3 维 RGB 张量, 实际形状 {0:?}")]
  NotRgb(Vec<usize>),
  #[error("张量形状错误: {0}")]
  Shape(#[from] ndarray::ShapeError),
}

/// 图像张量的轴顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
  /// NCHW / CHW
  ChannelsFirst,
  /// NHWC / HWC
  #[default]
  ChannelsLast,
}

impl DataFormat {
  /// 高、宽所在的轴（从张量末尾计数），返回值为 `(height_axis, width_axis)`
  pub fn spatial_axes(&self, rank: usize) -> Option<(usize, usize)> {
    match self {
      DataFormat::ChannelsFirst => rank.checked_sub(2).map(|h| (h, h + 1)),
      DataFormat::ChannelsLast => rank.checked_sub(3).map(|h| (h, h + 1)),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      DataFormat::ChannelsFirst => "channels_first",
      DataFormat::ChannelsLast => "channels_last",
    }
  }
}

impl fmt::Display for DataFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DataFormat {
  type Err = FrameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "channels_first" | "nchw" | "chw" => Ok(DataFormat::ChannelsFirst),
      "channels_last" | "nhwc" | "hwc" => Ok(DataFormat::ChannelsLast),
      _ => Err(FrameError::UnknownDataFormat(s.to_string())),
    }
  }
}

/// 运行时张量的静态形状（所有维度均已知）
pub fn static_shape(tensor: &Tensor) -> StaticShape {
  tensor.shape().iter().copied().map(Some).collect()
}

/// 转换到工作精度
pub fn to_working_precision<T: Copy + Into<f32>>(array: &ArrayD<T>) -> Tensor {
  array.mapv(Into::into)
}

/// RGB 图像转为 3 维张量（HWC 或 CHW）
#[cfg(feature = "image")]
pub fn rgb_image_to_tensor(image: &image::RgbImage, data_format: DataFormat) -> Tensor {
  let (width, height) = image.dimensions();
  let (height, width) = (height as usize, width as usize);
  let pixel = |x: usize, y: usize, c: usize| image.get_pixel(x as u32, y as u32)[c];
  let tensor = match data_format {
    DataFormat::ChannelsLast => {
      ndarray::Array3::from_shape_fn((height, width, RGB_CHANNELS), |(y, x, c)| pixel(x, y, c))
    }
    DataFormat::ChannelsFirst => {
      ndarray::Array3::from_shape_fn((RGB_CHANNELS, height, width), |(c, y, x)| pixel(x, y, c))
    }
  };
  to_working_precision(&tensor.into_dyn())
}

/// 3 维张量转回 RGB 图像，数值截断到 0..=255
#[cfg(feature = "image")]
pub fn tensor_to_rgb_image(
  tensor: &Tensor,
  data_format: DataFormat,
) -> Result<image::RgbImage, FrameError> {
  let hwc = tensor.view().into_dimensionality::<ndarray::Ix3>()?;
  let hwc = match data_format {
    DataFormat::ChannelsLast => hwc,
    DataFormat::ChannelsFirst => hwc.permuted_axes([1, 2, 0]),
  };

  let (height, width, channels) = hwc.dim();
  if channels != RGB_CHANNELS {
    return Err(FrameError::NotRgb(tensor.shape().to_vec()));
  }

  Ok(image::ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
    let (x, y) = (x as usize, y as usize);
    image::Rgb([
      hwc[[y, x, 0]].round().clamp(0.0, 255.0) as u8,
      hwc[[y, x, 1]].round().clamp(0.0, 255.0) as u8,
      hwc[[y, x, 2]].round().clamp(0.0, 255.0) as u8,
    ])
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::IxDyn;

  #[test]
  fn spatial_axes_follow_format() {
    assert_eq!(DataFormat::ChannelsLast.spatial_axes(4), Some((1, 2)));
    assert_eq!(DataFormat::ChannelsLast.spatial_axes(3), Some((0, 1)));
    assert_eq!(DataFormat::ChannelsFirst.spatial_axes(4), Some((2, 3)));
    assert_eq!(DataFormat::ChannelsFirst.spatial_axes(3), Some((1, 2)));
    assert_eq!(DataFormat::ChannelsLast.spatial_axes(2), None);
    assert_eq!(DataFormat::ChannelsFirst.spatial_axes(1), None);
  }

  #[test]
  fn data_format_parses_aliases() {
    assert_eq!("NCHW".parse::<DataFormat>().unwrap(), DataFormat::ChannelsFirst);
    assert_eq!("channels_last".parse::<DataFormat>().unwrap(), DataFormat::ChannelsLast);
    assert!("planar".parse::<DataFormat>().is_err());
    assert_eq!(DataFormat::default(), DataFormat::ChannelsLast);
  }

  #[test]
  fn data_format_serializes_snake_case() {
    let json = serde_json::to_string(&DataFormat::ChannelsFirst).unwrap();
    assert_eq!(json, "\"channels_first\"");
  }

  #[test]
  fn casts_bytes_to_working_precision() {
    let bytes = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0u8, 1, 128, 255]).unwrap();
    let tensor = to_working_precision(&bytes);
    assert_eq!(tensor.as_slice().unwrap(), &[0.0, 1.0, 128.0, 255.0]);
    assert_eq!(static_shape(&tensor), vec![Some(2), Some(2)]);
  }

  #[cfg(feature = "image")]
  #[test]
  fn rgb_image_round_trips_through_channels_first() {
    let image = image::RgbImage::from_fn(4, 3, |x, y| image::Rgb([x as u8, y as u8, 7]));
    let tensor = rgb_image_to_tensor(&image, DataFormat::ChannelsFirst);
    assert_eq!(tensor.shape(), &[3, 3, 4]);
    assert_eq!(tensor[[0, 2, 3]], 3.0);
    assert_eq!(tensor[[1, 2, 3]], 2.0);
    assert_eq!(tensor[[2, 0, 0]], 7.0);

    let back = tensor_to_rgb_image(&tensor, DataFormat::ChannelsFirst).unwrap();
    assert_eq!(back, image);
  }

  #[cfg(feature = "image")]
  #[test]
  fn rejects_non_rgb_tensor() {
    let tensor = Tensor::zeros(IxDyn(&[2, 2, 4]));
    assert!(matches!(
      tensor_to_rgb_image(&tensor, DataFormat::ChannelsLast),
      Err(FrameError::NotRgb(_))
    ));
  }
}
