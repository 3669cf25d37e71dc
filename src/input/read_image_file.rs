// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use ndarray::Axis;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{DataFormat, rgb_image_to_tensor},
  layer::Inputs,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemaMismatch(String),
  #[error("路径解码失败: {0}")]
  PathDecode(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 读取单张图像，作为一个批次大小为 1 的 `f32` 张量输出
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch(url.scheme().to_string()));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| ImageFileInputError::PathDecode(e.to_string()))?;
    let image = ImageReader::open(&*path)?.decode()?;
    info!("读取图像 {}: {}x{}", path, image.width(), image.height());

    Ok(ImageFileInput {
      image: Some(image.into_rgb8()),
    })
  }
}

impl From<RgbImage> for ImageFileInput {
  fn from(image: RgbImage) -> Self {
    Self { image: Some(image) }
  }
}

impl ImageFileInput {
  pub fn into_format(self, data_format: DataFormat) -> ImageFileInputIter {
    ImageFileInputIter {
      inner: self,
      data_format,
    }
  }

  pub fn into_nchw(self) -> ImageFileInputIter {
    self.into_format(DataFormat::ChannelsFirst)
  }

  pub fn into_nhwc(self) -> ImageFileInputIter {
    self.into_format(DataFormat::ChannelsLast)
  }
}

pub struct ImageFileInputIter {
  inner: ImageFileInput,
  data_format: DataFormat,
}

impl Iterator for ImageFileInputIter {
  type Item = Inputs;

  fn next(&mut self) -> Option<Self::Item> {
    let image = self.inner.image.take()?;
    let batch = rgb_image_to_tensor(&image, self.data_format).insert_axis(Axis(0));
    Some(Inputs::Images(batch))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn sample() -> RgbImage {
    RgbImage::from_fn(4, 2, |x, y| Rgb([x as u8, y as u8, 9]))
  }

  #[test]
  fn yields_one_nhwc_batch() {
    let mut iter = ImageFileInput::from(sample()).into_nhwc();
    let batch = iter.next().unwrap().into_images();
    assert_eq!(batch.shape(), &[1, 2, 4, 3]);
    assert_eq!(batch[[0, 1, 3, 0]], 3.0);
    assert_eq!(batch[[0, 1, 3, 1]], 1.0);
    assert!(iter.next().is_none());
  }

  #[test]
  fn yields_nchw_batch() {
    let batch = ImageFileInput::from(sample())
      .into_nchw()
      .next()
      .unwrap()
      .into_images();
    assert_eq!(batch.shape(), &[1, 3, 2, 4]);
    assert_eq!(batch[[0, 2, 0, 0]], 9.0);
  }

  #[test]
  fn degenerate_image_still_yields_batch() {
    let mut iter = ImageFileInput::from(RgbImage::new(0, 5)).into_nchw();
    let batch = iter.next().expect("空宽度图像也应产出批次").into_images();
    assert_eq!(batch.shape(), &[1, 3, 5, 0]);
    assert!(iter.next().is_none());
  }

  #[test]
  fn reads_percent_encoded_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a b.png");
    sample().save(&path).unwrap();
    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file", "image", 1)).unwrap();
    let batch = ImageFileInput::from_url(&url)
      .unwrap()
      .into_nhwc()
      .next()
      .unwrap();
    assert_eq!(batch.images().shape(), &[1, 2, 4, 3]);
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("v4l:///dev/video0").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch(_))
    ));
  }
}
