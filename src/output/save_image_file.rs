// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::Axis;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  bounding_box::{BoundingBoxFormat, BoundingBoxes},
  config::{self, ConfigError},
  frame::{DataFormat, FrameError, tensor_to_rgb_image},
  layer::Inputs,
  output::{
    Render,
    draw::{Draw, Record},
  },
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("张量无法转为图像: {0}")]
  FrameError(#[from] FrameError),
  #[error("配置错误: {0}")]
  ConfigError(#[from] ConfigError),
  #[error("路径解码失败: {0}")]
  PathDecode(String),
  #[error("图像张量应为 3 维或 4 维, 实际形状 {0:?}")]
  ImageRank(Vec<usize>),
}

/// `image:///path/out.png[?data_format=..][&bounding_box_format=..][&record=true]`
///
/// 批量输入时逐张保存为 `out_0.png`、`out_1.png` ……
pub struct SaveImageFileOutput {
  path: PathBuf,
  data_format: DataFormat,
  bounding_box_format: BoundingBoxFormat,
  draw: Draw,
  record: bool,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    Self::from_url_with_data_format(uri, DataFormat::default())
  }
}

impl SaveImageFileOutput {
  /// URL 未给出 `data_format` 时使用 `fallback`
  pub fn from_url_with_data_format(
    uri: &Url,
    fallback: DataFormat,
  ) -> Result<Self, SaveImageFileError> {
    config::check_scheme(uri, Self::SCHEME)?;

    let path = urlencoding::decode(uri.path())
      .map_err(|e| SaveImageFileError::PathDecode(e.to_string()))?
      .into_owned();

    Ok(SaveImageFileOutput {
      path: PathBuf::from(path),
      data_format: config::query_param(uri, "data_format")?.unwrap_or(fallback),
      bounding_box_format: config::query_param(uri, "bounding_box_format")?
        .unwrap_or(BoundingBoxFormat::Yxyx),
      draw: Draw::default(),
      record: config::query_param(uri, "record")?.unwrap_or(false),
    })
  }

  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      data_format: DataFormat::default(),
      bounding_box_format: BoundingBoxFormat::Yxyx,
      draw: Draw::default(),
      record: false,
    }
  }

  pub fn with_data_format(mut self, data_format: DataFormat) -> Self {
    self.data_format = data_format;
    self
  }

  pub fn with_bounding_box_format(mut self, format: BoundingBoxFormat) -> Self {
    self.bounding_box_format = format;
    self
  }

  pub fn with_record(mut self, record: bool) -> Self {
    self.record = record;
    self
  }

  fn indexed_path(&self, index: usize) -> PathBuf {
    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let name = match self.path.extension() {
      Some(ext) => format!("{}_{}.{}", stem, index, ext.to_string_lossy()),
      None => format!("{}_{}", stem, index),
    };
    self.path.with_file_name(name)
  }

  fn save_image(&self, image: &RgbImage, path: &Path) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(path)?;

    info!("保存图像到文件: {}", path.display());

    Ok(())
  }

  fn render_one(
    &self,
    image: &crate::frame::Tensor,
    boxes: Option<&BoundingBoxes>,
    path: &Path,
  ) -> Result<(), SaveImageFileError> {
    let mut image = tensor_to_rgb_image(image, self.data_format)?;
    if let Some(boxes) = boxes {
      self
        .draw
        .draw_boxes(&mut image, self.bounding_box_format, boxes.iter_coords());
    }
    self.save_image(&image, path)?;

    if let Some(boxes) = boxes
      && self.record
    {
      Record.record(boxes, path)?;
    }
    Ok(())
  }
}

impl Render<Inputs> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render(&self, data: &Inputs) -> Result<(), Self::Error> {
    let images = data.images();
    let boxes = data.bounding_boxes();

    match images.ndim() {
      3 => self.render_one(images, boxes, &self.path),
      4 => {
        let batch = images.len_of(Axis(0));
        if batch == 0 {
          warn!("空批次, 没有图像可保存");
        }
        for i in 0..batch {
          let image = images.index_axis(Axis(0), i).to_owned();
          // 批量边界框按样本取出，否则所有样本共用
          let sample_boxes = boxes.map(|b| {
            if b.is_batched() {
              BoundingBoxes::new(
                b.boxes.index_axis(Axis(0), i).to_owned(),
                b.labels.index_axis(Axis(0), i).to_owned(),
              )
            } else {
              b.clone()
            }
          });
          let path = if batch == 1 {
            self.path.clone()
          } else {
            self.indexed_path(i)
          };
          self.render_one(&image, sample_boxes.as_ref(), &path)?;
        }
        Ok(())
      }
      _ => Err(SaveImageFileError::ImageRank(images.shape().to_vec())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::Tensor, layer::Bundle};
  use image::Rgb;
  use ndarray::{IxDyn, array};

  #[test]
  fn parses_url() {
    let url = Url::parse("image:///tmp/my%20dir/out.png?data_format=channels_first&record=true")
      .unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.path, PathBuf::from("/tmp/my dir/out.png"));
    assert_eq!(output.data_format, DataFormat::ChannelsFirst);
    assert_eq!(output.bounding_box_format, BoundingBoxFormat::Yxyx);
    assert!(output.record);

    let wrong = Url::parse("video:///tmp/out.mp4").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&wrong),
      Err(SaveImageFileError::ConfigError(ConfigError::SchemeMismatch { .. }))
    ));
  }

  #[test]
  fn fallback_data_format_yields_to_url() {
    let plain = Url::parse("image:///tmp/out.png").unwrap();
    let output =
      SaveImageFileOutput::from_url_with_data_format(&plain, DataFormat::ChannelsFirst).unwrap();
    assert_eq!(output.data_format, DataFormat::ChannelsFirst);

    let explicit = Url::parse("image:///tmp/out.png?data_format=nhwc").unwrap();
    let output =
      SaveImageFileOutput::from_url_with_data_format(&explicit, DataFormat::ChannelsFirst).unwrap();
    assert_eq!(output.data_format, DataFormat::ChannelsLast);
  }

  #[test]
  fn saves_single_image_with_boxes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out.png");
    let output = SaveImageFileOutput::new(&path).with_record(true);
    let data = Bundle::new(Tensor::from_elem(IxDyn(&[10, 12, 3]), 200.0))
      .with_bounding_boxes(BoundingBoxes::new(
        array![[1.0, 2.0, 6.0, 8.0]].into_dyn(),
        array![4.0].into_dyn(),
      ));
    output.render(&Inputs::from(data)).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (12, 10));
    // yxyx: 左上角 (x=2, y=1)
    assert_eq!(saved.get_pixel(2, 1), &Rgb([0, 0, 255]));
    assert_eq!(saved.get_pixel(0, 0), &Rgb([200, 200, 200]));
    assert!(dir.path().join("nested/out.txt").exists());
  }

  #[test]
  fn saves_each_batch_element() {
    let dir = tempfile::tempdir().unwrap();
    let output = SaveImageFileOutput::new(dir.path().join("crop.png"))
      .with_data_format(DataFormat::ChannelsFirst);
    let images = Tensor::zeros(IxDyn(&[2, 3, 4, 5]));
    output.render(&Inputs::from(images)).unwrap();

    for i in 0..2 {
      let saved = image::open(dir.path().join(format!("crop_{}.png", i)))
        .unwrap()
        .to_rgb8();
      assert_eq!(saved.dimensions(), (5, 4));
    }
    assert!(!dir.path().join("crop.png").exists());
  }

  #[test]
  fn rejects_non_rgb() {
    let dir = tempfile::tempdir().unwrap();
    let output = SaveImageFileOutput::new(dir.path().join("x.png"));
    let result = output.render(&Inputs::from(Tensor::zeros(IxDyn(&[4, 4, 1]))));
    assert!(matches!(result, Err(SaveImageFileError::FrameError(_))));
  }
}
