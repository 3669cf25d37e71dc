// 该文件是 Shanan （山南西风） 项目的一部分。
// src/crop/random_crop.rs - RandomCrop 预处理层
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

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  bounding_box::{BoundingBoxFormat, BoundingBoxes},
  config::{self, ConfigError},
  crop::{CropApplier, CropError, CropPlanner, Transformation},
  frame::{DataFormat, StaticShape, Tensor, static_shape},
  layer::{ImagePreprocessingLayer, Inputs, LayerError},
  seed::{SeedGenerator, make_default_seed},
};

const DEFAULT_NAME: &str = "random_crop";

/// 可序列化的层配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomCropConfig {
  pub height: usize,
  pub width: usize,
  #[serde(default)]
  pub seed: Option<u64>,
  #[serde(default)]
  pub data_format: DataFormat,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bounding_box_format: Option<BoundingBoxFormat>,
}

impl RandomCropConfig {
  pub fn to_json(&self) -> Result<String, ConfigError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(json)?)
  }
}

/// 随机裁剪到 `(height, width)`。
///
/// 训练时在输入足够大的情况下随机选取窗口，否则取中心窗口。
/// 批内所有样本以及同一次调用的掩码、边界框共享同一个窗口。
#[derive(Debug, Clone)]
pub struct RandomCrop {
  name: String,
  seed: u64,
  bounding_box_format: Option<BoundingBoxFormat>,
  planner: CropPlanner,
  applier: CropApplier,
  generator: SeedGenerator,
}

impl RandomCrop {
  pub fn new(height: usize, width: usize) -> Result<Self, CropError> {
    Self::build(height, width, make_default_seed(), DataFormat::default())
  }

  fn build(height: usize, width: usize, seed: u64, data_format: DataFormat) -> Result<Self, CropError> {
    if height == 0 || width == 0 {
      return Err(CropError::InvalidConfig { height, width });
    }
    Ok(Self {
      name: DEFAULT_NAME.to_string(),
      seed,
      bounding_box_format: None,
      planner: CropPlanner::new(height, width, data_format),
      applier: CropApplier::new(height, width, data_format),
      generator: SeedGenerator::new(seed),
    })
  }

  /// 重新设定种子，生成器回到初始状态
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = seed;
    self.generator = SeedGenerator::new(seed);
    self
  }

  pub fn with_data_format(mut self, data_format: DataFormat) -> Self {
    let (height, width) = (self.height(), self.width());
    self.planner = CropPlanner::new(height, width, data_format);
    self.applier = CropApplier::new(height, width, data_format);
    self
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_bounding_box_format(mut self, format: BoundingBoxFormat) -> Self {
    self.bounding_box_format = Some(format);
    self
  }

  pub fn height(&self) -> usize {
    self.planner.height()
  }

  pub fn width(&self) -> usize {
    self.planner.width()
  }

  pub fn data_format(&self) -> DataFormat {
    self.planner.data_format()
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn get_config(&self) -> RandomCropConfig {
    RandomCropConfig {
      height: self.height(),
      width: self.width(),
      seed: Some(self.seed),
      data_format: self.data_format(),
      name: Some(self.name.clone()),
      bounding_box_format: self.bounding_box_format,
    }
  }

  pub fn from_config(config: RandomCropConfig) -> Result<Self, CropError> {
    let seed = config.seed.unwrap_or_else(make_default_seed);
    let mut layer = Self::build(config.height, config.width, seed, config.data_format)?;
    if let Some(name) = config.name {
      layer.name = name;
    }
    layer.bounding_box_format = config.bounding_box_format;
    Ok(layer)
  }
}

impl FromUrlWithScheme for RandomCrop {
  const SCHEME: &'static str = "random-crop";
}

impl FromUrl for RandomCrop {
  type Error = ConfigError;

  /// `random-crop://[name]?height=H&width=W[&seed=S][&data_format=..][&bounding_box_format=..]`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::from_url_with_data_format(url, DataFormat::default())
  }
}

impl RandomCrop {
  /// URL 未给出 `data_format` 时使用 `fallback`
  pub fn from_url_with_data_format(url: &Url, fallback: DataFormat) -> Result<Self, ConfigError> {
    config::check_scheme(url, Self::SCHEME)?;

    let config = RandomCropConfig {
      height: config::required_param(url, "height")?,
      width: config::required_param(url, "width")?,
      seed: config::query_param(url, "seed")?,
      data_format: config::query_param(url, "data_format")?.unwrap_or(fallback),
      name: url
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string),
      bounding_box_format: config::query_param(url, "bounding_box_format")?,
    };

    let layer = Self::from_config(config)?;
    info!(
      "创建 RandomCrop: {}x{}, 布局 {}, 种子 {}",
      layer.height(),
      layer.width(),
      layer.data_format(),
      layer.seed
    );
    Ok(layer)
  }
}

impl ImagePreprocessingLayer for RandomCrop {
  type Transformation = Transformation;

  fn name(&self) -> &str {
    &self.name
  }

  fn bounding_box_format(&self) -> Option<BoundingBoxFormat> {
    self.bounding_box_format
  }

  fn get_random_transformation(
    &mut self,
    data: &Inputs,
    training: bool,
    seed: Option<&mut SeedGenerator>,
  ) -> Result<Transformation, LayerError> {
    let shape = static_shape(data.images());
    let rng = match seed {
      Some(rng) => rng,
      None => &mut self.generator,
    };
    Ok(self.planner.plan(&shape, training, rng)?)
  }

  fn transform_images(
    &self,
    images: Tensor,
    transformation: &Transformation,
    _training: bool,
  ) -> Result<Tensor, LayerError> {
    Ok(self.applier.apply_to_images(&images, transformation)?)
  }

  fn transform_labels(
    &self,
    labels: Tensor,
    transformation: &Transformation,
    _training: bool,
  ) -> Result<Tensor, LayerError> {
    Ok(self.applier.apply_to_labels(labels, transformation))
  }

  fn transform_bounding_boxes(
    &self,
    bounding_boxes: BoundingBoxes,
    transformation: &Transformation,
    _training: bool,
  ) -> Result<BoundingBoxes, LayerError> {
    Ok(
      self
        .applier
        .apply_to_bounding_boxes(bounding_boxes, transformation)?,
    )
  }

  fn transform_segmentation_masks(
    &self,
    segmentation_masks: Tensor,
    transformation: &Transformation,
    _training: bool,
  ) -> Result<Tensor, LayerError> {
    Ok(
      self
        .applier
        .apply_to_segmentation_masks(&segmentation_masks, transformation)?,
    )
  }

  fn compute_output_shape(&self, input_shape: &[Option<usize>]) -> Result<StaticShape, LayerError> {
    Ok(self.applier.compute_output_shape(input_shape)?)
  }
}
