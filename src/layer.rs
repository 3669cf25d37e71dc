// 该文件是 Shanan （山南西风） 项目的一部分。
// src/layer.rs - 图像预处理层接口
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

use ndarray::Axis;
use thiserror::Error;
use tracing::debug;

use crate::{
  bounding_box::{BoundingBoxFormat, BoundingBoxes},
  crop::CropError,
  frame::{StaticShape, Tensor},
  seed::SeedGenerator,
};

#[derive(Error, Debug)]
pub enum LayerError {
  #[error("裁剪错误: {0}")]
  Crop(#[from] CropError),
  #[error("图像张量应为 3 维（单张）或 4 维（批量）, 实际形状 {0:?}")]
  ImageRank(Vec<usize>),
  #[error("输入包含边界框, 但层 {0} 没有设置 bounding_box_format")]
  MissingBoundingBoxFormat(String),
}

/// 层的输入：只有图像，或者图像加上附属标注
#[derive(Debug, Clone, PartialEq)]
pub enum Inputs {
  Images(Tensor),
  Bundle(Bundle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
  pub images: Tensor,
  pub labels: Option<Tensor>,
  pub bounding_boxes: Option<BoundingBoxes>,
  pub segmentation_masks: Option<Tensor>,
}

impl Bundle {
  pub fn new(images: Tensor) -> Self {
    Self {
      images,
      labels: None,
      bounding_boxes: None,
      segmentation_masks: None,
    }
  }

  pub fn with_labels(mut self, labels: Tensor) -> Self {
    self.labels = Some(labels);
    self
  }

  pub fn with_bounding_boxes(mut self, bounding_boxes: BoundingBoxes) -> Self {
    self.bounding_boxes = Some(bounding_boxes);
    self
  }

  pub fn with_segmentation_masks(mut self, segmentation_masks: Tensor) -> Self {
    self.segmentation_masks = Some(segmentation_masks);
    self
  }
}

impl Inputs {
  pub fn images(&self) -> &Tensor {
    match self {
      Inputs::Images(images) => images,
      Inputs::Bundle(bundle) => &bundle.images,
    }
  }

  pub fn into_images(self) -> Tensor {
    match self {
      Inputs::Images(images) => images,
      Inputs::Bundle(bundle) => bundle.images,
    }
  }

  pub fn bounding_boxes(&self) -> Option<&BoundingBoxes> {
    match self {
      Inputs::Images(_) => None,
      Inputs::Bundle(bundle) => bundle.bounding_boxes.as_ref(),
    }
  }
}

impl From<Tensor> for Inputs {
  fn from(images: Tensor) -> Self {
    Inputs::Images(images)
  }
}

impl From<Bundle> for Inputs {
  fn from(bundle: Bundle) -> Self {
    Inputs::Bundle(bundle)
  }
}

/// 3 维为单张，4 维为批量
pub fn is_batched(images: &Tensor) -> Result<bool, LayerError> {
  match images.ndim() {
    3 => Ok(false),
    4 => Ok(true),
    _ => Err(LayerError::ImageRank(images.shape().to_vec())),
  }
}

/// 图像预处理层。
///
/// 实现者只需给出一次随机变换的生成方式以及它对各类数据的作用，
/// 单张/批量的分派、边界框格式检查由 [`ImagePreprocessingLayer::call`] 统一完成。
/// 同一次调用内所有数据共享一个变换。
pub trait ImagePreprocessingLayer {
  type Transformation;

  fn name(&self) -> &str;

  fn bounding_box_format(&self) -> Option<BoundingBoxFormat>;

  /// `seed` 为 `None` 时使用层自身的生成器
  fn get_random_transformation(
    &mut self,
    data: &Inputs,
    training: bool,
    seed: Option<&mut SeedGenerator>,
  ) -> Result<Self::Transformation, LayerError>;

  fn transform_images(
    &self,
    images: Tensor,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<Tensor, LayerError>;

  fn transform_labels(
    &self,
    labels: Tensor,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<Tensor, LayerError>;

  fn transform_bounding_boxes(
    &self,
    bounding_boxes: BoundingBoxes,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<BoundingBoxes, LayerError>;

  fn transform_segmentation_masks(
    &self,
    segmentation_masks: Tensor,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<Tensor, LayerError>;

  fn compute_output_shape(&self, input_shape: &[Option<usize>]) -> Result<StaticShape, LayerError>;

  fn transform_single_image(
    &self,
    image: Tensor,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<Tensor, LayerError> {
    let images = image.insert_axis(Axis(0));
    let outputs = self.transform_images(images, transformation, training)?;
    Ok(outputs.index_axis_move(Axis(0), 0))
  }

  fn transform_single_label(
    &self,
    label: Tensor,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<Tensor, LayerError> {
    let labels = label.insert_axis(Axis(0));
    let outputs = self.transform_labels(labels, transformation, training)?;
    Ok(outputs.index_axis_move(Axis(0), 0))
  }

  fn transform_single_bounding_box(
    &self,
    bounding_box: BoundingBoxes,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<BoundingBoxes, LayerError> {
    let outputs =
      self.transform_bounding_boxes(bounding_box.expand_batch(), transformation, training)?;
    Ok(outputs.squeeze_batch())
  }

  fn transform_single_segmentation_mask(
    &self,
    segmentation_mask: Tensor,
    transformation: &Self::Transformation,
    training: bool,
  ) -> Result<Tensor, LayerError> {
    let masks = segmentation_mask.insert_axis(Axis(0));
    let outputs = self.transform_segmentation_masks(masks, transformation, training)?;
    Ok(outputs.index_axis_move(Axis(0), 0))
  }

  fn call(&mut self, data: Inputs, training: bool) -> Result<Inputs, LayerError> {
    let batched = is_batched(data.images())?;
    let transformation = self.get_random_transformation(&data, training, None)?;
    debug!(
      "层 {} 处理输入, 批量: {}",
      ImagePreprocessingLayer::name(self),
      batched
    );

    let bundle = match data {
      Inputs::Images(images) => {
        let images = if batched {
          self.transform_images(images, &transformation, training)?
        } else {
          self.transform_single_image(images, &transformation, training)?
        };
        return Ok(Inputs::Images(images));
      }
      Inputs::Bundle(bundle) => bundle,
    };

    let Bundle {
      images,
      labels,
      bounding_boxes,
      segmentation_masks,
    } = bundle;

    if bounding_boxes.is_some() && self.bounding_box_format().is_none() {
      return Err(LayerError::MissingBoundingBoxFormat(
        ImagePreprocessingLayer::name(self).to_string(),
      ));
    }

    let images = if batched {
      self.transform_images(images, &transformation, training)?
    } else {
      self.transform_single_image(images, &transformation, training)?
    };

    let bounding_boxes = bounding_boxes
      .map(|boxes| {
        if batched {
          self.transform_bounding_boxes(boxes, &transformation, training)
        } else {
          self.transform_single_bounding_box(boxes, &transformation, training)
        }
      })
      .transpose()?;

    let labels = labels
      .map(|labels| {
        if batched {
          self.transform_labels(labels, &transformation, training)
        } else {
          self.transform_single_label(labels, &transformation, training)
        }
      })
      .transpose()?;

    let segmentation_masks = segmentation_masks
      .map(|masks| {
        if batched {
          self.transform_segmentation_masks(masks, &transformation, training)
        } else {
          self.transform_single_segmentation_mask(masks, &transformation, training)
        }
      })
      .transpose()?;

    Ok(Inputs::Bundle(Bundle {
      images,
      labels,
      bounding_boxes,
      segmentation_masks,
    }))
  }
}

/// 对象安全的预处理接口，便于把不同的层串起来
pub trait Preprocess {
  fn name(&self) -> &str;

  fn preprocess(&mut self, data: Inputs, training: bool) -> Result<Inputs, LayerError>;

  fn output_shape(&self, input_shape: &[Option<usize>]) -> Result<StaticShape, LayerError>;
}

impl<L: ImagePreprocessingLayer> Preprocess for L {
  fn name(&self) -> &str {
    ImagePreprocessingLayer::name(self)
  }

  fn preprocess(&mut self, data: Inputs, training: bool) -> Result<Inputs, LayerError> {
    self.call(data, training)
  }

  fn output_shape(&self, input_shape: &[Option<usize>]) -> Result<StaticShape, LayerError> {
    self.compute_output_shape(input_shape)
  }
}
