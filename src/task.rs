// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 预处理流水线与任务
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

use std::time::Instant;

use tracing::{debug, info};

use url::Url;

use crate::{
  config::ConfigError,
  crop::RandomCrop,
  frame::{DataFormat, StaticShape},
  layer::{Inputs, LayerError, Preprocess},
  output::Render,
};

/// 按顺序串联的预处理层
#[derive(Default)]
pub struct Sequential {
  layers: Vec<Box<dyn Preprocess>>,
}

impl Sequential {
  pub fn new() -> Self {
    Self::default()
  }

  /// 由 `random-crop://` 地址依次建层，未写 `data_format` 的层使用 `data_format`
  pub fn from_layer_urls(urls: &[Url], data_format: DataFormat) -> Result<Self, ConfigError> {
    let mut pipeline = Self::new();
    for url in urls {
      let layer = RandomCrop::from_url_with_data_format(url, data_format)?;
      info!("层配置: {}", layer.get_config().to_json()?);
      pipeline.push(layer);
    }
    Ok(pipeline)
  }

  pub fn with_layer(mut self, layer: impl Preprocess + 'static) -> Self {
    self.push(layer);
    self
  }

  pub fn push(&mut self, layer: impl Preprocess + 'static) {
    self.layers.push(Box::new(layer));
  }

  pub fn len(&self) -> usize {
    self.layers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.layers.is_empty()
  }

  pub fn call(&mut self, mut data: Inputs, training: bool) -> Result<Inputs, LayerError> {
    for layer in self.layers.iter_mut() {
      debug!("执行预处理层 {}", layer.name());
      data = layer.preprocess(data, training)?;
    }
    Ok(data)
  }
}

impl Preprocess for Sequential {
  fn name(&self) -> &str {
    "sequential"
  }

  fn preprocess(&mut self, data: Inputs, training: bool) -> Result<Inputs, LayerError> {
    self.call(data, training)
  }

  fn output_shape(&self, input_shape: &[Option<usize>]) -> Result<StaticShape, LayerError> {
    self
      .layers
      .iter()
      .try_fold(input_shape.to_vec(), |shape, layer| layer.output_shape(&shape))
  }
}

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: P, output: O) -> Result<(), Self::Error>;
}

/// 取一批输入，预处理后交给输出
#[derive(Debug, Default)]
pub struct OneShotTask {
  training: bool,
}

impl OneShotTask {
  pub fn with_training(mut self, training: bool) -> Self {
    self.training = training;
    self
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Inputs>,
  P: Preprocess,
  O: Render<Inputs, Error = RE>,
> Task<I, P, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut pipeline: P, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let data = input.next().ok_or_else(|| anyhow::anyhow!("没有输入数据"))?;
    info!(
      "输入获取成功, 形状 {:?}, 开始预处理 (training: {})",
      data.images().shape(),
      self.training
    );
    let now = Instant::now();
    let result = pipeline.preprocess(data, self.training)?;
    info!(
      "预处理完成, 输出形状 {:?}, 耗时: {:.2?}",
      result.images().shape(),
      now.elapsed()
    );
    output.render(&result)?;
    info!("渲染完成, 总耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}
