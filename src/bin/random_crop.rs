// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/random_crop.rs - 随机裁剪单张图像
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_crop::{
  FromUrl,
  frame::DataFormat,
  input::InputWrapper,
  output::OutputWrapper,
  task::{OneShotTask, Sequential, Task},
};
use tracing::info;

/// 随机裁剪参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，例如 image:///path/in.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///path/out.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 预处理层，可重复，按顺序执行
  /// 例如 random-crop://?height=224&width=224&seed=42
  #[arg(long, value_name = "LAYER", required = true)]
  pub layer: Vec<Url>,
  /// 张量布局，层和输出地址未写 data_format 时也使用该值
  #[arg(long, default_value = "channels_last", value_name = "FORMAT")]
  pub data_format: DataFormat,
  /// 推理模式（中心裁剪）
  #[arg(long)]
  pub inference: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let pipeline = Sequential::from_layer_urls(&args.layer, args.data_format)?;
  let input = InputWrapper::from_url(&args.input)?.into_format(args.data_format);
  let output = OutputWrapper::from_url_with_data_format(&args.output, args.data_format)?;

  OneShotTask::default()
    .with_training(!args.inference)
    .run_task(input, pipeline, output)
}
