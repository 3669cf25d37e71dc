// 该文件是 Shanan （山南西风） 项目的一部分。
// src/seed.rs - 可复现的随机数种子生成器
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

use rand::{Rng, SeedableRng, rngs::StdRng};

/// 生成一个默认种子
pub fn make_default_seed() -> u64 {
  rand::rng().random()
}

/// 带状态的随机数生成器，由一个种子初始化，每次采样原地推进。
///
/// 同一种子构造的两个生成器按相同顺序调用时产生相同的序列。
#[derive(Debug, Clone)]
pub struct SeedGenerator {
  seed: u64,
  rng: StdRng,
}

impl SeedGenerator {
  pub fn new(seed: u64) -> Self {
    Self {
      seed,
      rng: StdRng::seed_from_u64(seed),
    }
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  /// 回到初始状态
  pub fn reset(&mut self) {
    self.rng = StdRng::seed_from_u64(self.seed);
  }

  /// 在 `[minval, maxval)` 上连续均匀采样
  pub fn uniform(&mut self, minval: f32, maxval: f32) -> f32 {
    minval + self.rng.random::<f32>() * (maxval - minval)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_seed_same_sequence() {
    let mut a = SeedGenerator::new(42);
    let mut b = SeedGenerator::new(42);
    for _ in 0..16 {
      assert_eq!(a.uniform(0.0, 10.0), b.uniform(0.0, 10.0));
    }
  }

  #[test]
  fn reset_replays_sequence() {
    let mut generator = SeedGenerator::new(7);
    let first: Vec<f32> = (0..4).map(|_| generator.uniform(0.0, 1.0)).collect();
    generator.reset();
    let second: Vec<f32> = (0..4).map(|_| generator.uniform(0.0, 1.0)).collect();
    assert_eq!(first, second);
    assert_eq!(generator.seed(), 7);
  }

  #[test]
  fn uniform_stays_in_range() {
    let mut generator = SeedGenerator::new(3);
    for _ in 0..1000 {
      let value = generator.uniform(2.0, 5.0);
      assert!((2.0..=5.0).contains(&value), "{value}");
    }
  }
}
