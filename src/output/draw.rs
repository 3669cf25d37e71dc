// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 边界框可视化
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

use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::bounding_box::{BoundingBoxFormat, BoundingBoxes};

const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BOX_THICKNESS: i32 = 2;

pub struct Draw {
  color: [u8; 3],
  thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      color: BOX_COLOR,
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  /// 在图像上绘制空心矩形，坐标为像素坐标，超出图像的部分被截断
  pub fn draw_box(&self, image: &mut RgbImage, format: BoundingBoxFormat, coords: [f32; 4]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }
    let [x_min, y_min, x_max, y_max] = format.to_xyxy(coords);

    let x_min = (x_min.floor() as i32).clamp(0, w - 1);
    let y_min = (y_min.floor() as i32).clamp(0, h - 1);
    let x_max = (x_max.ceil() as i32).clamp(0, w - 1);
    let y_max = (y_max.ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 向内加粗
    for t in 0..self.thickness {
      let width = x_max - x_min - 2 * t + 1;
      let height = y_max - y_min - 2 * t + 1;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.color));
    }
  }

  pub fn draw_boxes(
    &self,
    image: &mut RgbImage,
    format: BoundingBoxFormat,
    coords: impl IntoIterator<Item = [f32; 4]>,
  ) {
    for c in coords {
      self.draw_box(image, format, c);
    }
  }
}

/// 把边界框写成同名的 `.txt` 文件，每行 `label, c0, c1, c2, c3`
pub struct Record;

impl Record {
  pub fn record(&self, boxes: &BoundingBoxes, path: &Path) -> Result<(), std::io::Error> {
    let labels: Vec<f32> = boxes.labels.iter().copied().collect();
    let records: Vec<String> = boxes
      .iter_coords()
      .enumerate()
      .map(|(i, c)| {
        let label = labels
          .get(i)
          .map(|l| format!("{}", l))
          .unwrap_or_else(|| "-".to_string());
        format!("{}, {:.4}, {:.4}, {:.4}, {:.4}", label, c[0], c[1], c[2], c[3])
      })
      .collect();
    std::fs::write(path.with_extension("txt"), records.join("\n"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::array;

  #[test]
  fn draws_outline_only() {
    let mut image = RgbImage::new(20, 20);
    Draw::default().draw_box(&mut image, BoundingBoxFormat::Xyxy, [2.0, 4.0, 12.0, 14.0]);
    assert_eq!(image.get_pixel(2, 4), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(12, 14), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(3, 5), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(7, 9), &Rgb([0, 0, 0]));
  }

  #[test]
  fn respects_box_format() {
    let mut image = RgbImage::new(20, 20);
    // yxyx: y 2..6, x 10..18
    Draw::default().draw_box(&mut image, BoundingBoxFormat::Yxyx, [2.0, 10.0, 6.0, 18.0]);
    assert_eq!(image.get_pixel(10, 2), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(2, 10), &Rgb([0, 0, 0]));
  }

  #[test]
  fn skips_degenerate_boxes() {
    let mut image = RgbImage::new(8, 8);
    Draw::default().draw_boxes(
      &mut image,
      BoundingBoxFormat::Xyxy,
      [[0.0, 0.0, 0.0, 0.0], [30.0, 30.0, 40.0, 40.0]],
    );
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }

  #[test]
  fn records_boxes_next_to_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    let boxes = BoundingBoxes::new(
      array![[0.0, 0.0, 30.0, 30.0], [1.0, 2.0, 3.0, 4.0]].into_dyn(),
      array![3.0, 7.0].into_dyn(),
    );
    Record.record(&boxes, &path).unwrap();
    let text = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(
      text,
      "3, 0.0000, 0.0000, 30.0000, 30.0000\n7, 1.0000, 2.0000, 3.0000, 4.0000"
    );
  }
}
