mod common;

use common::{det, solid_image};
use dfu_detect::{
  model::LabelMap,
  output::{ColorPolicy, Draw, draw::PALETTE},
};
use image::{Rgb, RgbImage};

fn gradient(width: u32, height: u32) -> RgbImage {
  RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]))
}

#[test]
fn annotating_twice_is_pixel_identical() {
  let image = gradient(120, 100);
  let detections = vec![det([10.0, 40.0, 50.0, 80.0], 0.91), det([60.0, 30.0, 110.0, 90.0], 0.5)];
  let draw = Draw::default();
  let labels = LabelMap::default();

  let first = draw.annotate(&image, &detections, &labels);
  let second = draw.annotate(&image, &detections, &labels);
  assert_eq!(first, second);
}

#[test]
fn annotation_does_not_touch_the_input() {
  let image = gradient(100, 100);
  let original = image.clone();
  let detections = vec![det([10.0, 40.0, 50.0, 80.0], 0.91)];

  let mut annotated = Draw::default().annotate(&image, &detections, &LabelMap::default());
  assert_ne!(annotated, image);
  assert_ne!(annotated.as_raw().as_ptr(), image.as_raw().as_ptr());

  annotated.put_pixel(0, 0, Rgb([1, 2, 3]));
  assert_eq!(image, original);
}

#[test]
fn no_detections_returns_an_unchanged_copy() {
  let image = gradient(64, 48);
  let annotated = Draw::default().annotate(&image, &[], &LabelMap::default());
  assert_eq!(annotated, image);
  assert_ne!(annotated.as_raw().as_ptr(), image.as_raw().as_ptr());
}

#[test]
fn draws_outline_and_label_background_above_the_box() {
  let image = solid_image(100, 100);
  let color = [0, 0, 255];
  let draw = Draw::default().with_color(ColorPolicy::Fixed(color));
  let annotated = draw.annotate(&image, &[det([10.0, 40.0, 50.0, 80.0], 0.91)], &LabelMap::default());

  // 边框
  assert_eq!(annotated.get_pixel(10, 60).0, color);
  assert_eq!(annotated.get_pixel(50, 60).0, color);
  assert_eq!(annotated.get_pixel(30, 80).0, color);
  // 框内不填充
  assert_eq!(annotated.get_pixel(30, 60).0, [0, 0, 0]);
  // 标签背景紧贴上边缘
  assert_eq!(annotated.get_pixel(20, 17).0, color);
  assert_eq!(annotated.get_pixel(20, 39).0, color);
  assert_eq!(annotated.get_pixel(5, 20).0, [0, 0, 0]);
}

#[test]
fn palette_colors_follow_detection_order() {
  let image = solid_image(100, 100);
  let detections = vec![det([10.0, 40.0, 50.0, 80.0], 0.9), det([60.0, 40.0, 90.0, 80.0], 0.8)];
  let annotated = Draw::default()
    .with_color(ColorPolicy::Palette)
    .annotate(&image, &detections, &LabelMap::default());

  assert_eq!(annotated.get_pixel(10, 60).0, PALETTE[0]);
  assert_eq!(annotated.get_pixel(60, 60).0, PALETTE[1]);
}

#[test]
fn fixed_color_applies_to_every_detection() {
  let image = solid_image(100, 100);
  let detections = vec![det([10.0, 40.0, 50.0, 80.0], 0.9), det([60.0, 40.0, 90.0, 80.0], 0.8)];
  let annotated = Draw::default()
    .with_color(ColorPolicy::Fixed([255, 0, 0]))
    .annotate(&image, &detections, &LabelMap::default());

  assert_eq!(annotated.get_pixel(10, 60).0, [255, 0, 0]);
  assert_eq!(annotated.get_pixel(60, 60).0, [255, 0, 0]);
}

#[test]
fn boxes_outside_the_image_are_clamped() {
  let image = solid_image(40, 30);
  let detections = vec![det([-20.0, -5.0, 500.0, 400.0], 0.7), det([0.0, 0.0, 10.0, 10.0], 0.6)];
  let annotated = Draw::default()
    .with_color(ColorPolicy::Fixed([0, 255, 0]))
    .annotate(&image, &detections, &LabelMap::default());

  assert_eq!(annotated.dimensions(), (40, 30));
  assert_eq!(annotated.get_pixel(39, 29).0, [0, 255, 0]);
}

fn is_text_white(pixel: &Rgb<u8>) -> bool {
  pixel.0.iter().all(|&c| c > 200)
}

#[test]
fn label_text_is_drawn_in_white_inside_the_label_box() {
  let image = solid_image(200, 100);
  let draw = Draw::default().with_color(ColorPolicy::Fixed([0, 0, 255]));
  let annotated = draw.annotate(&image, &[det([20.0, 50.0, 120.0, 90.0], 0.91)], &LabelMap::default());

  // 标签背景占据 y 26..50，从 x = 20 开始
  let white_in_label = (26..50)
    .flat_map(|y| (20..120).map(move |x| (x, y)))
    .filter(|&(x, y)| is_text_white(annotated.get_pixel(x, y)))
    .count();
  let white_above_label = (0..26)
    .flat_map(|y| (0..200).map(move |x| (x, y)))
    .filter(|&(x, y)| is_text_white(annotated.get_pixel(x, y)))
    .count();

  assert!(white_in_label > 0);
  assert_eq!(white_above_label, 0);
}
