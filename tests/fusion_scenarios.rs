// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/fusion_scenarios.rs - 融合场景测试
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

use shanan_alpr::config::FusionConfig;
use shanan_alpr::frame::{AttachedTensorMeta, DetectedObject, Frame, FrameBatch, TensorLayer};
use shanan_alpr::fusion::{FusionEngine, VehicleRecord};
use shanan_alpr::tensor::ReadMode;

const LPR: u32 = 3;
const COLOR: u32 = 4;
const MAKE: u32 = 5;
const TYPE: u32 = 6;

fn layer(classes: usize, winner: usize, probability: f32) -> TensorLayer {
  let mut values = vec![0.01; classes];
  values[winner] = probability;
  TensorLayer::mirrored(values)
}

/// 车辆 42: 颜色 "red" (0.91)，品牌 "" (0.77)，类型 "suv" (0.64)
fn vehicle_42() -> DetectedObject {
  DetectedObject::new(42)
    .with_confidence(0.95)
    .with_label(COLOR, "red")
    .with_label(MAKE, "")
    .with_label(TYPE, "suv")
    .with_tensor(AttachedTensorMeta::new(COLOR, vec![layer(12, 8, 0.91)]))
    .with_tensor(AttachedTensorMeta::new(MAKE, vec![layer(20, 1, 0.77)]))
    .with_tensor(AttachedTensorMeta::new(TYPE, vec![layer(6, 3, 0.64)]))
}

fn plate_of(parent: u64, text: &str) -> DetectedObject {
  DetectedObject::new(1000 + parent)
    .with_parent(parent)
    .with_confidence(0.88)
    .with_label(LPR, text)
}

fn run(config: FusionConfig, objects: Vec<DetectedObject>) -> Vec<VehicleRecord> {
  let batch = FrameBatch::new(vec![Frame::new(0, objects)]);
  FusionEngine::new(config).process(&batch)
}

fn word_limited(count: usize) -> FusionConfig {
  FusionConfig {
    lpr_word_limit: true,
    lpr_word_count: count,
    ..Default::default()
  }
}

#[test]
fn plate_accepted_when_length_matches() {
  let records = run(word_limited(6), vec![vehicle_42(), plate_of(42, "ABC123")]);
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].plate, "ABC123");
  assert_eq!(records[0].plate_confidence, 0.88);
}

#[test]
fn plate_rejected_when_length_differs() {
  // 默认策略下没有匹配车牌的车辆不输出
  let records = run(word_limited(5), vec![vehicle_42(), plate_of(42, "ABC123")]);
  assert!(records.is_empty());

  let config = FusionConfig {
    open_everycar_classification: true,
    ..word_limited(5)
  };
  let records = run(config, vec![vehicle_42(), plate_of(42, "ABC123")]);
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].plate, "");
  assert_eq!(records[0].plate_confidence, 0.0);
}

#[test]
fn empty_label_zeroes_probability() {
  let records = run(FusionConfig::default(), vec![vehicle_42(), plate_of(42, "ABC123")]);
  let record = &records[0];
  assert_eq!(record.color.label, "red");
  assert_eq!(record.color.probability, 0.91);
  assert_eq!(record.make.label, "");
  assert_eq!(record.make.probability, 0.0);
  assert_eq!(record.vehicle_type.probability, 0.64);
  assert_eq!(
    record.to_string(),
    "42,ABC123,0.880000,red,0.910000,,0.000000,suv,0.640000"
  );
}

#[test]
fn attributes_without_plate_suppressed_by_default() {
  let records = run(FusionConfig::default(), vec![vehicle_42()]);
  assert!(records.is_empty());
}

#[test]
fn attributes_without_plate_emitted_with_everycar() {
  let config = FusionConfig {
    open_everycar_classification: true,
    ..Default::default()
  };
  let records = run(config, vec![vehicle_42()]);
  assert_eq!(records.len(), 1);
  assert_eq!(
    records[0].to_string(),
    "42,,0.000000,red,0.910000,,0.000000,suv,0.640000"
  );
}

#[test]
fn plate_of_other_vehicle_never_merges() {
  let other = DetectedObject::new(7).with_label(COLOR, "blue");
  let config = FusionConfig {
    open_everycar_classification: true,
    ..Default::default()
  };
  let records = run(config, vec![vehicle_42(), other, plate_of(7, "XYZ789")]);

  assert_eq!(records.len(), 2);
  let vehicle = records.iter().find(|r| r.track_id == 42).unwrap();
  assert_eq!(vehicle.plate, "");
  let other = records.iter().find(|r| r.track_id == 7).unwrap();
  assert_eq!(other.plate, "XYZ789");
}

#[test]
fn rerun_produces_identical_output_in_either_read_mode() {
  let batch = FrameBatch::new(vec![
    Frame::new(0, vec![vehicle_42(), plate_of(42, "ABC123")]),
    Frame::new(40, vec![]),
    Frame::new(80, vec![vehicle_42()]),
  ]);
  let config = FusionConfig {
    open_everycar_classification: true,
    ..Default::default()
  };

  let mut engine = FusionEngine::new(config).with_read_mode(ReadMode::Device);
  let lines = |records: Vec<VehicleRecord>| -> Vec<String> {
    records.iter().map(ToString::to_string).collect()
  };
  let first = lines(engine.process(&batch));
  assert_eq!(engine.read_mode(), ReadMode::Host);
  let second = lines(engine.process(&batch));
  assert_eq!(engine.read_mode(), ReadMode::Device);

  assert_eq!(first.len(), 2);
  assert_eq!(first, second);
}

#[test]
fn malformed_tensor_contributes_zero() {
  let vehicle = DetectedObject::new(9)
    .with_label(COLOR, "red")
    .with_tensor(AttachedTensorMeta::new(COLOR, vec![layer(5, 0, 0.99)]));
  let config = FusionConfig {
    open_everycar_classification: true,
    ..Default::default()
  };
  let records = run(config, vec![vehicle]);
  assert_eq!(records[0].color.label, "red");
  assert_eq!(records[0].color.probability, 0.0);
}

#[test]
fn empty_batch_emits_nothing() {
  let config = FusionConfig {
    open_everyobject_output: true,
    open_everycar_classification: true,
    ..Default::default()
  };
  let mut engine = FusionEngine::new(config);
  assert!(engine.process(&FrameBatch::default()).is_empty());
  assert!(engine
    .process(&FrameBatch::new(vec![Frame::new(0, vec![DetectedObject::new(1)])]))
    .is_empty());
}
