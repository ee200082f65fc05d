// 该文件是 Shanan （山南西风） 项目的一部分。
// src/fusion.rs - 车牌与车辆属性融合及输出策略
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

use std::{collections::HashSet, convert::Infallible, fmt};

use serde::Serialize;
use tracing::debug;

use crate::{
  config::FusionConfig,
  correlator::{Correlator, PlateCandidate, PlateTable, VehicleAttributes},
  frame::{DetectedObject, Frame, FrameBatch, TrackId},
  model::{Attribute, Component},
  tensor::{ReadMode, TensorExtractor},
  walker::{self, ObjectIndex},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeValue {
  pub label: String,
  pub probability: f32,
}

/// 一辆车在一帧内的融合结果，只在一次融合过程中存在
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleRecord {
  pub track_id: TrackId,
  pub pts: u64,
  pub frame_number: u64,
  pub plate: String,
  pub plate_confidence: f32,
  pub color: AttributeValue,
  pub make: AttributeValue,
  pub vehicle_type: AttributeValue,
}

impl fmt::Display for VehicleRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{},{},{:.6},{},{:.6},{},{:.6},{},{:.6}",
      self.track_id,
      self.plate,
      self.plate_confidence,
      self.color.label,
      self.color.probability,
      self.make.label,
      self.make.probability,
      self.vehicle_type.label,
      self.vehicle_type.probability
    )
  }
}

/// 记录的组成情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
  PlateAndAttributes,
  AttributesOnly,
  PlateOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmissionPolicy {
  pub open_everyobject_output: bool,
  pub open_everycar_classification: bool,
}

impl EmissionPolicy {
  pub fn from_config(config: &FusionConfig) -> Self {
    Self {
      open_everyobject_output: config.open_everyobject_output,
      open_everycar_classification: config.open_everycar_classification,
    }
  }

  /// 决定一辆车是否输出，`None` 表示不输出
  pub fn decide(&self, plate_present: bool, attributes_present: bool) -> Option<Assembly> {
    match (plate_present, attributes_present) {
      (true, true) => Some(Assembly::PlateAndAttributes),
      (false, true) if self.open_everycar_classification => Some(Assembly::AttributesOnly),
      (true, false) if self.open_everyobject_output => Some(Assembly::PlateOnly),
      _ => None,
    }
  }
}

/// 每个批次调用一次的处理阶段
pub trait BatchProbe {
  type Error;

  fn probe(&mut self, batch: &FrameBatch) -> Result<Vec<VehicleRecord>, Self::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AttributeProbabilities {
  color: f32,
  make: f32,
  vehicle_type: f32,
}

impl AttributeProbabilities {
  fn slot_mut(&mut self, attribute: Attribute) -> &mut f32 {
    match attribute {
      Attribute::Color => &mut self.color,
      Attribute::Make => &mut self.make,
      Attribute::Type => &mut self.vehicle_type,
    }
  }
}

/// 融合引擎。
///
/// 只能在单个处理线程上按顺序调用：主机/设备读取模式是引擎自身的字段，
/// 每次 [`FusionEngine::process`] 调用结束时切换一次。
/// 除读取模式外，引擎在批次之间不保留任何车辆状态。
#[derive(Debug)]
pub struct FusionEngine {
  config: FusionConfig,
  correlator: Correlator,
  policy: EmissionPolicy,
  extractor: TensorExtractor,
  read_mode: ReadMode,
}

impl FusionEngine {
  pub fn new(config: FusionConfig) -> Self {
    Self {
      correlator: Correlator::new(config.components, config.plate_filter()),
      policy: EmissionPolicy::from_config(&config),
      extractor: TensorExtractor::new(),
      read_mode: ReadMode::default(),
      config,
    }
  }

  pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
    self.read_mode = read_mode;
    self
  }

  pub fn config(&self) -> &FusionConfig {
    &self.config
  }

  /// 下一次调用将使用的读取模式
  pub fn read_mode(&self) -> ReadMode {
    self.read_mode
  }

  /// 对一个批次执行一次融合，返回需要输出的车辆记录
  pub fn process(&mut self, batch: &FrameBatch) -> Vec<VehicleRecord> {
    let mode = self.read_mode;
    let mut records = Vec::new();

    let objects: Vec<_> = walker::walk(batch).collect();
    for group in objects.chunk_by(|(a, _), (b, _)| std::ptr::eq(*a, *b)) {
      let frame = group[0].0;
      self.process_frame(frame, group.iter().map(|(_, object)| *object), mode, &mut records);
    }

    self.read_mode = mode.flip();
    records
  }

  /// `objects` 为该帧中带有分类结果的目标，父目标仍在整帧范围内解析
  fn process_frame<'f>(
    &mut self,
    frame: &'f Frame,
    objects: impl Iterator<Item = &'f DetectedObject>,
    mode: ReadMode,
    records: &mut Vec<VehicleRecord>,
  ) {
    let index = ObjectIndex::build(frame);
    let mut plates = PlateTable::new();
    let mut vehicles: Vec<(VehicleAttributes, &DetectedObject)> = Vec::new();

    for object in objects {
      let correlation = self.correlator.correlate(object, &index);
      if let Some(plate) = correlation.plate
        && let Some(replaced) = plates.insert(plate)
      {
        debug!(
          "车辆 {} 的车牌 {} 被同帧后续结果覆盖",
          replaced.vehicle_id, replaced.text
        );
      }
      if let Some(attributes) = correlation.attributes {
        vehicles.push((attributes, object));
      }
    }

    let mut attributed = HashSet::with_capacity(vehicles.len());
    for (attributes, object) in &vehicles {
      attributed.insert(attributes.vehicle_id);
      let plate = plates.get(attributes.vehicle_id);
      let Some(assembly) = self.policy.decide(plate.is_some(), true) else {
        debug!("车辆 {} 没有匹配的车牌，不输出", attributes.vehicle_id);
        continue;
      };

      // everyobject 模式同样输出真实概率，不清零
      let probabilities = self.attribute_probabilities(object, attributes, mode);
      debug!("车辆 {} 组装记录: {:?}", attributes.vehicle_id, assembly);
      records.push(assemble(
        frame,
        attributes.vehicle_id,
        plate,
        Some(attributes),
        probabilities,
      ));
    }

    for plate in plates.iter().filter(|p| !attributed.contains(&p.vehicle_id)) {
      if self.policy.decide(true, false).is_some() {
        debug!("车辆 {} 只有车牌 {}", plate.vehicle_id, plate.text);
        records.push(assemble(
          frame,
          plate.vehicle_id,
          Some(plate),
          None,
          AttributeProbabilities::default(),
        ));
      }
    }
  }

  /// 各属性槽位的最大概率，对应标签为空的槽位置零
  fn attribute_probabilities(
    &mut self,
    object: &DetectedObject,
    attributes: &VehicleAttributes,
    mode: ReadMode,
  ) -> AttributeProbabilities {
    let mut probabilities = AttributeProbabilities::default();

    for tensor in &object.tensors {
      let Some(Component::Attribute(attribute)) = self.config.components.resolve(tensor.component_id)
      else {
        continue;
      };
      let Some(result) = self
        .extractor
        .extract(tensor, mode, self.config.class_counts.get(attribute))
      else {
        continue;
      };

      let label = attributes.label(attribute).unwrap_or_default();
      let probability = if label.is_empty() {
        0.0
      } else {
        result.probability
      };
      debug!(
        "车辆 {} {}: 标签 {:?}, 张量最高类别 {:?}, 概率 {:.4}",
        object.object_id,
        attribute,
        label,
        attribute.class_label(result.class_index),
        probability
      );

      let slot = probabilities.slot_mut(attribute);
      if probability > *slot {
        *slot = probability;
      }
    }

    probabilities
  }
}

impl BatchProbe for FusionEngine {
  type Error = Infallible;

  fn probe(&mut self, batch: &FrameBatch) -> Result<Vec<VehicleRecord>, Self::Error> {
    Ok(self.process(batch))
  }
}

fn assemble(
  frame: &Frame,
  track_id: TrackId,
  plate: Option<&PlateCandidate>,
  attributes: Option<&VehicleAttributes>,
  probabilities: AttributeProbabilities,
) -> VehicleRecord {
  let value = |attribute: Attribute, probability: f32| AttributeValue {
    label: attributes
      .and_then(|a| a.label(attribute))
      .unwrap_or_default()
      .to_string(),
    probability,
  };

  VehicleRecord {
    track_id,
    pts: frame.pts,
    frame_number: frame.frame_number,
    plate: plate.map(|p| p.text.clone()).unwrap_or_default(),
    plate_confidence: plate.map(|p| p.confidence).unwrap_or_default(),
    color: value(Attribute::Color, probabilities.color),
    make: value(Attribute::Make, probabilities.make),
    vehicle_type: value(Attribute::Type, probabilities.vehicle_type),
  }
}
