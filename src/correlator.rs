// 该文件是 Shanan （山南西风） 项目的一部分。
// src/correlator.rs - 分类结果关联
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

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
  frame::{BoundingBox, DetectedObject, TrackId},
  model::{Attribute, Component, ComponentIds},
  walker::ObjectIndex,
};

/// 车牌字数过滤
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlateFilter {
  word_limit: bool,
  word_count: usize,
}

impl PlateFilter {
  pub fn new(word_limit: bool, word_count: usize) -> Self {
    Self {
      word_limit,
      word_count,
    }
  }

  /// 开启字数限制时，只接受字符数恰好等于 `word_count` 的车牌
  pub fn accepts(&self, text: &str) -> bool {
    !self.word_limit || text.chars().count() == self.word_count
  }
}

/// 车牌识别结果，按所属车辆的跟踪 ID 关联
#[derive(Debug, Clone, PartialEq)]
pub struct PlateCandidate {
  pub vehicle_id: TrackId,
  pub text: String,
  /// 车牌检测框的检测置信度
  pub confidence: f32,
  pub bbox: BoundingBox,
}

/// 车辆自身携带的颜色、品牌、类型标签
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleAttributes {
  pub vehicle_id: TrackId,
  pub color: Option<String>,
  pub make: Option<String>,
  pub vehicle_type: Option<String>,
  pub bbox: BoundingBox,
}

impl VehicleAttributes {
  pub fn label(&self, attribute: Attribute) -> Option<&str> {
    match attribute {
      Attribute::Color => self.color.as_deref(),
      Attribute::Make => self.make.as_deref(),
      Attribute::Type => self.vehicle_type.as_deref(),
    }
  }

  fn slot_mut(&mut self, attribute: Attribute) -> &mut Option<String> {
    match attribute {
      Attribute::Color => &mut self.color,
      Attribute::Make => &mut self.make,
      Attribute::Type => &mut self.vehicle_type,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.color.is_none() && self.make.is_none() && self.vehicle_type.is_none()
  }
}

/// 单个目标的关联结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCorrelation {
  pub plate: Option<PlateCandidate>,
  pub attributes: Option<VehicleAttributes>,
}

#[derive(Debug, Clone, Default)]
pub struct Correlator {
  ids: ComponentIds,
  filter: PlateFilter,
}

impl Correlator {
  pub fn new(ids: ComponentIds, filter: PlateFilter) -> Self {
    Self { ids, filter }
  }

  /// 按组件拆分目标上的分类结果。
  ///
  /// 车牌结果挂到父目标（所属车辆）的 ID 上，属性标签挂到目标自身的 ID 上。
  /// 同一槽位出现多个标签时后者覆盖前者。
  pub fn correlate(&self, object: &DetectedObject, index: &ObjectIndex<'_>) -> ObjectCorrelation {
    let mut plate = None;
    let mut attributes = VehicleAttributes {
      vehicle_id: object.object_id,
      bbox: object.bbox,
      ..Default::default()
    };

    for classification in &object.classifications {
      let Some(component) = self.ids.resolve(classification.component_id) else {
        debug!(
          "目标 {} 上的组件 {} 未知，忽略其分类结果",
          object.object_id, classification.component_id
        );
        continue;
      };

      for label in &classification.labels {
        match component {
          Component::LicensePlate => {
            if let Some(candidate) = self.plate_candidate(object, &label.label, index) {
              plate = Some(candidate);
            }
          }
          Component::Attribute(attribute) => {
            *attributes.slot_mut(attribute) = Some(label.label.clone());
          }
        }
      }
    }

    ObjectCorrelation {
      plate,
      attributes: (!attributes.is_empty()).then_some(attributes),
    }
  }

  fn plate_candidate(
    &self,
    object: &DetectedObject,
    text: &str,
    index: &ObjectIndex<'_>,
  ) -> Option<PlateCandidate> {
    if text.is_empty() {
      return None;
    }

    if !self.filter.accepts(text) {
      debug!(
        "车牌 {} 字数为 {}，不满足字数限制，丢弃",
        text,
        text.chars().count()
      );
      return None;
    }

    let Some(vehicle) = index.parent_of(object) else {
      warn!(
        "车牌目标 {} 的父目标 {:?} 不在本帧中，丢弃车牌 {}",
        object.object_id, object.parent_id, text
      );
      return None;
    };

    debug!(
      "车牌 {} 属于车辆 {}，检测框 ({:.0}, {:.0}, {:.0}x{:.0})",
      text,
      vehicle.object_id,
      object.bbox.left,
      object.bbox.top,
      object.bbox.width,
      object.bbox.height
    );

    Some(PlateCandidate {
      vehicle_id: vehicle.object_id,
      text: text.to_string(),
      confidence: object.confidence,
      bbox: object.bbox,
    })
  }
}

/// 单帧内按所属车辆 ID 保存的车牌，保持首次出现的顺序，同一车辆后写覆盖先写
#[derive(Debug, Default)]
pub struct PlateTable {
  plates: Vec<PlateCandidate>,
  by_vehicle: HashMap<TrackId, usize>,
}

impl PlateTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// 插入车牌，返回被覆盖的旧车牌
  pub fn insert(&mut self, candidate: PlateCandidate) -> Option<PlateCandidate> {
    match self.by_vehicle.get(&candidate.vehicle_id) {
      Some(&slot) => Some(std::mem::replace(&mut self.plates[slot], candidate)),
      None => {
        self
          .by_vehicle
          .insert(candidate.vehicle_id, self.plates.len());
        self.plates.push(candidate);
        None
      }
    }
  }

  pub fn get(&self, vehicle_id: TrackId) -> Option<&PlateCandidate> {
    self
      .by_vehicle
      .get(&vehicle_id)
      .map(|&slot| &self.plates[slot])
  }

  pub fn iter(&self) -> impl Iterator<Item = &PlateCandidate> {
    self.plates.iter()
  }

  pub fn len(&self) -> usize {
    self.plates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.plates.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::{AttachedClassification, Frame, LabelResult};

  fn frame_with(plate: DetectedObject) -> Frame {
    Frame::new(
      0,
      vec![
        DetectedObject::new(42)
          .with_bbox(BoundingBox::new(10.0, 20.0, 300.0, 200.0))
          .with_label(4, "red")
          .with_label(5, "Audi"),
        plate,
      ],
    )
  }

  fn plate_object(text: &str) -> DetectedObject {
    DetectedObject::new(100)
      .with_parent(42)
      .with_confidence(0.8)
      .with_label(3, text)
  }

  #[test]
  fn test_plate_filter() {
    assert!(PlateFilter::new(false, 0).accepts("ABC"));
    assert!(PlateFilter::new(true, 6).accepts("ABC123"));
    assert!(!PlateFilter::new(true, 5).accepts("ABC123"));
    assert!(!PlateFilter::new(true, 7).accepts("ABC123"));
    assert!(PlateFilter::new(true, 7).accepts("京A12345"));
  }

  #[test]
  fn test_plate_linked_to_parent() {
    let frame = frame_with(plate_object("ABC123"));
    let index = ObjectIndex::build(&frame);
    let correlator = Correlator::new(ComponentIds::default(), PlateFilter::new(true, 6));

    let result = correlator.correlate(&frame.objects[1], &index);
    let plate = result.plate.unwrap();
    assert_eq!(plate.vehicle_id, 42);
    assert_eq!(plate.text, "ABC123");
    assert_eq!(plate.confidence, 0.8);
    assert!(result.attributes.is_none());
  }

  #[test]
  fn test_plate_rejected_by_word_count() {
    let frame = frame_with(plate_object("ABC123"));
    let index = ObjectIndex::build(&frame);
    let correlator = Correlator::new(ComponentIds::default(), PlateFilter::new(true, 5));
    assert!(correlator.correlate(&frame.objects[1], &index).plate.is_none());
  }

  #[test]
  fn test_plate_without_resolvable_parent_dropped() {
    let frame = Frame::new(0, vec![DetectedObject::new(100).with_parent(7).with_label(3, "XYZ")]);
    let index = ObjectIndex::build(&frame);
    let correlator = Correlator::default();
    let result = correlator.correlate(&frame.objects[0], &index);
    assert_eq!(result, ObjectCorrelation::default());
  }

  #[test]
  fn test_attributes_on_vehicle() {
    let frame = frame_with(plate_object("ABC123"));
    let index = ObjectIndex::build(&frame);
    let correlator = Correlator::default();

    let attributes = correlator
      .correlate(&frame.objects[0], &index)
      .attributes
      .unwrap();
    assert_eq!(attributes.vehicle_id, 42);
    assert_eq!(attributes.label(Attribute::Color), Some("red"));
    assert_eq!(attributes.label(Attribute::Make), Some("Audi"));
    assert_eq!(attributes.label(Attribute::Type), None);
    assert_eq!(attributes.bbox, BoundingBox::new(10.0, 20.0, 300.0, 200.0));
  }

  #[test]
  fn test_last_plate_label_wins() {
    let mut plate = DetectedObject::new(100).with_parent(42);
    plate.classifications.push(AttachedClassification {
      component_id: 3,
      labels: vec![LabelResult::new("AAA111", 0.4), LabelResult::new("BBB222", 0.3)],
    });
    let frame = frame_with(plate);
    let index = ObjectIndex::build(&frame);
    let result = Correlator::default().correlate(&frame.objects[1], &index);
    assert_eq!(result.plate.unwrap().text, "BBB222");
  }

  #[test]
  fn test_unknown_component_ignored() {
    let frame = Frame::new(0, vec![DetectedObject::new(1).with_label(1, "lpd")]);
    let index = ObjectIndex::build(&frame);
    assert!(Correlator::default()
      .correlate(&frame.objects[0], &index)
      .attributes
      .is_none());
  }

  #[test]
  fn test_plate_table_last_write_wins() {
    let candidate = |text: &str| PlateCandidate {
      vehicle_id: 42,
      text: text.to_string(),
      confidence: 0.5,
      bbox: BoundingBox::default(),
    };
    let mut table = PlateTable::new();
    assert!(table.insert(candidate("AAA111")).is_none());
    let replaced = table.insert(candidate("BBB222")).unwrap();
    assert_eq!(replaced.text, "AAA111");
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(42).unwrap().text, "BBB222");
    assert!(table.get(43).is_none());
  }
}
