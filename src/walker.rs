// 该文件是 Shanan （山南西风） 项目的一部分。
// src/walker.rs - 批次与目标遍历
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

use crate::frame::{DetectedObject, Frame, FrameBatch, TrackId};

/// 批次中含有目标的帧
pub fn frames(batch: &FrameBatch) -> impl Iterator<Item = &Frame> {
  batch.frames.iter().filter(|frame| !frame.objects.is_empty())
}

/// 帧中带有分类结果的目标
pub fn classified_objects(frame: &Frame) -> impl Iterator<Item = &DetectedObject> {
  frame.objects.iter().filter(|object| object.has_classifications())
}

/// 按顺序惰性产生 (帧, 目标)，跳过空帧和没有分类结果的目标
pub fn walk(batch: &FrameBatch) -> impl Iterator<Item = (&Frame, &DetectedObject)> {
  frames(batch).flat_map(|frame| classified_objects(frame).map(move |object| (frame, object)))
}

/// 单帧内跟踪 ID 到目标的索引，用于解析父目标引用
#[derive(Debug)]
pub struct ObjectIndex<'a> {
  objects: HashMap<TrackId, &'a DetectedObject>,
}

impl<'a> ObjectIndex<'a> {
  pub fn build(frame: &'a Frame) -> Self {
    let objects = frame
      .objects
      .iter()
      .map(|object| (object.object_id, object))
      .collect();
    Self { objects }
  }

  pub fn get(&self, track_id: TrackId) -> Option<&'a DetectedObject> {
    self.objects.get(&track_id).copied()
  }

  /// 目标的父目标，父 ID 缺失或不在本帧中时返回 `None`
  pub fn parent_of(&self, object: &DetectedObject) -> Option<&'a DetectedObject> {
    object.parent_id.and_then(|id| self.get(id))
  }
}
