// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 批次、帧与目标元数据定义
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

use serde::{Deserialize, Serialize};

use crate::tensor::TensorError;

/// 跟踪器分配的目标 ID
pub type TrackId = u64;

/// 上游每个处理周期送来的一批帧
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameBatch {
  #[serde(default)]
  pub frames: Vec<Frame>,
}

impl FrameBatch {
  pub fn new(frames: Vec<Frame>) -> Self {
    Self { frames }
  }

  pub fn is_empty(&self) -> bool {
    self.frames.iter().all(|frame| frame.objects.is_empty())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
  /// 显示时间戳（纳秒）
  #[serde(default)]
  pub pts: u64,
  #[serde(default)]
  pub frame_number: u64,
  #[serde(default)]
  pub source_id: u32,
  #[serde(default)]
  pub objects: Vec<DetectedObject>,
}

impl Frame {
  pub fn new(pts: u64, objects: Vec<DetectedObject>) -> Self {
    Self {
      pts,
      objects,
      ..Default::default()
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub left: f32,
  pub top: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
    Self {
      left,
      top,
      width,
      height,
    }
  }
}

/// 主检测器输出的一个目标，附带跟踪 ID 与各个二级模型的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
  #[serde(default)]
  pub class_id: u32,
  pub object_id: TrackId,
  /// 子区域（如车牌）所属父目标的跟踪 ID
  #[serde(default)]
  pub parent_id: Option<TrackId>,
  #[serde(default)]
  pub bbox: BoundingBox,
  #[serde(default)]
  pub confidence: f32,
  #[serde(default)]
  pub classifications: Vec<AttachedClassification>,
  #[serde(default)]
  pub tensors: Vec<AttachedTensorMeta>,
}

impl DetectedObject {
  pub fn new(object_id: TrackId) -> Self {
    Self {
      object_id,
      ..Default::default()
    }
  }

  pub fn with_parent(mut self, parent_id: TrackId) -> Self {
    self.parent_id = Some(parent_id);
    self
  }

  pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
    self.bbox = bbox;
    self
  }

  pub fn with_confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn with_label(mut self, component_id: u32, label: &str) -> Self {
    self.classifications.push(AttachedClassification {
      component_id,
      labels: vec![LabelResult::new(label, 0.0)],
    });
    self
  }

  pub fn with_tensor(mut self, tensor: AttachedTensorMeta) -> Self {
    self.tensors.push(tensor);
    self
  }

  pub fn has_classifications(&self) -> bool {
    !self.classifications.is_empty()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachedClassification {
  pub component_id: u32,
  #[serde(default)]
  pub labels: Vec<LabelResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelResult {
  #[serde(default)]
  pub label: String,
  #[serde(default)]
  pub confidence: f32,
}

impl LabelResult {
  pub fn new(label: &str, confidence: f32) -> Self {
    Self {
      label: label.to_string(),
      confidence,
    }
  }
}

/// 二级分类模型的原始输出张量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachedTensorMeta {
  pub component_id: u32,
  #[serde(default)]
  pub layers: Vec<TensorLayer>,
}

impl AttachedTensorMeta {
  pub fn new(component_id: u32, layers: Vec<TensorLayer>) -> Self {
    Self {
      component_id,
      layers,
    }
  }
}

/// 一个输出层的逐类概率，主机端与设备端各有一份相同内容的拷贝
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TensorLayer {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub host: Vec<f32>,
  #[serde(default)]
  pub device: Option<DeviceBuffer>,
}

impl TensorLayer {
  pub fn host_only(host: Vec<f32>) -> Self {
    Self {
      host,
      ..Default::default()
    }
  }

  /// 主机端与设备端持有相同数据的输出层
  pub fn mirrored(probabilities: Vec<f32>) -> Self {
    Self {
      device: Some(DeviceBuffer::new(probabilities.clone())),
      host: probabilities,
      ..Default::default()
    }
  }
}

/// 设备端内存，只有拷贝到主机可见内存后才能读取
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceBuffer {
  data: Vec<f32>,
}

impl DeviceBuffer {
  pub fn new(data: Vec<f32>) -> Self {
    Self { data }
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 设备到主机拷贝，目标长度必须与设备端元素数一致
  pub fn copy_to_host(&self, host: &mut [f32]) -> Result<(), TensorError> {
    if host.len() != self.data.len() {
      return Err(TensorError::CopySizeMismatch {
        expected: self.data.len(),
        actual: host.len(),
      });
    }
    host.copy_from_slice(&self.data);
    Ok(())
  }
}
