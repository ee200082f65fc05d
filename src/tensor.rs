// 该文件是 Shanan （山南西风） 项目的一部分。
// src/tensor.rs - 分类张量概率提取
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

use thiserror::Error;
use tracing::{debug, warn};

use crate::frame::{AttachedTensorMeta, TensorLayer};

#[derive(Error, Debug)]
pub enum TensorError {
  #[error("设备拷贝大小不匹配: 期望 {expected} 个元素, 实际 {actual} 个")]
  CopySizeMismatch { expected: usize, actual: usize },
  #[error("输出层类别数不匹配: 期望 {expected}, 实际 {actual}")]
  ClassCountMismatch { expected: usize, actual: usize },
}

/// 读取输出层时使用的缓冲区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
  /// 直接读取主机端拷贝
  #[default]
  Host,
  /// 先把设备端拷贝传输到主机可见内存再读取
  Device,
}

impl ReadMode {
  pub fn flip(self) -> Self {
    match self {
      ReadMode::Host => ReadMode::Device,
      ReadMode::Device => ReadMode::Host,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbability {
  pub class_index: usize,
  pub probability: f32,
}

/// 从逐类概率张量中找出得分最高的类别。
///
/// 设备端数据会先拷贝到提取器自有的暂存区，输入元数据本身不会被修改。
/// 暂存区在多次调用间复用，容量不超过最大的合法输出层。
#[derive(Debug, Default)]
pub struct TensorExtractor {
  staging: Vec<f32>,
}

impl TensorExtractor {
  pub fn new() -> Self {
    Self::default()
  }

  /// 在所有合法输出层上取最大概率及其类别下标。
  ///
  /// 长度与 `expected_classes` 不符的输出层会被拒绝，不参与比较；
  /// 所有输出层都被拒绝时返回 `None`。
  pub fn extract(
    &mut self,
    meta: &AttachedTensorMeta,
    mode: ReadMode,
    expected_classes: usize,
  ) -> Option<ClassProbability> {
    let mut best: Option<ClassProbability> = None;

    for (layer_idx, layer) in meta.layers.iter().enumerate() {
      let probabilities = match self.read_layer(layer, mode, expected_classes) {
        Ok(probabilities) => probabilities,
        Err(e) => {
          warn!(
            "组件 {} 的第 {} 个输出层被拒绝: {}",
            meta.component_id, layer_idx, e
          );
          continue;
        }
      };

      if let Some(candidate) = arg_max(probabilities)
        && best.is_none_or(|b| candidate.probability > b.probability)
      {
        best = Some(candidate);
      }
    }

    debug!(
      "组件 {} 张量提取结果 ({:?} 模式): {:?}",
      meta.component_id, mode, best
    );
    best
  }

  fn read_layer<'a>(
    &'a mut self,
    layer: &'a TensorLayer,
    mode: ReadMode,
    expected_classes: usize,
  ) -> Result<&'a [f32], TensorError> {
    match (mode, &layer.device) {
      (ReadMode::Device, Some(device)) => {
        if device.len() != expected_classes {
          return Err(TensorError::ClassCountMismatch {
            expected: expected_classes,
            actual: device.len(),
          });
        }
        self.staging.clear();
        self.staging.resize(device.len(), 0.0);
        device.copy_to_host(&mut self.staging)?;
        Ok(self.staging.as_slice())
      }
      _ => {
        if layer.host.len() != expected_classes {
          return Err(TensorError::ClassCountMismatch {
            expected: expected_classes,
            actual: layer.host.len(),
          });
        }
        Ok(layer.host.as_slice())
      }
    }
  }
}

/// 相同概率时保留下标最小的类别，NaN 不参与比较
fn arg_max(probabilities: &[f32]) -> Option<ClassProbability> {
  probabilities
    .iter()
    .copied()
    .enumerate()
    .filter(|(_, p)| !p.is_nan())
    .fold(None, |best, (class_index, probability)| match best {
      Some(b) if b.probability >= probability => Some(b),
      _ => Some(ClassProbability {
        class_index,
        probability,
      }),
    })
}
