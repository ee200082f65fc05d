// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 融合配置
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

//! 部署配置文件为逐行的 `name = value` 格式（TOML 的子集），开关取整数，非零即真。
//!
//! ```text
//! # 融合输出策略
//! open_everyobject_output = 0
//! open_everycar_classification = 1
//! lpr_word_limit = 1
//! lpr_word_count = 7
//! ```
//!
//! 管道相关的 `muxer_*` 键会被接受并忽略；`component_*` 覆盖组件 ID，
//! `component_*_classes` 覆盖对应属性分类器的类别数。

use std::{collections::BTreeMap, path::Path, str::FromStr};

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  correlator::PlateFilter,
  model::{ClassCounts, ComponentIds},
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置解析错误: {0}")]
  ParseError(#[from] toml::de::Error),
  #[error("配置项 {key} 取值无效: {value}")]
  InvalidValue { key: &'static str, value: String },
}

/// 启动时读取、之后只读的融合配置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionConfig {
  /// 输出每个有车牌或分类结果的车辆
  pub open_everyobject_output: bool,
  /// 没有匹配车牌的车辆也输出分类结果
  pub open_everycar_classification: bool,
  /// 开启车牌字数过滤
  pub lpr_word_limit: bool,
  /// 开启过滤时要求的车牌字数
  pub lpr_word_count: usize,
  pub components: ComponentIds,
  pub class_counts: ClassCounts,
}

impl FusionConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!("读取配置文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    content.parse()
  }

  pub fn plate_filter(&self) -> PlateFilter {
    PlateFilter::new(self.lpr_word_limit, self.lpr_word_count)
  }
}

/// 配置文件中的键，未出现的键取默认值
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ConfigFile {
  #[serde(deserialize_with = "flag")]
  open_everyobject_output: bool,
  #[serde(deserialize_with = "flag")]
  open_everycar_classification: bool,
  #[serde(deserialize_with = "flag")]
  lpr_word_limit: bool,
  lpr_word_count: usize,
  component_lpr: Option<u32>,
  component_color: Option<u32>,
  component_make: Option<u32>,
  component_type: Option<u32>,
  component_color_classes: Option<usize>,
  component_make_classes: Option<usize>,
  component_type_classes: Option<usize>,
  #[serde(flatten)]
  rest: BTreeMap<String, toml::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
  Int(i64),
  Bool(bool),
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
  Ok(match Flag::deserialize(deserializer)? {
    Flag::Int(value) => value != 0,
    Flag::Bool(value) => value,
  })
}

fn class_count(key: &'static str, value: Option<usize>, default: usize) -> Result<usize, ConfigError> {
  match value {
    Some(0) => Err(ConfigError::InvalidValue {
      key,
      value: "0".to_string(),
    }),
    Some(count) => Ok(count),
    None => Ok(default),
  }
}

impl TryFrom<ConfigFile> for FusionConfig {
  type Error = ConfigError;

  fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
    for (key, value) in &file.rest {
      if key.starts_with("muxer_") {
        debug!("忽略管道配置项 {} = {}", key, value);
      } else {
        warn!("配置项 {} 未知，忽略", key);
      }
    }

    let defaults = ComponentIds::default();
    let components = ComponentIds {
      license_plate: file.component_lpr.unwrap_or(defaults.license_plate),
      color: file.component_color.unwrap_or(defaults.color),
      make: file.component_make.unwrap_or(defaults.make),
      vehicle_type: file.component_type.unwrap_or(defaults.vehicle_type),
    };

    let defaults = ClassCounts::default();
    let class_counts = ClassCounts {
      color: class_count("component_color_classes", file.component_color_classes, defaults.color)?,
      make: class_count("component_make_classes", file.component_make_classes, defaults.make)?,
      vehicle_type: class_count(
        "component_type_classes",
        file.component_type_classes,
        defaults.vehicle_type,
      )?,
    };

    Ok(Self {
      open_everyobject_output: file.open_everyobject_output,
      open_everycar_classification: file.open_everycar_classification,
      lpr_word_limit: file.lpr_word_limit,
      lpr_word_count: file.lpr_word_count,
      components,
      class_counts,
    })
  }
}

impl FromStr for FusionConfig {
  type Err = ConfigError;

  fn from_str(content: &str) -> Result<Self, Self::Err> {
    let file: ConfigFile = toml::from_str(content)?;
    let config = FusionConfig::try_from(file)?;
    debug!("融合配置: {:?}", config);
    Ok(config)
  }
}
