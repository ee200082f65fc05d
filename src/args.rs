// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_alpr::config::FusionConfig;

/// Shanan 车牌融合参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 批次元数据来源
  /// 支持格式:
  /// - 回放: replay:///path/to/batches.jsonl?bound=8
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 记录输出
  /// 支持格式:
  /// - 标准输出: stdout://
  /// - 目录记录: folder:///path/to/records?format=csv|json
  #[arg(long, default_value = "stdout://", value_name = "OUTPUT")]
  pub output: Url,

  /// 部署配置文件（name = value 格式）
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 输出每个有车牌或分类结果的车辆
  #[arg(long)]
  pub open_everyobject_output: bool,

  /// 没有匹配车牌的车辆也输出分类结果
  #[arg(long)]
  pub open_everycar_classification: bool,

  /// 只接受指定字数的车牌（开启字数过滤）
  #[arg(long, value_name = "COUNT")]
  pub lpr_word_count: Option<usize>,

  /// 最大处理批次数（不指定表示无限制）
  #[arg(long, value_name = "COUNT")]
  pub batch_number: Option<usize>,
}

impl Args {
  /// 读取配置文件，并用命令行参数覆盖
  pub fn fusion_config(&self) -> Result<FusionConfig> {
    let mut config = match &self.config {
      Some(path) => FusionConfig::load(path)?,
      None => FusionConfig::default(),
    };

    if self.open_everyobject_output {
      config.open_everyobject_output = true;
    }
    if self.open_everycar_classification {
      config.open_everycar_classification = true;
    }
    if let Some(count) = self.lpr_word_count {
      config.lpr_word_limit = true;
      config.lpr_word_count = count;
    }

    Ok(config)
  }
}
