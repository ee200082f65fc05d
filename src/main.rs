// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shanan_alpr::{
  FromUrl,
  fusion::FusionEngine,
  input::InputWrapper,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();
  let config = args.fusion_config()?;

  info!("Shanan 车牌融合");
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!(
    "输出策略: everyobject={}, everycar={}, 字数限制={} ({})",
    config.open_everyobject_output,
    config.open_everycar_classification,
    config.lpr_word_limit,
    config.lpr_word_count
  );

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let engine = FusionEngine::new(config);

  ContinuousTask::default()
    .with_batch_number(args.batch_number)
    .with_interrupt(true)
    .run_task(input.into_batches()?, engine, output)?;

  Ok(())
}
