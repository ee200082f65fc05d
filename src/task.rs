// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 融合任务
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

use std::{thread, time::Duration};
use tracing::{debug, info, warn};

use crate::{
  frame::FrameBatch,
  fusion::{BatchProbe, VehicleRecord},
  output::Render,
};

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, input: I, probe: P, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  PE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = FrameBatch>,
  P: BatchProbe<Error = PE>,
  O: Render<[VehicleRecord], Error = RE>,
> Task<I, P, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut probe: P, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let batch = input.next().ok_or_else(|| anyhow::anyhow!("没有输入批次"))?;
    info!("输入批次获取成功，共 {} 帧，开始融合...", batch.frames.len());
    let now = std::time::Instant::now();
    let records = probe.probe(&batch)?;
    let elapsed = now.elapsed();
    info!("融合完成，输出 {} 条记录，耗时: {:.2?}", records.len(), elapsed);
    output.render_result(records.as_slice())?;
    info!("输出完成");

    Ok(())
  }
}

/// 对同一批次反复融合，统计平均耗时并检查结果是否一致
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(1);
    self
  }
}

impl<
  PE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = FrameBatch>,
  P: BatchProbe<Error = PE>,
  O: Render<[VehicleRecord], Error = RE>,
> Task<I, P, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut probe: P, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let batch = input.next().ok_or_else(|| anyhow::anyhow!("没有输入批次"))?;
    info!("输入批次获取成功，开始重复融合 {} 次...", self.repeat_times);

    let mut times = Vec::with_capacity(self.repeat_times);
    let mut first: Option<Vec<VehicleRecord>> = None;
    let mut mismatches = 0usize;
    for i in 0..self.repeat_times {
      let now = std::time::Instant::now();
      let records = probe.probe(&batch)?;
      let elapsed = now.elapsed();
      debug!("({})融合完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);

      if let Some(expected) = &first {
        if *expected != records {
          mismatches += 1;
          warn!("({})融合结果与首次不一致", i);
        }
        continue;
      }
      output.render_result(records.as_slice())?;
      first = Some(records);
    }

    // 前两次含缓存预热，不计入平均
    let measured = if times.len() > 2 { &times[2..] } else { &times[..] };
    warn!(
      "平均融合时间: {:.2?}",
      measured.iter().sum::<Duration>() / measured.len() as u32
    );

    if mismatches > 0 {
      anyhow::bail!("{} 次融合结果与首次不一致", mismatches);
    }
    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  batch_number: Option<usize>,
  interruptible: bool,
}

impl ContinuousTask {
  pub fn with_batch_number(mut self, batch_number: Option<usize>) -> Self {
    self.batch_number = batch_number;
    self
  }

  /// 安装 Ctrl-C 处理，收到中断后不再处理后续批次
  pub fn with_interrupt(mut self, interruptible: bool) -> Self {
    self.interruptible = interruptible;
    self
  }
}

impl<
  PE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = FrameBatch>,
  P: BatchProbe<Error = PE>,
  O: Render<[VehicleRecord], Error = RE>,
> Task<I, P, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, mut probe: P, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    if self.interruptible {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }

    let mut batch_index = 0usize;
    let mut total_records = 0usize;
    for batch in input {
      batch_index += 1;
      debug!("处理第 {} 个批次", batch_index);
      let now = std::time::Instant::now();
      let records = probe.probe(&batch)?;
      let elapsed_a = now.elapsed();
      output.render_result(records.as_slice())?;
      let elapsed_b = now.elapsed();
      total_records += records.len();
      debug!(
        "批次 {} 输出 {} 条记录，耗时: {:.2?} / {:.2?}",
        batch_index,
        records.len(),
        elapsed_a,
        elapsed_b
      );
      if self.batch_number.is_some_and(|n| batch_index >= n) {
        info!("达到指定批次数 {}, 退出任务循环", batch_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 个批次，输出 {} 条记录",
      batch_index, total_records
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{cell::RefCell, convert::Infallible};

  use crate::{
    config::FusionConfig,
    frame::{DetectedObject, Frame},
    fusion::FusionEngine,
  };

  #[derive(Default)]
  struct Collect {
    lines: RefCell<Vec<String>>,
  }

  impl Render<[VehicleRecord]> for &Collect {
    type Error = Infallible;

    fn render_result(&self, result: &[VehicleRecord]) -> Result<(), Self::Error> {
      self
        .lines
        .borrow_mut()
        .extend(result.iter().map(|r| r.to_string()));
      Ok(())
    }
  }

  fn batches(count: u64) -> Vec<FrameBatch> {
    (0..count)
      .map(|i| {
        FrameBatch::new(vec![Frame::new(
          i,
          vec![
            DetectedObject::new(i + 1).with_label(4, "red"),
            DetectedObject::new(100 + i)
              .with_parent(i + 1)
              .with_label(3, "ABC123"),
          ],
        )])
      })
      .collect()
  }

  #[test]
  fn test_continuous_task_respects_batch_number() {
    let collect = Collect::default();
    ContinuousTask::default()
      .with_batch_number(Some(2))
      .run_task(
        batches(5).into_iter(),
        FusionEngine::new(FusionConfig::default()),
        &collect,
      )
      .unwrap();
    assert_eq!(
      *collect.lines.borrow(),
      vec![
        "1,ABC123,0.000000,red,0.000000,,0.000000,,0.000000".to_string(),
        "2,ABC123,0.000000,red,0.000000,,0.000000,,0.000000".to_string(),
      ]
    );
  }

  #[test]
  fn test_one_shot_task_requires_input() {
    let collect = Collect::default();
    let result = OneShotTask.run_task(
      std::iter::empty::<FrameBatch>(),
      FusionEngine::new(FusionConfig::default()),
      &collect,
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_repeat_shot_task_renders_once() {
    let collect = Collect::default();
    RepeatShotTask::default()
      .with_repeat_times(5)
      .run_task(
        batches(1).into_iter(),
        FusionEngine::new(FusionConfig::default()),
        &collect,
      )
      .unwrap();
    assert_eq!(collect.lines.borrow().len(), 1);
  }
}
