// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/replay.rs - 元数据批次回放输入
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

//! # 回放输入
//!
//! 从 JSON Lines 文件读取录制好的批次元数据，每行一个 `FrameBatch`：
//!
//! ```text
//! replay:///data/alpr/batches.jsonl?bound=16
//! ```
//!
//! 读取在独立的送数线程上进行，批次经有界通道交给处理线程，
//! `bound` 为通道容量（默认 8）。无法解析的行会被跳过。

use std::{
  fs::File,
  io::{BufRead, BufReader},
  sync::mpsc::{Receiver, SyncSender, sync_channel},
  thread::{self, JoinHandle},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoded_path, frame::FrameBatch};

const DEFAULT_BOUND: usize = 8;

#[derive(Error, Debug)]
pub enum ReplayInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("查询参数 {key} 无效: {value}")]
  InvalidQuery { key: String, value: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

pub struct ReplayInput {
  reader: Box<dyn BufRead + Send>,
  bound: usize,
}

impl FromUrlWithScheme for ReplayInput {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayInput {
  type Error = ReplayInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayInputError::SchemeMismatch(format!(
        "期望输入方式 '{}', 实际输入方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut bound = DEFAULT_BOUND;
    for (k, v) in url.query_pairs() {
      if k == "bound" {
        bound = v
          .parse()
          .ok()
          .filter(|&b| b > 0)
          .ok_or_else(|| ReplayInputError::InvalidQuery {
            key: k.to_string(),
            value: v.to_string(),
          })?;
      }
    }

    let path = decoded_path(url);
    info!("打开回放文件: {}", path);
    let file = File::open(&path)?;
    Ok(Self::from_reader(BufReader::new(file), bound))
  }
}

impl ReplayInput {
  pub fn from_reader(reader: impl BufRead + Send + 'static, bound: usize) -> Self {
    Self {
      reader: Box::new(reader),
      bound: bound.max(1),
    }
  }

  /// 启动送数线程，返回按顺序产生批次的迭代器
  pub fn into_batches(self) -> Result<ReplayBatches, ReplayInputError> {
    let (tx, rx) = sync_channel(self.bound);
    let reader = self.reader;
    let feeder = thread::Builder::new()
      .name("replay-feeder".to_string())
      .spawn(move || feed(reader, tx))?;

    Ok(ReplayBatches {
      receiver: Some(rx),
      feeder: Some(feeder),
    })
  }
}

fn feed(reader: Box<dyn BufRead + Send>, tx: SyncSender<FrameBatch>) {
  let mut sent = 0usize;
  for (idx, line) in reader.lines().enumerate() {
    let line = match line {
      Ok(line) => line,
      Err(e) => {
        error!("读取回放文件第 {} 行失败: {}", idx + 1, e);
        break;
      }
    };
    if line.trim().is_empty() {
      continue;
    }

    match serde_json::from_str::<FrameBatch>(&line) {
      Ok(batch) => {
        if tx.send(batch).is_err() {
          debug!("处理端已关闭，停止送数");
          break;
        }
        sent += 1;
      }
      Err(e) => warn!("第 {} 行批次解析失败，跳过: {}", idx + 1, e),
    }
  }
  info!("回放送数结束，共送出 {} 个批次", sent);
}

pub struct ReplayBatches {
  receiver: Option<Receiver<FrameBatch>>,
  feeder: Option<JoinHandle<()>>,
}

impl Iterator for ReplayBatches {
  type Item = FrameBatch;

  fn next(&mut self) -> Option<Self::Item> {
    self.receiver.as_ref()?.recv().ok()
  }
}

impl Drop for ReplayBatches {
  fn drop(&mut self) {
    // 先关闭接收端，送数线程在下一次发送时退出
    self.receiver.take();
    if let Some(feeder) = self.feeder.take()
      && feeder.join().is_err()
    {
      error!("送数线程异常退出");
    }
  }
}
