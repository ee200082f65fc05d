// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  fs::OpenOptions,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoded_path, fusion::VehicleRecord, output::Render};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("记录格式未知: {0}")]
  UnknownFormat(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordFormat {
  #[default]
  Csv,
  Json,
}

impl RecordFormat {
  fn extension(&self) -> &'static str {
    match self {
      RecordFormat::Csv => "csv",
      RecordFormat::Json => "jsonl",
    }
  }
}

/// 按日期分目录追加写入记录，`folder:///data/records?format=json`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  format: RecordFormat,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let mut format = RecordFormat::default();
    for (k, v) in uri.query_pairs() {
      if k == "format" {
        format = match v.as_ref() {
          "csv" => RecordFormat::Csv,
          "json" => RecordFormat::Json,
          other => return Err(DirectoryRecordOutputError::UnknownFormat(other.to_string())),
        };
      }
    }

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(decoded_path(uri)),
      format,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, format: RecordFormat) -> Self {
    Self {
      directory: directory.into(),
      format,
    }
  }

  pub fn record_path(&self, now: DateTime<Utc>) -> PathBuf {
    self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()))
      .join(format!("records.{}", self.format.extension()))
  }

  /// 按 `now` 所在日期写入记录，空记录不创建文件
  pub fn write_at(
    &self,
    now: DateTime<Utc>,
    records: &[VehicleRecord],
  ) -> Result<(), DirectoryRecordOutputError> {
    if records.is_empty() {
      return Ok(());
    }
    let path = self.record_path(now);
    debug!("写入 {} 条记录到 {}", records.len(), path.display());
    self.append(&path, records)
  }

  fn append(&self, path: &Path, records: &[VehicleRecord]) -> Result<(), DirectoryRecordOutputError> {
    if let Some(parent) = path.parent()
      && !parent.exists()
    {
      std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
      match self.format {
        RecordFormat::Csv => writeln!(writer, "{}", record)?,
        RecordFormat::Json => writeln!(writer, "{}", serde_json::to_string(record)?)?,
      }
    }
    writer.flush()?;
    Ok(())
  }
}

impl Render<[VehicleRecord]> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, result: &[VehicleRecord]) -> Result<(), Self::Error> {
    self.write_at(Utc::now(), result)
  }
}
