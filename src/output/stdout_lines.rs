// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/stdout_lines.rs - 标准输出逐行输出
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

use std::io::Write;

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, fusion::VehicleRecord, output::Render};

#[derive(Error, Debug)]
pub enum StdoutOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 每条车辆记录一行，字段以逗号分隔
pub struct StdoutOutput;

impl FromUrlWithScheme for StdoutOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutOutput {
  type Error = StdoutOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(StdoutOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    Ok(StdoutOutput)
  }
}

pub fn write_lines<W: Write>(writer: &mut W, records: &[VehicleRecord]) -> std::io::Result<()> {
  for record in records {
    writeln!(writer, "{}", record)?;
  }
  writer.flush()
}

impl Render<[VehicleRecord]> for StdoutOutput {
  type Error = StdoutOutputError;

  fn render_result(&self, result: &[VehicleRecord]) -> Result<(), Self::Error> {
    if result.is_empty() {
      return Ok(());
    }
    let stdout = std::io::stdout();
    write_lines(&mut stdout.lock(), result)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_one_line_per_record() {
    let records = vec![
      VehicleRecord {
        track_id: 1,
        plate: "ABC123".to_string(),
        ..Default::default()
      },
      VehicleRecord {
        track_id: 2,
        ..Default::default()
      },
    ];
    let mut buffer = Vec::new();
    write_lines(&mut buffer, &records).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert_eq!(
      text,
      "1,ABC123,0.000000,,0.000000,,0.000000,,0.000000\n2,,0.000000,,0.000000,,0.000000,,0.000000\n"
    );
  }

  #[test]
  fn test_from_url() {
    assert!(StdoutOutput::from_url(&Url::parse("stdout://").unwrap()).is_ok());
    assert!(StdoutOutput::from_url(&Url::parse("folder:///tmp").unwrap()).is_err());
  }
}
