// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 批次元数据输入
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

use crate::{FromUrl, frame::FrameBatch};

#[cfg(feature = "replay_input")]
mod replay;
#[cfg(feature = "replay_input")]
pub use self::replay::{ReplayBatches, ReplayInput, ReplayInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "replay_input")]
  #[error("Replay input error: {0}")]
  ReplayInputError(#[from] ReplayInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "replay_input")]
  Replay(ReplayInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "replay_input")]
    use crate::FromUrlWithScheme;

    match url.scheme() {
      #[cfg(feature = "replay_input")]
      ReplayInput::SCHEME => {
        let input = ReplayInput::from_url(url)?;
        Ok(InputWrapper::Replay(input))
      }
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl InputWrapper {
  pub fn into_batches(self) -> Result<InputWrapperIter, InputError> {
    match self {
      #[cfg(feature = "replay_input")]
      InputWrapper::Replay(input) => Ok(InputWrapperIter::Replay(input.into_batches()?)),
    }
  }
}

pub enum InputWrapperIter {
  #[cfg(feature = "replay_input")]
  Replay(ReplayBatches),
}

impl Iterator for InputWrapperIter {
  type Item = FrameBatch;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "replay_input")]
      InputWrapperIter::Replay(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unknown_scheme_rejected() {
    let url = url::Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }

  #[cfg(feature = "replay_input")]
  #[test]
  fn test_replay_scheme_dispatched() {
    let url = url::Url::parse("replay:///nonexistent/shanan-alpr/batches.jsonl").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::ReplayInputError(ReplayInputError::IoError(_)))
    ));
  }
}
