//! Process-wide configuration.
//!
//! Defaults match the budgets named throughout the component design; a
//! deployment may override them via a TOML file loaded with
//! [`IocConfig::from_file`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ioc_proto::Capability;

/// Errors loading or parsing an [`IocConfig`] file.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The file could not be read.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path that failed to read.
		path: std::path::PathBuf,
		/// Underlying I/O error.
		error: std::io::Error,
	},

	/// The file content was not valid TOML for this schema.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Process-wide configuration for queue depths and size limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IocConfig {
	/// Depth of each per-link EVT descriptor queue.
	pub depth_evt_desc_queue: usize,
	/// Depth of each per-link DAT chunk queue.
	pub depth_dat_chunk_queue: usize,
	/// Maximum accepted size, in bytes, of a single DAT chunk.
	pub max_data_queue_size: usize,
	/// Depth of the Conles bus's shared EVT queue.
	pub depth_conles_queue: usize,
}

impl Default for IocConfig {
	fn default() -> Self {
		Self {
			depth_evt_desc_queue: 64,
			depth_dat_chunk_queue: 64,
			max_data_queue_size: 1 << 20,
			depth_conles_queue: 256,
		}
	}
}

impl IocConfig {
	/// Read and parse a config file at `path`.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Ok(toml::from_str(&content)?)
	}

	/// Report the active configuration as a [`Capability`] record.
	#[must_use]
	pub fn capability(&self) -> Capability {
		Capability {
			depth_evt_desc_queue: self.depth_evt_desc_queue,
			depth_dat_chunk_queue: self.depth_dat_chunk_queue,
			max_data_queue_size: self.max_data_queue_size,
			depth_conles_queue: self.depth_conles_queue,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_nonzero() {
		let cfg = IocConfig::default();
		assert!(cfg.depth_evt_desc_queue > 0);
		assert!(cfg.max_data_queue_size > 0);
	}

	#[test]
	fn from_file_round_trips_partial_overrides() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ioc.toml");
		std::fs::write(&path, "depth_evt_desc_queue = 8\n").unwrap();
		let cfg = IocConfig::from_file(&path).unwrap();
		assert_eq!(cfg.depth_evt_desc_queue, 8);
		assert_eq!(cfg.depth_dat_chunk_queue, IocConfig::default().depth_dat_chunk_queue);
	}

	#[test]
	fn from_file_missing_is_io_error() {
		let err = IocConfig::from_file("/nonexistent/path/ioc.toml").unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
