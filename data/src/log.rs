//! Log sink settings: the level comes from `KEYVIZ_LOG`, records go to a
//! per-session file under the data directory.

use std::path::PathBuf;
use std::{fs, io};

use log::LevelFilter;

use crate::data_path;

pub const LEVEL_ENV: &str = "KEYVIZ_LOG";
const LOG_FILE: &str = "output.log";

/// Renderer crates that are capped at `warn` whatever the requested level.
pub const QUIET_TARGETS: [&str; 5] = ["wgpu_core", "wgpu_hal", "naga", "iced_wgpu", "iced_winit"];

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub file: PathBuf,
}

impl LogSettings {
    pub fn from_env() -> Result<Self, Error> {
        let raw = std::env::var(LEVEL_ENV).ok();
        Ok(Self {
            level: parse_level(raw.as_deref())?,
            file: data_path(LOG_FILE),
        })
    }

    pub fn level_for(&self, target: &str) -> LevelFilter {
        if QUIET_TARGETS.contains(&target) {
            self.level.min(LevelFilter::Warn)
        } else {
            self.level
        }
    }

    /// Truncates whatever the previous session left behind.
    pub fn open_file(&self) -> Result<fs::File, Error> {
        if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(fs::File::create(&self.file)?)
    }
}

/// Unset or blank means `info`.
pub fn parse_level(raw: Option<&str>) -> Result<LevelFilter, Error> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(level) => Ok(level.parse()?),
        None => Ok(LevelFilter::Info),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    SetLog(#[from] log::SetLoggerError),
    #[error("invalid KEYVIZ_LOG value: {0}")]
    ParseLevel(#[from] log::ParseLevelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn level_parsing() {
        assert_eq!(parse_level(None).unwrap(), LevelFilter::Info);
        assert_eq!(parse_level(Some("  ")).unwrap(), LevelFilter::Info);
        assert_eq!(parse_level(Some("debug")).unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level(Some("TRACE")).unwrap(), LevelFilter::Trace);
        assert!(matches!(parse_level(Some("loud")), Err(Error::ParseLevel(_))));
    }

    #[test]
    fn renderer_targets_are_capped() {
        let settings = LogSettings {
            level: LevelFilter::Trace,
            file: PathBuf::from(LOG_FILE),
        };
        assert_eq!(settings.level_for("wgpu_core"), LevelFilter::Warn);
        assert_eq!(settings.level_for("keyviz_data::view"), LevelFilter::Trace);

        let quiet = LogSettings {
            level: LevelFilter::Error,
            ..settings
        };
        assert_eq!(quiet.level_for("naga"), LevelFilter::Error);
    }

    #[test]
    fn file_is_truncated_per_session() {
        let dir = std::env::temp_dir().join(format!("keyviz-log-{}", std::process::id()));
        let settings = LogSettings {
            level: LevelFilter::Info,
            file: dir.join("nested").join(LOG_FILE),
        };

        settings.open_file().unwrap().write_all(b"old session").unwrap();
        settings.open_file().unwrap();
        assert_eq!(fs::read(&settings.file).unwrap().len(), 0);
        let _ = fs::remove_dir_all(dir);
    }
}
