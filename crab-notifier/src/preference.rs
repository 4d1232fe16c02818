// crab-notifier/src/preference.rs
// 通知偏好存储 - 静音开关持久化到工作目录

use std::fs;
use std::path::{Path, PathBuf};

/// Storage key, also the file name
pub const MUTED_KEY: &str = "mutedNotifications";

/// 静音偏好存储
///
/// The file holds the literal string `true` or `false`. Anything else,
/// or a missing file, reads as unmuted.
#[derive(Debug, Clone)]
pub struct PreferenceStorage {
    path: PathBuf,
}

impl PreferenceStorage {
    /// 创建偏好存储
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let path = base_path.into().join(MUTED_KEY);
        Self { path }
    }

    /// 确保目录存在
    fn ensure_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// 读取静音状态
    pub fn load_muted(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(value) => value.trim() == "true",
            Err(_) => false,
        }
    }

    /// 保存静音状态
    pub fn save_muted(&self, muted: bool) -> std::io::Result<()> {
        self.ensure_dir()?;
        fs::write(&self.path, if muted { "true" } else { "false" })
    }

    /// 获取路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}
