use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::RwLock,
};

use anyhow::Result;
use once_cell::sync::Lazy;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::config::is_truthy;

pub const ENV_TELEMETRY: &str = "COURSEFORGE_TELEMETRY";
pub const ENV_LOG_DIR: &str = "COURSEFORGE_LOG_DIR";
const LOG_FILE: &str = "courseforge.log";

struct TelemetryState {
    enabled: bool,
    log_dir: PathBuf,
}

static TELEMETRY: Lazy<RwLock<TelemetryState>> = Lazy::new(|| {
    RwLock::new(TelemetryState {
        enabled: false,
        log_dir: PathBuf::from("logs"),
    })
});

/**
 * \brief 更新遥测开关状态。
 */
pub fn set_enabled(enabled: bool) {
    if let Ok(mut guard) = TELEMETRY.write() {
        guard.enabled = enabled;
    }
}

/**
 * \brief 查询当前遥测开关状态。
 */
pub fn is_enabled() -> bool {
    TELEMETRY.read().map(|g| g.enabled).unwrap_or(false)
}

/**
 * \brief 设置日志目录。
 */
pub fn set_log_dir(dir: impl Into<PathBuf>) {
    if let Ok(mut guard) = TELEMETRY.write() {
        guard.log_dir = dir.into();
    }
}

/**
 * \brief 从环境变量初始化开关与日志目录。
 */
pub fn init_from_env() {
    if let Ok(dir) = std::env::var(ENV_LOG_DIR) {
        if !dir.trim().is_empty() {
            set_log_dir(dir.trim());
        }
    }
    if let Ok(flag) = std::env::var(ENV_TELEMETRY) {
        set_enabled(is_truthy(&flag));
    }
}

/**
 * \brief 记录常规事件。
 */
pub fn log_event(category: &str, message: &str) {
    emit("INFO", category, message);
}

/**
 * \brief 记录降级/回退等需要关注但非致命的事件。
 */
pub fn log_warn(category: &str, message: &str) {
    emit("WARN", category, message);
}

/**
 * \brief 记录错误事件。
 */
pub fn log_error(category: &str, message: &str) {
    emit("ERROR", category, message);
}

fn emit(level: &str, category: &str, message: &str) {
    if !is_enabled() {
        return;
    }
    let dir = TELEMETRY
        .read()
        .map(|g| g.log_dir.clone())
        .unwrap_or_else(|_| PathBuf::from("logs"));
    if let Err(err) = write_line(&dir, level, category, message) {
        eprintln!("telemetry write failed: {}", err);
    }
}

fn write_line(log_dir: &Path, level: &str, category: &str, message: &str) -> Result<()> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;
    writeln!(file, "{} [{}] {} - {}", timestamp, level, category, message)?;
    Ok(())
}
