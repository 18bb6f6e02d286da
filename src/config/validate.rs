// src/config/validate.rs

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::config::model::RawConfigFile;

/// Run semantic validation against a freshly parsed configuration.
///
/// This checks:
/// - `artifact_root` is not empty
/// - both suffixes are non-empty, start with `.` and differ
/// - durations parse
/// - `max_workers >= 1` when given
pub fn validate_raw(cfg: &RawConfigFile) -> Result<()> {
    validate_watch(cfg)?;
    validate_durations(cfg)?;
    validate_pool(cfg)?;
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.artifact_root.as_os_str().is_empty() {
        return Err(anyhow!("[watch].artifact_root must not be empty"));
    }

    for (key, suffix) in [
        ("artifact_suffix", &cfg.watch.artifact_suffix),
        ("container_suffix", &cfg.watch.container_suffix),
    ] {
        if suffix.len() < 2 || !suffix.starts_with('.') {
            return Err(anyhow!(
                "[watch].{key} must look like \".ext\" (got {suffix:?})"
            ));
        }
    }

    if cfg.watch.artifact_suffix == cfg.watch.container_suffix {
        return Err(anyhow!(
            "[watch].artifact_suffix and container_suffix must differ (both {:?})",
            cfg.watch.artifact_suffix
        ));
    }
    Ok(())
}

fn validate_durations(cfg: &RawConfigFile) -> Result<()> {
    parse_duration(&cfg.watch.drain_window)
        .map_err(|e| anyhow!(e))
        .context("invalid [watch].drain_window")?;
    parse_duration(&cfg.apply.listener_grace)
        .map_err(|e| anyhow!(e))
        .context("invalid [apply].listener_grace")?;
    Ok(())
}

fn validate_pool(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pool.max_workers == Some(0) {
        return Err(anyhow!("[pool].max_workers must be >= 1 (got 0)"));
    }
    Ok(())
}

/// Parse `"250ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{}'", s))
}
