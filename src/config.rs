use std::path::PathBuf;

use crate::calendar::{Calendar, DEFAULT_OFFSET_HOURS};
use crate::error::ValidationError;
use crate::streak::{DEFAULT_LOOKBACK, DEFAULT_WINDOW_DAYS};

/// Runtime settings of the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the JSON database.
    pub db_path: PathBuf,
    /// Owner recorded on new rows.
    pub owner: String,
    pub calendar: Calendar,
    pub lookback_days: u32,
    pub window_days: u32,
}

impl Config {
    /// Resolves the configuration from an optional `--db` flag and the
    /// environment.
    ///
    /// The database path is determined in the following order:
    /// 1. the `--db` flag.
    /// 2. `CADENCE_DB` environment variable.
    /// 3. `~/.local/share/cadence/cadence.json` (on Linux).
    /// 4. `./cadence.json` (fallback).
    ///
    /// `CADENCE_UTC_OFFSET` overrides the +5 hour reference offset and
    /// `CADENCE_USER` (or `USER`) names the owner.
    pub fn resolve(db_flag: Option<PathBuf>) -> Result<Self, ValidationError> {
        let db_path = db_flag
            .or_else(|| std::env::var("CADENCE_DB").ok().map(PathBuf::from))
            .unwrap_or_else(default_db_path);

        let offset = match std::env::var("CADENCE_UTC_OFFSET") {
            Ok(raw) => raw
                .trim()
                .parse::<i32>()
                .map_err(|_| ValidationError::InvalidSetting {
                    name: "CADENCE_UTC_OFFSET",
                    value: raw.clone(),
                })?,
            Err(_) => DEFAULT_OFFSET_HOURS,
        };

        let owner = std::env::var("CADENCE_USER")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_else(|_| "me".to_string());

        Ok(Config {
            db_path,
            owner,
            calendar: Calendar::with_offset_hours(offset)?,
            lookback_days: DEFAULT_LOOKBACK,
            window_days: DEFAULT_WINDOW_DAYS,
        })
    }
}

fn default_db_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(mut p) => {
            p.push("cadence");
            p.push("cadence.json");
            p
        }
        None => PathBuf::from("cadence.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // resolve() reads process-wide env vars
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<_> = vars.iter().map(|(k, _)| (*k, std::env::var(k).ok())).collect();
        for (k, v) in vars {
            match v {
                Some(v) => std::env::set_var(k, v),
                None => std::env::remove_var(k),
            }
        }
        f();
        for (k, v) in saved {
            match v {
                Some(v) => std::env::set_var(k, v),
                None => std::env::remove_var(k),
            }
        }
    }

    #[test]
    fn db_flag_beats_env_var() {
        let vars = [("CADENCE_DB", Some("/tmp/from-env.json")), ("CADENCE_UTC_OFFSET", None)];
        with_env(&vars, || {
            let cfg = Config::resolve(Some(PathBuf::from("/tmp/from-flag.json"))).unwrap();
            assert_eq!(cfg.db_path, PathBuf::from("/tmp/from-flag.json"));

            let cfg = Config::resolve(None).unwrap();
            assert_eq!(cfg.db_path, PathBuf::from("/tmp/from-env.json"));
        });
    }

    #[test]
    fn default_path_ends_in_cadence_json() {
        with_env(&[("CADENCE_DB", None), ("CADENCE_UTC_OFFSET", None)], || {
            let cfg = Config::resolve(None).unwrap();
            assert!(cfg.db_path.ends_with("cadence.json"));
            assert_eq!(cfg.calendar.offset().local_minus_utc(), DEFAULT_OFFSET_HOURS * 3600);
            assert_eq!(cfg.lookback_days, DEFAULT_LOOKBACK);
            assert_eq!(cfg.window_days, DEFAULT_WINDOW_DAYS);
        });
    }

    #[test]
    fn offset_and_owner_come_from_env() {
        let vars = [("CADENCE_UTC_OFFSET", Some(" -3 ")), ("CADENCE_USER", Some("dana"))];
        with_env(&vars, || {
            let cfg = Config::resolve(None).unwrap();
            assert_eq!(cfg.calendar.offset().local_minus_utc(), -3 * 3600);
            assert_eq!(cfg.owner, "dana");
        });
    }

    #[test]
    fn bad_offset_is_rejected() {
        with_env(&[("CADENCE_UTC_OFFSET", Some("east"))], || {
            let err = Config::resolve(None).unwrap_err();
            assert!(matches!(
                err,
                ValidationError::InvalidSetting { name: "CADENCE_UTC_OFFSET", .. }
            ));
        });
        with_env(&[("CADENCE_UTC_OFFSET", Some("30"))], || {
            let err = Config::resolve(None).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidOffset(30)));
        });
    }
}
