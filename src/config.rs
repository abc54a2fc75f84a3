use crate::error::{Result, SweepError};
use crate::git::{self, VcsTool};
use crate::model::DateWindow;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_PAGER: &str = "less";

/// Options shared by every traversal, resolved once per invocation.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub root: PathBuf,
    pub jobs: usize,
    pub fail_fast: bool,
}

impl SearchConfig {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            jobs: 1,
            fail_fast: false,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// The explicit directory made absolute, or the caller's home directory.
pub fn resolve_root(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(dir) if dir.is_absolute() => Ok(absolute_root(dir, Path::new(""))),
        Some(dir) => Ok(absolute_root(dir, &std::env::current_dir()?)),
        None => dirs::home_dir().ok_or_else(|| {
            SweepError::Validation("no --dir given and home directory is unknown".to_string())
        }),
    }
}

/// Joins `dir` onto `cwd`, resolving `.` and `..` segments lexically.
pub fn absolute_root(dir: &Path, cwd: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    for component in cwd.join(dir).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                root.pop();
            }
            other => root.push(other),
        }
    }
    root
}

/// The explicit user, or the identity from `git config user.name`.
pub fn resolve_user<T: VcsTool + ?Sized>(user: Option<&str>, tool: &T, cwd: &Path) -> Result<String> {
    if let Some(user) = user.map(str::trim).filter(|u| !u.is_empty()) {
        return Ok(user.to_string());
    }
    log::info!("user is not defined, using git config user.name instead");
    git::configured_user(tool, cwd)
        .ok_or_else(|| SweepError::Validation("no user name found in git config".to_string()))
}

/// `[start of today, start of tomorrow)` in the timezone of `now`.
pub fn day_window<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<DateWindow> {
    let today = now.date_naive();
    let tomorrow = today
        .succ_opt()
        .ok_or_else(|| SweepError::InvalidDate(format!("no day after {today}")))?;
    DateWindow::new(
        local_midnight(&now.timezone(), today)?,
        local_midnight(&now.timezone(), tomorrow)?,
    )
}

/// Builds the commit window from optional `--after`/`--before` flags.
pub fn resolve_window<Tz: TimeZone>(
    after: Option<&str>,
    before: Option<&str>,
    now: &DateTime<Tz>,
) -> Result<DateWindow> {
    let today = day_window(now)?;
    let after = match after {
        Some(s) => parse_date_flag(s, now)?,
        None => today.after,
    };
    let before = match before {
        Some(s) => parse_date_flag(s, now)?,
        None => today.before,
    };
    DateWindow::new(after, before)
}

/// Parses a date flag in the timezone of `now`.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DD`, or a duration
/// such as `36h` or `2days` meaning that long before `now`.
pub fn parse_date_flag<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Result<DateTime<FixedOffset>> {
    let input = input.trim();
    let tz = now.timezone();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return in_zone(&tz, &naive, input);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return local_midnight(&tz, date);
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        let duration = Duration::from_std(duration)
            .map_err(|_| SweepError::InvalidDate(format!("Duration overflow for '{input}'")))?;
        return now
            .clone()
            .checked_sub_signed(duration)
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| SweepError::InvalidDate(format!("Duration overflow for '{input}'")));
    }

    Err(SweepError::InvalidDate(format!("unrecognized date '{input}'")))
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<FixedOffset>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| SweepError::InvalidDate(format!("no midnight on {date}")))?;
    in_zone(tz, &naive, &date.to_string())
}

fn in_zone<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime, input: &str) -> Result<DateTime<FixedOffset>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| SweepError::InvalidDate(format!("'{input}' does not exist in the local timezone")))
}
