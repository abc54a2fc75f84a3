use crate::error::Result;
use crate::model::{BranchGroup, CommitRecord};
use crate::util::single_line;
use chrono::{NaiveDate, TimeZone};
use std::fmt::Display;

/// Most recent first; equal timestamps keep their collection order.
pub fn sort_newest_first(commits: &[CommitRecord]) -> Vec<&CommitRecord> {
    let mut sorted: Vec<&CommitRecord> = commits.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}

/// Date-grouped activity digest, with calendar dates taken in `tz`.
///
/// ```text
/// [Date: 2024-01-05]
/// 	[14:30][3f2a9c]: message
///
/// [Date: 2024-01-04]
/// 	[09:12][77be01]: message
/// ```
pub fn render_history<Tz>(commits: &[CommitRecord], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let mut current: Option<NaiveDate> = None;

    for commit in sort_newest_first(commits) {
        let local = commit.timestamp.with_timezone(tz);
        let date = local.date_naive();
        if current != Some(date) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("[Date: {}]\n", date.format("%Y-%m-%d")));
            current = Some(date);
        }
        out.push_str(&format!(
            "\t[{}][{}]: {}\n",
            local.format("%H:%M"),
            commit.short_hash,
            single_line(&commit.message)
        ));
    }

    out
}

pub fn render_history_json(commits: &[CommitRecord]) -> Result<String> {
    let sorted = sort_newest_first(commits);
    Ok(serde_json::to_string_pretty(&sorted)?)
}

pub fn render_branches(groups: &[BranchGroup]) -> String {
    let mut out = String::new();
    for group in groups.iter().filter(|g| !g.matches.is_empty()) {
        out.push_str(&format!("{} : \n", group.project));
        for line in &group.matches {
            out.push('\t');
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}
