use crate::aggregate::Aggregator;
use crate::cli::CommonArgs;
use crate::config::{resolve_root, resolve_user, resolve_window};
use crate::git::GitCli;
use crate::report::{render_history, render_history_json};
use crate::util::scan_spinner;
use anyhow::Context;
use chrono::Local;
use log::info;

pub const SAVE_PATH: &str = "gitsweep-history.txt";
pub const SAVE_PATH_JSON: &str = "gitsweep-history.json";

pub fn exec(
    common: CommonArgs,
    user: Option<String>,
    after: Option<String>,
    before: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let tool = GitCli::new();
    let root = resolve_root(common.dir.as_deref()).context("Failed to resolve search directory")?;

    let cwd = std::env::current_dir().unwrap_or_else(|_| root.clone());
    let user = resolve_user(user.as_deref(), &tool, &cwd).context("Failed to determine git user")?;

    let window = resolve_window(after.as_deref(), before.as_deref(), &Local::now())
        .context("Failed to resolve date range")?;

    let config = common.search_config(root);
    let sink = common.sink(if json { SAVE_PATH_JSON } else { SAVE_PATH });

    let progress = scan_spinner("Collecting commits...");
    let commits = Aggregator::new(&tool, &config)
        .with_progress(progress.clone())
        .collect_history(&user, &window);
    progress.finish_and_clear();
    let commits = commits.context("Failed to collect commit history")?;

    info!(
        "{} commits by {} between {} and {}",
        commits.len(),
        user,
        window.after,
        window.before
    );

    let report = if json {
        render_history_json(&commits).context("Failed to serialize commit history")?
    } else {
        render_history(&commits, &Local)
    };

    sink.deliver(&report).context("Failed to deliver report")?;
    Ok(())
}
