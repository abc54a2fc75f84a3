use crate::aggregate::Aggregator;
use crate::cli::CommonArgs;
use crate::config::resolve_root;
use crate::error::SweepError;
use crate::git::GitCli;
use crate::report::render_branches;
use crate::util::scan_spinner;
use anyhow::Context;
use log::info;

pub const SAVE_PATH: &str = "gitsweep-branches.txt";

pub fn exec(common: CommonArgs, name: String) -> anyhow::Result<()> {
    if name.is_empty() {
        return Err(SweepError::Validation("branch name required".to_string()).into());
    }

    let tool = GitCli::new();
    let root = resolve_root(common.dir.as_deref()).context("Failed to resolve search directory")?;
    let config = common.search_config(root);
    let sink = common.sink(SAVE_PATH);

    let progress = scan_spinner("Searching branches...");
    let groups = Aggregator::new(&tool, &config)
        .with_progress(progress.clone())
        .collect_branches(&name);
    progress.finish_and_clear();
    let groups = groups.context("Failed to collect branches")?;

    info!("{} repositories have branches matching '{}'", groups.len(), name);

    sink.deliver(&render_branches(&groups))
        .context("Failed to deliver report")?;
    Ok(())
}
