use crate::config::SearchConfig;
use crate::decode::{decode_branches, decode_commits};
use crate::error::{Result, SweepError};
use crate::git::{run_query, VcsTool};
use crate::locate::repositories;
use crate::model::{BranchGroup, CommitRecord, DateWindow, Query, RepositoryRef};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;

/// Walks the search root and merges per-repository results in traversal order.
pub struct Aggregator<'a, T: VcsTool + ?Sized> {
    tool: &'a T,
    config: &'a SearchConfig,
    progress: ProgressBar,
}

impl<'a, T: VcsTool + ?Sized> Aggregator<'a, T> {
    pub fn new(tool: &'a T, config: &'a SearchConfig) -> Self {
        Self {
            tool,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Commits by `author` inside `window`, unsorted, across every repository.
    pub fn collect_history(&self, author: &str, window: &DateWindow) -> Result<Vec<CommitRecord>> {
        let query = Query::Commits {
            author: author.to_string(),
            window: window.clone(),
        };
        let per_repo = self.scan(|repo| {
            let raw = self.query(repo, &query)?;
            if raw.is_empty() {
                info!("no commits for user {} in project {}", author, repo.name);
                return Ok(None);
            }
            let mut commits = decode_commits(&raw, &repo.name).map_err(|source| SweepError::Decode {
                project: repo.name.clone(),
                source,
            })?;
            // git treats --before as inclusive
            commits.retain(|c| window.contains(&c.timestamp));
            Ok(Some(commits).filter(|c| !c.is_empty()))
        })?;
        Ok(per_repo.into_iter().flatten().collect())
    }

    /// Branches whose name contains `pattern`, one group per matching repository.
    pub fn collect_branches(&self, pattern: &str) -> Result<Vec<BranchGroup>> {
        let query = Query::Branches {
            pattern: pattern.to_string(),
        };
        self.scan(|repo| {
            let raw = self.query(repo, &query)?;
            Ok(decode_branches(&raw, &repo.name))
        })
    }

    fn query(&self, repo: &RepositoryRef, query: &Query) -> Result<Vec<u8>> {
        run_query(self.tool, repo, query).map_err(|source| SweepError::ToolInvocation {
            repo: repo.workdir().to_path_buf(),
            source,
        })
    }

    fn scan<R, F>(&self, per_repo: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&RepositoryRef) -> Result<Option<R>> + Sync,
    {
        debug!("scanning {} with {} job(s)", self.config.root.display(), self.config.jobs);

        let results = if self.config.jobs <= 1 {
            let mut results = Vec::new();
            for repo in repositories(&self.config.root) {
                let repo = repo?;
                results.push(self.isolate(&repo, per_repo(&repo))?);
                self.progress.inc(1);
            }
            results
        } else {
            let repos = repositories(&self.config.root).collect::<Result<Vec<_>>>()?;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()?;
            let outcomes: Vec<Result<Option<R>>> = pool.install(|| {
                repos
                    .par_iter()
                    .map(|repo| {
                        let outcome = self.isolate(repo, per_repo(repo));
                        self.progress.inc(1);
                        outcome
                    })
                    .collect()
            });
            outcomes.into_iter().collect::<Result<Vec<_>>>()?
        };

        debug!("scanned {} repositories", results.len());
        Ok(results.into_iter().flatten().collect())
    }

    /// Per-repository failures drop that repository unless running fail-fast.
    fn isolate<R>(&self, repo: &RepositoryRef, outcome: Result<Option<R>>) -> Result<Option<R>> {
        match outcome {
            Err(err) if err.is_repository_scoped() && !self.config.fail_fast => {
                warn!("skipping {}: {}", repo.workdir().display(), err);
                Ok(None)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use chrono::{FixedOffset, TimeZone};
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    enum Reply {
        Output(Vec<u8>),
        Fail,
    }

    /// Canned replies keyed by the repository's directory name.
    struct FakeTool {
        replies: HashMap<String, Reply>,
    }

    impl FakeTool {
        fn new(replies: Vec<(&str, Reply)>) -> Self {
            Self {
                replies: replies
                    .into_iter()
                    .map(|(name, reply)| (name.to_string(), reply))
                    .collect(),
            }
        }
    }

    impl VcsTool for FakeTool {
        fn invoke(&self, workdir: &Path, _args: &[String]) -> std::result::Result<Vec<u8>, ToolError> {
            let name = workdir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match self.replies.get(&name) {
                Some(Reply::Output(out)) => Ok(out.clone()),
                Some(Reply::Fail) => Err(ToolError::Exit {
                    program: "git".to_string(),
                    code: Some(128),
                }),
                None => Ok(Vec::new()),
            }
        }
    }

    fn tree(repos: &[&str]) -> TempDir {
        let dir = tempdir().unwrap();
        for repo in repos {
            fs::create_dir_all(dir.path().join(repo).join(".git")).unwrap();
        }
        dir
    }

    fn entry(hash: &str, date: &str, message: &str) -> String {
        format!(
            "<entry><commit>{hash}</commit><author>alice</author><date>{date}</date><message>{message}\n</message></entry>\n"
        )
    }

    fn window() -> DateWindow {
        let tz = FixedOffset::east_opt(0).unwrap();
        DateWindow::new(
            tz.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn config(root: &Path) -> SearchConfig {
        SearchConfig::new(PathBuf::from(root))
    }

    #[test]
    fn empty_tree_gives_empty_report() {
        let dir = tree(&[]);
        let tool = FakeTool::new(vec![]);
        let config = config(dir.path());

        let commits = Aggregator::new(&tool, &config)
            .collect_history("alice", &window())
            .unwrap();
        assert!(commits.is_empty());
    }

    #[test]
    fn repositories_without_commits_are_omitted() {
        let dir = tree(&["proj/A", "proj/B"]);
        let raw = format!(
            "{}{}",
            entry("aaaaaaaaaa", "2024-01-05T09:00:00Z", "first"),
            entry("bbbbbbbbbb", "2024-01-05T14:30:00Z", "second")
        );
        let tool = FakeTool::new(vec![("A", Reply::Output(raw.into_bytes()))]);
        let config = config(dir.path());

        let commits = Aggregator::new(&tool, &config)
            .collect_history("alice", &window())
            .unwrap();
        assert_eq!(commits.len(), 2);
        assert!(commits.iter().all(|c| c.project == "A"));
    }

    #[test]
    fn commits_at_the_window_end_are_excluded() {
        let dir = tree(&["A", "B"]);
        let raw = format!(
            "{}{}",
            entry("aaaaaaaaaa", "2024-01-06T00:00:00Z", "at midnight"),
            entry("bbbbbbbbbb", "2024-01-05T23:59:59Z", "just before")
        );
        let edge_only = entry("cccccccccc", "2024-01-06T00:00:00Z", "edge only");
        let tool = FakeTool::new(vec![
            ("A", Reply::Output(raw.into_bytes())),
            ("B", Reply::Output(edge_only.into_bytes())),
        ]);
        let config = config(dir.path());

        let commits = Aggregator::new(&tool, &config)
            .collect_history("alice", &window())
            .unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "just before");
        assert_eq!(commits[0].project, "A");
    }

    #[test]
    fn decode_failure_drops_only_that_repository() {
        let dir = tree(&["A", "B"]);
        let good = entry("aaaaaaaaaa", "2024-01-05T09:00:00Z", "kept");
        let broken = format!(
            "{}<entry><commit>cccccccccc</commit><message>cut off",
            entry("bbbbbbbbbb", "2024-01-05T10:00:00Z", "lost")
        );
        let tool = FakeTool::new(vec![
            ("A", Reply::Output(good.into_bytes())),
            ("B", Reply::Output(broken.into_bytes())),
        ]);
        let config = config(dir.path());

        let commits = Aggregator::new(&tool, &config)
            .collect_history("alice", &window())
            .unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "kept");
    }

    #[test]
    fn tool_failure_is_isolated_unless_fail_fast() {
        let dir = tree(&["A", "B"]);
        let tool = FakeTool::new(vec![
            ("A", Reply::Fail),
            ("B", Reply::Output(b"  feature/x\n".to_vec())),
        ]);

        let lenient = config(dir.path());
        let groups = Aggregator::new(&tool, &lenient).collect_branches("feat").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].project, "B");

        let strict = config(dir.path()).with_fail_fast(true);
        let err = Aggregator::new(&tool, &strict)
            .collect_branches("feat")
            .unwrap_err();
        assert!(matches!(err, SweepError::ToolInvocation { .. }));
    }

    #[test]
    fn branch_groups_follow_traversal_order() {
        let dir = tree(&["b-repo", "a-repo", "c-repo"]);
        let tool = FakeTool::new(vec![
            ("a-repo", Reply::Output(b"  feat-a\n".to_vec())),
            ("c-repo", Reply::Output(b"  feat-c\n* feat-c2\n".to_vec())),
        ]);
        let config = config(dir.path());

        let groups = Aggregator::new(&tool, &config).collect_branches("feat").unwrap();
        let projects: Vec<&str> = groups.iter().map(|g| g.project.as_str()).collect();
        assert_eq!(projects, vec!["a-repo", "c-repo"]);
        assert_eq!(groups[1].matches.len(), 2);
    }

    #[test]
    fn parallel_scan_matches_sequential_order() {
        let names: Vec<String> = (0..12).map(|i| format!("repo{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = tree(&refs);
        let tool = FakeTool::new(
            names
                .iter()
                .map(|n| (n.as_str(), Reply::Output(format!("  feat/{n}\n").into_bytes())))
                .collect(),
        );

        let sequential = config(dir.path());
        let parallel = config(dir.path()).with_jobs(4);
        let a = Aggregator::new(&tool, &sequential).collect_branches("feat").unwrap();
        let b = Aggregator::new(&tool, &parallel).collect_branches("feat").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn missing_root_fails_the_whole_walk() {
        let dir = tempdir().unwrap();
        let tool = FakeTool::new(vec![]);
        let config = config(&dir.path().join("missing"));

        let err = Aggregator::new(&tool, &config).collect_branches("x").unwrap_err();
        assert!(matches!(err, SweepError::Filesystem { .. }));
    }
}
