use crate::config::SearchConfig;
use crate::deliver::Sink;
use anyhow::Result;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitsweep")]
#[command(about = "Commit history and branch search across every git repository under a directory")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "More log output (-v info, -vv debug)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(
        short,
        long,
        global = true,
        env = "GITSWEEP_DIR",
        help = "Parent directory to search recursively for .git markers [default: home directory]"
    )]
    pub dir: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = 1, help = "Repositories to query in parallel")]
    pub jobs: usize,

    #[arg(long, global = true, help = "Abort on the first repository git or decoding failure")]
    pub fail_fast: bool,

    #[arg(long, global = true, conflicts_with = "save", help = "Print the report instead of paging it")]
    pub no_pager: bool,

    #[arg(long, global = true, help = "Write the report to a file in the current directory")]
    pub save: bool,

    #[arg(long, global = true, env = "GITSWEEP_PAGER", help = "Pager command [default: $PAGER or less]")]
    pub pager: Option<String>,
}

impl CommonArgs {
    pub fn search_config(&self, root: PathBuf) -> SearchConfig {
        SearchConfig::new(root)
            .with_jobs(self.jobs)
            .with_fail_fast(self.fail_fast)
    }

    pub fn sink(&self, save_path: &str) -> Sink {
        Sink::choose(
            self.save.then(|| PathBuf::from(save_path)),
            self.no_pager,
            self.pager.clone(),
            console::Term::stdout().is_term(),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Your commits in a time window, grouped by day
    History {
        #[arg(short, long, env = "GITSWEEP_USER", help = "Git author name [default: git config user.name]")]
        user: Option<String>,

        #[arg(short, long, help = "Window start (RFC3339, YYYY-MM-DD [HH:MM[:SS]], or a duration ago like 36h) [default: start of today]")]
        after: Option<String>,

        #[arg(short, long, help = "Window end, exclusive, same formats as --after [default: start of tomorrow]")]
        before: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Local and remote branches whose name contains a substring
    Branch {
        #[arg(short, long, help = "Case-sensitive substring to look for in branch names")]
        name: String,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .format_timestamp(None)
            .try_init();
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Some(Commands::History {
                user,
                after,
                before,
                json,
            }) => crate::history::exec(self.common, user, after, before, json),
            Some(Commands::Branch { name }) => crate::branch::exec(self.common, name),
            None => {
                <Self as CommandFactory>::command().print_help()?;
                Ok(())
            }
        }
    }
}
