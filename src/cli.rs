use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::cmd::Commands;

/// Terminal task board.
/// Data lives in ~/.taskboard unless --data-dir says otherwise.
#[derive(Parser)]
#[command(name = "tb", version, about = "Task board with subtasks, derived progress and due-date filters")]
pub struct Cli {
    /// Directory holding the task document, config.toml and the UI log.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file to use instead of <data-dir>/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `ui`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_has_no_command() {
        let cli = Cli::try_parse_from(["tb"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn edit_rejects_leaf_with_subtasks() {
        assert!(Cli::try_parse_from(["tb", "edit", "1", "--leaf", "--subtask", "x"]).is_err());
        assert!(Cli::try_parse_from(["tb", "-vv", "edit", "1", "--leaf"]).is_ok());
    }
}
