use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "aristotle",
    about = "A terminal editor for natural deduction proofs, driven by ndpc",
    version
)]
pub struct Cli {
    /// Proof file to edit. Created on first save if it does not exist.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// ndpc executable to run (overrides the config file).
    #[arg(long, value_name = "PROGRAM")]
    pub ndpc: Option<PathBuf>,

    /// Config file to use instead of ./aristotle.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_and_overrides() {
        let cli = Cli::parse_from(["aristotle", "p.ndp", "--ndpc", "/opt/ndpc"]);
        assert_eq!(cli.file, Some(PathBuf::from("p.ndp")));
        assert_eq!(cli.ndpc, Some(PathBuf::from("/opt/ndpc")));
        assert!(cli.config.is_none());
    }

    #[test]
    fn no_arguments() {
        let cli = Cli::parse_from(["aristotle"]);
        assert!(cli.file.is_none());
    }
}
