//! CLI argument definitions using clap
//!
//! Commands:
//! - fieldgen check --schemas <dir>
//! - fieldgen explain --schemas <dir> --struct <name>
//! - fieldgen convert --schemas <dir> --struct <name> [--strict]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fieldgen - schema-driven struct conversion
#[derive(Parser, Debug)]
#[command(name = "fieldgen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Optional engine configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load every schema in a directory and check it
    Check {
        /// Directory of *.json schema files
        #[arg(long)]
        schemas: PathBuf,
    },

    /// Print the synthesized plan of one struct as JSON
    Explain {
        #[arg(long)]
        schemas: PathBuf,

        /// Struct type name
        #[arg(long = "struct")]
        struct_name: String,
    },

    /// Deserialize and re-serialize one JSON document per stdin line
    Convert {
        #[arg(long)]
        schemas: PathBuf,

        #[arg(long = "struct")]
        struct_name: String,

        /// Reject unknown fields and missing required fields
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "fieldgen", "convert", "--schemas", "schemas", "--struct", "User", "--strict",
        ])
        .unwrap();
        match cli.command {
            Command::Convert {
                struct_name,
                strict,
                ..
            } => {
                assert_eq!(struct_name, "User");
                assert!(strict);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_explain_requires_struct() {
        assert!(Cli::try_parse_from(["fieldgen", "explain", "--schemas", "s"]).is_err());
    }
}
