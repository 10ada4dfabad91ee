//! CLI argument parsing for the talentsync binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "talentsync", about = "Talent-pool bulk-import backend service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the API server (default if no subcommand given)
    Serve,
    /// Manage stored ATS credentials
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
}

#[derive(Subcommand)]
pub enum CredentialsAction {
    /// Store or replace the tokens for an owner key
    Set {
        /// Owner key the tokens belong to
        #[arg(long)]
        owner: String,
        /// Current bearer token
        #[arg(long)]
        access_token: String,
        /// Long-lived refresh token
        #[arg(long)]
        refresh_token: String,
    },
    /// List owner keys with stored credentials
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["talentsync"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_serve_command_parses() {
        let cli = Cli::parse_from(["talentsync", "serve"]);
        assert!(matches!(cli.command, Some(Command::Serve)));
    }

    #[test]
    fn test_cli_credentials_set_parses() {
        let cli = Cli::parse_from([
            "talentsync",
            "credentials",
            "set",
            "--owner",
            "owner-1",
            "--access-token",
            "abc",
            "--refresh-token",
            "def",
        ]);
        match cli.command {
            Some(Command::Credentials {
                action: CredentialsAction::Set { owner, .. },
            }) => assert_eq!(owner, "owner-1"),
            _ => panic!("expected credentials set"),
        }
    }

    #[test]
    fn test_cli_credentials_list_parses() {
        let cli = Cli::parse_from(["talentsync", "credentials", "list"]);
        assert!(matches!(
            cli.command,
            Some(Command::Credentials {
                action: CredentialsAction::List
            })
        ));
    }
}
