use clap::{Parser, Subcommand};

/// Highscore API: token-gated hiscore submission and queries
#[derive(Parser)]
#[command(name = "hiscore-api", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to bind (overrides HISCORE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create any missing tables
    Migrate,

    /// Manage access tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a new token
    Create {
        /// Grant the `hiscore` permission
        #[arg(long)]
        hiscore: bool,
        /// Grant the `ban` permission
        #[arg(long)]
        ban: bool,
        /// Grant the `create_token` permission
        #[arg(long)]
        create_token: bool,
        /// Grant the `verify_players` permission
        #[arg(long)]
        verify_players: bool,
    },
    /// Show the permissions of a token
    Show {
        #[arg(long)]
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_create_flags() {
        let cli = Cli::try_parse_from(["hiscore-api", "token", "create", "--hiscore", "--create-token"]).unwrap();
        match cli.command {
            Some(Commands::Token {
                command:
                    TokenCommands::Create {
                        hiscore,
                        ban,
                        create_token,
                        verify_players,
                    },
            }) => {
                assert!(hiscore && create_token);
                assert!(!ban && !verify_players);
            }
            _ => panic!("expected token create"),
        }
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["hiscore-api"]).unwrap();
        assert!(cli.command.is_none());
    }
}
