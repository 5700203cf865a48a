use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::serve::ServeArgs;

#[derive(Parser, Debug)]
#[command(name = "ccow", version, about = "ComplianceCow MCP server")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server on stdio or HTTP.
    Serve(ServeArgs),

    /// Inspect the tool catalogue without contacting the backend.
    Tools {
        #[command(subcommand)]
        cmd: ToolsCommand,
    },

    /// Validate a configuration file and print the effective settings.
    Check {
        /// Configuration file (defaults to ./ccow.yaml when present).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// List every tool with its access badge.
    List {
        /// Also print each tool's input schema.
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },

    /// Show the description and input schema of one tool.
    Describe {
        tool_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout belongs to the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve(args) => commands::serve::run(args).await?,
        Command::Tools { cmd } => match cmd {
            ToolsCommand::List { verbose } => commands::tools::list(verbose)?,
            ToolsCommand::Describe { tool_name } => commands::tools::describe(&tool_name)?,
        },
        Command::Check { config } => commands::check::run(config.as_deref())?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccow_core::Transport;

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "ccow",
            "serve",
            "--transport",
            "http",
            "--port",
            "9100",
        ])
        .unwrap();

        let Command::Serve(args) = cli.cmd else {
            panic!("expected serve");
        };
        assert_eq!(args.transport, Some(Transport::Http));
        assert_eq!(args.port, Some(9100));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_tools_describe() {
        let cli = Cli::try_parse_from(["ccow", "tools", "describe", "fetch_checks"]).unwrap();
        assert!(matches!(
            cli.cmd,
            Command::Tools {
                cmd: ToolsCommand::Describe { ref tool_name }
            } if tool_name == "fetch_checks"
        ));
    }

    #[test]
    fn test_rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["ccow", "serve", "--transport", "grpc"]).is_err());
    }
}
