use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::PortalConfig;

#[derive(Debug, Parser)]
#[command(name = "portal", version, about = "Job application dashboard client")]
pub struct Cli {
    /// Config file (RON). Defaults to ./portal.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Dashboard server root URL.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Also write logs to ./portal.log.
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Application totals, the latest applications and the 30-day chart.
    Dashboard,
    /// List stored resumes.
    Resumes,
    /// Upload a PDF resume.
    Upload { path: PathBuf },
    /// Delete a stored resume.
    Delete {
        name: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Connect the current browser tab through the relay until Ctrl-C.
    Relay {
        /// Relay URL, e.g. ws://localhost:3000.
        #[arg(long)]
        url: Option<String>,
        /// Skip the bridge detection probe.
        #[arg(long)]
        assume_extension: bool,
    },
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut PortalConfig) {
        if let Some(server) = &self.server {
            config.server_url.clone_from(server);
        }
        if let Command::Relay { url: Some(url), .. } = &self.command {
            config.relay_url.clone_from(url);
        }
        if self.log_file {
            config.log_to_file = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "portal",
            "--server",
            "http://example.test/",
            "relay",
            "--url",
            "ws://example.test:4000",
        ]);
        let mut config = PortalConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server_url, "http://example.test/");
        assert_eq!(config.relay_url, "ws://example.test:4000");
        assert!(!config.log_to_file);
    }

    #[test]
    fn delete_requires_a_name() {
        assert!(Cli::try_parse_from(["portal", "delete"]).is_err());
        let cli = Cli::try_parse_from(["portal", "delete", "cv.pdf", "--yes"]).unwrap();
        assert!(matches!(cli.command, Command::Delete { yes: true, .. }));
    }
}
