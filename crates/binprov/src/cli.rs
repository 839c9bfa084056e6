use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "binprov", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Config file to read instead of the one in the user config dir.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Log more; repeat for trace output.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Print records as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "l", name = "load", about = "Find an already installed binary")]
    Load(LoadArg),
    #[command(alias = "i", name = "install", about = "Install a binary with the first provider that can")]
    Install(BinArg),
    #[command(alias = "li", name = "load-or-install", about = "Load a binary, installing it if missing")]
    LoadOrInstall(BinArg),

    // Inspection
    #[command(name = "abspath", about = "Where each provider finds a binary")]
    Abspath(BinArg),
    #[command(name = "version", about = "Which version each provider reports for a binary")]
    Version(BinArg),
    #[command(name = "packages", about = "Which packages each provider would install for a binary")]
    Packages(BinArg),
    #[command(alias = "ls", name = "providers", about = "List providers and their search paths")]
    Providers,
}

#[derive(Clone, Debug, Args)]
pub struct BinArg {
    /// Binary name, e.g. `node` or `yt-dlp`.
    pub bin: String,
    /// Provider to try, in order. Repeatable; defaults to the configured list.
    #[arg(short = 'p', long = "provider", value_name = "NAME")]
    pub providers: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct LoadArg {
    #[command(flatten)]
    pub target: BinArg,
    /// Ignore anything cached by an earlier lookup.
    #[arg(long)]
    pub no_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_app_is_well_formed() {
        App::command().debug_assert();
    }

    #[test]
    fn test_parse_load() {
        let app = App::try_parse_from([
            "binprov", "--json", "load", "node", "-p", "npm", "--provider", "env", "--no-cache",
        ])
        .unwrap();
        assert!(app.json);
        let Commands::Load(arg) = app.cmd else {
            panic!("expected load");
        };
        assert_eq!(arg.target.bin, "node");
        assert_eq!(arg.target.providers, ["npm", "env"]);
        assert!(arg.no_cache);
    }

    #[test]
    fn test_parse_globals_after_subcommand() {
        let app = App::try_parse_from(["binprov", "providers", "-vv", "--config", "/tmp/b.toml"]).unwrap();
        assert_eq!(app.verbose, 2);
        assert_eq!(app.config, Some(PathBuf::from("/tmp/b.toml")));
        assert!(matches!(app.cmd, Commands::Providers));
    }

    #[test]
    fn test_parse_load_or_install_alias() {
        let app = App::try_parse_from(["binprov", "li", "yt-dlp"]).unwrap();
        let Commands::LoadOrInstall(arg) = app.cmd else {
            panic!("expected load-or-install");
        };
        assert_eq!(arg.bin, "yt-dlp");
        assert!(arg.providers.is_empty());
    }

    #[test]
    fn test_bin_is_required() {
        assert!(App::try_parse_from(["binprov", "install"]).is_err());
    }
}
