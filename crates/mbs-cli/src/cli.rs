use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mbs",
    about = "Managed Bean Server — inspect and drive registered beans",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Server configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the domains holding registered beans
    Domains,
    /// List registered beans matching a name pattern
    Query(QueryArgs),
    /// Describe a bean's attributes, operations, and notifications
    Info(InfoArgs),
    /// Read attributes
    Get(GetArgs),
    /// Write one attribute
    Set(SetArgs),
    /// Invoke an operation
    Invoke(InvokeArgs),
}

#[derive(Args)]
pub struct QueryArgs {
    /// Object name pattern, e.g. `mbs:*` (default: everything)
    pub pattern: Option<String>,
    /// Query expression as JSON, e.g. `{"class_name": "mbs.*"}`
    #[arg(long = "where")]
    pub filter: Option<String>,
}

#[derive(Args)]
pub struct InfoArgs {
    pub name: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub name: String,
    /// Attributes to read (default: every readable attribute)
    pub attributes: Vec<String>,
}

#[derive(Args)]
pub struct SetArgs {
    pub name: String,
    pub attribute: String,
    /// JSON value; anything that is not valid JSON is taken as a string
    pub value: String,
}

#[derive(Args)]
pub struct InvokeArgs {
    pub name: String,
    pub operation: String,
    /// JSON parameters; anything that is not valid JSON is taken as a string
    pub params: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_domains() {
        let cli = Cli::try_parse_from(["mbs", "domains"]).unwrap();
        assert!(matches!(cli.command, Command::Domains));
    }

    #[test]
    fn parse_query_with_filter() {
        let cli = Cli::try_parse_from([
            "mbs",
            "query",
            "mbs:*",
            "--where",
            r#"{"class_name": "mbs.*"}"#,
        ])
        .unwrap();
        if let Command::Query(args) = cli.command {
            assert_eq!(args.pattern.as_deref(), Some("mbs:*"));
            assert!(args.filter.is_some());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_query_everything() {
        let cli = Cli::try_parse_from(["mbs", "query"]).unwrap();
        if let Command::Query(args) = cli.command {
            assert!(args.pattern.is_none());
            assert!(args.filter.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_get_many() {
        let cli = Cli::try_parse_from(["mbs", "get", "mbs:type=Runtime", "Pid", "Version"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.name, "mbs:type=Runtime");
            assert_eq!(args.attributes, vec!["Pid", "Version"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set() {
        let cli = Cli::try_parse_from(["mbs", "set", "mbs:type=Runtime", "Label", "blue"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.attribute, "Label");
            assert_eq!(args.value, "blue");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_invoke() {
        let cli = Cli::try_parse_from(["mbs", "invoke", "mbs:type=Runtime", "echo", "hi"]).unwrap();
        if let Command::Invoke(args) = cli.command {
            assert_eq!(args.operation, "echo");
            assert_eq!(args.params, vec!["hi"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "mbs", "--verbose", "--format", "json", "--config", "mbs.toml", "domains",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("mbs.toml")));
    }
}
