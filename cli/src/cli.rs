use clap::{Args as ClapArgs, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "rdf-gateway")]
/// GraphQL gateway in front of SPARQL endpoints
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the GraphQL HTTP server
    Serve {
        /// Host and port to listen to
        ///
        /// Takes precedence over `--port`.
        #[arg(short, long, value_hint = ValueHint::Hostname)]
        bind: Option<String>,
        /// Port to listen to on all interfaces
        #[arg(short, long, env = "PORT", default_value_t = 4000)]
        port: u16,
        /// Allows cross-origin requests
        #[arg(long)]
        cors: bool,
        #[command(flatten)]
        resources: ResourceArgs,
    },
    /// Load the schema and the service configuration and report any error
    Validate {
        #[command(flatten)]
        resources: ResourceArgs,
    },
}

#[derive(ClapArgs)]
pub struct ResourceArgs {
    /// Schema file or directory of `.graphql` files
    #[arg(short, long, env = "RESOURCES_DIR", default_value = "resources", value_hint = ValueHint::AnyPath)]
    pub resources_dir: PathBuf,
    /// JSON file mapping service names to endpoint URLs and credentials
    #[arg(short, long, env = "SERVICES_FILE", value_hint = ValueHint::FilePath)]
    pub services_file: Option<PathBuf>,
    /// Directory of `.sparql` query templates
    ///
    /// Defaults to the resources directory.
    #[arg(short, long, env = "TEMPLATES_DIR", value_hint = ValueHint::DirPath)]
    pub templates_dir: Option<PathBuf>,
}

impl Command {
    pub fn bind_address(bind: Option<String>, port: u16) -> String {
        bind.unwrap_or_else(|| format!("0.0.0.0:{port}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn serve_with_explicit_bind() {
        let args = Args::try_parse_from([
            "rdf-gateway",
            "serve",
            "--bind",
            "localhost:8080",
            "--resources-dir",
            "schema.graphql",
        ])
        .unwrap();
        let Command::Serve {
            bind,
            port,
            resources,
            ..
        } = args.command
        else {
            panic!("expected the serve command");
        };
        assert_eq!(Command::bind_address(bind, port), "localhost:8080");
        assert_eq!(resources.resources_dir, PathBuf::from("schema.graphql"));
    }

    #[test]
    fn serve_on_port() {
        let args = Args::try_parse_from(["rdf-gateway", "serve", "--port", "9000"]).unwrap();
        let Command::Serve { bind, port, .. } = args.command else {
            panic!("expected the serve command");
        };
        assert_eq!(Command::bind_address(bind, port), "0.0.0.0:9000");
    }

    #[test]
    fn validate_with_templates_dir() {
        let args = Args::try_parse_from([
            "rdf-gateway",
            "validate",
            "--resources-dir",
            "resources",
            "--templates-dir",
            "queries",
        ])
        .unwrap();
        let Command::Validate { resources } = args.command else {
            panic!("expected the validate command");
        };
        assert_eq!(resources.templates_dir, Some(PathBuf::from("queries")));
        assert_eq!(resources.services_file, None);
    }
}
