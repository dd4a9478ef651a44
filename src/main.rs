//! cargohold CLI
//!
//! Entry point for the `cargohold` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cargohold::component::ComponentSpec;
use cargohold::config::Config;
use cargohold::environment::LxdProvisioner;
use cargohold::lint::LintStatus;
use cargohold::pipeline::{self, LintOptions, UploadOptions};
use cargohold::report::{ConsoleReporter, ProgressMode};
use cargohold::store::DirectoryStore;
use cargohold::upload::CancelFlag;
use cargohold::SquashfsManifestReader;

#[derive(Parser)]
#[command(name = "cargohold")]
#[command(about = "Upload and lint packaged build artifacts", version)]
struct Cli {
    /// Suppress progress output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an artifact to the store
    Upload {
        /// Artifact to upload
        artifact: PathBuf,

        /// Optional comma-separated list of channels to release to
        #[arg(long = "release", value_name = "channels", value_delimiter = ',')]
        release: Vec<String>,

        /// Component to upload with the artifact, as name=path; repeatable
        #[arg(long = "component", value_name = "name=path", value_parser = parse_component)]
        component: Vec<ComponentSpec>,
    },

    /// Lint the contents of an artifact
    Lint {
        /// Artifact to lint
        artifact: PathBuf,

        /// Run on the host instead of a provisioned instance
        #[arg(long)]
        host: bool,

        /// HTTP proxy for the provisioned instance
        #[arg(long, value_name = "proxy")]
        http_proxy: Option<String>,

        /// HTTPS proxy for the provisioned instance
        #[arg(long, value_name = "proxy")]
        https_proxy: Option<String>,
    },
}

fn parse_component(value: &str) -> Result<ComponentSpec, String> {
    cargohold::parse_component_option(value).map_err(|e| e.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return pipeline::EXIT_USAGE;
        }
    };

    let reporter = ConsoleReporter::new(ProgressMode::detect(cli.quiet));

    match cli.command {
        Commands::Upload {
            artifact,
            release,
            component,
        } => {
            let cancel = CancelFlag::new();
            let handler_flag = cancel.clone();
            if let Err(e) = ctrlc::set_handler(move || handler_flag.cancel()) {
                eprintln!("Warning: could not install signal handler: {e}");
            }

            let store = DirectoryStore::new(&config.store_root).with_cancel(cancel.clone());
            let options = UploadOptions {
                artifact,
                channels: release,
                components: component,
            };

            match pipeline::upload_flow(
                &options,
                &SquashfsManifestReader::new(),
                &store,
                &store,
                &reporter,
                &cancel,
            ) {
                Ok(_) => pipeline::EXIT_OK,
                Err(e) => {
                    eprintln!("Error: {e}");
                    e.exit_code()
                }
            }
        }

        Commands::Lint {
            artifact,
            host,
            http_proxy,
            https_proxy,
        } => {
            let options = LintOptions {
                artifact,
                force_host: host,
                http_proxy: http_proxy.or(config.http_proxy),
                https_proxy: https_proxy.or(config.https_proxy),
                instance_image: config.instance_image,
            };

            match pipeline::lint_flow(
                &options,
                &SquashfsManifestReader::new(),
                &LxdProvisioner::new(),
                &reporter,
            ) {
                Ok(LintStatus::Errors) => pipeline::EXIT_LINT,
                Ok(_) => pipeline::EXIT_OK,
                Err(e) => {
                    eprintln!("Error: {e}");
                    e.exit_code()
                }
            }
        }
    }
}
