use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use vpnwatch::configuration::config::{Config, Overrides};
use vpnwatch::controller::controller_handler::Controller;

#[derive(Parser, Debug)]
#[command(name = "vpnwatch")]
#[command(version = "0.1.0")]
#[command(about = "Session control and traffic history for a VPN daemon's management interface")]
struct Args {
    /// TOML configuration file
    config_file: PathBuf,

    /// Management interface host, overrides [management] host
    #[arg(long, env = "VPNWATCH_MGMT_HOST")]
    mgmt_host: Option<String>,

    /// Management interface port, overrides [management] port
    #[arg(long, env = "VPNWATCH_MGMT_PORT")]
    mgmt_port: Option<u16>,

    /// SQLite database file, overrides [storage] database_path
    #[arg(long, env = "VPNWATCH_DB_PATH")]
    database_path: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            mgmt_host: self.mgmt_host.clone(),
            mgmt_port: self.mgmt_port,
            database_path: self.database_path.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let args = Args::parse();

    info!("Importing configuration from {}", args.config_file.display());
    let config = match Config::from_file(&args.config_file)
        .and_then(|config| config.with_overrides(args.overrides()))
    {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration imported successfully");

    let controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    let result = tokio::spawn(async move {
        info!("Spawning the controller");
        controller.run().await
    });

    match result.await {
        Ok(Ok(())) => info!("Bye"),
        Ok(Err(e)) => {
            error!("Error occured in the controller process: {}, exiting...", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Error joining at the end of execution: {:?}", e);
            std::process::exit(1);
        }
    }
}
