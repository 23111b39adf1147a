use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use drive_dynamics::{
    config::{resolve_config_path, EstimatorConfig},
    server, EstimatorContext, TripRequest,
};

#[derive(Parser, Debug)]
#[command(name = "drive-dynamics", about = "Taxi trip peak, duration and fare estimates")]
struct Cli {
    /// config file listing the reference tables and model artifacts
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// estimate a single trip and print the results
    Estimate {
        #[arg(long, default_value_t = 1)]
        passengers: u32,
        #[arg(long, default_value_t = 1)]
        pickup: u32,
        #[arg(long, default_value_t = 1)]
        dropoff: u32,
        #[arg(long, default_value_t = 0)]
        hour: u32,
        #[arg(long, default_value_t = 0)]
        minute: u32,
        #[arg(long, default_value_t = 1)]
        day: u32,
        #[arg(long, default_value_t = 1)]
        month: u32,
        /// print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// serve POST /estimate over HTTP
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
}

fn load_context(explicit: Option<&std::path::Path>) -> anyhow::Result<EstimatorContext> {
    let path = resolve_config_path(explicit);
    tracing::info!("using config {}", path.display());
    let config = EstimatorConfig::load(&path)?;
    let ctx = EstimatorContext::load(&config)?;
    Ok(ctx)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let ctx = match load_context(cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Estimate {
            passengers,
            pickup,
            dropoff,
            hour,
            minute,
            day,
            month,
            json,
        } => {
            let req = TripRequest {
                passenger_count: passengers,
                pickup_zone: pickup,
                dropoff_zone: dropoff,
                hour,
                minute,
                day_of_month: day,
                month,
            };
            match drive_dynamics::estimate(&ctx, &req) {
                Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
                Ok(result) => println!("{result}"),
                Err(e) if e.is_user_facing() => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Serve { port } => server::serve(Arc::new(ctx), port).await?,
    }
    Ok(())
}
