use clap::Parser;
use script_rehearsal::{credential, Config};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Mints an ephemeral credential for the configured script, as a token backend would.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Print the rehearsal instructions instead of minting.
    #[arg(long)]
    instructions: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_timer(ChronoLocal::rfc_3339())
        .init();
    let args = Args::parse();
    let config = Config::from_env()?;

    if args.instructions {
        println!(
            "{}",
            script_rehearsal::instructions::system_prompt(config.script_title(), config.characters())
        );
        return Ok(());
    }

    let session = credential::mint(&reqwest::Client::new(), &config).await?;
    println!("session: {}", session.id().unwrap_or("unknown"));
    match session.client_secret().expires_at() {
        Some(expires_at) => println!("credential expires at {}", expires_at),
        None => println!("credential has no expiry"),
    }
    Ok(())
}
