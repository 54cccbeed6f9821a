use clap::Parser;
use pairwatch::cli::{self, Cli, Commands, ConfigAction, ContactsAction};
use pairwatch::config::{validate_config_object, Config};
use pairwatch::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Cli::parse();
    let config = Config::load(args.config.as_deref())?;
    logging::init(&config.logging);
    match &config.source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    match args.command {
        Commands::Login(opts) => {
            cli::login(&config, &opts.email, &opts.password).await?;
        }
        Commands::Register(opts) => {
            cli::register(&config, &opts.name, &opts.email, &opts.number, &opts.password).await?;
        }
        Commands::Logout => cli::logout(&config),
        Commands::Status => cli::status(&config).await?,
        Commands::Pair => cli::pair(&config).await?,
        Commands::Watch(opts) => {
            info!("Watching connection state at {}", config.backend.base_url);
            cli::watch(&config, opts.pair).await?;
        }
        Commands::History(opts) => cli::history(&config, &opts.jid).await?,
        Commands::Contacts(opts) => match opts.action {
            ContactsAction::Blacklist => cli::blacklist(&config).await?,
            ContactsAction::Chats => cli::active_chats(&config).await?,
            ContactsAction::Block { phone, name } => cli::block(&config, &phone, &name).await?,
            ContactsAction::Unblock { jid_or_phone } => {
                cli::unblock(&config, &jid_or_phone).await?
            }
        },
        Commands::Config(opts) => match opts.action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Validate => {
                validate_config_object(&config)?;
                info!("Configuration is valid");
                println!("Configuration is valid.");
            }
            ConfigAction::Init => {
                let path = args.config.as_deref().unwrap_or("pairwatch.json");
                Config::write_default(path)?;
                info!("Configuration file created at {}", path);
            }
        },
        Commands::Version => {
            println!("pairwatch {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
