use clap::Parser;

use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoLocal;

use portico::{load_tls_config, Acceptor, AppResult, EchoService, ServiceConfig};

#[derive(Parser)]
#[command(version)]
pub struct CommandLine {
    /// path to config file
    #[arg(short, long)]
    pub conf: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
    /// log level (v: info, vv: debug, vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Parser)]
pub enum Command {
    PrintConfig,
}

fn main() -> AppResult<()> {
    let commandline: CommandLine = CommandLine::parse();

    //setup tracing
    let max_level = match commandline.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let timer = ChronoLocal::new("%Y-%m-%d %H:%M:%S%.6f".to_string());
    let subscriber = tracing_subscriber::fmt()
        .with_timer(timer)
        .with_max_level(max_level)
        .with_target(true)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    //setup config
    let config_path = commandline
        .conf
        .as_ref()
        .map_or_else(|| PathBuf::from("conf.toml"), PathBuf::from);
    let config = ServiceConfig::set_up_config(config_path)?;

    if let Some(Command::PrintConfig) = commandline.command {
        println!("{:#?}", config);
        return Ok(());
    }

    let addr = config.listen_addr()?;
    let mut acceptor = if config.tls.enabled {
        let tls_config = load_tls_config(&config.tls.cert_file, &config.tls.key_file)?;
        Acceptor::<EchoService>::bind_tls(addr, tls_config, config.thread_count())?
    } else {
        Acceptor::<EchoService>::bind(addr, config.thread_count())?
    };
    acceptor.set_service_created_callback(|service| {
        tracing::info!("connection established with {}", service.peer());
    });
    acceptor.start()?;

    // start() returns immediately; park this thread on ctrl-c, then let the
    // acceptor's drop stop the workers
    let handle = acceptor.handle().expect("acceptor started").clone();
    handle.block_on(async {
        let _ = tokio::signal::ctrl_c().await;
    });
    tracing::info!("shutdown signal received, stopping acceptor");
    drop(acceptor);

    Ok(())
}
