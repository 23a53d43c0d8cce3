use depot::config::Config;
use depot::server::Server;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config = match Config::from_args(std::env::args()) {
        Ok(config) => config,
        Err(usage) => {
            eprintln!("{usage}");
            std::process::exit(1);
        }
    };

    Server::new(config)?.run()
}
