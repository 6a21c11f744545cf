use clap::Parser;
use log::error;
use wamp_router::RouterConfig;

#[tokio::main]
async fn main() {
    env_logger::init();
    let config = RouterConfig::parse();

    if let Err(e) = wamp_router::server::serve(config).await {
        error!("router exited: {e}");
        std::process::exit(1);
    }
}
