use std::sync::Arc;

use viewer_server::{bootstrap, config, logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A .env file is optional
    dotenv::dotenv().ok();

    let cfg = config::Config::load_from("config")?;
    logger::init(&cfg.logging)?;

    // Create the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(bootstrap::prepare(cfg)?);

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &state.config);

    server::run(listener, state).await?;
    Ok(())
}
