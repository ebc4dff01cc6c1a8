use clap::Parser;
use roomrelay_relay::{AppState, DEFAULT_MAX_MESSAGE_BYTES, serve};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "roomrelay-relay")]
struct RelayArgs {
    #[arg(long, env = "RELAY_BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    bind_address: String,

    #[arg(long, env = "RELAY_MAX_MESSAGE_BYTES", default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    max_message_bytes: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = RelayArgs::parse();
    let listener = match tokio::net::TcpListener::bind(&args.bind_address).await {
        Ok(listener) => listener,
        Err(source) => {
            let err = roomrelay_relay::RelayError::Bind {
                addr: args.bind_address.clone(),
                source,
            };
            error!("{}", err);
            std::process::exit(1);
        }
    };

    info!("relay starting on {}", args.bind_address);
    if let Err(err) = serve(listener, AppState::new(args.max_message_bytes)).await {
        warn!("{}", err);
    }
}
