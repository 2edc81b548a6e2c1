use sei_server::{config::Config, start_server};

#[tokio::main]
async fn main() {
    if let Err(err) = start_server(Config::load()).await {
        eprintln!("sei-server: {err}");
        std::process::exit(1);
    }
}
