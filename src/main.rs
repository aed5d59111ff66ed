#[tokio::main]
async fn main() -> std::io::Result<()> {
    world_server::frameworks::server::run_with_config().await
}
