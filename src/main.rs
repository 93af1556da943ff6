#[tokio::main]
async fn main() -> std::io::Result<()> {
    room_server::run_with_config().await
}
