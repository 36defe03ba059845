#[tokio::main]
async fn main() -> std::io::Result<()> {
    quota_server::run_with_config().await
}
