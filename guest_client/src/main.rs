#[tokio::main]
async fn main() -> std::io::Result<()> {
    guest_client::run().await
}
