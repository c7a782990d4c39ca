#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fixero_seed::run_cli().await
}
