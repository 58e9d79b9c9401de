use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tutor_cli::main_entry().await
}
