use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    vsctl_web_lib::run().await
}
