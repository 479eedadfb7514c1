use doorman::{App, Config, init_logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    init_logging(&config);

    let app = App::new(config).await?;
    app.run().await?;
    Ok(())
}
