use storefront::{Config, build_rocket};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    let rocket = build_rocket(config)?;
    let _ = rocket.launch().await?;

    Ok(())
}
