use hospital_pharmacy::config::Settings;

#[tokio::main]
async fn main() {
    hospital_pharmacy::init_tracing();

    let result = match Settings::from_env() {
        Ok(settings) => hospital_pharmacy::run(settings).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
