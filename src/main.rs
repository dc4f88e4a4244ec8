use anyhow::Result;
use earwire::config::AppConfig;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    earwire::telemetry::init_tracing(&config);
    earwire::server::run(&config)
}
