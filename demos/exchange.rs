use simple_ecdh::{ExchangeConfig, ExchangeError, Party, run_exchange};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ExchangeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ExchangeConfig::default();
    let outcome = run_exchange(&config)?;

    for party in [Party::A, Party::B] {
        let view = outcome.party(party);
        info!(%party, public_key = %view.encoded_public.to_hex(), "sent public key");
        println!("shared_{party}: {}", view.secret.to_hex());
    }
    assert!(outcome.secrets_match());
    info!(curve = %config.curve, len = config.derive.output_length, "secrets match");
    Ok(())
}
