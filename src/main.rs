use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exphe::{Experiment, Scheme, SchemeConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Variant {
    Validated,
    Relaxed,
}

/// Run encryption trials and report trivial-ciphertext statistics
#[derive(Parser, Debug)]
struct Opt {
    /// Bit size of the primes p and q
    #[arg(long, default_value_t = 512)]
    prime_bits: u64,
    /// Bit size of message magnitudes
    #[arg(long, default_value_t = 64)]
    message_bits: u64,
    /// Bit size of the auxiliary modulus z
    #[arg(long, default_value_t = 512)]
    aux_bits: u64,
    /// Number of independent trials
    #[arg(long, default_value_t = 1000)]
    trials: usize,
    #[arg(long, value_enum, default_value_t = Variant::Validated)]
    variant: Variant,
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();

    let opt = Opt::parse();

    let base = match opt.variant {
        Variant::Validated => SchemeConfig::validated(),
        Variant::Relaxed => SchemeConfig::relaxed(),
    };
    let config = base
        .with_prime_bits(opt.prime_bits)
        .with_message_bits(opt.message_bits)
        .with_aux_modulus_bits(opt.aux_bits);

    let scheme = Scheme::generate(config)?;
    info!(
        params = %scheme.params(),
        lambda_phi_ratio = scheme.params().lambda_phi_ratio(),
        variant = %scheme.config().variant,
        "scheme ready"
    );

    let stats = Experiment::new(&scheme).run_parallel(opt.trials)?;
    println!("{}", stats);

    Ok(())
}
