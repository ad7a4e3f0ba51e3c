use option_lattice::config::AppConfig;
use option_lattice::convergence::ConvergenceStudy;
use option_lattice::errors::PricingResult;
use option_lattice::models::binomial::BinomialModel;
use option_lattice::models::black_scholes::BlackScholesModel;
use option_lattice::models::PricingModel;
use option_lattice::report::PricingReport;

#[tokio::main]
async fn main() {
    // Structured logging on stderr; stdout carries the JSON report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("option_lattice starting");

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    match run(&cfg).await {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "pricing failed");
            std::process::exit(1);
        }
    }
}

async fn run(cfg: &AppConfig) -> PricingResult<String> {
    let option = cfg.option_spec()?;
    tracing::info!(
        spot = option.spot(),
        strike = option.strike(),
        rate = option.rate(),
        maturity = option.maturity(),
        volatility = option.volatility(),
        option_type = %option.option_type(),
        "option loaded"
    );

    let lattice = BinomialModel::new(option, cfg.lattice_steps, cfg.preset_u, cfg.preset_d)?;
    let analytic = BlackScholesModel::new(option);

    // Side-by-side through the shared interface
    let engines: [&dyn PricingModel; 2] = [&lattice, &analytic];
    for engine in engines {
        let price = engine.price()?;
        tracing::info!(model = engine.name(), price, "priced");
    }

    let study = ConvergenceStudy::run_parallel(option, &cfg.convergence_steps).await?;
    for point in &study.points {
        tracing::info!(
            steps = point.steps,
            lattice = point.lattice_price,
            abs_error = point.abs_error,
            "convergence"
        );
    }
    if !study.is_monotone() {
        tracing::warn!("lattice error did not decrease monotonically across the step grid");
    }

    let report = PricingReport::build(&lattice, study, chrono::Utc::now().to_rfc3339())?;
    report.to_json()
}
