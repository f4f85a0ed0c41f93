use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use csv_translate::translation::client::HttpClient;
use csv_translate::translation::GoogleTranslator;
use csv_translate::{translate_csv, AppError, Cli, RunConfig, RunReport};

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn run(config: RunConfig) -> Result<RunReport, AppError> {
    info!("Input CSV: {}", config.input.display());
    info!("Output CSV: {}", config.output.display());

    let http = HttpClient::new(config.timeout)?.with_logging_mode(config.logging_mode);
    let mut translator = GoogleTranslator::new(http, config.api_key.clone())?;
    if let Some(endpoint) = config.endpoint.as_deref() {
        translator = translator.with_base_url(endpoint)?;
    }

    translate_csv(
        &config.input,
        &config.output,
        &config.columns,
        &config.options,
        &translator,
    )
    .await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = match RunConfig::try_from(cli) {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            if !report.skipped_columns.is_empty() {
                info!("Skipped columns: {}", report.skipped_columns.join(", "));
            }
            info!(
                "Done: {} rows, encoding {}, added {}",
                report.rows,
                report.encoding,
                report.translated_columns.join(", ")
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            let presentation = e.to_presentation();
            eprintln!("{}: {}", presentation.title, presentation.message);
            if let Some(action) = presentation.action {
                eprintln!("  {}", action);
            }
            ExitCode::FAILURE
        }
    }
}
