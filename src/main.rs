use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytgrab::pipeline::validate_url;
use ytgrab::{output, utils, ArchiveOutcome, ArchivePipeline, Cli, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "ytgrab=debug" } else { "ytgrab=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };

    if cli.show_config {
        config.display();
        return ExitCode::SUCCESS;
    }

    let request = cli.to_request(&config);

    // Reject bad input before any subprocess runs
    if let Err(e) = validate_url(&request.url) {
        output::error(&e.to_string());
        return ExitCode::from(e.exit_code());
    }

    let missing_deps = utils::check_dependencies(&config).await;
    if !missing_deps.is_empty() {
        output::warning("Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
    }

    if !utils::is_youtube_url(request.url.trim()) {
        output::warning("URL doesn't appear to be a YouTube link. Proceeding anyway...");
    }

    if !request.info_only {
        output::print_banner();
    }

    tracing::info!("Starting archive for URL: {}", request.url);
    let pipeline = ArchivePipeline::new(&config);

    match pipeline.run(&request).await {
        Ok(ArchiveOutcome::InfoOnly(metadata)) => {
            output::print_info(&metadata);
            ExitCode::SUCCESS
        }
        Ok(ArchiveOutcome::Archived(archived)) => {
            output::print_summary(&archived);
            ExitCode::SUCCESS
        }
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}
