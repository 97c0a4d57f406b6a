use anyhow::{Context, Result};
use console::style;
use dialoguer::theme::ColorfulTheme;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytgrab::launcher;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ytgrab=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let binary = launcher::ytgrab_binary();
    let theme = ColorfulTheme::default();

    launcher::print_banner(&mut std::io::stdout())?;

    while let Some(job) = launcher::prompt_job(&theme)? {
        let status = launcher::run_job(&binary, &job)
            .await
            .with_context(|| format!("Failed to start {}", binary.display()))?;

        if status.success() {
            println!("\n{} Ready for the next download.", style("[DONE]").green());
        } else {
            println!(
                "\n{} ytgrab exited with {}.",
                style("[ERROR]").red(),
                status
            );
        }
    }

    println!("Goodbye!");
    Ok(())
}
