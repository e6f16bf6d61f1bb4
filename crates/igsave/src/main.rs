use anyhow::Result;
use dotenvy::dotenv;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use igcore::core::{init_logger, log_session_configuration};
use igcore::driver::cookies::load_session_cookies;
use igcore::{config, ChromiumDriver, ExtractionResult, Extractor, ScrapeOptions};
use igsave::cli::{Cli, Commands};
use igsave::{start_server, AppState, StateStore};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the appropriate subcommand;
/// running without a subcommand starts the API server.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    // .env first so LOG_LEVEL and friends can come from it
    let _ = dotenv();

    init_logger(config::LOG_FILE_PATH.as_deref(), &config::LOG_LEVEL)?;

    match cli.command {
        Some(Commands::Serve { port }) => run_server(port.unwrap_or(*config::PORT)).await?,
        Some(Commands::Extract { url, json }) => return run_extract(url, json).await,
        None => {
            log::info!("No command specified, starting the API server");
            run_server(*config::PORT).await?
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Build the extractor shared by every request
fn build_extractor() -> Extractor {
    let driver = ChromiumDriver::from_env();
    let headless = driver.headless();
    let cookies = load_session_cookies(Path::new(config::COOKIES_PATH.as_str()));
    let cookie_count = cookies.len();

    let extractor = Extractor::new(Arc::new(driver), ScrapeOptions::from_env()).with_cookies(cookies);
    log::info!(
        "Render driver: {} (headless: {}, session cookies: {})",
        extractor.driver_name(),
        headless,
        cookie_count
    );
    extractor
}

async fn run_server(port: u16) -> Result<()> {
    log_session_configuration();

    let downloads = match config::STATE_PATH.as_deref() {
        Some(path) => StateStore::open(path).await,
        None => StateStore::in_memory(),
    };
    let state = AppState::new(Arc::new(build_extractor()), downloads)?;

    start_server(port, state).await?;
    Ok(())
}

/// Extract one URL; a failed extraction exits non-zero
async fn run_extract(url: String, json: bool) -> Result<ExitCode> {
    let result = build_extractor().extract(&url, None).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(result: &ExtractionResult) {
    if !result.success {
        let code = result
            .code
            .and_then(|c| serde_json::to_value(c).ok())
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        eprintln!("❌ [{}] {}", code, result.error.as_deref().unwrap_or("unknown error"));
        return;
    }

    println!(
        "✅ {} media from @{}",
        result.count,
        result.username.as_deref().unwrap_or("unknown")
    );
    if let Some(story_id) = &result.story_id {
        println!("   story: {}", story_id);
    }
    for (i, media) in result.media.iter().enumerate() {
        let kind = if media.is_video() { "video" } else { "image" };
        println!("{:>3}. [{}] {}", i + 1, kind, media.url);
        if let Some(thumbnail) = &media.thumbnail {
            println!("       thumbnail: {}", thumbnail);
        }
    }
}
