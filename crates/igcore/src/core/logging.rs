//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + optional file)
//! - Session cookies validation and logging
//! - Startup diagnostics for the browser driver

use anyhow::Result;
use simplelog::*;
use std::fs::File;
use std::path::Path;

use crate::core::config;
use crate::driver::cookies::{self, CookieJar};

/// Parse a textual level, falling back to `Info` for anything unknown
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize logger for console and, when a path is given, file output
///
/// # Arguments
/// * `log_file_path` - Optional path to the log file
/// * `level` - Textual level (`info`, `debug`, ...)
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: Option<&str>, level: &str) -> Result<()> {
    let level = parse_level(level);
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path {
        let log_file = File::create(path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
        loggers.push(WriteLogger::new(level, Config::default(), log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs session configuration at application startup
///
/// Validates and logs:
/// - COOKIES_PATH existence, format and whether a usable `sessionid` is present
/// - Browser launch mode (headless, explicit Chrome path)
/// - Whether the binary was built with the Chromium driver
pub fn log_session_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🍪 Session Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cookies_path = config::COOKIES_PATH.as_str();
    if Path::new(cookies_path).exists() {
        match cookies::load_cookie_file(Path::new(cookies_path)) {
            Ok(jar) => log_jar(cookies_path, &jar),
            Err(e) => log::error!("❌ COOKIES_PATH: {} could not be parsed: {}", cookies_path, e),
        }
    } else {
        log::warn!("⚠️  COOKIES_PATH: {} not found", cookies_path);
        log::warn!("   Posts and reels usually work anonymously; stories will not load");
    }

    log::info!("🧭 HEADLESS: {}", *config::HEADLESS);
    match config::CHROME_PATH.as_deref() {
        Some(path) => log::info!("🧭 CHROME_PATH: {}", path),
        None => log::info!("🧭 CHROME_PATH: not set (autodetect)"),
    }

    if cfg!(feature = "browser") {
        log::info!("✅ Chromium driver compiled in");
    } else {
        log::error!("❌ Chromium driver NOT compiled in - rebuild with `--features browser`");
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn log_jar(path: &str, jar: &CookieJar) {
    match jar.session_cookie() {
        Some(session) if jar.is_usable() => {
            log::info!("✅ COOKIES_PATH: {} ({} cookies)", path, jar.len());
            log::info!("   sessionid: {}", session.masked_value());
        }
        Some(_) => {
            log::warn!("⚠️  COOKIES_PATH: {} holds a placeholder sessionid, ignoring cookies", path);
        }
        None => {
            log::warn!("⚠️  COOKIES_PATH: {} has no sessionid cookie, ignoring cookies", path);
        }
    }
}
