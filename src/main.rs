//! Agora - AI debate arena
//!
//! Opens two AI chat web apps in their own Chrome windows and lets them
//! argue a topic, each reply mirrored live into the other side's input.

mod arena;
mod cli;
mod transcript;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use agora_bridge::{AgentBridge, PromptTemplates};
use agora_config::{Config, ConfigLoader, ConfigValidator};
use agora_page_cdp::{Browser, BrowserLauncher, BrowserSlot, LauncherConfig};
use agora_protocols::Page;

use crate::arena::Arena;
use crate::cli::Cli;
use crate::transcript::TranscriptWriter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    cli.apply(&mut config);
    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    let locale = config.locale.resolve();
    let templates = PromptTemplates::new(locale);
    let topic = cli.topic_or_default(locale);

    let launcher = BrowserLauncher::new(launcher_config(&config));
    let result = run(&config, &launcher, templates, &topic).await;
    if let Err(e) = &result {
        error!("{:#}", e);
    }

    info!("Browsers stay open. Press Ctrl+C to exit.");
    tokio::signal::ctrl_c().await?;
    launcher.shutdown().await;
    result
}

async fn run(
    config: &Config,
    launcher: &BrowserLauncher,
    templates: PromptTemplates,
    topic: &str,
) -> anyhow::Result<()> {
    let [agent_a, agent_b] = config.agents.as_slice() else {
        bail!("Exactly two agents are required, found {}", config.agents.len());
    };

    info!("Launching browsers...");
    let mut browsers: Vec<Browser> = Vec::new();
    for (index, agent) in [agent_a, agent_b].into_iter().enumerate() {
        let slot = browser_slot(config, &agent.name, index);
        let browser = launcher
            .launch(&slot)
            .await
            .with_context(|| format!("Failed to launch browser for {}", agent.name))?;
        browser
            .page()
            .open(&agent.url)
            .await
            .with_context(|| format!("Failed to open {}", agent.url))?;
        browsers.push(browser);
    }

    info!("Log in to both sites if needed, then press Enter to start...");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    let bridges: Vec<Arc<AgentBridge>> = [agent_a, agent_b]
        .into_iter()
        .zip(&browsers)
        .map(|(agent, browser)| {
            let page: Arc<dyn Page> = browser.page();
            Arc::new(AgentBridge::new(
                agent.clone(),
                page,
                config.timings.clone(),
                templates,
            ))
        })
        .collect();
    let forwarders: Vec<_> = bridges
        .iter()
        .map(|bridge| bridge.spawn_console_forwarder())
        .collect();

    let writer = TranscriptWriter::new(&config.debate.log_dir)
        .await
        .with_context(|| format!("Failed to create transcript in {}", config.debate.log_dir.display()))?;
    let arena = Arena::new(
        Arc::clone(&bridges[0]),
        Arc::clone(&bridges[1]),
        templates,
        config.debate.max_round_retries,
    )
    .with_transcript(writer);

    let result = tokio::select! {
        result = arena.run(topic, config.debate.rounds) => result.map(|_| ()).map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping the debate");
            Ok(())
        }
    };

    for forwarder in forwarders {
        forwarder.abort();
    }
    result
}

fn launcher_config(config: &Config) -> LauncherConfig {
    LauncherConfig {
        chrome_path: config.browser.chrome_path.clone(),
        headless: config.browser.headless,
        window_width: config.browser.window_width,
        window_height: config.browser.window_height,
        ..Default::default()
    }
}

/// Agent `index` gets port `base_port + index` and a profile named after it.
fn browser_slot(config: &Config, name: &str, index: usize) -> BrowserSlot {
    BrowserSlot {
        name: name.to_string(),
        debug_port: config.browser.base_port + index as u16,
        profile_dir: config.browser.profiles_dir.join(name.to_lowercase()),
        window_index: index as u32,
    }
}

/// Get the .agora directory path.
fn agora_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".agora"))
        .unwrap_or_else(|| PathBuf::from(".agora"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.agora/debug/ with daily rotation.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = agora_dir().join("debug");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("agora")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes buffered lines on drop; keep it for the whole run.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}
