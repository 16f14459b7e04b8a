//! Quorum CLI - route one prompt to the best provider, or fuse several
//! providers' answers into one.
//!
//! Credentials are read from the environment (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`, `OPENROUTER_API_KEY`) and seeded
//! into the settings store at startup.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use quorum_models::ProviderId;
use quorum_orchestrator::settings::{api_key_setting, model_setting};
use quorum_orchestrator::{
    FactorySource, FusionConfig, FusionEngine, IntelligentRouter, MemorySettings,
    PerformanceTracker, ProviderRegistry, RegistryConfigLoader, ResponseType, RouteRequest,
    SettingsStore, FUSION_MODE_KEY,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const PROVIDERS: [ProviderId; 4] =
    [ProviderId::OpenAi, ProviderId::Claude, ProviderId::Gemini, ProviderId::OpenRouter];

/// Quorum - multi-provider LLM routing and fusion
#[derive(Parser, Debug)]
#[command(
    name = "quorum",
    author,
    version,
    about = "Route prompts to the best LLM provider, or fuse several providers' answers"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Provider registry TOML file (defaults to the builtin registry)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route a prompt to the single best provider
    Ask {
        /// The prompt to send
        prompt: String,

        /// Expected response type (general, coding, creative, data, technical)
        #[arg(short, long, default_value = "general")]
        response_type: String,

        /// Hard latency ceiling in milliseconds
        #[arg(long)]
        max_latency_ms: Option<u64>,

        /// Maximum acceptable cost per token in USD
        #[arg(long)]
        max_cost: Option<f64>,

        /// Minimum acceptable tracked success rate
        #[arg(long)]
        min_reliability: Option<f64>,
    },

    /// Dispatch the prompt to every configured provider and synthesize
    /// one combined answer (requires at least three configured providers)
    Fuse {
        /// The prompt to send
        prompt: String,
    },

    /// List known providers and whether each is configured
    Providers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = match &args.registry {
        Some(path) => RegistryConfigLoader::load(path)
            .with_context(|| format!("failed to load registry from {}", path.display()))?,
        None => ProviderRegistry::builtin(),
    };

    let settings = Arc::new(settings_from_env());
    let source = Arc::new(FactorySource);
    let tracker = Arc::new(PerformanceTracker::new());

    match args.command {
        Command::Ask { prompt, response_type, max_latency_ms, max_cost, min_reliability } => {
            // The fusionMode flag redirects plain asks to the fusion path.
            if settings.get(FUSION_MODE_KEY).as_deref() == Some("true") {
                let engine = FusionEngine::new(source);
                let config = FusionConfig::from_settings(settings.as_ref(), &PROVIDERS);
                let fused = engine.fuse(&prompt, &config).await?;
                println!("{}", fused.final_answer);
                return Ok(());
            }

            let response_type = ResponseType::from_str_opt(&response_type)
                .with_context(|| format!("unknown response type: {response_type}"))?;

            let router = IntelligentRouter::new(registry, tracker, source, settings);
            let mut request = RouteRequest::new(prompt, response_type);
            request.max_latency_ms = max_latency_ms;
            request.max_cost_per_token = max_cost;
            request.min_reliability = min_reliability;

            let outcome = router.route(request).await?;
            println!("{}", outcome.response);
            eprintln!();
            eprintln!("{} {}", "provider:".dimmed(), outcome.provider.to_string().cyan());
            eprintln!("{} {:.2}", "confidence:".dimmed(), outcome.confidence);
            eprintln!("{} {}", "why:".dimmed(), outcome.explanation.dimmed());
        }

        Command::Fuse { prompt } => {
            let engine = FusionEngine::new(source);
            let config = FusionConfig::from_settings(settings.as_ref(), &PROVIDERS);

            let fused = engine.fuse(&prompt, &config).await?;
            println!("{}", fused.final_answer);
            eprintln!();
            eprintln!(
                "{} {} ({} agents, category {})",
                "fused from:".dimmed(),
                fused
                    .providers
                    .iter()
                    .map(|r| format!("{} [{}]", r.provider, r.role))
                    .collect::<Vec<_>>()
                    .join(", ")
                    .cyan(),
                fused.providers.len(),
                fused.analysis.category
            );
        }

        Command::Providers => {
            for profile in registry.profiles() {
                let configured =
                    settings.get(&api_key_setting(profile.id)).is_some_and(|v| !v.is_empty());
                let status = if configured { "configured".green() } else { "no key".red() };
                println!(
                    "{:<12} {}  cost/tok ${:.6}  avg latency {}ms  ctx {}",
                    profile.id.to_string().bold(),
                    status,
                    profile.cost_per_token,
                    profile.average_latency_ms,
                    profile.context_window
                );
            }
        }
    }

    Ok(())
}

/// Seeds a settings store from environment variables, with per-provider
/// default model selections.
fn settings_from_env() -> MemorySettings {
    let env_keys = [
        (ProviderId::OpenAi, "OPENAI_API_KEY", "OPENAI_MODEL", "gpt-4o"),
        (ProviderId::Claude, "ANTHROPIC_API_KEY", "ANTHROPIC_MODEL", "claude-sonnet-4-5"),
        (ProviderId::Gemini, "GEMINI_API_KEY", "GEMINI_MODEL", "gemini-2.0-flash"),
        (ProviderId::OpenRouter, "OPENROUTER_API_KEY", "OPENROUTER_MODEL", "openai/gpt-4o"),
    ];

    let settings = MemorySettings::new();
    for (provider, key_var, model_var, default_model) in env_keys {
        if let Ok(key) = std::env::var(key_var) {
            settings.set(&api_key_setting(provider), &key);
        }
        let model = std::env::var(model_var).unwrap_or_else(|_| default_model.to_string());
        settings.set(&model_setting(provider), &model);
    }
    if let Ok(value) = std::env::var("QUORUM_FUSION_MODE") {
        settings.set(FUSION_MODE_KEY, &value);
    }
    settings
}
