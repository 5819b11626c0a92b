use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use kickgpt::chat::{ChatConfig, ChatService, Overrides};
use kickgpt::cli::commands::templates_text;
use kickgpt::cli::{parse_task, repl};
use kickgpt::conversation::ConversationStore;
use kickgpt::inference::{load_engine, EngineHandle};
use kickgpt::prompts::PromptStyle;
use kickgpt::server::{self, ServerConfig};
use kickgpt::storage::{self, AppSettings};
use kickgpt::types::Backend;

#[derive(Parser)]
#[command(name = "kickgpt")]
#[command(about = "KickGPT - local Mistral chat, prompt templates and REST API")]
#[command(version)]
struct Cli {
    /// Path to the GGUF model file
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Layers to offload to the GPU (0 = CPU only)
    #[arg(long, global = true)]
    gpu_layers: Option<u32>,

    /// Use a running llama.cpp server instead of loading the model in-process
    #[arg(long, global = true)]
    engine_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API and web chat UI
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactive chat with conversation memory
    Chat {
        /// Start with one-line template wording
        #[arg(long)]
        simple: bool,
    },
    /// Ask one question and exit
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },
    /// Run one prompt template, e.g. `prompt explain quantum computing`
    Prompt {
        /// Use the one-line wording instead of the structured template
        #[arg(long)]
        simple: bool,
        template: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List the prompt templates
    Templates,
    /// Check a running server's health
    Status {
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        url: String,
    },
    /// Print the effective settings
    Config {
        /// Also write them to the settings file
        #[arg(long)]
        write: bool,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

fn apply_overrides(cli: &Cli, settings: &mut AppSettings) {
    if let Some(ref model) = cli.model {
        settings.model.model_path = model.clone();
    }
    if let Some(gpu_layers) = cli.gpu_layers {
        settings.model.gpu_layers = gpu_layers;
    }
    if let Some(ref url) = cli.engine_url {
        settings.engine_url = url.clone();
        settings.backend = Backend::Http;
    }
    if let Command::Serve { ref host, port } = cli.command {
        if let Some(host) = host {
            settings.host = host.clone();
        }
        if let Some(port) = port {
            settings.port = port;
        }
    }
    settings.validate();
}

fn build_service(settings: &AppSettings, engine: EngineHandle) -> ChatService {
    ChatService::new(
        Arc::new(ConversationStore::new(settings.store_config())),
        engine,
        ChatConfig {
            defaults: settings.generation_params(),
            context_size: settings.model.context_size,
            request_timeout: settings.request_timeout(),
        },
    )
}

/// Load the engine up front; the terminal commands cannot work without it.
async fn ready_service(settings: &AppSettings) -> Result<ChatService> {
    let engine = load_engine(settings.backend, &settings.model, &settings.engine_url)
        .await
        .context("Failed to start the inference engine")?;
    Ok(build_service(settings, EngineHandle::ready(engine)))
}

fn style_for(simple: bool) -> PromptStyle {
    if simple {
        PromptStyle::Simple
    } else {
        PromptStyle::Structured
    }
}

async fn serve(settings: AppSettings) -> Result<()> {
    let handle = EngineHandle::loading();
    let service = Arc::new(build_service(&settings, handle.clone()));

    let loader_settings = settings.clone();
    tokio::spawn(async move {
        match load_engine(
            loader_settings.backend,
            &loader_settings.model,
            &loader_settings.engine_url,
        )
        .await
        {
            Ok(engine) => handle.set_ready(engine).await,
            Err(e) => handle.set_failed(e.to_string()).await,
        }
    });

    let config = ServerConfig {
        host: settings.host.clone(),
        port: settings.port,
        session_ttl: settings.session_ttl(),
    };
    let server = server::start(config, service)
        .await
        .with_context(|| format!("Failed to bind {}:{}", settings.host, settings.port))?;
    println!("KickGPT listening on http://{}:{}", settings.host, server.port);
    server.wait().await;
    Ok(())
}

async fn status(url: &str) -> Result<()> {
    let url = format!("{}/api/health", url.trim_end_matches('/'));
    let resp = reqwest::get(&url)
        .await
        .with_context(|| format!("Server not reachable at {url}"))?;
    let code = resp.status();
    let body: serde_json::Value = resp.json().await.context("Malformed health response")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !code.is_success() {
        bail!("server is not healthy ({code})");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level);

    let mut settings = storage::load_settings();
    apply_overrides(&cli, &mut settings);

    match cli.command {
        Command::Templates => print!("{}", templates_text()),
        Command::Status { ref url } => status(url).await?,
        Command::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if write {
                storage::save_settings(&settings).context("Failed to save settings")?;
                println!("Saved to {}", storage::settings::get_settings_path()?.display());
            }
        }
        Command::Serve { .. } => serve(settings).await?,
        Command::Chat { simple } => {
            let service = ready_service(&settings).await?;
            repl::run(&service, &settings, style_for(simple)).await?;
        }
        Command::Ask { ref words } => {
            let service = ready_service(&settings).await?;
            let reply = service
                .chat(repl::CLI_SESSION, &words.join(" "), Overrides::default())
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{reply}");
        }
        Command::Prompt { simple, ref template, ref args } => {
            let task = match parse_task(template, &args.join(" ")) {
                Some(Ok(task)) => task,
                Some(Err(usage)) => bail!("{usage}"),
                None => bail!("Unknown template '{template}'. Run `kickgpt templates` for the list."),
            };
            let service = ready_service(&settings).await?;
            let reply = service
                .run_task(&task, style_for(simple), Overrides::default())
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{}", reply.response);
        }
    }

    Ok(())
}
