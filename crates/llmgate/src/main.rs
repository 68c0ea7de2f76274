use anyhow::Result;
use clap::{Parser, Subcommand};
use llmgate_common::{logger, AppConfig};
use llmgate_llm::{
    content_hash, GenerationRequest, ProviderClient, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
use llmgate_store::{GatewayService, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "llmgate")]
#[command(about = "llmgate - resilient client for an external LLM provider", long_about = None)]
struct Cli {
    /// Layered config file (TOML/JSON/YAML); environment only when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to <log_dir>/llmgate.log
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate text
    Generate {
        /// User prompt
        #[arg(long)]
        prompt: String,

        /// System message text
        #[arg(long)]
        system: Option<String>,

        /// Context snippet (repeatable, kept in order)
        #[arg(long = "context")]
        context: Vec<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
        temperature: f64,

        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: u32,
    },

    /// Embed one or more texts; repeated texts are served from the store
    Embed {
        /// Text to embed (repeatable)
        #[arg(long = "text", required = true)]
        texts: Vec<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Print the content hash of a text without calling the provider
    Hash {
        #[arg(long)]
        text: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(Some(path.as_path()))?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    let config = load_config(cli.config.as_ref())?;
    if cli.log_file {
        logger::setup_logging(&config.log_dir, &config.log_level)?;
    } else {
        logger::setup_console_logging(&config.log_level)?;
    }

    tracing::debug!("Configuration loaded: {:?}", config.provider);

    match cli.command {
        Commands::Generate {
            prompt,
            system,
            context,
            model,
            temperature,
            max_tokens,
        } => {
            let client = ProviderClient::from_config(&config)?;

            let mut request = GenerationRequest::new(prompt)
                .with_temperature(temperature)
                .with_max_tokens(max_tokens);
            if let Some(system) = system {
                request = request.with_system_message(system);
            }
            if !context.is_empty() {
                request = request.with_context(context);
            }
            if let Some(model) = model {
                request = request.with_model(model);
            }

            let result = client.generate_text(request).await;
            client.shutdown();

            println!("{}", serde_json::to_string_pretty(&result?)?);
        }
        Commands::Embed { texts, model } => {
            let client = Arc::new(ProviderClient::from_config(&config)?);
            let service = GatewayService::new(client.clone(), Arc::new(MemoryStore::new()));

            let mut outcomes = Vec::with_capacity(texts.len());
            for text in &texts {
                outcomes.push(service.embed(text, model.as_deref()).await?);
            }

            drop(service);
            if let Ok(client) = Arc::try_unwrap(client) {
                client.shutdown();
            }

            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        Commands::Hash { text } => {
            println!("{}", content_hash(&text));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_args_keep_context_order() {
        let cli = Cli::try_parse_from([
            "llmgate", "generate", "--prompt", "P", "--context", "A", "--context", "B",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate {
                prompt,
                context,
                temperature,
                max_tokens,
                ..
            } => {
                assert_eq!(prompt, "P");
                assert_eq!(context, vec!["A", "B"]);
                assert_eq!(temperature, DEFAULT_TEMPERATURE);
                assert_eq!(max_tokens, 512);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_embed_requires_text() {
        assert!(Cli::try_parse_from(["llmgate", "embed"]).is_err());
    }
}
