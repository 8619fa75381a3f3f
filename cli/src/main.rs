//! Thin command surface over `loom::AgentService`: agent/session CRUD and a
//! `run` command that streams `AgentEvent`s to stdout as they arrive.

use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use loom::{
    Agent, AgentEvent, AgentService, AgentServiceConfig, InMemoryAgentRepository, InMemoryRunRepository,
    InMemorySessionRepository, LlmClient, ModelProvider, Persona, PluginRegistry, PromptPipeline,
};
use model_spec_core::{CachedResolver, ModelLimitResolver, ModelsDevResolver};
use uuid::Uuid;

struct UnconfiguredModelProvider;

impl ModelProvider for UnconfiguredModelProvider {
    fn resolve(&self, model_id: &str) -> Option<Arc<dyn LlmClient>> {
        tracing::warn!(model_id, "no model provider configured");
        None
    }
}

#[derive(Parser)]
#[command(name = "loom", about = "Loom agent runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Agent CRUD.
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },
    /// Session CRUD.
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Starts a run and streams its events to stdout.
    Run {
        #[arg(long)]
        agent_id: String,
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long)]
        input: String,
    },
}

#[derive(Subcommand)]
enum AgentCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        system_prompt: String,
        #[arg(long)]
        primary_model: String,
        #[arg(long, value_delimiter = ',')]
        fallback_models: Vec<String>,
        #[arg(long, default_value_t = 10)]
        max_turns: u32,
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,
    },
    List,
    Get {
        #[arg(long)]
        id: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    Create {
        #[arg(long)]
        agent_id: String,
    },
    List {
        #[arg(long)]
        agent_id: String,
    },
}

fn build_service() -> Arc<AgentService> {
    let window_resolver: Arc<dyn ModelLimitResolver> = Arc::new(CachedResolver::new(ModelsDevResolver::new()));
    AgentService::new(
        Arc::new(InMemoryAgentRepository::default()),
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(InMemoryRunRepository::default()),
        Arc::new(UnconfiguredModelProvider),
        window_resolver,
        Arc::new(PluginRegistry::new()),
        Arc::new(PromptPipeline::new()),
        AgentServiceConfig::default(),
    )
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::TextDelta { delta } => print!("{delta}"),
        AgentEvent::ToolCallStart { tool_call } => println!("\n[tool call: {}]", tool_call.name),
        AgentEvent::ToolCallEnd { tool_result } => println!("[tool result: {}]", tool_result.content),
        AgentEvent::RunStatus { status, error } => {
            if let Some(err) = error {
                eprintln!("\n[run {status}: {err}]");
            } else {
                println!("\n[run {status}]");
            }
        }
        AgentEvent::Error { message } => eprintln!("\n[error: {message}]"),
        AgentEvent::Done { usage } => println!("\n[done: {} prompt / {} completion tokens]", usage.prompt_tokens, usage.completion_tokens),
    }
}

#[tokio::main]
async fn main() {
    let _ = config::load_and_apply("loom", None);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let service = build_service();

    match cli.command {
        Command::Agent { command } => match command {
            AgentCommand::Create { name, system_prompt, primary_model, fallback_models, max_turns, temperature } => {
                let now = Utc::now();
                let agent = Agent {
                    id: Uuid::new_v4().to_string(),
                    name,
                    description: String::new(),
                    persona: Persona::default(),
                    system_prompt,
                    primary_model,
                    fallback_models,
                    allowed_tools: vec![],
                    allowed_mcp_servers: vec![],
                    max_turns,
                    temperature,
                    max_tokens: None,
                    created_at: now,
                    updated_at: now,
                };
                match service.create_agent(agent).await {
                    Ok(a) => println!("{}", serde_json::to_string_pretty(&a).unwrap()),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            AgentCommand::List => {
                let agents = service.list_agents().await;
                println!("{}", serde_json::to_string_pretty(&agents).unwrap());
            }
            AgentCommand::Get { id } => match service.get_agent(&id).await {
                Ok(a) => println!("{}", serde_json::to_string_pretty(&a).unwrap()),
                Err(e) => eprintln!("error: {e}"),
            },
            AgentCommand::Delete { id } => {
                if let Err(e) = service.delete_agent(&id).await {
                    eprintln!("error: {e}");
                }
            }
        },
        Command::Session { command } => match command {
            SessionCommand::Create { agent_id } => match service.create_session(&agent_id).await {
                Ok(s) => println!("{}", serde_json::to_string_pretty(&s).unwrap()),
                Err(e) => eprintln!("error: {e}"),
            },
            SessionCommand::List { agent_id } => {
                let sessions = service.list_sessions(&agent_id).await;
                println!("{}", serde_json::to_string_pretty(&sessions).unwrap());
            }
        },
        Command::Run { agent_id, session_id, input } => match service.start_run(&agent_id, session_id, input).await {
            Ok((_run, mut rx)) => {
                while let Some(event) = rx.recv().await {
                    print_event(&event);
                }
            }
            Err(e) => eprintln!("error: {e}"),
        },
    }
}
