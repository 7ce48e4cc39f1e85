//! CLI entrypoint for tooloop
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;
mod logging;
mod progress;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::Cli;
use progress::ProgressPrinter;
use std::sync::Arc;
use std::time::Duration;
use tooloop_application::{
    CapabilityRegistry, ChannelObserver, ConversationLogger, ExecutionParams, LlmGateway,
    NoConversationLogger, RunFunctionInput, RunFunctionUseCase, RunToolLoopInput,
    RunToolLoopUseCase, ToolSchemaPort,
};
use tooloop_domain::{FunctionArgument, FunctionPrompt, Message, TypeDescriptor};
use tooloop_infrastructure::{
    ConfigLoader, FileConfig, JsonSchemaToolConverter, JsonlConversationLogger, ReplayModelClient,
    builtin_registry,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        for line in ConfigLoader::config_sources() {
            println!("{}", line);
        }
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow::anyhow!(e.to_string()))?
    };
    let issues = config.validate();
    if !issues.is_empty() {
        let messages: Vec<_> = issues.iter().map(|i| i.to_string()).collect();
        bail!("invalid configuration: {}", messages.join("; "));
    }

    let log_file = cli.log_file.as_ref().or(config.logging.log_file.as_ref());
    let _log_guard = logging::init(cli.verbose, log_file.map(|p| p.as_path()))?;

    info!("Starting tooloop");

    let Some(prompt) = cli.prompt.clone() else {
        bail!("A prompt is required. See --help.");
    };
    let Some(script) = cli.script.as_ref() else {
        bail!("No model client configured. Pass --script <PATH> with a replay script.");
    };

    let execution = execution_params(&cli, &config);

    // === Dependency Injection ===
    let gateway: Arc<dyn LlmGateway> = Arc::new(
        ReplayModelClient::from_file(script)?
            .with_stream_buffer(config.execution.stream_buffer),
    );
    let registry = Arc::new(if cli.no_tools {
        CapabilityRegistry::new()
    } else {
        builtin_registry()
    });
    let conversation_logger = conversation_logger(&cli, &config);

    match cli.returns {
        Some(kind) => {
            let use_case = RunFunctionUseCase::new(
                gateway,
                registry,
                Arc::new(JsonSchemaToolConverter),
            )
            .with_conversation_logger(conversation_logger);

            let function_prompt = FunctionPrompt::new(
                cli.system
                    .clone()
                    .unwrap_or_else(|| "Answer the request.".to_string()),
                kind.descriptor(),
            )
            .with_argument(FunctionArgument::new("request", TypeDescriptor::Text, prompt));

            let output = use_case
                .execute(RunFunctionInput::new("cli", function_prompt).with_execution(execution))
                .await
                .context("typed run failed")?;
            println!("{}", serde_json::to_string_pretty(&output.value)?);
        }
        None => {
            let mut messages = Vec::new();
            if let Some(system) = &cli.system {
                messages.push(Message::system(system.clone()));
            }
            messages.push(Message::user(prompt));

            let schemas = JsonSchemaToolConverter.all_tools_schema(registry.tool_spec());
            let stream = execution.stream;
            let input = RunToolLoopInput::new("cli", messages)
                .with_tool_schemas(schemas)
                .with_execution(execution);
            let use_case = RunToolLoopUseCase::new(gateway, registry)
                .with_conversation_logger(conversation_logger);

            let (observer, events) = ChannelObserver::channel();
            let printer = ProgressPrinter::new(cli.quiet).spawn(events);
            let result = use_case.execute_with_observer(input, &observer).await;
            drop(observer);
            let streamed = printer.await.unwrap_or(false);

            let result = result.context("tool loop failed")?;
            // The forced final call is never streamed
            if !stream || result.forced || !streamed {
                println!("{}", result.content);
            } else {
                println!();
            }
            info!(
                model_calls = result.model_calls,
                tool_turns = result.tool_turns,
                "Run complete"
            );
        }
    }

    Ok(())
}

/// File config, then command-line overrides.
fn execution_params(cli: &Cli, config: &FileConfig) -> ExecutionParams {
    let mut params = config.execution.to_execution_params();
    if cli.stream {
        params = params.with_stream(true);
    }
    if let Some(turns) = cli.max_turns {
        params = params.with_max_tool_turns(turns);
    }
    if let Some(secs) = cli.tool_timeout {
        params = params.with_tool_timeout(Some(Duration::from_secs(secs)));
    }
    params
}

fn conversation_logger(cli: &Cli, config: &FileConfig) -> Arc<dyn ConversationLogger> {
    let path = cli
        .conversation_log
        .as_ref()
        .or(config.logging.conversation_log.as_ref());
    match path.map(JsonlConversationLogger::open) {
        Some(Some(logger)) => {
            info!("Conversation log: {}", logger.path().display());
            Arc::new(logger)
        }
        Some(None) => {
            warn!("Conversation logging disabled");
            Arc::new(NoConversationLogger)
        }
        None => Arc::new(NoConversationLogger),
    }
}
