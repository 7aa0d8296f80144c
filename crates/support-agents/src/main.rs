use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use support_agents::config::{self, SupportConfig};
use support_agents::generation::RigGenerator;
use support_agents::orchestrator::Pipeline;
use support_agents::state::TicketInput;
use support_agents::tools::knowledge_base::InMemoryKnowledgeBase;
use support_agents::tools::order_api::SeededOrderApi;

/// Run one support ticket through the agent pipeline.
#[derive(Parser, Debug)]
#[command(name = "support-agents", about = "Automated support ticket pipeline")]
struct Cli {
    /// Customer email address.
    #[arg(long)]
    email: String,

    /// Customer display name.
    #[arg(long)]
    name: String,

    /// Ticket subject line.
    #[arg(long)]
    subject: String,

    /// Ticket message body.
    #[arg(long)]
    message: String,

    /// Order id referenced by the ticket, if any.
    #[arg(long)]
    order_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = SupportConfig::default();
    info!(
        endpoint = %config.endpoint.url,
        model = %config.endpoint.model,
        "Support pipeline starting"
    );

    if !config::check_endpoint(&config.endpoint.url).await {
        warn!(
            url = %config.endpoint.url,
            "Inference endpoint not reachable; generation calls will fail"
        );
    }

    let generator = Arc::new(RigGenerator::from_config(&config)?);
    let knowledge = Arc::new(InMemoryKnowledgeBase::with_default_articles());
    let orders = Arc::new(SeededOrderApi::new());
    let pipeline = Pipeline::new(generator, knowledge, orders, config);

    let ticket = TicketInput {
        ticket_id: 1,
        customer_email: cli.email,
        customer_name: cli.name,
        subject: cli.subject,
        message: cli.message,
        order_id: cli.order_id,
    };

    let outcome = pipeline.run(ticket).await?;

    for trace in &outcome.traces {
        info!(
            step = trace.step_number,
            stage = %trace.stage,
            confidence = trace.confidence,
            elapsed_ms = trace.execution_time_ms,
            tools = ?trace.tools_used,
            "trace"
        );
    }
    info!(
        requires_human = outcome.requires_human,
        overall_confidence = outcome.overall_confidence,
        "verdict"
    );
    println!("{}", outcome.final_response);

    Ok(())
}
