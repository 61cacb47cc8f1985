//! CLI entry point for Dignity decision support.
//!
//! Every command prints a JSON result to stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use dignity_audit::JsonlAuditSink;
use dignity_core::{Actor, AppConfig, CasePattern, Permission, RecipientId};
use dignity_graph::GraphClient;
use dignity_support::{GuidanceDetector, SignalDetector, SupportService};

const DEFAULT_PATTERNS: &str = include_str!("../data/case_patterns.json");

#[derive(Parser)]
#[command(name = "dignity-support")]
#[command(about = "Briefings, handovers, guidance checks and case matching for livelihood-protection casework")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Acting user id, recorded in the audit log.
    #[arg(long, default_value = "cli", global = true)]
    actor: String,

    /// Role of the acting user (repeatable).
    #[arg(long, default_value = "caseworker", global = true)]
    role: Vec<String>,

    /// Config file prefix (default: dignity).
    #[arg(short, long, default_value = "dignity", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Safety-ordered briefing before contacting a recipient.
    Briefing {
        #[arg(long)]
        recipient_id: String,
    },
    /// Full ten-section handover document.
    Handover {
        #[arg(long)]
        recipient_id: String,
        /// Render Markdown instead of JSON.
        #[arg(long)]
        markdown: bool,
    },
    /// Case patterns ranked against the recipient's risk signals.
    SimilarCases {
        #[arg(long)]
        recipient_id: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Money management, active risks, services, patterns and recent contacts.
    FinancialSafety {
        #[arg(long)]
        recipient_id: String,
    },
    /// Multi-agency collaboration records, latest first.
    CollaborationHistory {
        #[arg(long)]
        recipient_id: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check narrative text (read from stdin) for harmful guidance phrasing.
    GuidanceCheck,
    /// Detect economic-risk signals in narrative text read from stdin.
    EconomicRiskSignals,
    /// Detect multi-agency collaboration signals in narrative text read from stdin.
    CollaborationSignals,
    /// Create graph constraints and indexes.
    SetupSchema,
    /// Load case patterns from a JSON file (built-in catalogue when omitted).
    SeedPatterns {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let actor = Actor {
        id: cli.actor.clone(),
        roles: cli.role.clone(),
    };

    let graph = Arc::new(GraphClient::connect(&config.neo4j.clone().into()).await?);

    if let Command::SetupSchema = cli.command {
        if !config.access.allows(&actor, Permission::SystemAdmin) {
            anyhow::bail!("{} lacks {}", actor.id, Permission::SystemAdmin);
        }
        graph.ensure_schema().await?;
        println!("{}", serde_json::json!({ "schema": "ok" }));
        return Ok(());
    }

    let sink = Arc::new(
        JsonlAuditSink::open(&config.audit.log_path)
            .with_context(|| format!("opening audit log {}", config.audit.log_path))?,
    );
    let (economic, collaboration) = SignalDetector::from_settings(&config.guidance)?;
    let service = SupportService::new(graph, sink)?
        .with_policy(config.access.clone())
        .with_guidance(GuidanceDetector::from_settings(&config.guidance)?)
        .with_signals(economic, collaboration);

    match cli.command {
        Command::Briefing { ref recipient_id } => {
            let briefing = service.briefing(&actor, parse_recipient(recipient_id)?).await?;
            println!("{}", serde_json::to_string(&briefing)?);
        }
        Command::Handover {
            ref recipient_id,
            markdown,
        } => {
            let doc = service.handover(&actor, parse_recipient(recipient_id)?).await?;
            if markdown {
                print!("{}", doc.render_markdown());
            } else {
                println!("{}", serde_json::to_string(&doc)?);
            }
        }
        Command::SimilarCases {
            ref recipient_id,
            limit,
        } => {
            let matches = service
                .similar_cases(&actor, parse_recipient(recipient_id)?, limit)
                .await?;
            println!("{}", serde_json::to_string(&matches)?);
        }
        Command::FinancialSafety { ref recipient_id } => {
            let summary = service
                .financial_safety_summary(&actor, parse_recipient(recipient_id)?)
                .await?;
            println!("{}", serde_json::to_string(&summary)?);
        }
        Command::CollaborationHistory {
            ref recipient_id,
            limit,
        } => {
            let history = service
                .collaboration_history(&actor, parse_recipient(recipient_id)?, limit)
                .await?;
            println!("{}", serde_json::to_string(&history)?);
        }
        Command::GuidanceCheck => {
            let text = std::io::read_to_string(std::io::stdin())?;
            let report = service.guidance_check(&actor, &text)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::EconomicRiskSignals => {
            let text = std::io::read_to_string(std::io::stdin())?;
            let report = service.economic_risk_signals(&actor, &text)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::CollaborationSignals => {
            let text = std::io::read_to_string(std::io::stdin())?;
            let report = service.collaboration_signals(&actor, &text)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::SeedPatterns { ref file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => DEFAULT_PATTERNS.to_string(),
            };
            let patterns: Vec<CasePattern> = serde_json::from_str(&raw)?;
            let count = service.seed_patterns(&actor, &patterns).await?;
            println!("{}", serde_json::json!({ "seeded": count }));
        }
        Command::SetupSchema => {}
    }

    Ok(())
}

fn parse_recipient(raw: &str) -> anyhow::Result<RecipientId> {
    let uuid = uuid::Uuid::parse_str(raw).with_context(|| format!("invalid recipient id {raw}"))?;
    Ok(RecipientId(uuid))
}
