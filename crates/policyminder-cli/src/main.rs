mod config;

use anyhow::Context;
use clap::Parser;
use policyminder_core::{
    ComplianceFilter, ComposerSettings, Coordinator, DEFAULT_MESSAGE_TEMPLATE, LogSink,
    MessageComposer, NotificationSink, PersonnelSource,
};
use policyminder_secureframe::{GraphqlClient, RestClient};
use policyminder_slack::SlackClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Source};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("policyminder v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let template = match &cli.message_template {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading message template {}", path.display()))?,
        None => DEFAULT_MESSAGE_TEMPLATE.to_string(),
    };
    let composer = MessageComposer::new(&template).context("parsing message template")?;

    let required = cli.required_types();
    if required.is_empty() {
        anyhow::bail!("--employee-types must name at least one employee type");
    }
    let filter = ComplianceFilter::new(required, cli.evaluation_mode());

    let (source, company): (Box<dyn PersonnelSource>, Option<String>) = match cli.source {
        Source::Graphql => {
            let token = cli
                .secureframe_token
                .clone()
                .context("--secureframe-token (SECUREFRAME_TOKEN) is required for the graphql source")?;
            let company_id = cli
                .company_id
                .clone()
                .context("--company-id is required for the graphql source")?;
            let company_user_id = cli
                .company_user_id
                .clone()
                .context("--company-user-id is required for the graphql source")?;
            let client = GraphqlClient::new(token, company_id, company_user_id);

            let company = match &cli.company_name {
                Some(name) => Some(name.clone()),
                None => {
                    let company = client.company().await.context("looking up company name")?;
                    info!(company = %company.name, "resolved company name");
                    Some(company.name)
                }
            };
            let source: Box<dyn PersonnelSource> = Box::new(client);
            (source, company)
        }
        Source::Rest => {
            let access_key = cli
                .access_key
                .clone()
                .context("--access-key (SECUREFRAME_ACCESS_KEY) is required for the rest source")?;
            let secret_key = cli
                .secret_key
                .clone()
                .context("--secret-key (SECUREFRAME_SECRET_KEY) is required for the rest source")?;
            let source: Box<dyn PersonnelSource> =
                Box::new(RestClient::new(access_key, secret_key));
            (source, cli.company_name.clone())
        }
    };
    let company = company.unwrap_or_else(|| ComposerSettings::default().company);

    let sink: Box<dyn NotificationSink> = match cli.slack_token() {
        Some(token) => {
            info!(bytes = token.len(), "setting up slack client");
            Box::new(SlackClient::new(token.to_string()))
        }
        None => {
            warn!("SLACK_TOKEN not set, won't actually post messages to Slack");
            Box::new(LogSink)
        }
    };

    let mut coordinator = Coordinator::new(
        cli.run_config()?,
        filter,
        cli.composer_settings(company),
        composer,
    );
    let summary = coordinator
        .run(source.as_ref(), sink.as_ref(), chrono::Utc::now())
        .await
        .context("secureframe personnel query failed")?;

    if summary.failed > 0 {
        warn!(failed = summary.failed, "some reminders could not be sent");
    }
    Ok(())
}
