use std::env;
use std::process::ExitCode;

use aid_graph::{
    ArmApi, DryRunClient, GraphApi, GraphConfig, OperationError, RemoteCollectionClient,
    ReqwestRemoteClient,
};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod cli;
mod commands;
mod output;

use cli::{Cli, Command};
use output::ConsoleReporter;

/// Live client, or the same client behind the dry-run decorator.
enum Transport {
    Live(ReqwestRemoteClient),
    Rehearsal(DryRunClient<ReqwestRemoteClient>),
}

impl Transport {
    fn client(&self) -> &dyn RemoteCollectionClient {
        match self {
            Transport::Live(client) => client,
            Transport::Rehearsal(client) => client,
        }
    }

    fn skipped_writes(&self) -> usize {
        match self {
            Transport::Live(_) => 0,
            Transport::Rehearsal(client) => client.skipped().len(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _telemetry = match aid_telemetry::install("agent-identity", env!("CARGO_PKG_VERSION")) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let tenant_override = cli.tenant_id.clone();
    let config = GraphConfig::from_lookup(|key| match key {
        "AZURE_TENANT_ID" => tenant_override.clone(),
        _ => env::var(key).ok(),
    })
    .context("incomplete configuration")?;

    let http = config.http_client()?;
    let transport = if cli.dry_run {
        Transport::Rehearsal(DryRunClient::new(ReqwestRemoteClient::new(http.clone())))
    } else {
        Transport::Live(ReqwestRemoteClient::new(http.clone()))
    };

    let audience = cli.command.audience();
    let session = config
        .auth_provider(http)
        .authenticate(&config.tenant_id, &audience.scopes())
        .await
        .with_context(|| format!("authentication for tenant '{}' failed", config.tenant_id))?;
    info!(tenant = %config.tenant_id, ?audience, dry_run = cli.dry_run, "authenticated");

    let reporter = ConsoleReporter::new(cli.json);
    let record = match cli.command {
        Command::Graph(command) => {
            let api = GraphApi::new(transport.client(), &session, config.graph_base.clone())
                .with_reporter(&reporter);
            commands::run_graph(&api, command).await?
        }
        Command::ResourceManager(command) => {
            let arm = ArmApi::new(
                transport.client(),
                &session,
                config.arm_base.clone(),
                config.arm_scope()?,
            )
            .with_reporter(&reporter);
            commands::run_arm(&arm, command).await?
        }
    };

    let skipped = transport.skipped_writes();
    let record = if cli.dry_run {
        record.with("dryRun", true).with("skippedWrites", skipped)
    } else {
        record
    };
    reporter
        .emit(&record)
        .context("failed to write the result to stdout")?;
    Ok(())
}

fn report_failure(err: &anyhow::Error) {
    eprintln!("error: {err:#}");
    let Some(op) = err.downcast_ref::<OperationError>() else {
        return;
    };
    if op.is_partial() {
        warn!(error = %op, "removal stopped after the disable step");
        eprintln!("the item was disabled but is still present; run the same remove again to finish");
    }
    if let Some(code) = op.remote().and_then(|remote| remote.service_code()) {
        eprintln!("service error code: {code}");
    }
}
