use anyhow::{Context, Result};
use aws_config::{sts::AssumeRoleProvider, BehaviorVersion};
use aws_sdk_dynamodb::Client;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use dynamodb_copy::config::{CopyConfig, RetryConfig};
use dynamodb_copy::dynamodb::{DynamoDb, TableService};
use dynamodb_copy::retry::{Backoff, JitterBackoff};
use dynamodb_copy::{run_copy_table, Copier, Provisioner};

const SESSION_NAME: &str = "dynamodb-copy";

/// Copies DynamoDB tables while temporarily raising their provisioned throughput
#[derive(Debug, Parser)]
#[command(name = "dynamodb-copy", version)]
pub struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copies dynamoDB records from a source to a target table
    CopyTable(CopyTableArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct CopyTableArgs {
    /// Table to read from
    pub source_table: String,

    /// Table to write to
    pub target_table: String,

    /// Set the profile to use for the source table
    #[arg(short = 's', long)]
    pub source_profile: Option<String>,

    /// Set the profile to use for the target table
    #[arg(short = 't', long)]
    pub target_profile: Option<String>,

    /// Assume this role to access the source table
    #[arg(long)]
    pub source_role_arn: Option<String>,

    /// Assume this role to access the target table
    #[arg(long)]
    pub target_role_arn: Option<String>,

    /// Set the read provisioned capacity for the source table
    #[arg(long, default_value_t = 0)]
    pub read_capacity: u64,

    /// Set the write provisioned capacity for the target table
    #[arg(long, default_value_t = 0)]
    pub write_capacity: u64,

    /// Set the number of read workers to use
    #[arg(
        short = 'r',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub reader_count: u32,

    /// Set the number of write workers to use
    #[arg(
        short = 'w',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub writer_count: u32,

    /// Custom DynamoDB endpoint, e.g. DynamoDB Local
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,
}

impl CopyTableArgs {
    fn copy_config(&self) -> CopyConfig {
        CopyConfig {
            read_capacity: self.read_capacity,
            write_capacity: self.write_capacity,
            readers: self.reader_count,
            writers: self.writer_count,
        }
    }
}

/// Runs the `copy-table` command.
pub async fn copy_table(args: CopyTableArgs) -> Result<()> {
    let config = args.copy_config();
    config.validate()?;

    let retry = RetryConfig::default();
    let backoff: Arc<dyn Backoff> = Arc::new(JitterBackoff::new(retry.max_jitter));

    let source_store = connect(
        args.source_profile.as_deref(),
        args.source_role_arn.as_deref(),
        args.endpoint_url.as_deref(),
    )
    .await;
    let target_store = connect(
        args.target_profile.as_deref(),
        args.target_role_arn.as_deref(),
        args.endpoint_url.as_deref(),
    )
    .await;

    let source = TableService::new(
        &args.source_table,
        Arc::new(source_store),
        backoff.clone(),
        &retry,
    );
    let target = TableService::new(&args.target_table, Arc::new(target_store), backoff, &retry);

    let provisioner = Provisioner::new(source.clone(), target.clone());
    let copier = Copier::new(source, target, config.readers, config.writers);

    let summary = run_copy_table(&provisioner, &copier, config.minimums())
        .await
        .with_context(|| {
            format!(
                "copy-table {} -> {} failed",
                args.source_table, args.target_table
            )
        })?;

    info!(
        "copied {} items from {} to {}",
        summary.written, args.source_table, args.target_table
    );
    Ok(())
}

/// Builds a DynamoDB client for one table's credentials.
async fn connect(
    profile: Option<&str>,
    role_arn: Option<&str>,
    endpoint_url: Option<&str>,
) -> DynamoDb {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    if let Some(endpoint_url) = endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    let sdk_config = loader.load().await;

    let Some(role_arn) = role_arn else {
        return DynamoDb::new(&sdk_config);
    };

    info!("assuming role {role_arn}");
    let provider = AssumeRoleProvider::builder(role_arn)
        .session_name(SESSION_NAME)
        .configure(&sdk_config)
        .build()
        .await;
    let config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
        .credentials_provider(provider)
        .build();
    DynamoDb::from_client(Client::from_conf(config))
}
