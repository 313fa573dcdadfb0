use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

use github_query_watcher::{
    DataSinks, FetcherRateLimitEnforcer, FetcherRetrier, GITHUB_GRAPHQL_ENDPOINT,
    GitHubDataSource, GraphQlFetcher, MemoryResponseCache, StdResult, WatcherDataSource,
    WatchingQueryExecutor,
};

/// Command line arguments for the GitHub query watcher
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// What to fetch
    #[command(subcommand)]
    command: Command,

    /// GraphQL endpoint
    #[arg(short, long, default_value = GITHUB_GRAPHQL_ENDPOINT)]
    endpoint: String,

    /// GitHub API token
    #[arg(long, env = "GITHUB_API_TOKEN", hide_env_values = true)]
    github_api_token: String,

    /// Maximum number of attempts per network request
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Base delay of the exponential backoff between attempts, in milliseconds
    #[arg(long, default_value_t = 500)]
    retry_base_delay_ms: u64,

    /// Number of values buffered per subscriber
    #[arg(long, default_value_t = 64)]
    sink_capacity: usize,

    /// How long to keep watching before cancelling, in seconds
    #[arg(short, long, default_value_t = 10)]
    watch_duration_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the repositories of the authenticated user
    Repositories,

    /// Fetch the detail of a repository
    Detail {
        /// Repository name
        name: String,
    },

    /// Fetch the default branch commits of a repository
    Commits {
        /// Repository name
        name: String,
    },
}

#[tokio::main]
async fn main() -> StdResult<()> {
    env_logger::init();
    let args = Args::parse();
    debug!("Command: {:?}", args.command);

    let data_source = build_data_source(&args)?;
    let printers = spawn_printers(data_source.as_ref());
    match &args.command {
        Command::Repositories => data_source.fetch_repositories(),
        Command::Detail { name } => data_source.fetch_repository_detail(name),
        Command::Commits { name } => data_source.fetch_commits(name),
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.watch_duration_secs)) => {
            info!("Watch duration elapsed");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
        }
    }
    data_source.cancel_fetching();
    for printer in printers {
        printer.abort();
    }

    Ok(())
}

fn build_data_source(args: &Args) -> StdResult<Arc<dyn GitHubDataSource>> {
    let fetcher = Arc::new(FetcherRateLimitEnforcer::new(Arc::new(FetcherRetrier::new(
        Arc::new(GraphQlFetcher::try_new(
            &args.endpoint,
            &args.github_api_token,
        )?),
        args.max_retries,
        Duration::from_millis(args.retry_base_delay_ms),
    ))));
    let executor = Arc::new(WatchingQueryExecutor::try_new(
        fetcher,
        Arc::new(MemoryResponseCache::new()),
    )?);

    Ok(Arc::new(WatcherDataSource::try_new(
        executor,
        DataSinks::new(args.sink_capacity),
    )?))
}

fn spawn_printers(data_source: &dyn GitHubDataSource) -> Vec<JoinHandle<()>> {
    let mut repositories = data_source.subscribe_repositories();
    let mut repository_detail = data_source.subscribe_repository_detail();
    let mut commits = data_source.subscribe_commits();
    let mut errors = data_source.subscribe_errors();

    vec![
        tokio::spawn(async move {
            loop {
                match repositories.recv().await {
                    Ok(repositories) => {
                        println!("{} repositories", repositories.len());
                        for repository in repositories {
                            println!("  {repository}");
                        }
                    }
                    Err(RecvError::Lagged(total_skipped)) => {
                        warn!("Skipped {total_skipped} repositories emissions")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }),
        tokio::spawn(async move {
            loop {
                match repository_detail.recv().await {
                    Ok(detail) => println!("{detail}"),
                    Err(RecvError::Lagged(total_skipped)) => {
                        warn!("Skipped {total_skipped} repository detail emissions")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }),
        tokio::spawn(async move {
            loop {
                match commits.recv().await {
                    Ok(commits) => {
                        println!("{} commits", commits.len());
                        for commit in commits {
                            println!("  {commit}");
                        }
                    }
                    Err(RecvError::Lagged(total_skipped)) => {
                        warn!("Skipped {total_skipped} commits emissions")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }),
        tokio::spawn(async move {
            loop {
                match errors.recv().await {
                    Ok(failure) => eprintln!("Error: {failure}"),
                    Err(RecvError::Lagged(total_skipped)) => {
                        warn!("Skipped {total_skipped} error emissions")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }),
    ]
}
