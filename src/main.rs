use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use yatube::auth::session;
use yatube::config::{AddGroupArgs, Cli, Command, Config};
use yatube::db::{self, groups, models::GROUP_TITLE_MAX_CHARS};
use yatube::routes;
use yatube::state::{AppState, DbPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::AddGroup(args) => add_group(&pool, &args),
        Command::Serve => serve(pool, config).await,
    }
}

fn add_group(pool: &DbPool, args: &AddGroupArgs) -> anyhow::Result<()> {
    let title = args.title.trim();
    if title.is_empty() || title.chars().count() > GROUP_TITLE_MAX_CHARS {
        anyhow::bail!(
            "group title must be 1 to {} characters",
            GROUP_TITLE_MAX_CHARS
        );
    }
    if !groups::is_valid_slug(&args.slug) {
        anyhow::bail!(
            "invalid slug {:?}: use letters, digits, '-' and '_'",
            args.slug
        );
    }

    let conn = pool.get()?;
    if groups::find_by_slug(&conn, &args.slug)?.is_some() {
        anyhow::bail!("a group with slug {:?} already exists", args.slug);
    }
    let id = groups::create_group(&conn, title, &args.slug, args.description.trim())?;
    tracing::info!("Created group {:?} ({}) with id {}", title, args.slug, id);
    Ok(())
}

async fn serve(pool: DbPool, config: Config) -> anyhow::Result<()> {
    {
        let conn = pool.get()?;
        let purged = session::purge_expired(&conn)?;
        if purged > 0 {
            tracing::info!("Purged {} expired sessions", purged);
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = routes::app(AppState::new(pool, config));

    // Start server
    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
