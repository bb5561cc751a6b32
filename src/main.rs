//! Repo Gallery - a photo gallery API backed by a GitHub repository.
//!
//! This binary starts the HTTP server and runs the maintenance commands.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_gallery::{
    catalog::{build_catalog, write_catalog, CatalogOptions, ThumbnailOptions},
    config::{
        CatalogConfig, CheckConfig, Cli, Command, HashPasswordConfig, HasherArgs,
        MigrateUsersConfig, RepoArgs, ServeConfig,
    },
    gallery::{PhotoPaths, PhotoService},
    repo::{ContentRepository, GitHubRepository},
    server::{create_router, RouterConfig},
    users::{Accounts, Argon2Hasher, CredentialHasher, RepoUserStore, Role, UserRecord, UserStore},
    RepoError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::HashPassword(config) => run_hash_password(config),
        Command::MigrateUsers(config) => run_migrate_users(config).await,
        Command::Check(config) => run_check(config).await,
        Command::Catalog(config) => run_catalog(config).await,
    }
}

// =============================================================================
// Shared Setup
// =============================================================================

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "repo_gallery=debug,tower_http=debug"
    } else {
        "repo_gallery=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn create_repository(args: &RepoArgs) -> Result<Arc<GitHubRepository>, RepoError> {
    GitHubRepository::new(
        args.github_api_url.clone(),
        args.github_owner.clone().unwrap_or_default(),
        args.github_repo.clone().unwrap_or_default(),
        args.github_branch.clone(),
        args.token_or_empty(),
    )
    .map(Arc::new)
}

fn create_hasher(args: &HasherArgs) -> Result<Argon2Hasher, String> {
    Argon2Hasher::new(
        args.argon2_memory_kib,
        args.argon2_iterations,
        args.argon2_parallelism,
    )
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Repo Gallery v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Repository: {}", config.repo.slug());
    if let Some(ref branch) = config.repo.github_branch {
        info!("  Branch: {}", branch);
    }
    info!("  Photos root: {}", config.photos_root);
    info!("  Users file: {}", config.users_path);

    if config.has_session_secret() {
        info!("  Sessions: enabled ({}s lifetime)", config.session_ttl);
    } else {
        warn!("  Sessions: NO SECRET - login and admin operations will answer 500");
        warn!("            Set --session-secret or GALLERY_SESSION_SECRET");
    }
    if config.allow_anonymous_upload {
        warn!("  Uploads: ANONYMOUS - anyone can commit photos");
    }

    let repo = match create_repository(&config.repo) {
        Ok(repo) => repo,
        Err(e) => {
            error!("Failed to create repository client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let hasher = match create_hasher(&config.hasher) {
        Ok(hasher) => hasher,
        Err(e) => {
            error!("Invalid Argon2 parameters: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = RepoUserStore::new(Arc::clone(&repo), config.users_path.clone());
    let accounts = Accounts::new(Arc::new(store), Arc::new(hasher));
    let photos = PhotoService::new(repo, PhotoPaths::new(config.photos_root.clone()));

    let router = create_router(photos, accounts, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_session_ttl(Duration::from_secs(config.session_ttl))
        .with_body_limit(config.body_limit)
        .with_anonymous_upload(config.allow_anonymous_upload)
        .with_tracing(!config.no_tracing);

    if let Some(ref secret) = config.session_secret {
        router_config = router_config.with_session_secret(secret.clone());
    }

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Hash Password Command
// =============================================================================

fn run_hash_password(config: HashPasswordConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let hasher = match create_hasher(&config.hasher) {
        Ok(hasher) => hasher,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let hash = match hasher.hash(&config.password) {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.username {
        Some(username) => {
            let record = UserRecord::new(username, hash, Role::parse(&config.role));
            println!("{}", record.to_line());
        }
        None => println!("{}", hash),
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Migrate Users Command
// =============================================================================

async fn run_migrate_users(config: MigrateUsersConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let (repo, hasher) = match (create_repository(&config.repo), create_hasher(&config.hasher)) {
        (Ok(repo), Ok(hasher)) => (repo, hasher),
        (Err(e), _) => {
            error!("Failed to create repository client: {}", e);
            return ExitCode::FAILURE;
        }
        (_, Err(e)) => {
            error!("Invalid Argon2 parameters: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = RepoUserStore::new(repo, config.users_path.clone());
    let accounts = Accounts::new(Arc::new(store), Arc::new(hasher));

    let report = match accounts.migrate_plaintext(config.dry_run).await {
        Ok(report) => report,
        Err(e) => {
            error!("Migration failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let verb = if config.dry_run { "Would rehash" } else { "Rehashed" };
    println!("{} {} plaintext credential(s)", verb, report.rehashed.len());
    for username in &report.rehashed {
        println!("  {}", username);
    }
    println!("Already Argon2: {}", report.current);

    if !report.bcrypt.is_empty() {
        println!();
        println!("These users hold bcrypt hashes, rehashed on their next login:");
        for username in &report.bcrypt {
            println!("  {}", username);
        }
    }

    if !report.foreign.is_empty() {
        println!();
        println!("These users hold hashes this server cannot verify and must reset their password:");
        for username in &report.foreign {
            println!("  {}", username);
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Repo Gallery Configuration Check");
    println!("═════════════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Repository: {}", config.repo.slug());
    println!("✓ API: {}", config.repo.github_api_url);

    if config.session_secret.as_deref().is_some_and(|s| !s.is_empty()) {
        println!("✓ Session secret: set");
    } else {
        println!("✗ Session secret: missing (login and admin operations will answer 500)");
    }
    println!();

    let repo = match create_repository(&config.repo) {
        Ok(repo) => repo,
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    print!("Reading {}... ", config.users_path);
    let store = RepoUserStore::new(Arc::clone(&repo), config.users_path.clone());
    match store.get_records().await {
        Ok(records) => {
            let admins = records.iter().filter(|r| r.role.is_admin()).count();
            println!("✓ {} user(s), {} admin(s)", records.len(), admins);
            if admins == 0 {
                println!("  No admin account: uploads, moves and deletes will be refused");
            }
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The token can read repository contents");
            println!("  - '{}' exists in {}", config.users_path, repo.identifier());
            return ExitCode::FAILURE;
        }
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}

// =============================================================================
// Catalog Command
// =============================================================================

async fn run_catalog(config: CatalogConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = CatalogOptions {
        thumbnails: ThumbnailOptions {
            max_size: config.thumbnail_size,
            quality: config.thumbnail_quality,
        },
        skip_thumbnails: config.no_thumbnails,
    };

    info!("Scanning {}...", config.photos_dir.display());
    let photos_dir = config.photos_dir.clone();
    let catalog = match tokio::task::spawn_blocking(move || build_catalog(&photos_dir, &options)).await {
        Ok(Ok(catalog)) => catalog,
        Ok(Err(e)) => {
            error!("Catalog failed: {}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Catalog task failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if catalog.is_empty() {
        warn!("No photos found in {}", config.photos_dir.display());
        return ExitCode::SUCCESS;
    }

    if let Err(e) = write_catalog(&catalog, &config.output) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    info!("Generated {}", config.output.display());
    info!("  Home photos: {}", catalog.home.len());
    info!("  Collections: {}", catalog.collections.len());
    for (name, photos) in &catalog.collections {
        info!("    - {}: {} photos", name, photos.len());
    }

    ExitCode::SUCCESS
}
