//! wavshare server binary.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{delete, get, post, put},
};
use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wavshare::api::{AuthState, DatabaseAuthState, handlers};
use wavshare::crypto::hash_password;
use wavshare::db::{DbConfig, DbPool, NewUser, UserRepository, run_migrations};
use wavshare::importer::Importer;

/// Music sharing server with a per-user play queue.
#[derive(Parser)]
#[command(name = "wavshare")]
#[command(about = "A music sharing and playback queue server written in Rust")]
struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "wavshare.db")]
    database: String,

    /// Server port
    #[arg(short, long, default_value = "4533")]
    port: u16,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user
    CreateUser {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Display name shown as the artist on uploads (defaults to the
        /// username)
        #[arg(long)]
        display_name: Option<String>,
    },

    /// Generate a bearer token for a user
    GenerateToken {
        /// Username of the user to generate a token for
        #[arg(short, long)]
        username: String,

        /// The user's password; a token acts as the user, so minting one
        /// requires it
        #[arg(short, long)]
        password: String,
    },

    /// Revoke (delete) a user's bearer token
    RevokeToken {
        /// Username of the user to revoke the token for
        #[arg(short, long)]
        username: String,
    },

    /// Show a user's bearer token
    ShowToken {
        /// Username of the user
        #[arg(short, long)]
        username: String,
    },

    /// Import uploaded audio files from a directory as posts
    Import {
        /// Username that will own the imported posts
        #[arg(short, long)]
        username: String,

        /// Directory of uploaded audio files
        #[arg(long)]
        path: PathBuf,
    },

    /// Register a single audio file as a post
    AddPost {
        /// Username that will own the post
        #[arg(short, long)]
        username: String,

        /// Path to the audio file
        #[arg(short, long)]
        file: PathBuf,

        /// Post title (defaults to the file's tag title)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Start the server (default)
    Serve,
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    auth: Arc<DatabaseAuthState>,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            auth: Arc::new(DatabaseAuthState::new(pool)),
        }
    }
}

// Allow extracting Arc<dyn AuthState> from AppState
impl FromRef<AppState> for Arc<dyn AuthState> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Create the main router with all REST routes.
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/me", get(handlers::me))
        // Queue endpoints
        .route(
            "/queue",
            get(handlers::get_queue)
                .post(handlers::enqueue)
                .delete(handlers::clear_queue),
        )
        .route("/queue/next", post(handlers::enqueue_next))
        .route("/queue/reorder", put(handlers::reorder_queue))
        .route(
            "/queue/settings",
            get(handlers::get_queue_settings).put(handlers::update_queue_settings),
        )
        .route("/queue/{post_id}", delete(handlers::remove_from_queue))
        // Post endpoints
        .route("/posts/{id}", get(handlers::get_post))
        .route("/posts/{id}/stream", get(handlers::stream_post))
        // Playlist endpoints
        .route(
            "/playlists",
            get(handlers::get_playlists).post(handlers::create_playlist),
        )
        .route("/playlists/{id}", get(handlers::get_playlist))
        .route("/playlists/{id}/tracks", post(handlers::add_playlist_track))
        .route("/playlists/{id}/queue", post(handlers::add_playlist_to_queue))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn setup_database(database_url: &str) -> DbPool {
    let config = DbConfig::new(database_url);
    let pool = config.build_pool().expect("Failed to create database pool");

    // Run migrations
    let mut conn = pool.get().expect("Failed to get database connection");
    run_migrations(&mut conn).expect("Failed to run migrations");

    pool
}

fn create_user(
    pool: &DbPool,
    username: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password_hash = hash_password(password)?;
    let repo = UserRepository::new(pool.clone());

    let new_user = NewUser::new(
        username,
        &password_hash,
        display_name.unwrap_or(username),
    );

    match repo.create(&new_user) {
        Ok(user) => {
            println!("Created user '{}' (id: {})", user.username, user.id);
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to create user: {}", e);
            Err(Box::new(e))
        }
    }
}

#[tokio::main]
async fn main() {
    // Pick up RUST_LOG and friends from .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wavshare=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Setup database
    let pool = setup_database(&cli.database);

    match cli.command {
        Some(Commands::CreateUser {
            username,
            password,
            display_name,
        }) => {
            if create_user(&pool, &username, &password, display_name.as_deref()).is_err() {
                std::process::exit(1);
            }
        }
        Some(Commands::GenerateToken { username, password }) => {
            let repo = UserRepository::new(pool.clone());
            match repo.find_by_username(&username) {
                Ok(Some(user)) => {
                    if !user.verify_password(&password) {
                        eprintln!("Invalid password for user '{}'", username);
                        std::process::exit(1);
                    }
                    match repo.generate_token(user.id) {
                        Ok(token) => {
                            println!("Generated bearer token for user '{}':", username);
                            println!("{}", token);
                        }
                        Err(e) => {
                            eprintln!("Failed to generate token: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
                Ok(None) => {
                    eprintln!("User '{}' not found", username);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Database error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::RevokeToken { username }) => {
            let repo = UserRepository::new(pool.clone());
            match repo.find_by_username(&username) {
                Ok(Some(user)) => match repo.revoke_token(user.id) {
                    Ok(true) => {
                        println!("Revoked bearer token for user '{}'", username);
                    }
                    Ok(false) => {
                        eprintln!("User '{}' not found", username);
                        std::process::exit(1);
                    }
                    Err(e) => {
                        eprintln!("Failed to revoke token: {}", e);
                        std::process::exit(1);
                    }
                },
                Ok(None) => {
                    eprintln!("User '{}' not found", username);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Database error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::ShowToken { username }) => {
            let repo = UserRepository::new(pool.clone());
            match repo.find_by_username(&username) {
                Ok(Some(user)) => match user.api_token {
                    Some(token) => {
                        println!("Bearer token for user '{}':", username);
                        println!("{}", token);
                    }
                    None => {
                        println!("User '{}' has no token. Generate one with:", username);
                        println!("  wavshare generate-token --username {}", username);
                    }
                },
                Ok(None) => {
                    eprintln!("User '{}' not found", username);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Database error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Import { username, path }) => {
            let importer = Importer::new(pool);
            match importer.import_directory(&username, &path) {
                Ok(stats) => {
                    println!("\nImport complete:");
                    println!("  Files found:    {}", stats.files_found);
                    println!("  Posts added:    {}", stats.posts_added);
                    println!("  Files skipped:  {}", stats.files_skipped);
                    println!("  Files failed:   {}", stats.files_failed);
                }
                Err(e) => {
                    eprintln!("Import failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::AddPost {
            username,
            file,
            title,
        }) => {
            let importer = Importer::new(pool);
            match importer.import_file(&username, &file, title.as_deref()) {
                Ok(post) => {
                    println!("Registered post '{}' (id: {})", post.title, post.id);
                }
                Err(e) => {
                    eprintln!("Failed to register post: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Serve) | None => {
            run_server(pool, cli.port).await;
        }
    }
}

async fn run_server(pool: DbPool, port: u16) {
    // Check if there are any users
    let repo = UserRepository::new(pool.clone());
    if !repo.has_users().unwrap_or(false) {
        tracing::warn!("No users found in database. Create one with:");
        tracing::warn!("  wavshare create-user --username alice --password <password>");
    }

    let state = AppState::new(pool);
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            tracing::error!("Is another process already using port {}?", port);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "wavshare server listening on {}",
        listener
            .local_addr()
            .expect("listener should have local addr")
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
