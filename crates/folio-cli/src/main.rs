use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use folio_common::telemetry::{self, TelemetryConfig};
use folio_common::{
    ApiClient, BearerToken, Post, PostCollection, PostId, PostKind, Settings, UploadFile,
};
use folio_editor_core::RichTextEditor;
use folio_editor_core::media::resolve_asset_url;
use miette::{IntoDiagnostic, Result};

mod config;
mod script;

use config::Config;
use script::TerminalHost;

#[derive(Parser)]
#[command(version, about = "Folio - compose and publish rich text posts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file
    #[arg(long, short, env = "FOLIO_CONFIG", default_value = "folio.toml")]
    config: PathBuf,

    /// Bearer token for uploads and publishing
    #[arg(long, env = "FOLIO_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an editor script against an HTML document
    Edit {
        /// HTML file to seed the editor with
        file: PathBuf,

        /// Script of editor steps, one per line
        #[arg(long)]
        script: PathBuf,

        /// Write the result here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload a file and print its URL
    Upload {
        file: PathBuf,
    },
    /// Create a post, or edit one with --id
    Publish {
        #[arg(long = "type", default_value = "work")]
        kind: PostKind,

        #[arg(long)]
        title: String,

        /// HTML file with the post body
        #[arg(long)]
        body: PathBuf,

        /// Id of an existing post to edit
        #[arg(long)]
        id: Option<u64>,
    },
    /// List posts, newest first
    Feed {
        #[arg(long = "type", default_value = "work")]
        kind: PostKind,
    },
    /// Remove a post
    Delete {
        #[arg(long)]
        id: u64,
    },
    /// Upload an image and make it the site banner
    Banner {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init(TelemetryConfig::from_env("folio-cli"));

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let mut client = ApiClient::new(config.api.clone());
    if let Some(token) = cli.token.filter(|t| !t.is_empty()) {
        client = client.with_token(BearerToken::new(token));
    }

    match cli.command {
        Commands::Edit { file, script, out } => {
            edit(&config, &client, &file, &script, out.as_deref()).await?;
        }
        Commands::Upload { file } => {
            let file = UploadFile::from_path(&file)?;
            let url = client.upload(&file).await?;
            println!("{}", resolve_asset_url(&config.editor.asset_base_url, &url));
        }
        Commands::Publish {
            kind,
            title,
            body,
            id,
        } => {
            publish(&config, &client, kind, title, &body, id.map(PostId)).await?;
        }
        Commands::Feed { kind } => {
            let posts = client.fetch_posts().await?;
            let feed = posts.feed(kind);
            if feed.is_empty() {
                println!("No posts yet.");
            }
            for post in feed {
                println!(
                    "{}  {:>13}  {}",
                    post.date.format("%Y-%m-%d"),
                    post.id,
                    post.title
                );
            }
        }
        Commands::Delete { id } => {
            let mut posts = client.fetch_posts().await?;
            let removed = remove_post(&mut posts, PostId(id))?;
            client.save_posts(posts.as_slice()).await?;
            println!("✓ Deleted post {} ({})", removed.id, removed.title);
        }
        Commands::Banner { file } => {
            let file = UploadFile::from_path(&file)?;
            let previous = client.fetch_settings().await?;
            let url = client.upload(&file).await?;
            let settings = Settings {
                banner_url: resolve_asset_url(&config.editor.asset_base_url, &url),
            };
            tracing::debug!(previous = %previous.banner_url, "replacing banner");
            client.save_settings(&settings).await?;
            println!("✓ Banner: {}", settings.banner_url);
        }
    }

    Ok(())
}

async fn edit(
    config: &Config,
    client: &ApiClient,
    file: &Path,
    script_path: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let html = tokio::fs::read_to_string(file).await.into_diagnostic()?;
    let script_text = tokio::fs::read_to_string(script_path)
        .await
        .into_diagnostic()?;
    let steps = script::parse(&script_text)?;

    let mut editor =
        RichTextEditor::new(TerminalHost::new(), ()).with_settings(config.editor.clone());
    editor.seed(&html);

    let start = std::time::Instant::now();
    script::run(&mut editor, client, &steps).await?;
    tracing::info!(
        steps = steps.len(),
        changes = editor.revision(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "script finished"
    );

    let result = editor.to_html();
    match out {
        Some(path) => {
            tokio::fs::write(path, &result).await.into_diagnostic()?;
            eprintln!("✓ Output: {}", path.display());
        }
        None => println!("{result}"),
    }
    Ok(())
}

async fn publish(
    config: &Config,
    client: &ApiClient,
    kind: PostKind,
    title: String,
    body: &Path,
    id: Option<PostId>,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(miette::miette!("Post title must not be empty"));
    }
    let html = tokio::fs::read_to_string(body).await.into_diagnostic()?;
    // Round-trip through the editor so stored content is always sanitized.
    let mut editor = RichTextEditor::new((), ()).with_settings(config.editor.clone());
    editor.seed(&html);
    let content = editor.to_html();

    let mut posts = client.fetch_posts().await?;
    let post = match id {
        Some(id) => posts
            .get(id)
            .ok_or_else(|| miette::miette!("No post with id {id}"))?
            .revise(kind, title, content),
        None => Post::create(kind, title, content),
    };
    let post_id = post.id;
    posts.upsert(post);
    client.save_posts(posts.as_slice()).await?;

    println!("✓ Saved post {post_id}");
    Ok(())
}

fn remove_post(posts: &mut PostCollection, id: PostId) -> Result<Post> {
    posts
        .remove(id)
        .ok_or_else(|| miette::miette!("No post with id {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from([
            "folio", "publish", "--type", "program", "--title", "Hi", "--body", "b.html", "--id",
            "42",
        ])
        .unwrap();
        match cli.command {
            Commands::Publish { kind, id, .. } => {
                assert_eq!(kind, PostKind::Program);
                assert_eq!(id, Some(42));
            }
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_parse_delete_and_banner() {
        let cli = Cli::try_parse_from(["folio", "delete", "--id", "42"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { id: 42 }));
        assert!(Cli::try_parse_from(["folio", "delete"]).is_err());

        let cli = Cli::try_parse_from(["folio", "banner", "b.png"]).unwrap();
        match cli.command {
            Commands::Banner { file } => assert_eq!(file, PathBuf::from("b.png")),
            _ => panic!("expected banner"),
        }
    }

    #[test]
    fn test_remove_post() {
        let keep = Post {
            id: PostId(1),
            ..Post::create(PostKind::Work, "keep", "<p>a</p>")
        };
        let gone = Post {
            id: PostId(2),
            ..Post::create(PostKind::Program, "gone", "<p>b</p>")
        };
        let mut posts = PostCollection::new(vec![keep.clone(), gone]);

        let removed = remove_post(&mut posts, PostId(2)).unwrap();
        assert_eq!(removed.title, "gone");
        assert_eq!(posts.as_slice(), [keep]);

        let err = remove_post(&mut posts, PostId(2)).unwrap_err();
        assert_eq!(err.to_string(), "No post with id 2");
        assert_eq!(posts.as_slice().len(), 1);
    }

    #[test]
    fn test_rejects_unknown_post_type() {
        assert!(Cli::try_parse_from(["folio", "feed", "--type", "essay"]).is_err());
    }
}
