use std::sync::Arc;

use ansi_term::Colour;
use anyhow::{anyhow, bail, Result};
use clap::Subcommand;
use tracing::error;

use crate::{
    docs::entities::DocumentId,
    github::{
        client::{EntryKind, GitHubClient},
        mirror::{list_remote, push_document, remove_document},
        settings::{GitHubSettings, DEFAULT_BRANCH, DEFAULT_DOCS_FOLDER},
    },
    services::Services,
};

#[derive(Subcommand, Debug)]
pub enum GithubCommand {
    #[command(about = "Store the repository and credentials used for mirroring")]
    Configure {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        #[arg(long, env = "DEVDOCS_GITHUB_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(long, default_value = DEFAULT_BRANCH)]
        branch: String,
        #[arg(long = "docs-folder", default_value = DEFAULT_DOCS_FOLDER)]
        docs_folder: String,
    },
    #[command(about = "Show the current settings")]
    Status,
    #[command(about = "Forget the stored settings")]
    Clear,
    #[command(about = "Check that the repository can be reached")]
    Test,
    #[command(about = "List a directory of the repository")]
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    #[command(about = "List the mirrored documents")]
    Remote,
    #[command(about = "Upload one document, or every document when no id is given")]
    Push { id: Option<String> },
    #[command(about = "Delete the mirrored copy of a document")]
    Unpublish { id: String },
}

pub async fn process_github_command(command: GithubCommand, services: &mut Services) -> Result<()> {
    match command {
        GithubCommand::Configure {
            owner,
            repo,
            token,
            branch,
            docs_folder,
        } => {
            services
                .settings
                .save(GitHubSettings {
                    owner,
                    repo,
                    token,
                    branch,
                    docs_folder,
                })
                .await;
            println!("{}", Colour::Green.paint("Settings saved"));
        }
        GithubCommand::Status => {
            let settings = services.settings.settings();
            println!("owner\t{}", settings.owner);
            println!("repo\t{}", settings.repo);
            println!("branch\t{}", settings.branch);
            println!("folder\t{}", settings.docs_folder);
            println!(
                "token\t{}",
                if settings.token.is_empty() { "missing" } else { "set" }
            );
            println!("configured\t{}", services.settings.is_configured());
        }
        GithubCommand::Clear => {
            services.settings.clear().await;
            println!("{}", Colour::Green.paint("Settings cleared"));
        }
        GithubCommand::Test => {
            let report = services.settings.test_connection().await;
            if !report.success {
                bail!(report.message);
            }
            println!("{}", Colour::Green.paint(report.message));
        }
        GithubCommand::Ls { path } => {
            let client = configured_client(services)?;
            for entry in client.list_files(&path).await? {
                let kind = match entry.kind {
                    EntryKind::File => "file",
                    EntryKind::Dir => "dir",
                    EntryKind::Other => "other",
                };
                println!("{kind}\t{}", entry.path);
            }
        }
        GithubCommand::Remote => {
            let client = configured_client(services)?;
            for entry in list_remote(&client, services.settings.settings()).await? {
                println!("{}", entry.path);
            }
        }
        GithubCommand::Push { id } => {
            let client = configured_client(services)?;
            let settings = services.settings.settings();
            let documents = match id {
                Some(id) => {
                    let id = DocumentId::from(id.as_str());
                    let document = services
                        .documents
                        .get(&id)
                        .ok_or_else(|| anyhow!("No document with id {id}"))?;
                    vec![document]
                }
                None => services.documents.all().iter().collect(),
            };

            let mut failed = 0;
            for document in documents {
                match push_document(&client, settings, document).await {
                    Ok(commit) => println!("{}\t{commit}", document.id),
                    Err(e) => {
                        error!("Failed to push {} {e:?}", document.id);
                        eprintln!("{}\t{}", document.id, Colour::Red.paint(e.to_string()));
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} documents could not be pushed");
            }
        }
        GithubCommand::Unpublish { id } => {
            let client = configured_client(services)?;
            let commit = remove_document(
                &client,
                services.settings.settings(),
                &DocumentId::from(id.as_str()),
            )
            .await?;
            println!("{commit}");
        }
    }
    Ok(())
}

fn configured_client(services: &mut Services) -> Result<Arc<GitHubClient>> {
    services
        .settings
        .client()
        .ok_or_else(|| anyhow!("GitHub is not configured, run `devdocs github configure` first"))
}
