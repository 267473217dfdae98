use std::path::PathBuf;

use ansi_term::Colour;
use anyhow::{bail, Result};
use clap::Subcommand;

use crate::{
    docs::entities::{Document, DocumentFields, DocumentId},
    services::Services,
};

#[derive(Subcommand, Debug)]
pub enum DocsCommand {
    #[command(about = "List documents")]
    List {
        #[arg(long, help = "Only documents carrying this tag")]
        tag: Option<String>,
    },
    #[command(about = "Print a document")]
    Show { id: String },
    #[command(about = "Create a document")]
    New {
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
        #[arg(long = "tag", help = "Tag to attach. Can be repeated")]
        tags: Vec<String>,
    },
    #[command(about = "Change a document. Omitted fields are kept")]
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
        #[arg(long = "tag", help = "Replaces all tags. Can be repeated")]
        tags: Vec<String>,
        #[arg(long, conflicts_with = "tags", help = "Remove every tag")]
        clear_tags: bool,
    },
    #[command(about = "Delete a document")]
    Rm { id: String },
}

#[derive(Debug, clap::Args)]
pub struct ContentArgs {
    #[arg(long, conflicts_with = "content_file")]
    content: Option<String>,
    #[arg(long = "content-file", help = "Read the content from a file")]
    content_file: Option<PathBuf>,
}

impl ContentArgs {
    async fn read(self) -> Result<Option<String>> {
        match (self.content, self.content_file) {
            (Some(content), _) => Ok(Some(content)),
            (None, Some(path)) => Ok(Some(tokio::fs::read_to_string(path).await?)),
            (None, None) => Ok(None),
        }
    }
}

pub async fn process_docs_command(command: DocsCommand, services: &mut Services) -> Result<()> {
    let documents = &mut services.documents;
    match command {
        DocsCommand::List { tag } => {
            let mut listed = match &tag {
                Some(tag) => documents.find_by_tag(tag).collect::<Vec<_>>(),
                None => documents.all().iter().collect(),
            };
            listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            for document in listed {
                println!(
                    "{}\t{}\t{}\t{}",
                    document.id,
                    document.updated_at.format("%Y-%m-%d %H:%M"),
                    Colour::Cyan.paint(document.title.as_str()),
                    document.tags.join(", ")
                );
            }
        }
        DocsCommand::Show { id } => {
            documents.select(Some(DocumentId::from(id.as_str())));
            let Some(document) = documents.selected() else {
                bail!("No document with id {id}");
            };
            print_document(document);
        }
        DocsCommand::New {
            title,
            content,
            tags,
        } => {
            let fields = DocumentFields {
                title,
                content: content.read().await?,
                tags: Some(tags),
            };
            let id = documents.create(fields).await;
            println!("{}", id);
        }
        DocsCommand::Edit {
            id,
            title,
            content,
            tags,
            clear_tags,
        } => {
            let tags = if clear_tags {
                Some(Vec::new())
            } else if tags.is_empty() {
                None
            } else {
                Some(tags)
            };
            let fields = DocumentFields {
                title,
                content: content.read().await?,
                tags,
            };
            if !documents.update(&DocumentId::from(id.as_str()), fields).await {
                bail!("No document with id {id}");
            }
            println!("{}", Colour::Green.paint("Updated"));
        }
        DocsCommand::Rm { id } => {
            if !documents.delete(&DocumentId::from(id.as_str())).await {
                bail!("No document with id {id}");
            }
            println!("{}", Colour::Green.paint("Deleted"));
        }
    }
    Ok(())
}

fn print_document(document: &Document) {
    println!("{}", Colour::Cyan.bold().paint(document.title.as_str()));
    println!(
        "id {}  created {}  updated {}",
        document.id,
        document.created_at.format("%Y-%m-%d %H:%M"),
        document.updated_at.format("%Y-%m-%d %H:%M")
    );
    if !document.tags.is_empty() {
        println!("tags {}", document.tags.join(", "));
    }
    println!();
    println!("{}", document.content);
}
