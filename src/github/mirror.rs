use tracing::info;

use crate::docs::entities::{Document, DocumentId};

use super::{
    client::{EntryKind, GitHubClient, RemoteEntry, RemoteFile},
    error::GitHubError,
    settings::GitHubSettings,
};

const DOCUMENT_EXTENSION: &str = ".md";

/// Repository path of a mirrored document: `{docs_folder}/{id}.md`.
pub fn remote_path(settings: &GitHubSettings, id: &DocumentId) -> String {
    let folder = settings.docs_folder.trim_matches('/');
    if folder.is_empty() {
        format!("{id}{DOCUMENT_EXTENSION}")
    } else {
        format!("{folder}/{id}{DOCUMENT_EXTENSION}")
    }
}

/// Markdown with a front matter block. Values are JSON literals, which YAML readers accept too.
pub fn render_document(document: &Document) -> String {
    let string = |v: &str| serde_json::Value::from(v).to_string();
    let tags = serde_json::Value::from(document.tags.clone()).to_string();
    format!(
        "---\nid: {}\ntitle: {}\ntags: {}\ncreatedAt: {}\nupdatedAt: {}\n---\n\n{}\n",
        string(document.id.as_str()),
        string(&document.title),
        tags,
        string(&document.created_at.to_rfc3339()),
        string(&document.updated_at.to_rfc3339()),
        document.content.trim_end(),
    )
}

/// Creates or overwrites the mirrored copy of `document`. Returns the commit sha.
pub async fn push_document(
    client: &GitHubClient,
    settings: &GitHubSettings,
    document: &Document,
) -> Result<String, GitHubError> {
    let path = remote_path(settings, &document.id);
    let commit = client
        .save_file(
            RemoteFile {
                path: path.clone(),
                content: render_document(document),
                sha: None,
            },
            &format!("Update {}", document.title),
        )
        .await?;
    info!("Pushed document {} to {path} in {commit}", document.id);
    Ok(commit)
}

/// Deletes the mirrored copy of a document. Returns the commit sha.
pub async fn remove_document(
    client: &GitHubClient,
    settings: &GitHubSettings,
    id: &DocumentId,
) -> Result<String, GitHubError> {
    let path = remote_path(settings, id);
    let commit = client.delete_file(&path, &format!("Delete {id}")).await?;
    info!("Removed document {id} from {path} in {commit}");
    Ok(commit)
}

/// Mirrored documents in the docs folder. A folder that doesn't exist yet holds nothing.
pub async fn list_remote(
    client: &GitHubClient,
    settings: &GitHubSettings,
) -> Result<Vec<RemoteEntry>, GitHubError> {
    match client.list_files(&settings.docs_folder).await {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter(|v| v.kind == EntryKind::File && v.name.ends_with(DOCUMENT_EXTENSION))
            .collect()),
        Err(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
