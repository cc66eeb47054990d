//! Command handlers.

use std::io::Write;
use std::sync::Arc;

use quire_core::collection::Collection;
use quire_core::session::NoticeKind;
use quire_core::view::{SortField, sort_entries};
use quire_core::{EditorSession, Engine, Entry};
use tracing::{info, warn};

use super::{CliError, CliResult, Command};

pub async fn dispatch(engine: Arc<Engine>, command: Command, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Command::List {
            collection,
            sort,
            desc,
            json,
        } => list(&engine, &collection, sort, desc, json, out).await,
        Command::Show { collection, slug, raw } => show(&engine, &collection, &slug, raw, out).await,
        Command::Search { term, collections } => search(&engine, &term, &collections, out).await,
        Command::Query {
            collection,
            term,
            fields,
            file,
            limit,
        } => {
            let result = engine
                .query(&collection, &fields, &term, file.as_deref(), limit)
                .await?;
            let c = engine.collection(&collection)?;
            print_entries(c, &result.hits, out)
        }
        Command::New { collection, values } => create(engine, &collection, &values, out).await,
        Command::Delete { collection, slug } => {
            let c = engine.collection(&collection)?;
            engine.delete_entry(c, &slug).await?;
            engine.delete_local_backup(c, &slug).await.unwrap_or_else(|e| {
                warn!(%collection, %slug, error = %e, "could not delete local backup");
            });
            writeln!(out, "deleted {collection}/{slug}")?;
            Ok(())
        }
        Command::Media { folder } => {
            for file in engine.get_media(folder.as_deref()).await? {
                writeln!(out, "{}\t{}", file.path, file.size.map(|s| s.to_string()).unwrap_or_default())?;
            }
            Ok(())
        }
        Command::Unpublished => {
            let mut session = EditorSession::new(engine.clone());
            session.load_unpublished().await?;
            for status in quire_core::workflow::WorkflowStatus::ALL {
                for entry in session.workflow().by_status(status) {
                    writeln!(out, "{status}\t{}/{}", entry.collection, entry.slug)?;
                }
            }
            Ok(())
        }
        Command::Publish { collection, slug } => {
            let mut session = EditorSession::new(engine.clone());
            session.load_unpublished().await?;
            let result = session.publish(&collection, &slug).await;
            report_notices(&mut session);
            result?;
            writeln!(out, "published {collection}/{slug}")?;
            Ok(())
        }
    }
}

fn print_entries(collection: &Collection, entries: &[Entry], out: &mut dyn Write) -> CliResult<()> {
    for entry in entries {
        writeln!(out, "{}\t{}", entry.slug, collection.entry_title(entry))?;
    }
    Ok(())
}

async fn list(
    engine: &Engine,
    collection: &str,
    sort: Option<String>,
    desc: bool,
    json: bool,
    out: &mut dyn Write,
) -> CliResult<()> {
    let c = engine.collection(collection)?;
    let mut entries = engine.list_all_entries(c).await?;
    if let Some(key) = sort {
        let field = if desc { SortField::desc(key) } else { SortField::asc(key) };
        sort_entries(&mut entries, &[field]);
    }
    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }
    print_entries(c, &entries, out)
}

async fn show(engine: &Engine, collection: &str, slug: &str, raw: bool, out: &mut dyn Write) -> CliResult<()> {
    let c = engine.collection(collection)?;
    let entry = engine.get_entry(c, slug).await?;
    if raw {
        write!(out, "{}", engine.entry_to_raw(c, &entry)?)?;
    } else {
        serde_json::to_writer_pretty(&mut *out, &entry)?;
        writeln!(out)?;
    }
    Ok(())
}

async fn search(engine: &Engine, term: &str, collections: &[String], out: &mut dyn Write) -> CliResult<()> {
    let names: Vec<&str> = if collections.is_empty() {
        engine.config().collections.iter().map(|c| c.name.as_str()).collect()
    } else {
        collections.iter().map(String::as_str).collect()
    };
    for entry in engine.search(&names, term).await? {
        let c = engine.collection(&entry.collection)?;
        writeln!(out, "{}/{}\t{}", entry.collection, entry.slug, c.entry_title(&entry))?;
    }
    Ok(())
}

/// Turn `key=value` pairs into the query string new drafts accept.
fn values_query(values: &[String]) -> CliResult<String> {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for assignment in values {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| CliError::Usage(format!("expected KEY=VALUE, got '{assignment}'")))?;
        query.append_pair(key.trim(), value);
    }
    Ok(query.finish())
}

async fn create(engine: Arc<Engine>, collection: &str, values: &[String], out: &mut dyn Write) -> CliResult<()> {
    let query = values_query(values)?;
    let mut session = EditorSession::new(engine);
    session.load_entries(collection).await?;
    session.create_empty(collection, &query).await?;
    let result = session.persist().await;
    report_notices(&mut session);
    let slug = result?;
    info!(collection, %slug, "entry created");
    writeln!(out, "{slug}")?;
    Ok(())
}

fn report_notices(session: &mut EditorSession) {
    for notice in session.take_notices() {
        match notice.kind {
            NoticeKind::Success => info!("{}", notice.message),
            NoticeKind::Warning | NoticeKind::Error => warn!("{}", notice.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, run};
    use clap::Parser;

    // ── arguments ──

    #[test]
    fn assignments_become_a_query_string() {
        let query = values_query(&["title=Hello world".into(), "draft=true".into()]).unwrap();
        assert_eq!(query, "title=Hello+world&draft=true");
        assert!(matches!(values_query(&["oops".into()]), Err(CliError::Usage(_))));
    }

    #[test]
    fn parses_global_options_after_the_command() {
        let cli = Cli::try_parse_from(["quire", "list", "posts", "--sort", "date", "--desc", "--config", "site.yml"])
            .unwrap();
        assert_eq!(cli.config, std::path::PathBuf::from("site.yml"));
        assert!(matches!(cli.command, Command::List { desc: true, .. }));
        assert!(Cli::try_parse_from(["quire", "list", "posts", "--desc"]).is_err());
    }

    // ── local repository ──

    fn site(dir: &std::path::Path) {
        std::fs::write(
            dir.join("config.yml"),
            "backend:\n  name: local\nmedia_folder: static/media\ncollections:\n  - name: posts\n    label_singular: Post\n    folder: content/posts\n    extension: md\n    format: frontmatter\n    create: true\n    fields:\n      - { name: title }\n      - { name: body, widget: markdown, required: false }\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.join("content/posts")).unwrap();
        std::fs::write(dir.join("content/posts/first.md"), "---\ntitle: First\n---\nHello\n").unwrap();
    }

    async fn run_in(dir: &std::path::Path, command: Command) -> String {
        let cli = Cli {
            config: dir.join("config.yml"),
            root: None,
            backups: Some(dir.join("backups")),
            command,
        };
        let mut out = Vec::new();
        run(cli, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn lists_creates_and_deletes_entries() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());

        let list = || Command::List {
            collection: "posts".into(),
            sort: None,
            desc: false,
            json: false,
        };
        assert_eq!(run_in(dir.path(), list()).await, "first\tFirst\n");

        let created = run_in(
            dir.path(),
            Command::New {
                collection: "posts".into(),
                values: vec!["title=Second post".into()],
            },
        )
        .await;
        assert_eq!(created, "second-post\n");
        assert!(dir.path().join("content/posts/second-post.md").exists());

        let deleted = run_in(
            dir.path(),
            Command::Delete {
                collection: "posts".into(),
                slug: "first".into(),
            },
        )
        .await;
        assert_eq!(deleted, "deleted posts/first\n");
        assert!(!dir.path().join("content/posts/first.md").exists());
        assert_eq!(run_in(dir.path(), list()).await, "second-post\tSecond post\n");
    }

    #[tokio::test]
    async fn shows_the_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());
        let shown = run_in(
            dir.path(),
            Command::Show {
                collection: "posts".into(),
                slug: "first".into(),
                raw: false,
            },
        )
        .await;
        let entry: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(entry["slug"], "first");
        assert_eq!(entry["data"]["title"], "First");
    }
}
