//! Keyword and source administration handlers for the CLI.

use clap::Subcommand;

use forumwatch_core::ItemOwner;
use forumwatch_monitor::Monitor;

const DEFAULT_ACTOR: &str = "cli";

/// Sub-commands available under `keywords`.
#[derive(Debug, Subcommand)]
pub enum KeywordCommands {
    /// List built-in and user keywords
    List,
    /// Add a user keyword
    Add {
        group: String,
        pattern: String,
        #[arg(long, default_value = DEFAULT_ACTOR)]
        by: String,
    },
    /// Delete a user keyword by id
    Remove { id: i64 },
    /// Disable a built-in keyword
    Disable {
        group: String,
        pattern: String,
        #[arg(long, default_value = DEFAULT_ACTOR)]
        by: String,
    },
    /// Re-enable a disabled built-in keyword
    Enable { group: String, pattern: String },
}

/// Sub-commands available under `sources`.
#[derive(Debug, Subcommand)]
pub enum SourceCommands {
    /// List built-in and user sources
    List,
    /// Add a user source
    Add {
        name: String,
        url: String,
        #[arg(long, default_value = "discourse")]
        kind: String,
        #[arg(long, default_value = DEFAULT_ACTOR)]
        by: String,
    },
    /// Delete a user source by id
    Remove { id: i64 },
    /// Disable a built-in source
    Disable {
        name: String,
        #[arg(long, default_value = DEFAULT_ACTOR)]
        by: String,
    },
    /// Re-enable a disabled built-in source
    Enable { name: String },
}

fn owner_label(owner: &ItemOwner) -> String {
    match owner {
        ItemOwner::BuiltIn(_) => "built-in".to_string(),
        ItemOwner::UserOwned(id) => format!("user:{id}"),
    }
}

fn state_label(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "disabled"
    }
}

/// # Errors
///
/// Returns an error if validation or the ledger fails.
pub(crate) async fn run_keywords(monitor: &Monitor, command: KeywordCommands) -> anyhow::Result<()> {
    match command {
        KeywordCommands::List => {
            let keywords = monitor.list_keywords().await?;
            if keywords.is_empty() {
                println!("no keywords configured");
                return Ok(());
            }
            println!("{:<12}{:<10}{:<20}PATTERN", "OWNER", "STATE", "GROUP");
            for k in &keywords {
                println!(
                    "{:<12}{:<10}{:<20}{}",
                    owner_label(&k.owner),
                    state_label(k.active),
                    k.group,
                    k.pattern
                );
            }
        }
        KeywordCommands::Add { group, pattern, by } => {
            let id = monitor.add_keyword(&group, &pattern, &by).await?;
            println!("added keyword {id}: {group} / {pattern}");
        }
        KeywordCommands::Remove { id } => {
            if monitor.remove_keyword(id).await? {
                println!("removed keyword {id}");
            } else {
                anyhow::bail!("no user keyword with id {id}");
            }
        }
        KeywordCommands::Disable { group, pattern, by } => {
            monitor.disable_keyword(&group, &pattern, &by).await?;
            println!("disabled keyword {group} / {pattern}");
        }
        KeywordCommands::Enable { group, pattern } => {
            if monitor.enable_keyword(&group, &pattern).await? {
                println!("enabled keyword {group} / {pattern}");
            } else {
                println!("keyword {group} / {pattern} was not disabled");
            }
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if validation or the ledger fails.
pub(crate) async fn run_sources(monitor: &Monitor, command: SourceCommands) -> anyhow::Result<()> {
    match command {
        SourceCommands::List => {
            let sources = monitor.list_sources().await?;
            if sources.is_empty() {
                println!("no sources configured");
                return Ok(());
            }
            println!("{:<12}{:<10}{:<20}{:<12}URL", "OWNER", "STATE", "NAME", "KIND");
            for s in &sources {
                println!(
                    "{:<12}{:<10}{:<20}{:<12}{}",
                    owner_label(&s.owner),
                    state_label(s.active),
                    s.name,
                    s.kind,
                    s.url
                );
            }
        }
        SourceCommands::Add {
            name,
            url,
            kind,
            by,
        } => {
            let id = monitor.add_source(&name, &url, &kind, &by).await?;
            println!("added source {id}: {name} ({url})");
        }
        SourceCommands::Remove { id } => {
            if monitor.remove_source(id).await? {
                println!("removed source {id}");
            } else {
                anyhow::bail!("no user source with id {id}");
            }
        }
        SourceCommands::Disable { name, by } => {
            monitor.disable_source(&name, &by).await?;
            println!("disabled source {name}");
        }
        SourceCommands::Enable { name } => {
            if monitor.enable_source(&name).await? {
                println!("enabled source {name}");
            } else {
                println!("source {name} was not disabled");
            }
        }
    }
    Ok(())
}
