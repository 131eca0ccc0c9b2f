use clap::Parser;

use super::*;

#[test]
fn no_command_defaults_to_none() {
    let cli = Cli::try_parse_from(["forumwatch"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert!(!cli.dry_run);
}

#[test]
fn dry_run_is_global() {
    let cli = Cli::try_parse_from(["forumwatch", "once", "--dry-run"]).unwrap();
    assert!(cli.dry_run);
    assert!(matches!(cli.command, Some(Commands::Once)));
}

#[test]
fn scan_defaults_to_seven_days() {
    let cli = Cli::try_parse_from(["forumwatch", "scan"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Scan {
            days: 7,
            keyword: None,
            group: None
        })
    ));
}

#[test]
fn scan_backfill_takes_keyword_and_group() {
    let cli = Cli::try_parse_from([
        "forumwatch",
        "scan",
        "--days",
        "30",
        "--keyword",
        "grant",
        "--group",
        "funding",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Scan {
            days,
            keyword,
            group,
        }) => {
            assert_eq!(days, 30);
            assert_eq!(keyword.as_deref(), Some("grant"));
            assert_eq!(group.as_deref(), Some("funding"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn scan_keyword_without_group_is_rejected() {
    assert!(Cli::try_parse_from(["forumwatch", "scan", "--keyword", "grant"]).is_err());
}

#[test]
fn keywords_add_defaults_actor() {
    let cli = Cli::try_parse_from(["forumwatch", "keywords", "add", "funding", "grant"]).unwrap();
    match cli.command {
        Some(Commands::Keywords {
            command: KeywordCommands::Add { group, pattern, by },
        }) => {
            assert_eq!(group, "funding");
            assert_eq!(pattern, "grant");
            assert_eq!(by, "cli");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn keywords_remove_takes_numeric_id() {
    let cli = Cli::try_parse_from(["forumwatch", "keywords", "remove", "12"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Keywords {
            command: KeywordCommands::Remove { id: 12 }
        })
    ));
    assert!(Cli::try_parse_from(["forumwatch", "keywords", "remove", "twelve"]).is_err());
}

#[test]
fn sources_add_defaults_to_discourse() {
    let cli = Cli::try_parse_from([
        "forumwatch",
        "sources",
        "add",
        "aave",
        "https://governance.aave.com",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Sources {
            command: SourceCommands::Add { name, kind, .. },
        }) => {
            assert_eq!(name, "aave");
            assert_eq!(kind, "discourse");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn only_polling_commands_deliver() {
    assert!(Commands::Run.delivers());
    assert!(Commands::Test.delivers());
    assert!(!Commands::Stats.delivers());
    assert!(!Commands::Keywords {
        command: KeywordCommands::List
    }
    .delivers());
}
