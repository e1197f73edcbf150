//! Command dispatch

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::services::{DeletionReport, RegroupReport};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{
    ListKind, NewNode, Node, NodeUpdate, NormalizationService, Scope, TaxonomyKind,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, SelectionItem};

/// Parse-independent entry point: load settings, build services, run.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".into()));
    };

    match command {
        Commands::Completion { shell } => {
            print_completions(*shell);
            return Ok(());
        }
        Commands::Config { command } => return config_command(cli, command),
        _ => {}
    }

    let settings = load_settings(cli)?;
    if let Commands::Normalize { name } = command {
        let names = NormalizationService::new(settings.scope.abbreviation.clone().unwrap_or_default());
        output::info(&names.normalize(name));
        return Ok(());
    }

    let container = ServiceContainer::new(settings)?;
    execute_with(&container, cli.kind, command)
}

/// Run a command against an already wired container.
#[instrument(level = "debug", skip(container))]
pub fn execute_with(
    container: &ServiceContainer,
    kind: TaxonomyKind,
    command: &Commands,
) -> CliResult<()> {
    let scope = scope(&container.settings)?;
    let store = container.store(kind);

    match command {
        Commands::List { parents, leafs } => {
            let list_kind = match (parents, leafs) {
                (true, _) => ListKind::ParentsOnly,
                (_, true) => ListKind::LeafsOnly,
                _ => ListKind::All,
            };
            let nodes = store.list(&scope, list_kind)?;
            output::header(&format!("{} in {} ({})", kind.resource(), scope, nodes.len()));
            for n in &nodes {
                output::node(&n.id, n.is_group, n.is_default, &n.display_name);
            }
        }

        Commands::Tree => {
            let tree = store.tree(&scope)?;
            let counts = store.counts(&scope)?;
            for orphan in tree.orphans() {
                output::warning(&format!("{orphan} references a missing parent"));
            }
            let show_counts = kind.member_source().is_some();
            for root in tree.render(|n| label(n, show_counts.then(|| counts.total(&n.id)))) {
                output::info(&root);
            }
        }

        Commands::Counts => {
            let nodes = store.list(&scope, ListKind::All)?;
            let counts = store.counts_for(&scope, &nodes)?;
            output::header(&format!("{:<36} {:>7} {:>7}  name", "id", "direct", "total"));
            for n in &nodes {
                output::info(&format!(
                    "{:<36} {:>7} {:>7}  {}",
                    n.id,
                    counts.direct(&n.id),
                    counts.total(&n.id),
                    n.display_name
                ));
            }
            if counts.unmatched() > 0 {
                output::warning(&format!("{} member(s) match no node", counts.unmatched()));
            }
        }

        Commands::Create {
            name,
            parent,
            group,
            leaf,
        } => {
            let mut new = NewNode::new(name.as_str());
            if let Some(parent) = parent {
                new = new.under(parent.as_str());
            }
            if *group || *leaf {
                new = new.group(*group);
            }
            let node = store.create(&scope, &new)?;
            output::success(&format!("Created {} ({})", node.display_name, node.id));
        }

        Commands::Rename { id, name } => {
            let node = store.update(&scope, id, &NodeUpdate::rename(name.as_str()))?;
            output::success(&format!("Renamed {} to {}", node.id, node.display_name));
        }

        Commands::Move { id, parent, root } => {
            let destination = if *root { None } else { parent.clone() };
            let node = store.update(&scope, id, &NodeUpdate::reparent(destination))?;
            match &node.parent_id {
                Some(parent_id) => output::success(&format!("Moved {} under {}", node.id, parent_id)),
                None => output::success(&format!("Moved {} to the root", node.id)),
            }
        }

        Commands::Regroup {
            groups,
            subgroups,
            target,
        } => {
            let mut session = container.session(kind, scope.clone());
            for id in groups {
                session.select_group(id, true);
            }
            for id in subgroups {
                session.select_subgroup(id, true);
            }
            let target = match target {
                Some(target) => target.clone(),
                None => pick_target(container, kind, &scope, &session.selection().ids())?,
            };
            let report = session.regroup_selection(&target)?;
            print_regroup(&report)?;
        }

        Commands::Delete { ids, cascade } => {
            let deletion = container
                .deletion(kind)
                .with_cascade(*cascade || container.settings.delete.cascade);
            if let [id] = ids.as_slice() {
                deletion.delete_one(&scope, id)?;
                output::success(&format!("Deleted {id}"));
            } else {
                let report = deletion.delete_many(&scope, ids)?;
                print_deletion(&report)?;
            }
        }

        Commands::Default { id } => match container.defaults(kind).toggle_default(&scope, id)? {
            Some(default) => output::success(&format!("Default for {scope}: {default}")),
            None => output::success(&format!("{scope} has no default")),
        },

        Commands::Normalize { .. } | Commands::Config { .. } | Commands::Completion { .. } => {
            return Err(CliError::Usage(
                "command does not need the remote store".into(),
            ))
        }
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let project_dir: Option<PathBuf> = cli
        .project_dir
        .clone()
        .or_else(|| std::env::current_dir().ok());
    let mut settings = Settings::load(project_dir.as_deref())?;

    if let Some(company) = &cli.company {
        settings.scope.company = Some(company.clone());
    }
    if let Some(abbr) = &cli.abbr {
        settings.scope.abbreviation = Some(abbr.clone());
    }
    if let Some(base_url) = &cli.base_url {
        settings.remote.base_url = base_url.clone();
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn scope(settings: &Settings) -> CliResult<Scope> {
    settings.scope().ok_or_else(|| {
        CliError::InvalidArgs("no company scope: pass --company or set [scope] company".into())
    })
}

fn label(node: &Node, total: Option<usize>) -> String {
    let mut label = node.display_name.clone();
    if let Some(total) = total {
        label.push_str(&format!(" ({total})"));
    }
    if node.is_default {
        label.push_str(" *");
    }
    label
}

fn pick_target(
    container: &ServiceContainer,
    kind: TaxonomyKind,
    scope: &Scope,
    selected: &[String],
) -> CliResult<String> {
    let items: Vec<SelectionItem> = container
        .regroup(kind)
        .candidate_targets(scope, selected)?
        .into_iter()
        .map(|g| SelectionItem {
            display: format!("{} ({})", g.display_name, g.id),
            value: g.id,
        })
        .collect();
    if items.is_empty() {
        return Err(CliError::Usage("no group can take the selection".into()));
    }

    let picked = container
        .selector
        .select_one(&items, "target> ")
        .map_err(|message| InfraError::Selector { message })?;
    picked
        .map(|item| item.value)
        .ok_or_else(|| CliError::Usage("no target selected".into()))
}

fn print_regroup(report: &RegroupReport) -> CliResult<()> {
    output::success(&format!("Moved {} node(s)", report.moved_count));
    if report.is_complete() {
        return Ok(());
    }
    for failure in &report.failures {
        output::failure(&format!("{}: {}", failure.id, failure.error));
    }
    Err(CliError::PartialFailure(format!(
        "{} of {} node(s) could not be moved",
        report.failures.len(),
        report.moved_count + report.failures.len()
    )))
}

fn print_deletion(report: &DeletionReport) -> CliResult<()> {
    output::success(&format!("Deleted {} node(s)", report.deleted_count));
    if report.is_complete() {
        return Ok(());
    }
    for outcome in report.failures() {
        output::failure(&format!(
            "{}: {}",
            outcome.id,
            outcome.error.as_deref().unwrap_or("failed")
        ));
    }
    Err(CliError::PartialFailure(format!(
        "{} of {} node(s) could not be deleted",
        report.results.len() - report.deleted_count,
        report.results.len()
    )))
}

fn config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let project_dir = cli
                .project_dir
                .clone()
                .or_else(|| std::env::current_dir().ok());
            output::header("Config files (lowest to highest precedence)");
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {} {}", path.display(), exists(&path))),
                None => output::detail("global: (no config directory)"),
            }
            if let Some(dir) = project_dir {
                let path = local_config_path(&dir);
                output::detail(&format!("local:  {} {}", path.display(), exists(&path)));
            }
            output::detail("env:    TAXONOMY_<SECTION>__<KEY>");
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

fn exists(path: &std::path::Path) -> &'static str {
    if path.exists() {
        "(found)"
    } else {
        "(missing)"
    }
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
