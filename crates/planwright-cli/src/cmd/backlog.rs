use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use planwright_core::{
    backlog::{self, ItemUpdate, ListFilter, NewItem, Priority, Status},
    clock, PhaseId,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum BacklogSubcommand {
    /// Park a new idea in the backlog
    Add {
        title: String,
        /// high | medium | low
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        group: Option<String>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Body text below the title
        #[arg(long)]
        description: Option<String>,
    },
    /// List items, optionally filtered
    List {
        /// open | triaged | promoted | dropped
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Change fields of one item
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        priority: Option<Priority>,
        /// Replace tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        /// Triage details as a JSON object
        #[arg(long)]
        triage: Option<String>,
    },
    /// Promote an item into a phase
    Promote {
        id: String,
        /// Existing phase to promote into; a new phase is added when omitted
        #[arg(long)]
        phase: Option<PhaseId>,
    },
    /// Assign items to a group
    Group {
        /// Group name
        name: String,
        /// Item ids (B001 B002 ...)
        #[arg(required = true)]
        ids: Vec<String>,
        /// Remove the items from any group instead
        #[arg(long)]
        clear: bool,
    },
    /// Regenerate backlog/INDEX.md
    Index,
    /// Counts by status, priority and group
    Stats,
}

pub fn run(root: &Path, subcmd: BacklogSubcommand) -> anyhow::Result<()> {
    let now = clock::now_rfc3339();
    match subcmd {
        BacklogSubcommand::Add {
            title,
            priority,
            group,
            tags,
            description,
        } => {
            let item = backlog::add(
                root,
                NewItem {
                    title,
                    priority,
                    group,
                    tags,
                    description,
                },
                &now,
            )
            .context("failed to add backlog item")?;
            print_json(&item)
        }
        BacklogSubcommand::List {
            status,
            priority,
            group,
            tag,
        } => {
            let filter = ListFilter {
                status,
                priority,
                group,
                tag,
            };
            print_json(&backlog::list(root, &filter).context("failed to read backlog")?)
        }
        BacklogSubcommand::Update {
            id,
            title,
            status,
            priority,
            tags,
            triage,
        } => {
            let triage = match triage {
                Some(raw) => Some(
                    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw)
                        .context("--triage must be a JSON object")?,
                ),
                None => None,
            };
            let changes = ItemUpdate {
                title,
                status,
                priority,
                tags,
                triage,
            };
            let item = backlog::update(root, &id, changes, &now)
                .with_context(|| format!("failed to update {id}"))?;
            print_json(&item)
        }
        BacklogSubcommand::Promote { id, phase } => {
            let promoted = backlog::promote(root, &id, phase, &now)
                .with_context(|| format!("failed to promote {id}"))?;
            print_json(&promoted)
        }
        BacklogSubcommand::Group { name, ids, clear } => {
            let group = (!clear).then_some(name.as_str());
            let items = backlog::group(root, &ids, group, &now).context("failed to group items")?;
            print_json(&serde_json::json!({
                "group": group,
                "count": items.len(),
                "items": items,
            }))
        }
        BacklogSubcommand::Index => {
            let report =
                backlog::index(root, &clock::today()).context("failed to write backlog index")?;
            print_json(&report)
        }
        BacklogSubcommand::Stats => {
            print_json(&backlog::stats(root).context("failed to read backlog")?)
        }
    }
}
