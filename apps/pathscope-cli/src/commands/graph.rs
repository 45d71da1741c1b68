use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use pathscope_core::search::matched_term;
use pathscope_core::{GraphSnapshot, MergeReport, PathKind, PathQuery, SessionEvent};
use serde::Serialize;
use serde_json::json;

use super::util::{effective_config, print_json, runtime, session, settle, GlobalArgs};

#[derive(Args, Clone)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,
}

#[derive(Args, Clone)]
pub struct NodeArgs {
    /// Node id
    pub id: i64,
}

#[derive(Args, Clone)]
pub struct EdgeArgs {
    /// Relationship id
    pub id: i64,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ModeArg {
    Identity,
    Permission,
    Shortest,
}

impl From<ModeArg> for PathKind {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Identity => PathKind::Identity,
            ModeArg::Permission => PathKind::Permission,
            ModeArg::Shortest => PathKind::Shortest,
        }
    }
}

#[derive(Args, Clone)]
pub struct PathArgs {
    /// Start node id
    pub start: i64,
    /// End node id
    pub end: i64,
    /// Path kind
    #[arg(long, value_enum, default_value_t = ModeArg::Identity)]
    pub mode: ModeArg,
    /// Narrow permission paths to one action
    #[arg(long)]
    pub action: Option<String>,
}

#[derive(Serialize)]
struct GraphOutput {
    merged: MergeReport,
    graph: GraphSnapshot,
}

fn merged(events: &[SessionEvent]) -> MergeReport {
    let mut total = MergeReport::default();
    for event in events {
        if let SessionEvent::GraphMerged { report, .. } = event {
            total.absorb(*report);
        }
    }
    total
}

pub fn run_search(global: &GlobalArgs, args: &SearchArgs) -> Result<()> {
    let config = effective_config(global)?;
    let rt = runtime()?;
    rt.block_on(async {
        let mut session = session(&config)?;
        let dispatched = session.type_search(&args.query).is_some();
        if dispatched {
            settle(&mut session).await?;
        }
        let suggestions = session.search().suggestions();
        let items: Vec<_> = suggestions
            .items
            .iter()
            .map(|node| {
                json!({
                    "id": node.id,
                    "kinds": node.kinds,
                    "matched": matched_term(node, &args.query),
                })
            })
            .collect();
        print_json(
            &json!({
                "query": args.query,
                "dispatched": dispatched,
                "truncated": suggestions.truncated,
                "suggestions": items,
            }),
            global.pretty,
        )
    })
}

pub fn run_node(global: &GlobalArgs, args: &NodeArgs) -> Result<()> {
    let config = effective_config(global)?;
    let rt = runtime()?;
    rt.block_on(async {
        let mut session = session(&config)?;
        session.click_node(args.id);
        for event in settle(&mut session).await? {
            if let SessionEvent::NotFound { what, .. } = event {
                bail!("{what} not found");
            }
        }
        print_json(&session.snapshot(), global.pretty)
    })
}

pub fn run_edge(global: &GlobalArgs, args: &EdgeArgs) -> Result<()> {
    let config = effective_config(global)?;
    let rt = runtime()?;
    rt.block_on(async {
        let mut session = session(&config)?;
        session.click_edge(args.id);
        let mut filtered = None;
        for event in settle(&mut session).await? {
            match event {
                SessionEvent::NotFound { what, .. } => bail!("{what} not found"),
                SessionEvent::EdgeFiltered { layer, .. } => filtered = Some(layer),
                _ => {}
            }
        }
        print_json(
            &json!({
                "selectable": filtered.is_none(),
                "layer": filtered.flatten(),
                "graph": session.snapshot(),
            }),
            global.pretty,
        )
    })
}

pub fn run_path(global: &GlobalArgs, args: &PathArgs) -> Result<()> {
    let mut query = PathQuery::new(args.mode.into(), args.start, args.end);
    if let Some(action) = args.action.as_deref() {
        query = query.with_action(action);
    }
    merge_and_print(global, move |session| {
        session.load_paths(query);
    })
}

pub fn run_tier_zero(global: &GlobalArgs, account: &str) -> Result<()> {
    merge_and_print(global, |session| {
        session.load_tier_zero(account);
    })
}

pub fn run_action_policies(global: &GlobalArgs, action: &str) -> Result<()> {
    merge_and_print(global, |session| {
        session.load_action_paths(action);
    })
}

fn merge_and_print<F>(global: &GlobalArgs, issue: F) -> Result<()>
where
    F: FnOnce(&mut pathscope_core::Session<pathscope_gateway::HttpGateway>),
{
    let config = effective_config(global)?;
    let rt = runtime()?;
    rt.block_on(async {
        let mut session = session(&config)?;
        issue(&mut session);
        let events = settle(&mut session).await?;
        let output = GraphOutput {
            merged: merged(&events),
            graph: session.snapshot(),
        };
        print_json(&output, global.pretty)
    })
}
