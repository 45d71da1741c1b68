use anyhow::{bail, Result};
use clap::Args;
use pathscope_core::SessionEvent;
use pathscope_protocol::kinds;
use serde_json::json;

use super::util::{effective_config, print_json, runtime, session, settle, GlobalArgs};

#[derive(Args, Clone)]
pub struct ExploreArgs {
    /// Account id; omit to list accounts
    pub account: Option<String>,
    /// Node kind to list within the account
    #[arg(long, default_value = kinds::AWS_ROLE)]
    pub kind: String,
    /// Also open these node ids as tabs
    #[arg(long = "open")]
    pub open: Vec<i64>,
}

pub fn run(global: &GlobalArgs, args: &ExploreArgs) -> Result<()> {
    if !kinds::EXPLORABLE.contains(&args.kind.as_str()) {
        bail!(
            "kind {} is not explorable (expected one of: {})",
            args.kind,
            kinds::EXPLORABLE.join(", ")
        );
    }
    let config = effective_config(global)?;
    let rt = runtime()?;
    rt.block_on(async {
        let mut session = session(&config)?;
        match args.account.as_deref() {
            Some(account) => {
                session.explore(account, &args.kind);
            }
            None => {
                session.load_accounts();
            }
        }
        for id in &args.open {
            session.open_in_tab(*id);
        }
        let mut missing = Vec::new();
        for event in settle(&mut session).await? {
            if let SessionEvent::NotFound { what, .. } = event {
                missing.push(what);
            }
        }
        let explorer = session.explorer();
        let listing = args
            .account
            .as_deref()
            .and_then(|account| {
                explorer.listing(&pathscope_core::explorer::folder_key(account, &args.kind))
            })
            .unwrap_or_default();
        print_json(
            &json!({
                "accounts": explorer.accounts(),
                "listing": listing,
                "tabs": session.tabs().iter().collect::<Vec<_>>(),
                "missing": missing,
            }),
            global.pretty,
        )
    })
}
