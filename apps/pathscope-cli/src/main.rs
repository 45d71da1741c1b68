use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCmd, EdgeArgs, ExploreArgs, GlobalArgs, NodeArgs, PathArgs, SearchArgs};

#[derive(Parser)]
#[command(
    name = "pathscope-cli",
    version,
    about = "Assemble graph views from the path backend"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search-as-you-type against the backend and print suggestions
    Search(SearchArgs),
    /// Select a node and print the resulting view (JSON)
    Node(NodeArgs),
    /// Select a relationship and print the resulting view (JSON)
    Edge(EdgeArgs),
    /// Merge the paths between two nodes and print the graph (JSON)
    Path(PathArgs),
    /// Merge the tier-zero paths of an account
    TierZero {
        /// Account id
        account: String,
    },
    /// Merge the policy paths granting an action
    ActionPolicies {
        /// Action name, e.g. iam:PassRole
        action: String,
    },
    /// Browse accounts and their nodes by kind
    Explore(ExploreArgs),
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

fn main() {
    pathscope_otel::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Search(args) => commands::graph::run_search(&cli.global, &args),
        Commands::Node(args) => commands::graph::run_node(&cli.global, &args),
        Commands::Edge(args) => commands::graph::run_edge(&cli.global, &args),
        Commands::Path(args) => commands::graph::run_path(&cli.global, &args),
        Commands::TierZero { account } => commands::graph::run_tier_zero(&cli.global, &account),
        Commands::ActionPolicies { action } => {
            commands::graph::run_action_policies(&cli.global, &action)
        }
        Commands::Explore(args) => commands::explore::run(&cli.global, &args),
        Commands::Config { cmd } => commands::config::run(&cli.global, cmd),
    };
    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
