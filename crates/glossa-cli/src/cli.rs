use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Localized module catalog over SQLite",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set log verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(required = false, short, long, global = true)]
    pub quiet: bool,

    /// Log as JSON
    #[arg(required = false, short, long, global = true)]
    pub json: bool,

    /// Disable colors in log output
    #[arg(required = false, long, global = true)]
    pub no_color: bool,

    /// Path to the configuration file
    #[arg(required = false, short, long, global = true)]
    pub config: Option<String>,

    /// Locale of the translated columns; defaults to the configured locale
    #[arg(required = false, short, long, global = true)]
    pub locale: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Debug, Default)]
pub struct Target {
    /// Module id or `bundle.alias`
    pub module: Option<String>,

    /// Data table of the module
    pub table: Option<String>,

    /// Row id or alias
    pub item: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the catalog tables and register the configured modules
    #[clap(name = "init")]
    Init,

    /// List modules, show module settings or read module data
    #[clap(name = "get", visible_alias = "ls")]
    Get {
        #[command(flatten)]
        target: Target,

        /// Filter as a JSON object, e.g. '{"views>": 10}'
        #[arg(required = false, short, long)]
        filter: Option<String>,

        /// Order as `column[,asc|desc]`
        #[arg(required = false, short, long)]
        order: Option<String>,

        /// Limit as `count[,offset]`
        #[arg(required = false, long)]
        limit: Option<String>,

        /// Replace foreign keys with the rows they reference
        #[arg(required = false, long)]
        rel_one: bool,

        /// Attach rows of other tables referencing each row
        #[arg(required = false, long)]
        rel_many: bool,
    },

    /// Register a module or add a row to a module table
    #[clap(name = "create", visible_alias = "add")]
    Create {
        #[command(flatten)]
        target: Target,

        /// Row values as a JSON object
        #[arg(short, long)]
        data: String,
    },

    /// Change module settings or a row of a module table
    #[clap(name = "update")]
    Update {
        #[command(flatten)]
        target: Target,

        /// Row values as a JSON object
        #[arg(short, long)]
        data: String,
    },

    /// Remove a module or a row of a module table
    #[clap(name = "delete", visible_alias = "rm")]
    Delete {
        #[command(flatten)]
        target: Target,
    },
}
