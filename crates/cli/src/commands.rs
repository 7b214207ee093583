use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Sync every catalog table from source to destination
    Sync {
        #[arg(long, help = "Print the run summary as JSON")]
        json: bool,
    },
    /// Connect to both databases (with retries) and report reachability
    TestConn,
    /// Create the sync_log ledger table in the destination if missing
    InitLedger,
    /// Show recent ledger entries
    Status {
        #[arg(long, help = "Only entries for this table")]
        table: Option<String>,

        #[arg(long, default_value_t = 20, help = "Maximum number of entries")]
        limit: u64,

        #[arg(long, help = "Print entries as JSON instead of a table")]
        json: bool,
    },
    /// List the synced tables in sync order
    Tables {
        #[arg(long, help = "Print the catalog as JSON")]
        json: bool,
    },
}
