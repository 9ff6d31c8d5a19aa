use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the data directory (database and blob storage)
    Init {
        /// Data directory for database and photo storage
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user account and its profile
    Add {
        /// Data directory for database and photo storage
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Sign-in email address
        #[arg(long)]
        email: Option<String>,

        /// Business unit the user belongs to ("master" sees all data)
        #[arg(long)]
        business_unit: Option<String>,

        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Skip interactive prompts (requires --email and --password)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Change which business unit a user belongs to
    SetUnit {
        /// Data directory for database and photo storage
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email of the user to update
        #[arg(long)]
        email: Option<String>,

        /// New business unit
        #[arg(long, conflicts_with = "clear")]
        business_unit: Option<String>,

        /// Remove the user's business unit
        #[arg(long)]
        clear: bool,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// List user accounts
    List {
        /// Data directory for database and photo storage
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
