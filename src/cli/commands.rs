use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hr-faq-bot")]
#[command(author, version, about = "HR FAQ chatbot with a conversation log", long_about = None)]
pub struct Cli {
    /// Keep all data in memory instead of the configured database
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question
    Ask {
        /// Employee ID or email
        #[arg(short = 'u', long)]
        user: String,

        query: String,
    },

    /// Start an interactive chat session
    Interactive {
        /// Employee ID or email (prompted for when missing)
        #[arg(short = 'u', long)]
        user: Option<String>,
    },

    /// Show how many queries a user has made
    Stats {
        #[arg(short = 'u', long)]
        user: String,
    },

    /// Show the archived chat history of a user
    History {
        #[arg(short = 'u', long)]
        user: String,

        /// Print the history as JSON
        #[arg(long)]
        json: bool,
    },

    /// Seed the FAQ table when it is empty and report its row count
    Seed,
}
