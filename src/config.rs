//! Configuration for the review engine operator CLI
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand, ValueEnum};

/// Review engine - moderation, voting and company reputation
#[derive(Parser, Debug, Clone)]
#[command(name = "review-engine")]
#[command(about = "Operator CLI for the review lifecycle, voting and reputation engine")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "reviews")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Id of the user the command acts as
    #[arg(long, global = true)]
    pub as_user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register a company
    AddCompany {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
    },

    /// Submit a review (anonymous unless --as-user is given)
    CreateReview {
        #[arg(long)]
        company: String,
        /// interview, employee, intern or contractor
        #[arg(long, default_value = "employee")]
        review_type: String,
        #[arg(long)]
        job_title: String,
        #[arg(long)]
        overall: i32,
        /// Sub-ratings in order: work-life balance, compensation,
        /// career growth, management, culture
        #[arg(long, required = true, value_delimiter = ',')]
        ratings: Vec<i32>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        #[arg(long, default_value = "")]
        pros: String,
        #[arg(long, default_value = "")]
        cons: String,
        #[arg(long)]
        recommend: bool,
    },

    /// Vote a review helpful or unhelpful
    Vote {
        #[arg(long)]
        review: String,
        /// helpful or unhelpful
        #[arg(long)]
        value: String,
    },

    /// Show the acting user's vote on a review
    UserVote {
        #[arg(long)]
        review: String,
    },

    /// Report a review
    Report {
        #[arg(long)]
        review: String,
        /// spam, inappropriate, fake, offensive, conflict_of_interest or other
        #[arg(long)]
        reason: String,
        #[arg(long)]
        details: Option<String>,
    },

    /// Dismiss or confirm a pending report (admin)
    ResolveReport {
        #[arg(long)]
        report: String,
        /// dismiss or confirm
        #[arg(long)]
        action: String,
        #[arg(long)]
        note: Option<String>,
    },

    /// Approve or reject a pending review (admin)
    Moderate {
        #[arg(long)]
        review: String,
        /// approved or rejected
        #[arg(long)]
        status: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Post or edit the reply on a review (recruiter or admin)
    Respond {
        #[arg(long)]
        review: String,
        #[arg(long)]
        content: String,
    },

    /// Recompute a company's reputation summary
    Recompute {
        #[arg(long)]
        company: String,
    },

    /// List a company's public reviews
    PublicReviews {
        #[arg(long)]
        company: String,
    },

    /// Walk one review through its whole lifecycle in a throwaway in-memory store
    Demo,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "LOG_LEVEL must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        // The demo never touches MongoDB
        if matches!(self.command, Command::Demo) {
            return Ok(());
        }

        if self.mongodb_uri.trim().is_empty() {
            return Err("MONGODB_URI must not be empty".to_string());
        }
        if !self.mongodb_uri.starts_with("mongodb://")
            && !self.mongodb_uri.starts_with("mongodb+srv://")
        {
            return Err(format!(
                "MONGODB_URI must start with mongodb:// or mongodb+srv://, got '{}'",
                self.mongodb_uri
            ));
        }
        if self.mongodb_db.trim().is_empty() {
            return Err("MONGODB_DB must not be empty".to_string());
        }

        Ok(())
    }
}
