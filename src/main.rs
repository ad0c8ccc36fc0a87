//! Review engine operator CLI
//!
//! Runs one engine operation per invocation against MongoDB and prints the
//! result as JSON on stdout. Logs go to stderr.

use anyhow::{bail, Context};
use bson::oid::ObjectId;
use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_engine::{
    config::{Args, Command, LogFormat},
    db::schemas::{
        CompanyDoc, NewReview, ReportAction, ReportReason, ReviewType, SubRatings, UserDoc,
        UserType,
    },
    db::MongoClient,
    identity::{require_caller, Caller},
    moderation::ModerationDecision,
    services::VoteValue,
    store::{InMemoryRepository, MongoRepository, ReviewRepository},
    types::parse_object_id,
    ReviewEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("review_engine={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let output = match args.command {
        Command::Demo => demo().await?,
        command => {
            let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db)
                .await
                .context("MongoDB connection failed")?;
            let repo = Arc::new(MongoRepository::new(&mongo).await?);
            let engine = ReviewEngine::new(repo.clone(), repo.clone());
            run(&engine, repo, args.as_user.as_deref(), command).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Resolve `--as-user` to a caller from the users collection
async fn load_caller(
    repo: &dyn ReviewRepository,
    as_user: Option<&str>,
) -> anyhow::Result<Option<Caller>> {
    let Some(raw) = as_user else {
        return Ok(None);
    };
    let id = parse_object_id("as_user", raw)?;
    let user = repo
        .find_user(&id)
        .await?
        .with_context(|| format!("User {} not found", id))?;
    Ok(Some(Caller::from_user(&user)?))
}

fn sub_ratings(values: &[i32]) -> anyhow::Result<SubRatings> {
    let [work_life_balance, compensation, career_growth, management, culture] = values else {
        bail!("--ratings takes exactly 5 comma-separated values, got {}", values.len());
    };
    Ok(SubRatings {
        work_life_balance: *work_life_balance,
        compensation: *compensation,
        career_growth: *career_growth,
        management: *management,
        culture: *culture,
    })
}

async fn run(
    engine: &ReviewEngine,
    repo: Arc<MongoRepository>,
    as_user: Option<&str>,
    command: Command,
) -> anyhow::Result<Value> {
    let caller = load_caller(repo.as_ref(), as_user).await?;

    let value = match command {
        Command::AddCompany { name, slug } => {
            let id = repo.insert_company(CompanyDoc::new(name, slug)).await?;
            info!(company = %id, "Company registered");
            json!({ "company_id": id.to_hex() })
        }

        Command::CreateReview {
            company,
            review_type,
            job_title,
            overall,
            ratings,
            title,
            body,
            pros,
            cons,
            recommend,
        } => {
            let fields = NewReview {
                company: parse_object_id("company", &company)?,
                review_type: review_type.parse::<ReviewType>()?,
                job_title,
                ratings: sub_ratings(&ratings)?,
                overall_rating: overall,
                title,
                body,
                pros,
                cons,
                recommend_to_friend: recommend,
                approves_of_ceo: None,
            };
            serde_json::to_value(engine.create_review(caller.as_ref(), fields).await?)?
        }

        Command::Vote { review, value } => {
            let caller = require_caller(caller)?;
            let review = parse_object_id("review", &review)?;
            let value = value.parse::<VoteValue>()?;
            serde_json::to_value(engine.vote(&caller, &review, value).await?)?
        }

        Command::UserVote { review } => {
            let caller = require_caller(caller)?;
            let review = parse_object_id("review", &review)?;
            json!({ "user_vote": engine.user_vote(&review, &caller.user_id).await? })
        }

        Command::Report { review, reason, details } => {
            let caller = require_caller(caller)?;
            let review = parse_object_id("review", &review)?;
            let reason = reason.parse::<ReportReason>()?;
            let id = engine.report(&caller, &review, reason, details).await?;
            json!({ "report_id": id.to_hex() })
        }

        Command::ResolveReport { report, action, note } => {
            let caller = require_caller(caller)?;
            let report = parse_object_id("report", &report)?;
            let action = action.parse::<ReportAction>()?;
            serde_json::to_value(engine.resolve_report(&caller, &report, action, note).await?)?
        }

        Command::Moderate { review, status, reason } => {
            let caller = require_caller(caller)?;
            let review = parse_object_id("review", &review)?;
            let decision = status.parse::<ModerationDecision>()?;
            serde_json::to_value(engine.moderate_review(&caller, &review, decision, reason).await?)?
        }

        Command::Respond { review, content } => {
            let caller = require_caller(caller)?;
            let review = parse_object_id("review", &review)?;
            serde_json::to_value(engine.respond_to_review(&caller, &review, &content).await?)?
        }

        Command::Recompute { company } => {
            let company = parse_object_id("company", &company)?;
            serde_json::to_value(engine.recompute_company_reputation(&company).await?)?
        }

        Command::PublicReviews { company } => {
            let company = parse_object_id("company", &company)?;
            serde_json::to_value(engine.public_reviews(&company).await?)?
        }

        Command::Demo => bail!("demo runs without MongoDB"),
    };

    Ok(value)
}

/// Scripted lifecycle against an in-memory store
async fn demo() -> anyhow::Result<Value> {
    let repo = Arc::new(InMemoryRepository::new());
    let engine = ReviewEngine::new(repo.clone(), repo.clone());

    let company = repo
        .insert_company(CompanyDoc::new("Acme Corp", "acme-corp"))
        .await?;

    let register = |user: UserDoc| -> anyhow::Result<Caller> {
        let mut user = user;
        user._id = Some(repo.insert_user(user.clone()));
        Ok(Caller::from_user(&user)?)
    };
    let admin = register(UserDoc::new("admin@acme.test", "Admin", UserType::Admin))?;
    let author = register(UserDoc::new("dev@acme.test", "Dev", UserType::Employee))?;
    let voter = register(UserDoc::new("cand@example.test", "Candidate", UserType::Candidate))?;
    let recruiter = register(UserDoc::recruiter("talent@acme.test", "ACME corp."))?;

    let review = engine
        .create_review(
            Some(&author),
            NewReview {
                company,
                review_type: ReviewType::Employee,
                job_title: "Backend Engineer".into(),
                ratings: SubRatings {
                    work_life_balance: 4,
                    compensation: 3,
                    career_growth: 4,
                    management: 3,
                    culture: 5,
                },
                overall_rating: 4,
                title: "Solid place to grow".into(),
                body: "Good mentoring, slow promotion cycle.".into(),
                pros: "Mentoring".into(),
                cons: "Promotions".into(),
                recommend_to_friend: true,
                approves_of_ceo: Some(true),
            },
        )
        .await?;
    let review_id = review._id.context("created review has no id")?;

    engine
        .moderate_review(&admin, &review_id, ModerationDecision::Approved, None)
        .await?;
    let votes = engine.vote(&voter, &review_id, VoteValue::Helpful).await?;

    let report = engine
        .report(&voter, &review_id, ReportReason::Other, Some("Looks like marketing".into()))
        .await?;
    engine
        .resolve_report(&admin, &report, ReportAction::Dismiss, Some("Genuine review".into()))
        .await?;
    let listed_after_dismissal = engine.public_reviews(&company).await?.len();

    engine
        .moderate_review(&admin, &review_id, ModerationDecision::Approved, None)
        .await?;
    let replied = engine
        .respond_to_review(&recruiter, &review_id, "Thanks, we are reworking promotions.")
        .await?;
    let reputation = engine.recompute_company_reputation(&company).await?;

    Ok(json!({
        "review": replied,
        "votes": votes,
        "public_reviews_after_dismissal": listed_after_dismissal,
        "reputation": reputation,
        "notifications": repo.notifications_for(&author.user_id),
        "recruiter_company": repo
            .find_user(&recruiter.user_id)
            .await?
            .and_then(|u| u.recruiter_info)
            .and_then(|info| info.company_id)
            .map(|id: ObjectId| id.to_hex()),
    }))
}
