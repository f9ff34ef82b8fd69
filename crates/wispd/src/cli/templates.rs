//! the `templates` subcommand - manage configuration templates.

use chrono::Utc;
use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result, bail};

use wispd_db::Database;
use wispd_types::ConfigTemplate;

use super::DbArgs;

/// manage configuration templates
#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    /// list templates in merge order
    List(ListTemplatesArgs),

    /// add a template
    Add(AddTemplateArgs),
}

/// list templates
#[derive(Args, Debug)]
pub struct ListTemplatesArgs {
    #[command(flatten)]
    db: DbArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// add a template
#[derive(Args, Debug)]
pub struct AddTemplateArgs {
    #[command(flatten)]
    db: DbArgs,

    /// template name
    name: String,

    /// merge priority; lower merges first
    #[arg(short, long, default_value_t = 100)]
    priority: i32,

    /// path to a netjson file, or `-` for stdin
    #[arg(long)]
    netjson: String,
}

impl TemplatesCommand {
    /// run the subcommand
    pub async fn run(self) -> Result<()> {
        match self {
            Self::List(args) => list_templates(args).await,
            Self::Add(args) => add_template(args).await,
        }
    }
}

async fn list_templates(args: ListTemplatesArgs) -> Result<()> {
    let db = args.db.open().await?;
    let templates = db.list_templates().await?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    println!("{:<6} {:>8}  {}", "ID", "PRIORITY", "NAME");
    for template in templates {
        println!(
            "{:<6} {:>8}  {}",
            template.id, template.priority, template.name
        );
    }
    Ok(())
}

async fn add_template(args: AddTemplateArgs) -> Result<()> {
    let raw = if args.netjson == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.netjson)
            .with_context(|| format!("failed to read {}", args.netjson))?
    };
    let netjson: serde_json::Value =
        serde_json::from_str(&raw).context("netjson is not valid JSON")?;
    if !netjson.is_object() {
        bail!("netjson must be a JSON object");
    }

    let db = args.db.open().await?;
    let now = Utc::now();
    let created = db
        .create_template(&ConfigTemplate {
            id: 0,
            org_id: None,
            name: args.name,
            priority: args.priority,
            netjson,
            vars_schema: None,
            created_at: now,
            updated_at: now,
        })
        .await?;

    println!("created template {} (priority {})", created.name, created.priority);
    Ok(())
}
