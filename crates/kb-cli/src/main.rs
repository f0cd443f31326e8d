//! kb: command-line client for the knowledge base API.
//!
//! Set KB_API_URL (and optionally KB_TOKEN_DIR). `kb login` stores the session token;
//! every other command sends it and renews it when it is about to expire.

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use kb_api_client::{delete_record_with_files, ApiClient, EditSession, ListQuery, RecordForm};
use kb_cli::{
    hours_summary, init_tracing, log_failure, preview_index, read_attachment, session_status,
    LoginHint,
};
use kb_core::models::{LoginPayload, Record};
use kb_core::timesheet::TIMESHEET_CATEGORY;
use kb_core::ClientConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kb", about = "Knowledge base API CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        /// Account e-mail
        #[arg(long)]
        username: String,
        #[arg(long, env = "KB_PASSWORD", hide_env_values = true)]
        password: String,
        /// Six-digit verification code
        #[arg(long)]
        totp: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show whether a session is active and how long it has left
    Status,
    /// List records, one page at a time
    List {
        #[arg(long, default_value = "0")]
        page: u32,
        #[arg(long, default_value = "10")]
        limit: u32,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        tag: String,
        /// Category to leave out (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },
    /// Get a single record by ID
    Get { id: i64 },
    /// List known categories
    Categories,
    /// List known tags
    Tags,
    /// Create a record
    Create {
        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Update a record; list options replace the stored values when given
    Update {
        id: i64,
        #[command(flatten)]
        fields: RecordArgs,
        /// Attached file ID to delete (repeatable)
        #[arg(long = "remove-file")]
        remove_file: Vec<i64>,
    },
    /// Delete a record and its attachments
    Delete { id: i64 },
    /// Sum worked hours over timesheet records
    Hours {
        #[arg(long, default_value = TIMESHEET_CATEGORY)]
        category: String,
        #[arg(long, default_value = "100")]
        page_size: u32,
    },
}

#[derive(Args)]
struct RecordArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    subcategory: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Related URI (repeatable)
    #[arg(long = "uri")]
    uris: Vec<String>,
    /// Local file to attach (repeatable)
    #[arg(long = "attach")]
    attach: Vec<PathBuf>,
    /// Times use `dd/mm/yyyy HH:MM`
    #[arg(long)]
    morning_in: Option<String>,
    #[arg(long)]
    morning_out: Option<String>,
    #[arg(long)]
    afternoon_in: Option<String>,
    #[arg(long)]
    afternoon_out: Option<String>,
    #[arg(long)]
    night_in: Option<String>,
    #[arg(long)]
    night_out: Option<String>,
}

impl RecordArgs {
    /// Overlay the given options onto `form`.
    fn apply(&self, form: &mut RecordForm) {
        if let Some(name) = &self.name {
            form.name = name.clone();
        }
        if self.category.is_some() {
            form.category = self.category.clone();
        }
        if self.subcategory.is_some() {
            form.subcategory = self.subcategory.clone();
        }
        if let Some(description) = &self.description {
            form.description = description.clone();
        }
        if !self.tags.is_empty() {
            form.tags = self.tags.clone();
        }
        if !self.uris.is_empty() {
            form.uris = self.uris.clone();
        }
        let times = &mut form.times;
        for (slot, value) in [
            (&mut times.morning_in, &self.morning_in),
            (&mut times.morning_out, &self.morning_out),
            (&mut times.afternoon_in, &self.afternoon_in),
            (&mut times.afternoon_out, &self.afternoon_out),
            (&mut times.night_in, &self.night_in),
            (&mut times.night_out, &self.night_out),
        ] {
            if value.is_some() {
                *slot = value.clone();
            }
        }
    }

    async fn queue_attachments(&self, session: &mut EditSession) -> anyhow::Result<()> {
        for path in &self.attach {
            session.queue_file(read_attachment(path).await?);
        }
        Ok(())
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn save(
    client: &ApiClient,
    mut session: EditSession,
    form: RecordForm,
) -> anyhow::Result<Record> {
    session.save(&form, client, client).await.map_err(|e| {
        let message = e.user_message();
        anyhow::Error::new(e).context(message)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let result = run(Cli::parse()).await;
    if let Err(err) = &result {
        log_failure(err);
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context(
        "Invalid configuration. Check KB_API_URL, KB_TOKEN_BACKEND and KB_TOKEN_DIR",
    )?;
    let store = kb_storage::create_store(&config)
        .await
        .context("Failed to open token storage")?;
    let client = ApiClient::new(&config, store, Arc::new(LoginHint))
        .context("Failed to create API client")?;

    match cli.command {
        Commands::Login {
            username,
            password,
            totp,
        } => {
            let payload = LoginPayload {
                username,
                password,
                totp,
            };
            match client.login(&payload).await {
                Ok(response) if response.token().is_some() => {
                    let token = client.tokens().get_token().await?;
                    print_json(&session_status(
                        token.as_deref(),
                        config.refresh_threshold_secs,
                        Utc::now(),
                    ))?;
                }
                Ok(_) => anyhow::bail!("Login succeeded but no token was returned"),
                Err(e) => {
                    let message = e.login_message();
                    return Err(anyhow::Error::new(e).context(message));
                }
            }
        }
        Commands::Logout => {
            client.logout().await?;
            print_json(&serde_json::json!({ "success": true, "message": "Logged out" }))?;
        }
        Commands::Status => {
            let token = client.tokens().get_token().await?;
            print_json(&session_status(
                token.as_deref(),
                config.refresh_threshold_secs,
                Utc::now(),
            ))?;
        }
        Commands::List {
            page,
            limit,
            category,
            tag,
            exclude,
        } => {
            let query = ListQuery {
                page,
                limit,
                category,
                tag,
                exclusions: exclude,
            };
            print_json(&client.list_records(&query).await?)?;
        }
        Commands::Get { id } => {
            print_json(&client.get_record(id).await?)?;
        }
        Commands::Categories => {
            print_json(&client.categories().await?)?;
        }
        Commands::Tags => {
            print_json(&client.tags().await?)?;
        }
        Commands::Create { fields } => {
            let mut form = RecordForm::default();
            fields.apply(&mut form);
            let mut session = EditSession::new_record();
            fields.queue_attachments(&mut session).await?;
            print_json(&save(&client, session, form).await?)?;
        }
        Commands::Update {
            id,
            fields,
            remove_file,
        } => {
            let record = client.get_record(id).await?;
            let mut session = EditSession::open(&record, &client).await?;
            for file_id in remove_file {
                let index = preview_index(session.previews(), file_id)
                    .with_context(|| format!("File {} is not attached to record {}", file_id, id))?;
                session.remove_preview(index);
            }
            fields.queue_attachments(&mut session).await?;

            let mut form = RecordForm::from_record(&record);
            form.id = Some(id);
            fields.apply(&mut form);
            print_json(&save(&client, session, form).await?)?;
        }
        Commands::Delete { id } => {
            let record = client.get_record(id).await?;
            delete_record_with_files(id, &record.file_ids(), &client, &client).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("Record {} deleted", id) }),
            )?;
        }
        Commands::Hours {
            category,
            page_size,
        } => {
            let mut records: Vec<Record> = Vec::new();
            let mut query = ListQuery {
                limit: page_size.max(1),
                category,
                ..Default::default()
            };
            loop {
                let page = client.list_records(&query).await?;
                let fetched = page.links.len();
                records.extend(page.links);
                if fetched == 0 || records.len() as u64 >= page.total {
                    break;
                }
                query.page += 1;
            }
            print_json(&hours_summary(&records))?;
        }
    }

    Ok(())
}

