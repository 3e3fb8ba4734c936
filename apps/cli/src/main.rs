use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use parley_api::{Message, NewAccount, OutgoingAttachment};
use parley_chats::{ChatDirectory, ChatRoom};
use parley_config::AppConfig;
use parley_runtime::{telemetry, ClientServices};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Terminal client for the chat backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account (sign in separately afterwards)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in and cache the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and clear the cached session
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// List conversations
    Chats,
    /// List users available for a new conversation
    Online,
    /// Open a conversation and watch it until interrupted
    Open {
        /// Peer user id for a direct chat
        #[arg(long, conflicts_with = "group")]
        user: Option<String>,
        /// Group chat id
        #[arg(long)]
        group: Option<String>,
    },
    /// Send one message to a conversation
    Send {
        #[arg(long, conflicts_with = "group")]
        user: Option<String>,
        #[arg(long)]
        group: Option<String>,
        /// Message text
        content: String,
        /// File to attach (repeatable, up to 5)
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// Delete a message from a conversation
    DeleteMessage {
        #[arg(long, conflicts_with = "group")]
        user: Option<String>,
        #[arg(long)]
        group: Option<String>,
        /// Message id
        message: String,
    },
    /// Group chat management
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Create a group chat with at least two other participants
    Create {
        #[arg(long)]
        name: String,
        /// Participant user id (repeatable)
        #[arg(long = "participant")]
        participants: Vec<String>,
    },
    /// Show a group's details
    Show {
        #[arg(long)]
        chat: String,
    },
    /// Rename a group
    Rename {
        #[arg(long)]
        chat: String,
        #[arg(long)]
        name: String,
    },
    /// Add a participant to a group
    Add {
        #[arg(long)]
        chat: String,
        #[arg(long)]
        user: String,
    },
    /// Remove a participant from a group
    Remove {
        #[arg(long)]
        chat: String,
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = parley_config::load().context("failed to load configuration")?;
    let services =
        ClientServices::initialise(&config).context("failed to initialise client services")?;

    match cli.command {
        Commands::Register {
            email,
            username,
            password,
        } => register(&services, email, username, password).await,
        Commands::Login { email, password } => login(&services, &email, &password).await,
        Commands::Logout => {
            services.session.logout();
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => whoami(&services),
        Commands::Chats => list_chats(&services).await,
        Commands::Online => list_online(&services).await,
        Commands::Open { user, group } => watch(&services, &config, user, group).await,
        Commands::Send {
            user,
            group,
            content,
            attachments,
        } => send(&services, user, group, &content, attachments).await,
        Commands::DeleteMessage {
            user,
            group,
            message,
        } => delete_message(&services, user, group, &message).await,
        Commands::Group { command } => group(&services, command).await,
    }
}

async fn register(
    services: &ClientServices,
    email: String,
    username: String,
    password: String,
) -> anyhow::Result<()> {
    let identity = services
        .session
        .register(&NewAccount {
            email,
            password,
            username,
        })
        .await?;
    println!("Account created for {} ({}).", identity.username, identity.email);
    println!("Sign in with `parley login` to start chatting.");
    Ok(())
}

async fn login(services: &ClientServices, email: &str, password: &str) -> anyhow::Result<()> {
    let identity = services.session.login(email, password).await?;
    println!("Signed in as {} ({}).", identity.username, identity.email);
    Ok(())
}

fn whoami(services: &ClientServices) -> anyhow::Result<()> {
    match services.session.identity() {
        Some(identity) => {
            println!("{} ({}) [{}]", identity.username, identity.email, identity.id);
            Ok(())
        }
        None => {
            println!("Not signed in.");
            Ok(())
        }
    }
}

async fn list_chats(services: &ClientServices) -> anyhow::Result<()> {
    let own_id = services
        .session
        .identity()
        .map(|identity| identity.id)
        .unwrap_or_default();
    let directory = ChatDirectory::new(services.session.clone());
    let chats = directory.list_chats().await?;

    if chats.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }
    for chat in chats {
        let kind = if chat.is_group { "group" } else { "direct" };
        let preview = chat
            .latest_message
            .as_ref()
            .map(|message| format!(": {}", truncate(&message.content, 40)))
            .unwrap_or_default();
        println!("{}  [{}] {}{}", chat.id, kind, chat.label(&own_id), preview);
    }
    Ok(())
}

async fn list_online(services: &ClientServices) -> anyhow::Result<()> {
    let directory = ChatDirectory::new(services.session.clone());
    let users = directory.available_users().await?;

    if users.is_empty() {
        println!("No users are currently available.");
        return Ok(());
    }
    for user in users {
        println!("{}  {}", user.id, user.username);
    }
    Ok(())
}

async fn open_room(
    services: &ClientServices,
    user: Option<String>,
    group: Option<String>,
) -> anyhow::Result<ChatRoom> {
    let mut room = ChatRoom::new(services.session.clone());
    match (user, group) {
        (Some(user), None) => room.open_direct(&user).await?,
        (None, Some(group)) => room.open_group(&group).await?,
        _ => bail!("specify exactly one of --user or --group"),
    }
    Ok(room)
}

async fn watch(
    services: &ClientServices,
    config: &AppConfig,
    user: Option<String>,
    group: Option<String>,
) -> anyhow::Result<()> {
    let mut room = open_room(services, user, group).await?;

    let conversation = room.conversation().context("conversation should be open")?;
    let own_id = services
        .session
        .identity()
        .map(|identity| identity.id)
        .unwrap_or_default();
    println!(
        "Watching {} (ctrl-c to leave)",
        conversation.label(&own_id)
    );

    let mut printed: HashSet<String> = HashSet::new();
    for message in room.messages() {
        printed.insert(message.id.clone());
        print_message(&message);
    }

    room.start_polling(config.polling.interval_for(room.is_group()));

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = parley_runtime::shutdown_signal() => break,
            _ = ticker.tick() => {
                for message in room.messages() {
                    if printed.insert(message.id.clone()) {
                        print_message(&message);
                    }
                }
                if let Some(error) = room.last_error() {
                    tracing::warn!(error = %error, "refresh problem");
                }
            }
        }
    }

    room.close();
    println!("Left the conversation.");
    Ok(())
}

async fn send(
    services: &ClientServices,
    user: Option<String>,
    group: Option<String>,
    content: &str,
    attachment_paths: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let mut attachments = Vec::with_capacity(attachment_paths.len());
    for path in attachment_paths {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read attachment {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        attachments.push(OutgoingAttachment { file_name, bytes });
    }

    let room = open_room(services, user, group).await?;
    if room.send_message(content, attachments).await? {
        println!("Sent.");
    } else {
        println!("Nothing to send.");
    }
    Ok(())
}

async fn delete_message(
    services: &ClientServices,
    user: Option<String>,
    group: Option<String>,
    message_id: &str,
) -> anyhow::Result<()> {
    let room = open_room(services, user, group).await?;
    room.delete_message(message_id).await?;
    println!("Deleted.");
    Ok(())
}

async fn group(services: &ClientServices, command: GroupCommands) -> anyhow::Result<()> {
    let directory = ChatDirectory::new(services.session.clone());
    match command {
        GroupCommands::Create { name, participants } => {
            let conversation = directory.create_group(&name, &participants).await?;
            println!("Group created: {} ({})", name, conversation.id);
        }
        GroupCommands::Show { chat } => {
            let conversation = directory.group_details(&chat).await?;
            println!(
                "{} ({} participants)",
                conversation.name.as_deref().unwrap_or("unnamed"),
                conversation.participants.len()
            );
            for participant in conversation.participants {
                println!("  {}  {}", participant.id, participant.username);
            }
        }
        GroupCommands::Rename { chat, name } => {
            directory.rename_group(&chat, &name).await?;
            println!("Renamed to {name}.");
        }
        GroupCommands::Add { chat, user } => {
            directory.add_participant(&chat, &user).await?;
            println!("Participant added.");
        }
        GroupCommands::Remove { chat, user } => {
            directory.remove_participant(&chat, &user).await?;
            println!("Participant removed.");
        }
    }
    Ok(())
}

fn print_message(message: &Message) {
    let timestamp = message.created_at.format("%H:%M");
    let attachments = if message.attachments.is_empty() {
        String::new()
    } else {
        format!(" (+{} attachments)", message.attachments.len())
    };
    println!(
        "[{}] {}: {}{}",
        timestamp, message.sender.username, message.content, attachments
    );
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max).collect();
        format!("{prefix}…")
    }
}
