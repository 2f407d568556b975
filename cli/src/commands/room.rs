use crate::output::{print_json, OutputFormat};
use crate::session::App;
use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use colored::Colorize;
use hearth_core::{NewRoom, Room, RoomPatch};

#[derive(Subcommand)]
pub enum RoomCommands {
    /// Create a room owned by the active user
    Create {
        /// Room name
        name: String,
        /// Room emoji
        #[arg(long, default_value = "\u{1F3E0}")]
        emoji: String,
        /// Room description
        #[arg(long)]
        description: Option<String>,
    },
    /// List the rooms you are a member of
    List,
    /// Show a room's details and members
    Show {
        /// Room id
        room_id: String,
    },
    /// Request to join the room behind an invite code
    Join {
        /// Invite code
        invite_code: String,
    },
    /// List pending join requests for rooms you own
    Requests,
    /// Approve a pending join request
    Approve {
        /// Request id (from `room requests`)
        request_id: String,
    },
    /// Deny a pending join request
    Deny {
        /// Request id (from `room requests`)
        request_id: String,
    },
    /// Leave a room you are a member of
    Leave {
        /// Room id
        room_id: String,
    },
    /// Update a room's display fields
    Update {
        /// Room id
        room_id: String,
        /// New room name
        #[arg(long)]
        name: Option<String>,
        /// New room emoji
        #[arg(long)]
        emoji: Option<String>,
        /// New room description
        #[arg(long)]
        description: Option<String>,
        /// Remove the room description
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
    },
}

pub async fn execute(command: RoomCommands, app: App, format: OutputFormat) -> Result<()> {
    match command {
        RoomCommands::Create {
            name,
            emoji,
            description,
        } => {
            let user = app.active_user().await?;
            let room = app
                .coordinator()
                .registry()
                .create_room(NewRoom {
                    name,
                    emoji,
                    owner_id: user.id,
                    description,
                })
                .await?;

            match format {
                OutputFormat::Human => {
                    println!("Created room {} {} ({})", room.emoji, room.name.bold(), room.id);
                    println!("Invite code: {}", room.invite_code.green().bold());
                }
                OutputFormat::Json => print_json(&room)?,
            }
            Ok(())
        }
        RoomCommands::List => {
            let user = app.active_user().await?;
            let rooms = app
                .coordinator()
                .registry()
                .get_user_rooms(&user.id)
                .await?;

            match format {
                OutputFormat::Human => {
                    if rooms.is_empty() {
                        println!("You are not a member of any room");
                    } else {
                        for room in &rooms {
                            let role = if room.is_owner(&user.id) { " (owner)" } else { "" };
                            println!(
                                "{} {} [{}] - {} member(s){}",
                                room.emoji,
                                room.name.bold(),
                                room.id.yellow(),
                                room.members.len(),
                                role
                            );
                        }
                    }
                }
                OutputFormat::Json => print_json(&rooms)?,
            }
            Ok(())
        }
        RoomCommands::Show { room_id } => {
            let room = app.coordinator().registry().require_room(&room_id).await?;
            match format {
                OutputFormat::Human => print_room(&room),
                OutputFormat::Json => print_json(&room)?,
            }
            Ok(())
        }
        RoomCommands::Join { invite_code } => {
            let user = app.active_user().await?;
            let request = app
                .coordinator()
                .send_join_request(&user.id, &invite_code)
                .await?;

            match format {
                OutputFormat::Human => println!(
                    "Join request sent for {} (waiting for the owner to approve)",
                    request.room_name.bold()
                ),
                OutputFormat::Json => print_json(&request)?,
            }
            Ok(())
        }
        RoomCommands::Requests => {
            let user = app.active_user().await?;
            let requests = app
                .coordinator()
                .ledger()
                .pending_join_requests(&user.id)
                .await?;

            match format {
                OutputFormat::Human => {
                    if requests.is_empty() {
                        println!("No pending join requests");
                    } else {
                        for request in &requests {
                            println!(
                                "[{}] {} ({}) wants to join {} - received {}",
                                request.id.yellow(),
                                request.user_name.bold(),
                                request.user_email,
                                request.room_name,
                                request
                                    .created_at
                                    .with_timezone(&Local)
                                    .format("%Y-%m-%d %H:%M")
                            );
                        }
                    }
                }
                OutputFormat::Json => print_json(&requests)?,
            }
            Ok(())
        }
        RoomCommands::Approve { request_id } => {
            app.coordinator().accept_join_request(&request_id).await?;
            match format {
                OutputFormat::Human => println!("Join request approved"),
                OutputFormat::Json => {
                    println!(r#"{{"status":"success","action":"approve"}}"#)
                }
            }
            Ok(())
        }
        RoomCommands::Deny { request_id } => {
            app.coordinator().reject_join_request(&request_id).await?;
            match format {
                OutputFormat::Human => println!("Join request denied"),
                OutputFormat::Json => {
                    println!(r#"{{"status":"success","action":"deny"}}"#)
                }
            }
            Ok(())
        }
        RoomCommands::Leave { room_id } => {
            let user = app.active_user().await?;
            app.coordinator().leave_room(&user.id, &room_id).await?;
            match format {
                OutputFormat::Human => println!("Left room {}", room_id),
                OutputFormat::Json => {
                    println!(r#"{{"status":"success","action":"leave"}}"#)
                }
            }
            Ok(())
        }
        RoomCommands::Update {
            room_id,
            name,
            emoji,
            description,
            clear_description,
        } => {
            let patch = RoomPatch {
                name,
                emoji,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
            };
            app.coordinator()
                .registry()
                .update_room(&room_id, patch)
                .await?;

            let room = app.coordinator().registry().require_room(&room_id).await?;
            match format {
                OutputFormat::Human => {
                    println!("Room updated");
                    print_room(&room);
                }
                OutputFormat::Json => print_json(&room)?,
            }
            Ok(())
        }
    }
}

fn print_room(room: &Room) {
    println!("{} {} ({})", room.emoji, room.name.bold(), room.id);
    if let Some(description) = &room.description {
        println!("  {}", description);
    }
    println!("  Owner:       {}", room.owner_id);
    println!("  Invite code: {}", room.invite_code.green().bold());
    println!("  Members:");
    for member in &room.members {
        let marker = if room.is_owner(member) { " (owner)" } else { "" };
        println!("    {}{}", member, marker);
    }
}
