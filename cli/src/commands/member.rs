use crate::output::{print_json, OutputFormat};
use crate::session::App;
use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand)]
pub enum MemberCommands {
    /// List members of a room
    List {
        /// Room id
        room_id: String,
    },
    /// Remove a member from a room you own
    Kick {
        /// Room id
        room_id: String,
        /// User id of the member to remove
        user_id: String,
    },
}

pub async fn execute(command: MemberCommands, app: App, format: OutputFormat) -> Result<()> {
    match command {
        MemberCommands::List { room_id } => {
            let room = app.coordinator().registry().require_room(&room_id).await?;
            let mut members = Vec::with_capacity(room.members.len());
            for member_id in &room.members {
                members.push(
                    app.coordinator()
                        .directory()
                        .require_user(member_id)
                        .await?,
                );
            }

            match format {
                OutputFormat::Human => {
                    for member in &members {
                        let marker = if room.is_owner(&member.id) { " (owner)" } else { "" };
                        println!(
                            "{} ({}) - {}{}",
                            member.display_name.bold(),
                            member.id,
                            member.email,
                            marker
                        );
                    }
                }
                OutputFormat::Json => print_json(&members)?,
            }
            Ok(())
        }
        MemberCommands::Kick { room_id, user_id } => {
            let acting = app.active_user().await?;
            app.coordinator()
                .remove_member(&room_id, &user_id, &acting.id)
                .await?;

            match format {
                OutputFormat::Human => println!("Removed {} from {}", user_id, room_id),
                OutputFormat::Json => {
                    println!(r#"{{"status":"success","action":"kick"}}"#)
                }
            }
            Ok(())
        }
    }
}
