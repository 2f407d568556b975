use crate::output::{print_json, OutputFormat};
use crate::session::App;
use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand)]
pub enum FriendCommands {
    /// Send a friend request to the holder of a friend code
    Add {
        /// The other user's friend code
        friend_code: String,
    },
    /// List pending friend requests addressed to you
    Requests,
    /// Accept a pending friend request
    Accept {
        /// Request id (from `friend requests`)
        request_id: String,
    },
    /// Reject a pending friend request
    Reject {
        /// Request id (from `friend requests`)
        request_id: String,
    },
    /// List your friends
    List,
}

pub async fn execute(command: FriendCommands, app: App, format: OutputFormat) -> Result<()> {
    match command {
        FriendCommands::Add { friend_code } => {
            let user = app.active_user().await?;
            let request = app
                .coordinator()
                .send_friend_request(&user.id, &friend_code)
                .await?;

            match format {
                OutputFormat::Human => println!(
                    "Friend request sent to {} ({})",
                    request.receiver_name.bold(),
                    request.receiver_email
                ),
                OutputFormat::Json => print_json(&request)?,
            }
            Ok(())
        }
        FriendCommands::Requests => {
            let user = app.active_user().await?;
            let requests = app
                .coordinator()
                .ledger()
                .pending_friend_requests(&user.id)
                .await?;

            match format {
                OutputFormat::Human => {
                    if requests.is_empty() {
                        println!("No pending friend requests");
                    } else {
                        for request in &requests {
                            println!(
                                "[{}] {} ({}) - received {}",
                                request.id.yellow(),
                                request.sender_name.bold(),
                                request.sender_email,
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
        FriendCommands::Accept { request_id } => {
            app.coordinator().accept_friend_request(&request_id).await?;
            match format {
                OutputFormat::Human => println!("Friend request accepted"),
                OutputFormat::Json => {
                    println!(r#"{{"status":"success","action":"accept"}}"#)
                }
            }
            Ok(())
        }
        FriendCommands::Reject { request_id } => {
            app.coordinator().reject_friend_request(&request_id).await?;
            match format {
                OutputFormat::Human => println!("Friend request rejected"),
                OutputFormat::Json => {
                    println!(r#"{{"status":"success","action":"reject"}}"#)
                }
            }
            Ok(())
        }
        FriendCommands::List => {
            let user = app.active_user().await?;
            let mut friends = Vec::with_capacity(user.friends.len());
            for friend_id in &user.friends {
                friends.push(
                    app.coordinator()
                        .directory()
                        .require_user(friend_id)
                        .await?,
                );
            }

            match format {
                OutputFormat::Human => {
                    if friends.is_empty() {
                        println!("No friends yet. Share your friend code: {}", user.friend_code);
                    } else {
                        for friend in &friends {
                            println!(
                                "{} ({}) - {}",
                                friend.display_name.bold(),
                                friend.id,
                                friend.email
                            );
                        }
                    }
                }
                OutputFormat::Json => print_json(&friends)?,
            }
            Ok(())
        }
    }
}
