use crate::output::{print_json, OutputFormat};
use crate::session::App;
use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use hearth_core::{User, UserPatch, UserProfile};

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user account and make it the active user
    Create {
        /// User id
        id: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Profile photo URL
        #[arg(long)]
        photo: Option<String>,
    },
    /// Switch the active user
    Use {
        /// User id
        id: String,
    },
    /// Show the active user's profile
    Show,
    /// Update the active user's profile
    Update {
        /// New email address
        #[arg(long)]
        email: Option<String>,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New profile photo URL
        #[arg(long)]
        photo: Option<String>,
        /// Remove the profile photo
        #[arg(long, conflicts_with = "photo")]
        clear_photo: bool,
    },
}

pub async fn execute(command: UserCommands, mut app: App, format: OutputFormat) -> Result<()> {
    match command {
        UserCommands::Create {
            id,
            email,
            name,
            photo,
        } => {
            let user = app
                .coordinator()
                .directory()
                .create_user(UserProfile {
                    id,
                    email,
                    display_name: name,
                    photo_url: photo,
                })
                .await?;
            app.set_active_user(&user.id)?;

            match format {
                OutputFormat::Human => {
                    println!("Created user {} ({})", user.display_name.bold(), user.id);
                    println!("Friend code: {}", user.friend_code.green().bold());
                    println!("This is now the active user");
                }
                OutputFormat::Json => print_json(&user)?,
            }
            Ok(())
        }
        UserCommands::Use { id } => {
            let user = app.coordinator().directory().require_user(&id).await?;
            app.set_active_user(&user.id)?;

            match format {
                OutputFormat::Human => {
                    println!("Active user is now {} ({})", user.display_name.bold(), user.id)
                }
                OutputFormat::Json => print_json(&user)?,
            }
            Ok(())
        }
        UserCommands::Show => {
            let user = app.active_user().await?;
            match format {
                OutputFormat::Human => print_user(&user),
                OutputFormat::Json => print_json(&user)?,
            }
            Ok(())
        }
        UserCommands::Update {
            email,
            name,
            photo,
            clear_photo,
        } => {
            let user = app.active_user().await?;
            let patch = UserPatch {
                email,
                display_name: name,
                photo_url: if clear_photo { Some(None) } else { photo.map(Some) },
            };
            app.coordinator()
                .directory()
                .update_user(&user.id, patch)
                .await?;

            let updated = app.active_user().await?;
            match format {
                OutputFormat::Human => {
                    println!("Profile updated");
                    print_user(&updated);
                }
                OutputFormat::Json => print_json(&updated)?,
            }
            Ok(())
        }
    }
}

fn print_user(user: &User) {
    println!("{} ({})", user.display_name.bold(), user.id);
    println!("  Email:       {}", user.email);
    if let Some(photo) = &user.photo_url {
        println!("  Photo:       {}", photo);
    }
    println!("  Friend code: {}", user.friend_code.green().bold());
    println!("  Friends:     {}", user.friends.len());
    println!("  Rooms:       {}", user.rooms.len());
}
