use crate::output::{print_json, OutputFormat};
use crate::session::App;
use anyhow::Result;
use chrono::Local;
use clap::Args;
use colored::Colorize;
use hearth_core::{FriendRequest, RoomJoinRequest};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Args)]
pub struct WatchArgs {
    /// Polling interval for store changes, in milliseconds
    #[arg(short, long, default_value = "1000")]
    poll_interval: u64,

    /// Auto-exit after N seconds (0 = no timeout)
    #[arg(short, long, default_value = "0")]
    timeout: u64,
}

enum Update {
    Friends(Vec<FriendRequest>),
    Joins(Vec<RoomJoinRequest>),
}

/// Stream the active user's pending friend and join requests until
/// Ctrl+C or the timeout. Each change prints the full current set.
pub async fn execute(args: WatchArgs, app: App, format: OutputFormat) -> Result<()> {
    let user = app.active_user().await?;

    let poller = app
        .store()
        .spawn_mtime_poll(Duration::from_millis(args.poll_interval));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let friends_tx = tx.clone();
    let _friends = app
        .notifier()
        .subscribe_pending_friend_requests(&user.id, move |requests| {
            let _ = friends_tx.send(Update::Friends(requests));
        });
    let _joins = app
        .notifier()
        .subscribe_pending_join_requests(&user.id, move |requests| {
            let _ = tx.send(Update::Joins(requests));
        });

    if matches!(format, OutputFormat::Human) {
        println!(
            "Watching pending requests for {} (Ctrl+C to stop)",
            user.display_name.bold()
        );
    }

    let deadline = async {
        if args.timeout > 0 {
            tokio::time::sleep(Duration::from_secs(args.timeout)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
            update = rx.recv() => match update {
                Some(update) => print_update(&update, format)?,
                None => break,
            },
        }
    }

    poller.abort();
    Ok(())
}

fn print_update(update: &Update, format: OutputFormat) -> Result<()> {
    let now = Local::now().format("%H:%M:%S");
    match (update, format) {
        (Update::Friends(requests), OutputFormat::Human) => {
            println!("[{}] {} pending friend request(s)", now, requests.len());
            for request in requests {
                println!(
                    "  [{}] {} ({})",
                    request.id.yellow(),
                    request.sender_name.bold(),
                    request.sender_email
                );
            }
        }
        (Update::Joins(requests), OutputFormat::Human) => {
            println!("[{}] {} pending join request(s)", now, requests.len());
            for request in requests {
                println!(
                    "  [{}] {} wants to join {}",
                    request.id.yellow(),
                    request.user_name.bold(),
                    request.room_name
                );
            }
        }
        (Update::Friends(requests), OutputFormat::Json) => {
            print_json(&json!({"type": "friendRequests", "requests": requests}))?;
        }
        (Update::Joins(requests), OutputFormat::Json) => {
            print_json(&json!({"type": "joinRequests", "requests": requests}))?;
        }
    }
    Ok(())
}
