//! Rally CLI client.
//!
//! Connects to the presence relay, announces the given user id, and
//! turns slash commands into frames:
//!
//! ```not_rust
//! /chat <to> <message...>
//! /invite <to>
//! /respond <to> <invitation-id> <accepted|rejected>
//! /channel <channel-id> <message...>
//! /quit
//! ```
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rally-client -- --user-id 1
//! cargo run --bin rally-client -- -i 2 --url ws://127.0.0.1:3000/ws/presence
//! ```

use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use rally_client::formatter::MessageFormatter;
use rally_client::ui::redisplay_prompt;
use rally_client::{InvitationTracker, RelaySession, SessionConfig, SessionEvent};
use rally_server::infrastructure::dto::websocket::{ClientFrame, ServerEvent};
use rally_shared::logger::setup_logger;
use rally_shared::time::now_millis;

#[derive(Parser, Debug)]
#[command(name = "rally-client")]
#[command(about = "CLI client for the Rally presence relay", long_about = None)]
struct Args {
    /// Numeric user id to announce
    #[arg(short = 'i', long)]
    user_id: i64,

    /// Display name sent with game invitations
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:3000/ws/presence")]
    url: String,
}

/// One parsed line of user input.
#[derive(Debug, PartialEq)]
enum CliCommand {
    Frame(ClientFrame),
    Quit,
}

fn parse_command(
    line: &str,
    user_id: i64,
    display_name: &str,
    now: i64,
) -> Result<CliCommand, String> {
    let mut parts = line.split_whitespace();
    let command = parts.next().ok_or("empty input")?;
    match command {
        "/chat" => {
            let to: i64 = parts
                .next()
                .ok_or("usage: /chat <to> <message...>")?
                .parse()
                .map_err(|_| "recipient must be a user id")?;
            let message = parts.collect::<Vec<_>>().join(" ");
            if message.is_empty() {
                return Err("usage: /chat <to> <message...>".to_string());
            }
            Ok(CliCommand::Frame(ClientFrame::Chat {
                to,
                message,
                message_id: Some(format!("cli-{user_id}-{to}-{now}")),
            }))
        }
        "/invite" => {
            let to: i64 = parts
                .next()
                .ok_or("usage: /invite <to>")?
                .parse()
                .map_err(|_| "target must be a user id")?;
            Ok(CliCommand::Frame(ClientFrame::GameInvitation {
                to,
                from: user_id,
                from_name: display_name.to_string(),
                invitation_id: format!("inv-{user_id}-{now}"),
            }))
        }
        "/respond" => {
            let to: i64 = parts
                .next()
                .ok_or("usage: /respond <to> <invitation-id> <accepted|rejected>")?
                .parse()
                .map_err(|_| "inviter must be a user id")?;
            let invitation_id = parts
                .next()
                .ok_or("usage: /respond <to> <invitation-id> <accepted|rejected>")?
                .to_string();
            let response = match parts.next() {
                Some("accepted") => rally_server::domain::InvitationResponse::Accepted,
                Some("rejected") => rally_server::domain::InvitationResponse::Rejected,
                _ => return Err("response must be 'accepted' or 'rejected'".to_string()),
            };
            Ok(CliCommand::Frame(ClientFrame::GameInvitationResponse {
                to,
                from: user_id,
                invitation_id,
                response,
            }))
        }
        "/channel" => {
            let channel_id = parts
                .next()
                .ok_or("usage: /channel <channel-id> <message...>")?
                .to_string();
            let content = parts.collect::<Vec<_>>().join(" ");
            if content.is_empty() {
                return Err("usage: /channel <channel-id> <message...>".to_string());
            }
            Ok(CliCommand::Frame(ClientFrame::ChannelMessage {
                channel_id,
                content,
                local_message_id: Some(format!("cli-{user_id}-{now}")),
            }))
        }
        "/quit" => Ok(CliCommand::Quit),
        other => Err(format!(
            "unknown command '{other}'; try /chat, /invite, /respond, /channel, /quit"
        )),
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let display_name = args
        .name
        .clone()
        .unwrap_or_else(|| format!("user-{}", args.user_id));

    let session = RelaySession::spawn(SessionConfig::new(args.url.clone(), args.user_id));
    let mut events = session.subscribe();
    let mut tracker = InvitationTracker::new();

    println!(
        "\nYou are user {}. Type /chat, /invite, /respond, /channel or /quit.\n",
        args.user_id
    );

    // Rustyline is synchronous; run it on its own thread and bridge the
    // lines over a channel.
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt_user_id = args.user_id;
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };
        let prompt = format!("{}> ", prompt_user_id);
        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = input_tx.send("/quit".to_string());
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::Connected) => {
                    println!("\n[session] connected\n");
                    redisplay_prompt(args.user_id);
                }
                Ok(SessionEvent::Disconnected) => {
                    println!("\n[session] connection lost, reconnecting...\n");
                }
                Ok(SessionEvent::Failed) => {
                    eprintln!("\n[session] could not reconnect; please restart the client.\n");
                    break;
                }
                Ok(SessionEvent::Server(server_event)) => {
                    handle_server_event(&mut tracker, &server_event);
                    redisplay_prompt(args.user_id);
                }
                Err(_) => break,
            },
            line = input_rx.recv() => {
                let Some(line) = line else { break };
                match parse_command(&line, args.user_id, &display_name, now_millis()) {
                    Ok(CliCommand::Frame(frame)) => {
                        if session.send(frame).is_err() {
                            eprintln!("session is gone");
                            break;
                        }
                    }
                    Ok(CliCommand::Quit) => break,
                    Err(e) => {
                        println!("{}", e);
                        redisplay_prompt(args.user_id);
                    }
                }
            }
        }
    }

    session.close().await;
}

fn handle_server_event(tracker: &mut InvitationTracker, event: &ServerEvent) {
    match event {
        ServerEvent::GameInvitation { invitation_id, .. } => {
            tracker.observe(invitation_id);
            print!("{}", MessageFormatter::format_event(event));
        }
        ServerEvent::GameInvitationResponse {
            invitation_id,
            response,
            ..
        } => {
            // A resolved invitation never re-opens; stale or duplicate
            // responses are dropped here.
            if tracker.apply_response(invitation_id, *response) {
                print!("{}", MessageFormatter::format_event(event));
            }
        }
        _ => {
            print!("{}", MessageFormatter::format_event(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_command_builds_a_chat_frame() {
        // given:
        let line = "/chat 2 see you in the arena";

        // when:
        let command = parse_command(line, 1, "alice", 42).unwrap();

        // then:
        assert_eq!(
            command,
            CliCommand::Frame(ClientFrame::Chat {
                to: 2,
                message: "see you in the arena".to_string(),
                message_id: Some("cli-1-2-42".to_string()),
            })
        );
    }

    #[test]
    fn test_invite_command_carries_name_and_generated_id() {
        // given:
        let line = "/invite 3";

        // when:
        let command = parse_command(line, 1, "alice", 42).unwrap();

        // then:
        assert_eq!(
            command,
            CliCommand::Frame(ClientFrame::GameInvitation {
                to: 3,
                from: 1,
                from_name: "alice".to_string(),
                invitation_id: "inv-1-42".to_string(),
            })
        );
    }

    #[test]
    fn test_respond_command_validates_the_answer() {
        // given:
        let good = "/respond 1 inv-1-42 accepted";
        let bad = "/respond 1 inv-1-42 maybe";

        // when:
        let parsed = parse_command(good, 2, "bob", 0);
        let rejected = parse_command(bad, 2, "bob", 0);

        // then:
        assert!(matches!(parsed, Ok(CliCommand::Frame(_))));
        assert!(rejected.is_err());
    }

    #[test]
    fn test_quit_and_unknown_commands() {
        // given:

        // when:
        let quit = parse_command("/quit", 1, "alice", 0);
        let unknown = parse_command("/teleport 5", 1, "alice", 0);

        // then:
        assert_eq!(quit.unwrap(), CliCommand::Quit);
        assert!(unknown.is_err());
    }
}
