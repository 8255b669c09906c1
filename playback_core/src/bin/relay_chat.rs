//! Line-oriented chat client for the relay.
//!
//! Every stdin line is sent as a message. `/play` plays the buffered reply
//! audio, `/quit` exits. With `AUTO_PLAY=true` a reply is played once its
//! turn is over: on the relay's end-of-stream frame, or after
//! `AUTO_PLAY_IDLE_MS` of silence when the relay sends none.

use playback_core::{BufferState, ClientApp, ClientConfig, ClientEvent, FileSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    let config = ClientConfig::from_env();
    info!(
        "Relay {} (conversation {}, expecting {:?}, format {})",
        config.relay_url, config.conversation_id, config.expected, config.format
    );
    let auto_play = config.auto_play;
    let idle = config.auto_play_idle;
    let sink = FileSink::new(config.playback_dir.clone());
    let mut app = ClientApp::new(config, sink);

    app.ensure_connected().await?;
    println!("{}", app.status());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_state = BufferState::Idle;
    // Armed while a playable reply waits for its turn to go quiet
    let mut idle_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                match line {
                    "" => continue,
                    "/quit" => break,
                    "/play" => {
                        play(&mut app);
                        idle_deadline = None;
                        last_state = app.controller().buffer().state();
                    }
                    text => {
                        if let Err(e) = app.send(text).await {
                            error!("Failed to send message: {e}");
                            break;
                        }
                    }
                }
            }
            event = app.next_event() => {
                let Some((event, state)) = event else { break };
                let closed = matches!(event, ClientEvent::Disconnected | ClientEvent::Error(_));
                if !matches!(event, ClientEvent::Binary(_)) {
                    println!("{}", app.status());
                }

                if app.auto_play_due(&event, state) {
                    play(&mut app);
                    idle_deadline = None;
                } else if state == BufferState::Ready {
                    if auto_play {
                        idle_deadline = Some(Instant::now() + idle);
                    } else if last_state != BufferState::Ready {
                        let received = app.controller().buffer().received();
                        println!("Reply ready ({received} chunks), type /play");
                    }
                } else {
                    idle_deadline = None;
                }
                last_state = app.controller().buffer().state();

                if closed {
                    break;
                }
            }
            _ = tokio::time::sleep_until(idle_deadline.unwrap_or_else(Instant::now)),
                if idle_deadline.is_some() =>
            {
                idle_deadline = None;
                play(&mut app);
                last_state = app.controller().buffer().state();
            }
        }
    }

    app.shutdown().await;
    Ok(())
}

fn play(app: &mut ClientApp<FileSink>) {
    match app.play() {
        Ok(played) => match app.controller().sink().last_path() {
            Some(path) => println!(
                "Played {} chunks ({} bytes) -> {}",
                played.chunks,
                played.bytes,
                path.display()
            ),
            None => println!("Played {} chunks ({} bytes)", played.chunks, played.bytes),
        },
        Err(e) => warn!("{e}"),
    }
}
