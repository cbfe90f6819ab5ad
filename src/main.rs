use quadplay::Deck;
use quadplay::cli::Args;
use quadplay::events::{ChannelObserver, PlayerEvent};
use quadplay::player::PlayerState;

use anyhow::bail;
use clap::Parser;
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-slot bookkeeping for the run summary.
struct SlotStats {
    name: String,
    decoded: u64,
    presented: u64,
    finishes: u64,
    errors: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Console logging with specified verbosity level (respects RUST_LOG if set)
    let default_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    info!("quadplay starting...");
    debug!("Command-line args: {:?}", args);

    if args.slots == 0 {
        bail!("deck needs at least one slot");
    }
    if args.files.len() > args.slots {
        warn!(
            "{} files given but only {} slots; extra files ignored",
            args.files.len(),
            args.slots
        );
    }

    let deck = Deck::new(args.slots);

    // One event channel and one frame receiver per engine
    let mut event_rx: Vec<Receiver<PlayerEvent>> = Vec::new();
    let mut frame_rx = Vec::new();
    for player in deck.players() {
        let (tx, rx) = crossbeam_channel::unbounded();
        player.set_observer(Arc::new(ChannelObserver::new(tx)));
        event_rx.push(rx);
        frame_rx.push(player.frames());
    }

    let mut opened = 0usize;
    for (player, path) in deck.players().zip(&args.files) {
        // A failed open leaves that engine Closed; the others stay operable
        match player.open(path) {
            Ok(()) => {
                info!("opened {}", player.display_name());
                opened += 1;
            }
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }
    if opened == 0 {
        bail!("no file could be opened");
    }

    let mut stats: Vec<SlotStats> = deck
        .players()
        .map(|p| SlotStats {
            name: p.display_name(),
            decoded: 0,
            presented: 0,
            finishes: 0,
            errors: 0,
        })
        .collect();

    deck.play_all();

    // Consumer loop: drain events and frames until the deadline, or until
    // every opened stream has finished (unless looping).
    let deadline = Instant::now() + Duration::from_secs_f64(args.duration.max(0.0));
    while Instant::now() < deadline {
        for (i, player) in deck.players().enumerate() {
            for event in event_rx[i].try_iter() {
                match event {
                    PlayerEvent::FrameReady { index } => {
                        stats[i].decoded += 1;
                        debug!("{}: frame {index}", stats[i].name);
                    }
                    PlayerEvent::Finished => {
                        info!("{}: playback finished", stats[i].name);
                        stats[i].finishes += 1;
                        if args.loop_playback {
                            player.restart();
                        }
                    }
                    PlayerEvent::Error(reason) => {
                        warn!("{}: {reason}", stats[i].name);
                        stats[i].errors += 1;
                    }
                }
            }
            // This is where a GUI would blit; headless, we just count
            if frame_rx[i].try_take().is_some() {
                stats[i].presented += 1;
            }
        }

        if !args.loop_playback
            && deck
                .players()
                .all(|p| p.state() != PlayerState::Playing)
        {
            info!("all streams finished");
            break;
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    deck.close_all();

    for s in stats.iter().filter(|s| !s.name.is_empty()) {
        println!(
            "{}: {} frames decoded, {} presented, {} finish(es), {} error(s)",
            s.name, s.decoded, s.presented, s.finishes, s.errors
        );
    }

    Ok(())
}
