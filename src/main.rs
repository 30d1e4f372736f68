use log::{error, info, warn};
use metronome::audio::status::SinkStatus;
use metronome::haptics::NoHapticDevice;
use metronome::messaging::channels::{NotificationConsumer, NotificationProducer};
use metronome::messaging::notification::{
    Notification, NotificationCategory, NotificationLevel, try_notify,
};
use metronome::{
    AudioOutput, AudioSink, ClickSound, HapticEngine, HostClock, Meter, MetronomeSettings,
    Metronome, MonotonicClock, NullAudioSink, PulseMonitor, SettingsStore, Tempo,
    create_beat_channel, create_notification_channel,
};
use ringbuf::traits::Consumer;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// Ringbuffer capacity constants
// At 300 BPM a 64-slot beat buffer holds over 12 seconds of beats
const BEAT_RINGBUFFER_CAPACITY: usize = 64;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;

/// Longest sleep of the pulse printer, so it notices shutdown promptly
const PULSE_POLL_MAX: Duration = Duration::from_millis(10);

struct Args {
    verbose: bool,
    bpm: Option<f64>,
    meter: Option<u32>,
    settings_path: Option<PathBuf>,
    save: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    };

    Args {
        verbose: args.iter().any(|a| a == "--verbose" || a == "-v"),
        bpm: value_of("--bpm").and_then(|s| s.parse().ok()),
        meter: value_of("--meter").and_then(|s| s.parse().ok()),
        settings_path: value_of("--settings").map(PathBuf::from),
        save: !args.iter().any(|a| a == "--no-save"),
    }
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Logger unavailable: {}", e);
    }

    info!("metronome starting (log level: {:?})", log_level);
}

enum Command {
    Start,
    Stop,
    Tap,
    Bpm(f64),
    Nudge(f64),
    Meter(u32),
    Sound(ClickSound),
    Mute,
    Haptics,
    Sync,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(Command::Tap);
    };
    let arg = words.next();

    let command = match word {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "t" | "tap" => Command::Tap,
        "+" => Command::Nudge(1.0),
        "-" => Command::Nudge(-1.0),
        "mute" => Command::Mute,
        "haptics" => Command::Haptics,
        "sync" => Command::Sync,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "q" | "quit" => Command::Quit,
        "bpm" => {
            let bpm = arg
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or("usage: bpm <number>")?;
            Command::Bpm(bpm)
        }
        "meter" => {
            let beats = arg
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or("usage: meter <beats per bar>")?;
            Command::Meter(beats)
        }
        "sound" => {
            let sound = arg.ok_or("usage: sound <beep|wood|noise|square>")?;
            Command::Sound(sound.parse()?)
        }
        other => return Err(format!("Unknown command '{}', try 'help'", other)),
    };
    Ok(command)
}

fn print_help() {
    println!("Commands:");
    println!("  start | stop          transport");
    println!("  t, tap, <enter>       tap tempo");
    println!("  bpm <n> | + | -       set or nudge tempo (20-300)");
    println!("  meter <n>             beats per bar (1-12)");
    println!("  sound <kind>          beep, wood, noise, square");
    println!("  mute | haptics        toggle outputs");
    println!("  sync                  restart the bar now");
    println!("  status | help | quit");
}

/// Everything a command may touch
struct Session {
    metronome: Metronome,
    audio: Option<AudioOutput>,
    haptics_available: bool,
    notification_tx: Arc<Mutex<NotificationProducer>>,
}

impl Session {
    fn execute(&self, command: Command) {
        let metronome = &self.metronome;
        match command {
            Command::Start => match metronome.start() {
                Ok(true) => println!("Started at {}", metronome.tempo()),
                Ok(false) => println!("Already running"),
                Err(e) => {
                    error!("Start failed: {}", e);
                    try_notify(
                        &self.notification_tx,
                        Notification::error(NotificationCategory::Scheduler, e.to_string()),
                    );
                }
            },
            Command::Stop => {
                if !metronome.stop() {
                    println!("Not running");
                }
            }
            Command::Tap => match metronome.record_tap(Instant::now()) {
                Some(tempo) => println!("Tap: {}", tempo),
                None => println!("Tap... keep going"),
            },
            Command::Bpm(bpm) => println!("{}", metronome.set_tempo(bpm)),
            Command::Nudge(delta) => println!("{}", metronome.nudge_tempo(delta)),
            Command::Meter(beats) => println!("Meter {}", metronome.set_meter(beats)),
            Command::Sound(sound) => {
                metronome.set_sound(sound);
                println!("Sound: {}", sound);
            }
            Command::Mute => {
                let enabled = !metronome.sound_enabled();
                metronome.set_sound_enabled(enabled);
                println!("Sound {}", if enabled { "on" } else { "off" });
            }
            Command::Haptics => {
                let enabled = !metronome.haptics_enabled();
                metronome.set_haptics_enabled(enabled);
                println!("Haptics {}", if enabled { "on" } else { "off" });
                if enabled && !self.haptics_available {
                    try_notify(
                        &self.notification_tx,
                        Notification::info(
                            NotificationCategory::Haptics,
                            "No haptics hardware, pulses will not be felt".to_string(),
                        ),
                    );
                }
            }
            Command::Sync => {
                if !metronome.resync_phase() {
                    println!("Not running");
                }
            }
            Command::Status => self.print_status(),
            Command::Help => print_help(),
            Command::Quit => {}
        }
    }

    fn print_status(&self) {
        let metronome = &self.metronome;
        let audio = match &self.audio {
            Some(output) if output.status() == SinkStatus::Ready => format!(
                "{} Hz, {} ch",
                output.sample_rate(),
                output.channels()
            ),
            Some(output) => format!("{:?}", output.status()),
            None => "unavailable".to_string(),
        };

        println!(
            "{} | {} | {} | sound {} ({}) | haptics {}",
            if metronome.is_running() { "running" } else { "stopped" },
            metronome.tempo(),
            metronome.meter(),
            metronome.sound(),
            if metronome.sound_enabled() { "on" } else { "muted" },
            if metronome.haptics_enabled() { "on" } else { "off" },
        );
        println!("audio: {}", audio);
    }
}

fn drain_notifications(rx: &mut NotificationConsumer) {
    while let Some(notification) = rx.try_pop() {
        let label = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        println!(
            "[{} {:?}] {}",
            label, notification.category, notification.message
        );
    }
}

/// Print a marker for every beat at the moment it sounds
fn spawn_pulse_printer(
    mut monitor: PulseMonitor,
    running: Arc<AtomicBool>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("pulse".to_string())
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                while let Some(beat) = monitor.poll() {
                    print!("{}", if beat.accent { "\n* " } else { ". " });
                    let _ = io::stdout().flush();
                }
                let delay = monitor
                    .next_delay()
                    .map_or(PULSE_POLL_MAX, |d| d.min(PULSE_POLL_MAX));
                thread::sleep(delay);
            }
        })
}

fn load_settings(
    store: Option<&SettingsStore>,
    notification_tx: &Mutex<NotificationProducer>,
) -> MetronomeSettings {
    let Some(store) = store else {
        return MetronomeSettings::default();
    };

    store.load().unwrap_or_else(|e| {
        warn!("Ignoring settings at {}: {}", store.path().display(), e);
        try_notify(
            notification_tx,
            Notification::warning(
                NotificationCategory::Settings,
                format!("Settings not loaded: {}", e),
            ),
        );
        MetronomeSettings::default()
    })
}

fn main() {
    let args = parse_args();
    init_logging(args.verbose);

    println!("=== Metronome ===");

    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let notification_tx = Arc::new(Mutex::new(notification_tx));

    let store = match args.settings_path {
        Some(path) => Some(SettingsStore::new(path)),
        None => SettingsStore::open_default()
            .map_err(|e| warn!("Settings disabled: {}", e))
            .ok(),
    };
    let mut settings = load_settings(store.as_ref(), &notification_tx);
    if let Some(bpm) = args.bpm {
        settings.bpm = Tempo::new(bpm);
    }
    if let Some(beats) = args.meter {
        settings.beats_per_bar = Meter::new(beats);
    }

    let clock: Arc<dyn HostClock> = Arc::new(MonotonicClock::new());

    // Without an output device the metronome still runs, silently
    let (audio, audio_sink): (Option<AudioOutput>, Box<dyn AudioSink>) =
        match AudioOutput::open(Arc::clone(&clock), Arc::clone(&notification_tx)) {
            Ok((output, sink)) => (Some(output), Box::new(sink)),
            Err(e) => {
                error!("Audio init failed: {}", e);
                try_notify(
                    &notification_tx,
                    Notification::error(
                        NotificationCategory::Audio,
                        format!("No audio output: {}", e),
                    ),
                );
                (None, Box::new(NullAudioSink::default()))
            }
        };

    let haptics = HapticEngine::prepare(NoHapticDevice, Arc::clone(&clock));
    let haptics_available = haptics.is_available();

    let (beat_tx, beat_rx) = create_beat_channel(BEAT_RINGBUFFER_CAPACITY);
    let metronome = Metronome::new(
        Arc::clone(&clock),
        settings.scheduler,
        audio_sink,
        Box::new(haptics),
    )
    .with_beat_output(beat_tx);
    metronome.apply_settings(&settings);

    let running = Arc::new(AtomicBool::new(true));
    let pulse_thread = match spawn_pulse_printer(
        PulseMonitor::new(beat_rx, Arc::clone(&clock)),
        Arc::clone(&running),
    ) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("No beat display: {}", e);
            None
        }
    };

    let session = Session {
        metronome,
        audio,
        haptics_available,
        notification_tx,
    };

    print_help();
    session.print_status();
    drain_notifications(&mut notification_rx);

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("stdin: {}", e);
                break;
            }
        };

        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => session.execute(command),
            Err(message) => println!("{}", message),
        }
        drain_notifications(&mut notification_rx);
    }

    session.metronome.stop();
    running.store(false, Ordering::Relaxed);
    if let Some(handle) = pulse_thread {
        let _ = handle.join();
    }

    if args.save {
        if let Some(store) = &store {
            match store.save(&session.metronome.settings()) {
                Ok(()) => info!("Settings saved to {}", store.path().display()),
                Err(e) => error!("Failed to save settings: {}", e),
            }
        }
    }

    println!("\nBye");
}
