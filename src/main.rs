use std::io::{BufRead, Write};
use std::sync::Arc;

use tarot_recorder::api_key;
use tarot_recorder::app::{Notifier, TarotApp};
use tarot_recorder::conversation::engine::LineGenerator;
use tarot_recorder::conversation::gemini::{self, GeminiClient};
use tarot_recorder::conversation::scenarios;
use tarot_recorder::recorder::format_elapsed;
use tarot_recorder::settings;
use tarot_recorder::speech::{NullSpeech, PlatformSpeech, SpeechBackend};
use tarot_recorder::storage::format_file_size;

/// Blocking console notifications; the terminal stands in for the modal
/// dialogs of a windowed shell.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("\n>> {}", message);
    }

    fn confirm(&self, message: &str) -> bool {
        print!("{} [y/N] ", message);
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

const HELP: &str = "Commands:
  scenarios            list the available client personas
  select <id>          choose a persona (e.g. select love)
  devices              list the available input devices
  capture              start the microphone
  release              release the microphone
  record               start recording; the client opens the consultation
  say <your line>      answer as the teacher; the client replies and speaks
  skip                 cut the client's speech short
  pause                pause/resume the recording
  elapsed              show the recording time
  stop                 stop, save the recording, update history
  test-api             probe the Gemini endpoint with the configured key
  key-status           show where the Gemini API key comes from
  set-key <key>        store the Gemini API key in the system keyring
  clear-key            delete the Gemini API key from the system keyring
  history              list saved recordings
  clear-history        delete all history entries
  quit                 exit";

#[tokio::main]
async fn main() {
    // Load .env file if present (for development convenience)
    // Silently ignore if not found - production uses system env vars
    let _ = dotenvy::dotenv();

    // fmt's log bridge carries the crate's `log` records too.
    tracing_subscriber::fmt::init();

    let app_settings = settings::load_settings();

    let gemini_key = gemini::resolve_api_key(&app_settings).unwrap_or_else(|| {
        log::warn!("No Gemini API key configured; the client will use scripted lines only");
        String::new()
    });
    let generator: Arc<dyn LineGenerator> = Arc::new(GeminiClient::new(gemini_key.clone()));

    let speech_backend: Arc<dyn SpeechBackend> = match PlatformSpeech::new() {
        Ok(platform) => Arc::new(platform),
        Err(e) => {
            log::warn!("Speech synthesis unavailable: {}", e);
            Arc::new(NullSpeech)
        }
    };

    let mut app = TarotApp::new(
        app_settings,
        generator,
        speech_backend,
        Arc::new(ConsoleNotifier),
    );

    println!("Tarot practice session recorder");
    println!("{}", HELP);

    let stdin = std::io::stdin();
    loop {
        print!("\n> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::error!("Failed to read input: {}", e);
                break;
            }
        }

        let input = line.trim();
        let (command, argument) = match input.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match command {
            "" => {}
            "help" => println!("{}", HELP),
            "scenarios" => {
                for scenario in scenarios::all_scenarios() {
                    println!(
                        "  {} {:10} {} — {}",
                        scenario.icon, scenario.id, scenario.name, scenario.description
                    );
                }
            }
            "select" => app.select_scenario(argument),
            "devices" => {
                let devices = tarot_recorder::capture::list_input_devices();
                if devices.is_empty() {
                    println!("  No input devices found");
                }
                for name in devices {
                    println!("  {}", name);
                }
            }
            "capture" => app.start_capture(),
            "release" => app.stop_capture(),
            "record" => app.start_recording().await,
            "say" if argument.is_empty() => {
                println!("Usage: say <your line as the teacher>")
            }
            "say" => app.next_turn(argument).await,
            "test-api" => {
                match GeminiClient::new(gemini_key.clone()).test_connection().await {
                    Ok(true) => println!("  Gemini API reachable, key accepted"),
                    Ok(false) => println!("  Gemini API rejected the key"),
                    Err(e) => println!("  Gemini API check failed: {}", e),
                }
            }
            "key-status" => {
                if gemini::is_api_key_configured(app.settings()) {
                    println!("  Gemini API key configured");
                } else {
                    println!("  No Gemini API key configured; scripted lines only");
                }
                if api_key::is_gemini_key_stored() {
                    match api_key::get_masked_gemini_key() {
                        Some(masked) => println!("  Keyring entry: {}", masked),
                        None => println!("  Keyring entry present"),
                    }
                } else {
                    println!("  No keyring entry");
                }
            }
            "set-key" if argument.is_empty() => {
                println!("Usage: set-key <gemini api key>")
            }
            "set-key" => match api_key::set_gemini_api_key(Some(argument)) {
                Ok(()) => println!("  Key stored in the system keyring; used on next start"),
                Err(e) => println!("  Could not store the key: {}", e),
            },
            "clear-key" => match api_key::set_gemini_api_key(None) {
                Ok(()) => println!("  Keyring entry removed"),
                Err(e) => println!("  Could not remove the key: {}", e),
            },
            "skip" => app.skip_speech(),
            "pause" => app.pause_recording(),
            "elapsed" => println!("  {}", format_elapsed(app.elapsed_seconds())),
            "stop" => app.stop_recording().await,
            "history" => {
                let entries = app.history_entries();
                if entries.is_empty() {
                    println!("  No recordings yet");
                }
                for entry in entries {
                    println!(
                        "  {}  {}  {}  [{}]",
                        entry.filename,
                        format_file_size(entry.size_bytes),
                        format_elapsed(entry.duration_secs),
                        entry.storage
                    );
                }
            }
            "clear-history" => app.clear_history(),
            "quit" | "exit" => break,
            other => println!("Unknown command: {} (try `help`)", other),
        }
    }

    app.stop_capture();
    log::info!("Goodbye");
}
