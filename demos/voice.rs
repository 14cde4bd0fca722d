use clap::Parser;
use gemini_live::native::{list_devices, CpalMicrophone, CpalOutput};
use gemini_live::session::share::{Facing, ShareMode};
use gemini_live::types::audio::Voice;
use gemini_live::utils::tap::SharedTap;
use gemini_live::{AppConfig, Command, Config, GeminiConnector, Input, SessionController};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser, Debug)]
#[command(version, about = "Talk to a Gemini Live model from the terminal")]
struct Args {
    /// Prebuilt voice, e.g. Puck, Charon, Kore, Fenrir or Aoede
    #[arg(long)]
    voice: Option<String>,

    /// Enable Google Search grounding and the chart function
    #[arg(long)]
    tools: bool,

    #[arg(long)]
    input_device: Option<String>,

    #[arg(long)]
    output_device: Option<String>,

    /// Print the available audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

const HELP: &str = "commands: r (toggle mic), v NAME (voice), t (toggle tools), s (share screen), c (share camera), x (stop share), n (new session), q (quit)";

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match words.next()? {
        "r" => Command::ToggleRecording,
        "v" => Command::SetVoice(words.next()?.parse::<Voice>().ok()?),
        "t" => Command::ToggleTools,
        "s" => Command::StartShare(ShareMode::Screen),
        "c" => Command::StartShare(ShareMode::Camera(Facing::User)),
        "x" => Command::StopShare,
        "n" => Command::Reset,
        "q" => Command::Shutdown,
        _ => return None,
    };
    Some(command)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.list_devices {
        println!("{}", list_devices()?);
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let mut settings = config.session.clone();
    if let Some(voice) = args.voice.and_then(|name| name.parse::<Voice>().ok()) {
        settings = settings.with_voice(voice);
    }
    if args.tools {
        settings = settings.with_tools_enabled(true);
    }

    let connector = Arc::new(GeminiConnector::new(
        Config::builder()
            .with_api_key(config.api_key.expose_secret())
            .with_model(&config.model)
            .build(),
    ));

    let (tx, rx) = mpsc::channel::<Input>(1024);
    let output_tap = SharedTap::default();
    let output = CpalOutput::open(args.output_device, tx.clone(), output_tap.clone())?;

    let controller = SessionController::new(connector.clone(), output, tx.clone())
        .with_settings(settings)
        .with_microphone(CpalMicrophone::new(args.input_device));

    let mut status = controller.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let line = status.borrow_and_update().clone();
            if !line.error.is_empty() {
                eprintln!("error: {}", line.error);
            } else if !line.status.is_empty() {
                println!("status: {}", line.status);
            }
        }
    });

    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Some(command) => {
                    if stdin_tx.send(Input::Command(command)).await.is_err() {
                        break;
                    }
                }
                None => println!("{}", HELP),
            }
        }
    });

    let ctrl_c_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            let _ = ctrl_c_tx.send(Input::Command(Command::Shutdown)).await;
        }
    });
    drop(tx);

    let history = controller.run(rx).await;
    let stats = connector.stats();
    tracing::info!(
        "tokens: prompt={}, response={}, total={}",
        stats.prompt_tokens(),
        stats.response_tokens(),
        stats.total_tokens()
    );
    let peak = output_tap.frequency_data().into_iter().max().unwrap_or(0);
    tracing::debug!("final output spectrum peak: {}", peak);
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
