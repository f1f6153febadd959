use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use shadowplay_core::{
    load_beat_durations, EngineConfig, Episode, HeadlessBackend, Recorder, RecordingSettings,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> shadowplay_core::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Play {
            episode,
            durations,
            durations_file,
            cue_log,
            config,
        } => {
            let settings = RecordingSettings {
                cue_log_path: cue_log,
                beat_durations: match durations_file {
                    Some(path) => load_beat_durations(path)?,
                    None => durations,
                },
            };
            run_play(&episode, config.as_ref(), settings).await
        }
        Commands::Inspect { episode } => run_inspect(&episode),
    }
}

async fn run_play(
    episode: &PathBuf,
    config: Option<&PathBuf>,
    settings: RecordingSettings,
) -> shadowplay_core::Result<()> {
    let config = match config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let episode = Arc::new(Episode::from_path(episode)?);
    tracing::info!(title = episode.title(), "playing episode headlessly");

    let mut recorder = Recorder::new(episode, Box::new(HeadlessBackend::new()), config);
    recorder.set_beat_durations(settings.beat_durations);
    let report = recorder.start_playback().await?;
    recorder.write_cue_log(&settings.cue_log_path)?;

    println!(
        "played {} scenes / {} beats in {:.1}s, {} cues written to {}",
        report.scenes,
        report.beats,
        report.elapsed.as_secs_f64(),
        report.cues,
        settings.cue_log_path
    );
    Ok(())
}

fn run_inspect(path: &PathBuf) -> shadowplay_core::Result<()> {
    let episode = Episode::from_path(path)?;

    println!("Episode: {}", episode.title());
    println!("  Scenes: {}", episode.scenes.len());
    println!("  Beats: {}", episode.beat_count());
    println!("  Cues: {}", episode.cue_count());
    if let Some(meta) = &episode.episode {
        println!("  Voice: {} ({})", meta.narration.voice, meta.narration.rate);
    }

    let mut beat_index = 0;
    for scene in &episode.scenes {
        println!(
            "\n[{}] background={} characters={} props={}",
            scene.id,
            scene.background,
            scene.characters_on_stage.len(),
            scene.props_on_stage.len()
        );
        for beat in &scene.beats {
            let preview: String = beat.narration.chars().take(60).collect();
            let tags: Vec<&str> = beat.actions.iter().map(|action| action.tag()).collect();
            println!("  {beat_index:>3}  {preview:<60}  [{}]", tags.join(", "));
            beat_index += 1;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Narrated shadow-puppet episode player", long_about = None)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play an episode in real time and write the audio cue log.
    Play {
        /// Path to the episode JSON script.
        episode: PathBuf,
        /// Narration duration per beat in milliseconds, comma separated.
        #[arg(short, long, value_delimiter = ',', conflicts_with = "durations_file")]
        durations: Vec<u64>,
        /// JSON file holding the narration durations as an array.
        #[arg(long)]
        durations_file: Option<PathBuf>,
        /// Output path for the cue log.
        #[arg(short, long, default_value = "audio_cues.json")]
        cue_log: String,
        /// Optional engine configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate an episode and print its scene and beat outline.
    Inspect {
        /// Path to the episode JSON script.
        episode: PathBuf,
    },
}
