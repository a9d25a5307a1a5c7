//! narrate - Convert EPUB files to narrated audio using pluggable TTS providers

mod audio;
mod book;
mod config;
mod error;
mod narrator;
mod text;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::NarratorConfig;
use env_logger::Env;
use narrator::{AudiobookGenerator, NarratorOptions};
use std::path::{Path, PathBuf};
use tts_client::VoiceParameters;

use book::{NewlineMode, ParserConfig, TitleMode};

#[derive(Parser, Debug)]
#[command(name = "narrate")]
#[command(about = "Convert EPUB files to narrated audio using pluggable TTS providers", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the book file
    input_file: Option<PathBuf>,

    /// Output folder (default: folder named after the book, next to it)
    output_folder: Option<PathBuf>,

    /// TTS provider (azure, openai, edge, piper)
    #[arg(long)]
    tts: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log: LogLevel,

    /// List chapters without synthesizing audio
    #[arg(long)]
    preview: bool,

    /// Language tag, e.g. en-US or zh-CN
    #[arg(long)]
    language: Option<String>,

    /// How paragraph breaks are detected
    #[arg(long, value_enum)]
    newline_mode: Option<NewlineMode>,

    /// How chapter titles are chosen
    #[arg(long, value_enum)]
    title_mode: Option<TitleMode>,

    /// First chapter to narrate (1-based)
    #[arg(long, default_value_t = 1)]
    chapter_start: i64,

    /// Last chapter to narrate (1-based, -1 for the last chapter)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    chapter_end: i64,

    /// Write each chapter's text next to its audio
    #[arg(long)]
    output_text: bool,

    /// Strip endnote numbers that follow words or punctuation
    #[arg(long)]
    remove_endnotes: bool,

    /// File of `search==replace` rules applied to chapter text
    #[arg(long)]
    search_and_replace_file: Option<PathBuf>,

    /// Voice name
    #[arg(long)]
    voice_name: Option<String>,

    /// Provider output format identifier
    #[arg(long)]
    output_format: Option<String>,

    /// Model name (openai) or model file (piper)
    #[arg(long)]
    model_name: Option<String>,

    /// Speaking rate, e.g. +10%
    #[arg(long, allow_hyphen_values = true)]
    voice_rate: Option<String>,

    /// Volume, e.g. -20%
    #[arg(long, allow_hyphen_values = true)]
    voice_volume: Option<String>,

    /// Pitch, e.g. +5Hz
    #[arg(long, allow_hyphen_values = true)]
    voice_pitch: Option<String>,

    /// Proxy URL (edge)
    #[arg(long)]
    proxy: Option<String>,

    /// Pause at section breaks in milliseconds (azure)
    #[arg(long)]
    break_duration: Option<u32>,

    /// Speaker id for multi-speaker models (piper)
    #[arg(long)]
    piper_speaker: Option<u32>,

    /// Seconds of silence after each sentence (piper)
    #[arg(long)]
    piper_sentence_silence: Option<f32>,

    /// Phoneme length scale (piper)
    #[arg(long)]
    piper_length_scale: Option<f32>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List available TTS providers
    Providers,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the default TTS provider
    SetTts {
        /// Provider name
        name: String,
    },
    /// Set the default language tag
    SetLanguage {
        /// Language tag, e.g. en-US
        language: String,
    },
    /// Set the default voice name
    SetVoice {
        /// Voice name
        name: String,
    },
    /// Set the chunk limit for a provider
    SetChunkLimit {
        /// Provider name
        provider: String,
        /// Maximum characters per request
        limit: usize,
    },
    /// Store an API key for a provider
    SetApiKey {
        /// Provider name
        provider: String,
        /// API key
        key: String,
    },
    /// Set the executable for a CLI provider
    SetExecutable {
        /// Provider name
        provider: String,
        /// Path to the executable
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(args.log.as_filter())).init();

    match &args.command {
        Some(Commands::Config { action }) => {
            return handle_config_command(action);
        }
        Some(Commands::Providers) => {
            for name in tts_client::list_supported_providers() {
                println!("{}", name);
            }
            return Ok(());
        }
        None => {}
    }

    let input_file = args
        .input_file
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Input file path is required. Run 'narrate --help' for usage."))?;

    if !input_file.exists() {
        anyhow::bail!("Input file not found: {}", input_file.display());
    }

    let config = NarratorConfig::load().context("Failed to load configuration")?;

    let tts = args.tts.clone().unwrap_or_else(|| config.tts.clone());
    let provider = narrator::create_tts_provider(&tts, &config.provider_config(&tts))
        .with_context(|| format!("Failed to set up TTS provider '{}'", tts))?;

    let parser_config = ParserConfig {
        input_file: input_file.clone(),
        title_mode: args.title_mode.unwrap_or(config.title_mode),
        newline_mode: args.newline_mode.unwrap_or(config.newline_mode),
        remove_endnotes: args.remove_endnotes || config.remove_endnotes,
        search_and_replace_file: args.search_and_replace_file.clone(),
    };
    let parser = book::get_book_parser(&parser_config)
        .with_context(|| {
            format!(
                "Failed to open {} (supported formats: {})",
                input_file.display(),
                book::supported_book_parsers().join(", ")
            )
        })?;
    log::info!(
        "Book: \"{}\" by {}, {} search and replace rules",
        parser.book_title(),
        parser.book_author(),
        parser.search_and_replaces().len()
    );

    let language = args.language.clone().unwrap_or_else(|| config.language.clone());
    let options = NarratorOptions {
        output_folder: args
            .output_folder
            .clone()
            .unwrap_or_else(|| default_output_folder(&input_file)),
        voice: voice_parameters(&args, &config.voice, &language),
        chunk_limit: config.chunk_limit(&tts),
        language,
        chapter_start: args.chapter_start,
        chapter_end: args.chapter_end,
        output_text: args.output_text,
        show_progress: !args.preview,
    };

    let generator = AudiobookGenerator::new(parser, provider, options);

    if args.preview {
        let summaries = generator.preview()?;
        for summary in &summaries {
            println!(
                "{:>4}  {:<50}  {} chars",
                summary.index, summary.title, summary.char_count
            );
        }
        let total: usize = summaries.iter().map(|s| s.char_count).sum();
        println!("{} chapters, {} characters", summaries.len(), total);
        return Ok(());
    }

    let summary = generator.run().await?;
    eprintln!(
        "Narrated {} chapters ({} chunks) into {}",
        summary.chapters,
        summary.chunks,
        generator.output_folder().display()
    );

    Ok(())
}

/// `<dir>/<stem>` next to the input file.
fn default_output_folder(input_file: &Path) -> PathBuf {
    let stem = input_file.file_stem().unwrap_or_default();
    input_file.with_file_name(stem)
}

/// Voice settings from the command line, falling back to the config file.
fn voice_parameters(args: &Args, defaults: &VoiceParameters, language: &str) -> VoiceParameters {
    VoiceParameters {
        language: Some(language.to_string()),
        voice_name: args.voice_name.clone().or_else(|| defaults.voice_name.clone()),
        output_format: args
            .output_format
            .clone()
            .or_else(|| defaults.output_format.clone()),
        model_name: args.model_name.clone().or_else(|| defaults.model_name.clone()),
        voice_rate: args.voice_rate.clone().or_else(|| defaults.voice_rate.clone()),
        voice_volume: args
            .voice_volume
            .clone()
            .or_else(|| defaults.voice_volume.clone()),
        voice_pitch: args.voice_pitch.clone().or_else(|| defaults.voice_pitch.clone()),
        proxy: args.proxy.clone().or_else(|| defaults.proxy.clone()),
        break_duration_ms: args.break_duration.or(defaults.break_duration_ms),
        piper_speaker: args.piper_speaker.or(defaults.piper_speaker),
        piper_sentence_silence: args
            .piper_sentence_silence
            .or(defaults.piper_sentence_silence),
        piper_length_scale: args.piper_length_scale.or(defaults.piper_length_scale),
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = NarratorConfig::load()?;
            println!("Configuration file: {:?}", NarratorConfig::config_path()?);
            println!();
            println!("tts = \"{}\"", config.tts);
            println!("language = \"{}\"", config.language);
            println!("title_mode = {:?}", config.title_mode);
            println!("newline_mode = {:?}", config.newline_mode);
            println!("remove_endnotes = {}", config.remove_endnotes);
            match &config.voice.voice_name {
                Some(voice) => println!("voice_name = \"{}\"", voice),
                None => println!("voice_name = (provider default)"),
            }
            for (provider, limit) in &config.chunk_limits {
                println!("chunk_limits.{} = {}", provider, limit);
            }
            for (name, provider) in &config.providers {
                let key = if provider.api_key.is_some() { "(set)" } else { "(none)" };
                println!("providers.{}.api_key = {}", name, key);
                if let Some(exe) = &provider.executable {
                    println!("providers.{}.executable = \"{}\"", name, exe.display());
                }
            }
        }
        ConfigAction::SetTts { name } => {
            if !tts_client::is_supported(name) {
                anyhow::bail!(
                    "Unknown TTS provider '{}'. Available: {}",
                    name,
                    tts_client::list_supported_providers().join(", ")
                );
            }
            let mut config = NarratorConfig::load()?;
            config.tts = name.to_lowercase();
            config.save()?;
            println!("Default TTS provider set to: {}", config.tts);
        }
        ConfigAction::SetLanguage { language } => {
            let mut config = NarratorConfig::load()?;
            config.language = language.clone();
            config.save()?;
            println!("Default language set to: {}", language);
        }
        ConfigAction::SetVoice { name } => {
            let mut config = NarratorConfig::load()?;
            config.voice.voice_name = Some(name.clone());
            config.save()?;
            println!("Default voice set to: {}", name);
        }
        ConfigAction::SetChunkLimit { provider, limit } => {
            if *limit == 0 {
                anyhow::bail!("Chunk limit must be greater than zero");
            }
            let mut config = NarratorConfig::load()?;
            config.chunk_limits.insert(provider.to_lowercase(), *limit);
            config.save()?;
            println!("Chunk limit for {} set to: {}", provider, limit);
        }
        ConfigAction::SetApiKey { provider, key } => {
            let mut config = NarratorConfig::load()?;
            config.provider_config_mut(provider).api_key = Some(key.clone());
            config.save()?;
            println!("API key for {} saved", provider);
        }
        ConfigAction::SetExecutable { provider, path } => {
            let mut config = NarratorConfig::load()?;
            config.provider_config_mut(provider).executable = Some(path.clone());
            config.save()?;
            println!("Executable for {} set to: {}", provider, path.display());
        }
    }
    Ok(())
}
