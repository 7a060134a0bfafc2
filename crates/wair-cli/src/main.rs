use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use wair_contracts::chat::{parse_intent, ChatMessage, Role, CHAT_HELP_COMMANDS};
use wair_contracts::events::EventLog;
use wair_contracts::stores::JsonFileStore;
use wair_contracts::{Category, NewWardrobeItem, ResolvedOutfit, WardrobeItem};
use wair_engine::codec::{decode_data_url, extension_for_mime};
use wair_engine::prompts::QUICK_START_SUGGESTIONS;
use wair_engine::{AppState, ChatRequest, ChatTurn, EngineConfig, StylingOrchestrator};

#[derive(Debug, Parser)]
#[command(name = "wair", version, about = "WAIR wardrobe stylist")]
struct Cli {
    /// Directory holding per-user documents, the event log and try-on renders.
    #[arg(long, env = "WAIR_DATA_DIR", default_value = ".wair", global = true)]
    data_dir: PathBuf,
    #[arg(long, env = "WAIR_USER", default_value = "default", global = true)]
    user: String,
    /// Used when neither GEMINI_API_KEY nor GOOGLE_API_KEY is set.
    #[arg(long, env = "WAIR_FALLBACK_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Wardrobe(WardrobeCommand),
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Chats(ChatsCommand),
    Chat(ChatArgs),
    TryOn(TryOnArgs),
}

#[derive(Debug, Subcommand)]
enum WardrobeCommand {
    List,
    /// Analyse a garment photo and add it. Flags override the analysis.
    Add(AddArgs),
    Delete {
        id: String,
    },
    /// Add the demo items (existing demo items are replaced).
    Seed,
    /// Delete everything and reseed the demo wardrobe.
    Reset,
    Insights,
}

#[derive(Debug, Parser)]
struct AddArgs {
    photo: String,
    #[arg(long, default_value_t = 5)]
    formality: u8,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    subcategory: Option<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    material: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    Show,
    AddPhoto { photo: String },
    /// Zero-based gallery index.
    RemovePhoto { index: usize },
}

#[derive(Debug, Subcommand)]
enum ChatsCommand {
    List,
    Delete { id: String },
}

#[derive(Debug, Parser)]
struct ChatArgs {
    /// Resume an existing session instead of starting a new one.
    #[arg(long)]
    session: Option<String>,
}

#[derive(Debug, Parser)]
struct TryOnArgs {
    #[arg(long)]
    session: String,
    /// One-based outfit number, counted across the session's replies.
    #[arg(long)]
    outfit: usize,
    /// Zero-based gallery index; defaults to the primary photo.
    #[arg(long)]
    photo: Option<usize>,
    #[arg(long)]
    out: PathBuf,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("wair error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wair_cli=info,wair_engine=info,wair_contracts=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let state = AppState::with_file_store(&cli.user, JsonFileStore::new(&cli.data_dir));
    let events_path = cli
        .events
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("events.jsonl"));
    let config = EngineConfig::from_env().with_fallback_api_key(cli.api_key.clone());
    let events = EventLog::new(events_path, &cli.user);
    tracing::debug!(path = %events.path().display(), "styling events");
    let orchestrator = StylingOrchestrator::new(config).with_events(events);

    match cli.command {
        Command::Wardrobe(WardrobeCommand::Seed) => {
            println!("Seeded {} demo items.", state.seed_demo()?);
            return Ok(0);
        }
        Command::Wardrobe(WardrobeCommand::Reset) => {
            println!("Wardrobe reset with {} demo items.", state.reset_wardrobe()?);
            return Ok(0);
        }
        command => {
            state.ensure_defaults()?;
            match command {
                Command::Wardrobe(command) => run_wardrobe(&state, &orchestrator, command)?,
                Command::Profile(command) => run_profile(&state, &orchestrator, command)?,
                Command::Chats(command) => run_chats(&state, command)?,
                Command::Chat(args) => run_chat(&state, &orchestrator, &cli.data_dir, args)?,
                Command::TryOn(args) => run_try_on(&state, &orchestrator, args)?,
            }
        }
    }
    Ok(0)
}

fn run_wardrobe(
    state: &AppState,
    orchestrator: &StylingOrchestrator,
    command: WardrobeCommand,
) -> Result<()> {
    match command {
        WardrobeCommand::List => print_wardrobe(&state.wardrobe()?),
        WardrobeCommand::Add(args) => {
            let item = add_garment(state, orchestrator, args)?;
            println!("Added {} ({}) as {}", item.label(), item.category(), item.id());
        }
        WardrobeCommand::Delete { id } => {
            if !state.delete_item(&id)? {
                bail!("no wardrobe item with id {id}");
            }
            println!("Deleted {id}");
        }
        WardrobeCommand::Insights => {
            let items = state.wardrobe()?;
            if items.is_empty() {
                bail!("wardrobe is empty");
            }
            let insights = orchestrator.wardrobe_insights(&items)?;
            println!("Style: {}", insights.style);
            println!("Palette: {}", insights.palette.join(", "));
            println!("Missing pieces:");
            for missing in insights.missing {
                println!("  - {missing}");
            }
        }
        WardrobeCommand::Seed | WardrobeCommand::Reset => {}
    }
    Ok(())
}

fn add_garment(
    state: &AppState,
    orchestrator: &StylingOrchestrator,
    args: AddArgs,
) -> Result<WardrobeItem> {
    let image = orchestrator.prepare_photo(&args.photo)?;
    let manual_category = args
        .category
        .as_deref()
        .map(|raw| raw.parse::<Category>().map_err(anyhow::Error::msg))
        .transpose()?;

    let mut draft = match (&manual_category, &args.subcategory, &args.color) {
        (Some(category), Some(subcategory), Some(color)) => NewWardrobeItem {
            category: *category,
            subcategory: subcategory.clone(),
            color: color.clone(),
            material: None,
            formality: args.formality,
            image,
            description: None,
        },
        _ => orchestrator
            .analyze_garment(&image)
            .context("Failed to analyze image. Pass --category, --subcategory and --color to add it manually")?
            .into_item(image, args.formality),
    };

    if let Some(category) = manual_category {
        draft.category = category;
    }
    if let Some(subcategory) = args.subcategory {
        draft.subcategory = subcategory;
    }
    if let Some(color) = args.color {
        draft.color = color;
    }
    if let Some(material) = args.material {
        draft.material = Some(material);
    }
    state.add_item(draft)
}

fn run_profile(
    state: &AppState,
    orchestrator: &StylingOrchestrator,
    command: ProfileCommand,
) -> Result<()> {
    match command {
        ProfileCommand::Show => {
            let profile = state.profile()?;
            match &profile.attributes {
                Some(attributes) => {
                    println!("Gender:    {}", or_dash(&attributes.gender));
                    println!("Hair:      {}", or_dash(&attributes.hair));
                    println!("Skin tone: {}", or_dash(&attributes.skin_tone));
                    println!("Body type: {}", or_dash(&attributes.body_type));
                    println!("Summary:   {}", or_dash(&attributes.summary));
                }
                None => println!("No analysis yet."),
            }
            for (index, photo) in profile.gallery.iter().enumerate() {
                let marker = if index == 0 { " (primary)" } else { "" };
                println!("[{index}] {}{marker}", photo_label(photo));
            }
        }
        ProfileCommand::AddPhoto { photo } => {
            let update = orchestrator.analyze_profile_photo(state, &photo)?;
            if let Some(warning) = update.warning {
                println!("Photo added but analysis failed ({warning}). You can still use it for try-on.");
            } else if let Some(attributes) = update.profile.attributes {
                println!("Photo added. {}", attributes.summary);
            }
        }
        ProfileCommand::RemovePhoto { index } => {
            let mut profile = state.profile()?;
            if profile.remove_photo(index).is_none() {
                bail!("no gallery photo at index {index}");
            }
            state.update_profile(profile)?;
            println!("Removed photo {index}");
        }
    }
    Ok(())
}

fn run_chats(state: &AppState, command: ChatsCommand) -> Result<()> {
    match command {
        ChatsCommand::List => {
            let sessions = state.sessions()?;
            if sessions.is_empty() {
                println!("No chats yet. Start a new session with `wair chat`.");
            }
            for session in sessions {
                println!(
                    "{}  {}  {}",
                    session.id,
                    session.title,
                    session.last_message.as_deref().unwrap_or("No messages")
                );
            }
        }
        ChatsCommand::Delete { id } => {
            if !state.delete_chat(&id)? {
                bail!("no chat session with id {id}");
            }
            println!("Deleted chat {id}");
        }
    }
    Ok(())
}

fn run_chat(
    state: &AppState,
    orchestrator: &StylingOrchestrator,
    data_dir: &Path,
    args: ChatArgs,
) -> Result<()> {
    let mut session_id = match args.session {
        Some(id) => state.session(&id)?.id,
        None => state.create_chat()?.id,
    };
    let mut outfits = session_outfits(&state.messages(&session_id)?);

    let stdin = io::stdin();
    let mut line = String::new();

    println!("WAIR chat {session_id}. Type /help for commands.");
    if state.messages(&session_id)?.is_empty() {
        println!("Quick start ideas: {}", QUICK_START_SUGGESTIONS.join(" | "));
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);

        match intent.action.as_str() {
            "noop" => continue,
            "quit" => break,
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
            }
            "style_request" => {
                let text = intent.prompt.unwrap_or(intent.raw);
                let turn = orchestrator.send_message(state, &session_id, ChatRequest::text(text));
                report_turn(turn, &mut outfits);
            }
            "surprise_me" => {
                let turn = orchestrator.surprise_me(state, &session_id);
                report_turn(turn, &mut outfits);
            }
            "critique_photo" => {
                let Some(path) = arg_string(intent.command_args.get("path")) else {
                    println!("/photo requires a path");
                    continue;
                };
                let text = arg_string(intent.command_args.get("text")).unwrap_or_default();
                let turn = orchestrator
                    .prepare_photo(&path)
                    .and_then(|photo| {
                        orchestrator.send_message(state, &session_id, ChatRequest::photo(text, photo))
                    });
                report_turn(turn, &mut outfits);
            }
            "try_on" => {
                let Some(number) = arg_index(intent.command_args.get("outfit")) else {
                    println!("/tryon requires an outfit number");
                    continue;
                };
                let photo = arg_index(intent.command_args.get("photo"));
                let out = data_dir.join("renders");
                match try_on_outfit(state, orchestrator, &outfits, number, photo, &out) {
                    Ok(path) => println!("Try-on saved to {}", path.display()),
                    Err(err) => println!("Try-on failed: {err:#}"),
                }
            }
            "history" => {
                let mut next_outfit = 1;
                for message in state.messages(&session_id)? {
                    print_message(&message, next_outfit);
                    next_outfit += message.outfits.len();
                }
            }
            "new_chat" => {
                session_id = state.create_chat()?.id;
                outfits.clear();
                println!("Started chat {session_id}");
            }
            "list_wardrobe" => print_wardrobe(&state.wardrobe()?),
            "insights" => match orchestrator.wardrobe_insights(&state.wardrobe()?) {
                Ok(insights) => {
                    println!("Style: {}", insights.style);
                    println!("Palette: {}", insights.palette.join(", "));
                    println!("Missing: {}", insights.missing.join(", "));
                }
                Err(err) => println!("Analysis failed: {err}"),
            },
            "unknown" => {
                let command = arg_string(intent.command_args.get("command")).unwrap_or_default();
                println!("Unknown command /{command}. Type /help for commands.");
            }
            other => {
                tracing::debug!(action = other, "unhandled chat action");
            }
        }
    }
    Ok(())
}

fn run_try_on(state: &AppState, orchestrator: &StylingOrchestrator, args: TryOnArgs) -> Result<()> {
    let outfits = session_outfits(&state.messages(&state.session(&args.session)?.id)?);
    let path = try_on_outfit(state, orchestrator, &outfits, args.outfit, args.photo, &args.out)?;
    println!("Try-on saved to {}", path.display());
    Ok(())
}

/// Renders outfit `number` (one-based) and writes it under `out`. A path with
/// an extension is used as the file name; anything else is a directory.
fn try_on_outfit(
    state: &AppState,
    orchestrator: &StylingOrchestrator,
    outfits: &[ResolvedOutfit],
    number: usize,
    photo_index: Option<usize>,
    out: &Path,
) -> Result<PathBuf> {
    let outfit = number
        .checked_sub(1)
        .and_then(|index| outfits.get(index))
        .with_context(|| format!("no outfit #{number} in this chat ({} available)", outfits.len()))?;
    let profile = state.profile()?;
    let photo = match photo_index {
        Some(index) => profile.photo(index),
        None => profile.primary_photo(),
    }
    .context("no profile photo selected, add one with `wair profile add-photo`")?;

    println!("Generating try-on for \"{}\"...", outfit.name);
    let result = orchestrator.try_on(photo, outfit)?;
    let (mime, bytes) = decode_data_url(&result.image)?;

    let path = if out.extension().is_some() {
        out.to_path_buf()
    } else {
        out.join(format!(
            "tryon-{}.{}",
            slug(&outfit.name),
            extension_for_mime(&mime)
        ))
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn report_turn(turn: Result<ChatTurn>, outfits: &mut Vec<ResolvedOutfit>) {
    match turn {
        Ok(turn) => {
            if let Some(error) = &turn.error {
                println!("! {}", error.message);
            }
            let first = outfits.len() + 1;
            print_message(&turn.reply, first);
            outfits.extend(turn.reply.outfits.iter().cloned());
        }
        Err(err) => println!("! {err:#}"),
    }
}

fn session_outfits(messages: &[ChatMessage]) -> Vec<ResolvedOutfit> {
    messages
        .iter()
        .flat_map(|message| message.outfits.iter().cloned())
        .collect()
}

fn print_message(message: &ChatMessage, first_outfit: usize) {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "wair",
    };
    if message.image.is_some() {
        println!("{speaker}: [photo]");
    }
    if let Some(text) = message.text.as_deref().filter(|text| !text.is_empty()) {
        println!("{speaker}: {text}");
    }
    for (offset, outfit) in message.outfits.iter().enumerate() {
        println!();
        println!("  #{} {} ({})", first_outfit + offset, outfit.name, outfit.occasion);
        for item in &outfit.items {
            println!("     - {} [{}]", item.label(), item.category());
        }
        if !outfit.reasoning.is_empty() {
            println!("     Why: {}", outfit.reasoning);
        }
        if !outfit.styling_tip.is_empty() {
            println!("     Tip: {}", outfit.styling_tip);
        }
    }
}

fn print_wardrobe(items: &[WardrobeItem]) {
    if items.is_empty() {
        println!("Wardrobe is empty.");
        return;
    }
    for item in items {
        println!(
            "{}  {:<28} {:<10} formality {:>2}  {}",
            item.id(),
            item.label(),
            item.category().as_str(),
            item.formality(),
            item.material().unwrap_or("-")
        );
    }
}

fn photo_label(photo: &str) -> String {
    match photo.split_once(";base64,") {
        Some((header, data)) => format!("{header} ({} bytes encoded)", data.len()),
        None => photo.to_string(),
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

fn slug(name: &str) -> String {
    let slug = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
        .collect::<String>();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "outfit".to_string()
    } else {
        slug
    }
}

fn arg_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn arg_index(value: Option<&Value>) -> Option<usize> {
    value
        .and_then(Value::as_u64)
        .and_then(|value| usize::try_from(value).ok())
}
