//! Loopdeck CLI - shortcut daemon for Loupedeck-style control surfaces.
//!
//! Every command works on the configuration directory; `render` previews the
//! active profile as PNG files. Use --json for machine-readable output.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use console::style;
use serde::Serialize;

use loopdeck::app::App;
use loopdeck::cli::{self, Cli, Commands, IconCommand};
use loopdeck::config::{ActionType, ProfileId, Settings, StorePaths};
use loopdeck::device::{DeviceGateway, DeviceInfo, PreviewGateway};
use loopdeck::error::LdError;
use loopdeck::logging::init_logging;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

type Result<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    init_logging(cli.json, cli.verbose, cli.quiet);

    if let Err(e) = run(&cli).await {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => {
            print_quick_start();
            Ok(())
        }
        Some(Commands::Init) => cmd_init(cli).await,
        Some(Commands::Check) => cmd_check(cli).await,
        Some(Commands::Validate(args)) => cmd_validate(cli, args).await,
        Some(Commands::Profile(args)) => cmd_profile(cli, args).await,
        Some(Commands::Trigger(args)) => cmd_trigger(cli, args).await,
        Some(Commands::Exec(args)) => cmd_exec(cli, args).await,
        Some(Commands::Render(args)) => cmd_render(cli, args).await,
        Some(Commands::Icon(command)) => cmd_icon(cli, command).await,
        Some(Commands::Apps) => cmd_apps(cli).await,
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

fn print_quick_start() {
    println!(
        "{} {} - control surface shortcuts\n",
        style("loopdeck").bold().cyan(),
        build_info::VERSION
    );

    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  Create the configuration", style("loopdeck init").green());
    println!("  {}  Load and repair it", style("loopdeck check").green());
    println!("  {}  Switch profile", style("loopdeck profile 2").green());
    println!("  {}  Run key 4", style("loopdeck trigger 4").green());
    println!("  {}  Preview keys", style("loopdeck render --out ./preview").green());
    println!();

    println!("{}", style("KEY LAYOUT (4 x 3)").bold().underlined());
    println!();
    println!("  [0] [1] [2] [3]");
    println!("  [4] [5] [6] [7]");
    println!("  [8] [9] [10][11]");
    println!();

    println!("Run {} for full help", style("loopdeck --help").yellow());
}

// === Command Implementations ===

fn store_paths(cli: &Cli) -> Result<StorePaths> {
    match &cli.config_dir {
        Some(dir) => Ok(StorePaths::new(dir)),
        None => Ok(StorePaths::platform_default()?),
    }
}

async fn load_app(cli: &Cli) -> Result<App> {
    let paths = store_paths(cli)?;
    let settings = Settings::load(&paths)?;
    let app = App::system(paths, settings)?;
    app.ensure_config()
        .await
        .context("Could not prepare the configuration directory")?;
    Ok(app)
}

fn parse_profile(text: &str) -> Result<ProfileId> {
    ProfileId::parse(text)
        .ok_or_else(|| LdError::UnknownProfile(text.to_string()).into())
}

async fn cmd_init(cli: &Cli) -> Result<()> {
    let app = load_app(cli).await?;
    let file = app.paths().config_file();
    if cli.json {
        output_json(&serde_json::json!({
            "ok": true,
            "config": file,
            "icons": app.paths().icons_dir(),
        }))?;
    } else {
        println!("{} {}", style("Configuration:").bold(), file.display());
    }
    Ok(())
}

async fn cmd_check(cli: &Cli) -> Result<()> {
    let app = load_app(cli).await?;
    let outcome = app.read_config().await;
    if cli.json {
        output_json(&serde_json::json!({
            "ok": true,
            "activeProfile": outcome.config.active_profile,
            "issues": outcome.issues,
        }))?;
        return Ok(());
    }

    println!(
        "{} active profile {}",
        style("Loaded").green().bold(),
        outcome.config.active_profile.label()
    );
    if outcome.issues.is_empty() {
        println!("No repairs needed");
    } else {
        println!("{}", style("Repaired:").yellow().bold());
        for issue in &outcome.issues {
            println!("  - {issue}");
        }
    }
    Ok(())
}

async fn cmd_validate(cli: &Cli, args: &cli::ValidateArgs) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Could not read {}", args.file.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| LdError::ConfigParse(format!("{}: {e}", args.file.display())))?;

    if args.write {
        let app = load_app(cli).await?;
        app.submit_config(&payload).await?;
    } else {
        loopdeck::config::validate_strict_error(&payload)?;
    }

    if cli.json {
        output_json(&serde_json::json!({ "ok": true, "written": args.write }))?;
    } else if args.write {
        println!("{} and saved", style("Valid").green().bold());
    } else {
        println!("{}", style("Valid").green().bold());
    }
    Ok(())
}

async fn cmd_profile(cli: &Cli, args: &cli::ProfileArgs) -> Result<()> {
    let profile = parse_profile(&args.id)?;
    let app = load_app(cli).await?;
    let switch = app.switch_profile(profile).await?;
    if cli.json {
        output_json(&switch)?;
    } else if switch.changed {
        println!("Active profile: {}", style(profile.label()).bold());
    } else {
        println!("Already on profile {}", profile.label());
    }
    Ok(())
}

async fn cmd_trigger(cli: &Cli, args: &cli::TriggerArgs) -> Result<()> {
    let profile = args.profile.as_deref().map(parse_profile).transpose()?;
    let app = load_app(cli).await?;
    let outcome = app.trigger(args.key, profile).await?;
    print_outcome(cli, &outcome)
}

async fn cmd_exec(cli: &Cli, args: &cli::ExecArgs) -> Result<()> {
    let Some(action_type) = ActionType::parse_exact(&args.action_type) else {
        bail!("Unknown action type '{}'", args.action_type);
    };
    let app = load_app(cli).await?;
    let outcome = app.execute_action(action_type, &args.value).await;
    print_outcome(cli, &outcome)
}

fn print_outcome(cli: &Cli, outcome: &loopdeck::actions::ActionOutcome) -> Result<()> {
    if cli.json {
        output_json(outcome)?;
    } else if outcome.is_ok() {
        println!("{} {}", style("OK").green().bold(), outcome.text());
    } else {
        println!("{} {}", style("FAILED").red().bold(), outcome.text());
    }
    if !outcome.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_render(cli: &Cli, args: &cli::RenderArgs) -> Result<()> {
    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("Could not create {}", args.out.display()))?;
    let app = load_app(cli).await?;
    let gateway = Arc::new(PreviewGateway::new(DeviceInfo::live(), &args.out));
    let device: Arc<dyn DeviceGateway> = gateway.clone();
    app.attach_device(device);

    let config = app.read_config().await.config;
    let report = app
        .render_profile(&config)
        .await
        .context("Preview device went away")?;

    if cli.json {
        output_json(&serde_json::json!({
            "out": gateway.dir(),
            "report": report,
            "leds": gateway.state().buttons,
        }))?;
    } else {
        println!(
            "Rendered {} key(s), {} with icons, into {}",
            report.filled.len(),
            report.iconed.len(),
            gateway.dir().display()
        );
        for (key, reason) in &report.failures {
            println!("  {} key {key}: {reason}", style("skipped").yellow());
        }
    }
    Ok(())
}

async fn cmd_icon(cli: &Cli, command: &IconCommand) -> Result<()> {
    let app = load_app(cli).await?;
    match command {
        IconCommand::Set(args) => {
            let profile = args.profile.as_deref().map(parse_profile).transpose()?;
            let data_url = image_data_url(&args.image).await?;
            let path = app.save_custom_icon(profile, args.key, &data_url).await?;
            if cli.json {
                output_json(&serde_json::json!({ "ok": true, "iconPath": path }))?;
            } else {
                println!("Key {} icon: {}", args.key, style(path).bold());
            }
        }
        IconCommand::Clear(args) => {
            let profile = args.profile.as_deref().map(parse_profile).transpose()?;
            app.clear_custom_icon(profile, args.key).await?;
            if cli.json {
                output_json(&serde_json::json!({ "ok": true }))?;
            } else {
                println!("Key {} icon removed", args.key);
            }
        }
    }
    Ok(())
}

/// Read an image file as a `data:` URL, typed by extension.
async fn image_data_url(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => bail!("Unsupported image type '{}' (png, jpg, webp)", path.display()),
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

async fn cmd_apps(cli: &Cli) -> Result<()> {
    let app = load_app(cli).await?;
    let apps = app.list_apps().await;
    if cli.json {
        output_json(&apps)?;
        return Ok(());
    }
    if apps.is_empty() {
        println!("No applications found ({})", app.status_line().last());
    }
    for entry in &apps {
        println!("{}  {}", style(&entry.name).bold(), style(&entry.command).dim());
    }
    Ok(())
}

fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.json {
        output_json(&serde_json::json!({
            "version": build_info::VERSION,
            "git_sha": build_info::git_sha(),
            "git_dirty": build_info::git_dirty() == "true",
            "build_timestamp": build_info::build_timestamp(),
            "rustc_version": build_info::rustc_semver(),
            "target": build_info::target(),
        }))?;
    } else {
        println!("loopdeck {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
    Ok(())
}

fn cmd_completions(args: &cli::CompletionsArgs) {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "loopdeck", &mut io::stdout());
}

// === Utility Functions ===

fn output_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn output_error(cli: &Cli, error: &anyhow::Error) {
    let ld = error.downcast_ref::<LdError>();
    let violations = match ld {
        Some(LdError::Validation(errors)) => errors.clone(),
        _ => Vec::new(),
    };
    if cli.json {
        let json = serde_json::json!({
            "error": true,
            "message": format!("{error:#}"),
            "errors": violations,
            "suggestion": ld.and_then(LdError::suggestion),
            "recoverable": ld.is_some_and(LdError::is_user_recoverable),
        });
        eprintln!("{json}");
    } else {
        eprintln!("{}: {error:#}", style("Error").red().bold());
        for violation in &violations {
            eprintln!("  - {violation}");
        }
        if let Some(suggestion) = ld.and_then(LdError::suggestion) {
            eprintln!("{}: {suggestion}", style("Hint").yellow());
        }
    }
}
