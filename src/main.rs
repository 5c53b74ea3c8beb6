#![forbid(unsafe_code)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use appshell_prefs::constants::env;
use appshell_prefs::{
    Environment, FileStore, LayoutSession, OverallMode, SidebarMode, SidebarVariant, ThemeSession, reset_all,
};

/// Inspect and edit the stored layout and theme preferences
#[derive(Debug, Parser)]
#[command(name = "appshell-prefs", version)]
struct Cli {
    /// Preference directory (defaults to the user config dir)
    #[arg(long, env = env::STORE_DIR)]
    dir: Option<PathBuf>,

    /// Evaluate as a non-desktop viewport
    #[arg(long)]
    mobile: bool,

    /// Keep everything in memory
    #[arg(long)]
    no_storage: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the derived layout view and the theme record as JSON
    Show,
    /// row | col
    SetOverallMode { mode: OverallMode },
    /// static | overlay
    SetSidebarMode { mode: SidebarMode },
    /// sidebar | inset | floating
    SetSidebarVariant { variant: SidebarVariant },
    SetSidebarCanCollapse {
        #[arg(action = clap::ArgAction::Set)]
        can_collapse: bool,
    },
    SetSidebarInitiallyOpenDesktop {
        #[arg(action = clap::ArgAction::Set)]
        is_open: bool,
    },
    ToggleSidebar,
    OpenSidebarOverlay,
    CloseSidebarOverlay,
    ResetLayout,
    SetDarkMode {
        #[arg(action = clap::ArgAction::Set)]
        dark: bool,
    },
    ToggleDarkMode,
    SetPreset { preset: String },
    SetPrimaryColor { color: String },
    /// Omit the color to fall back to the preset's surface palette
    SetSurfaceColor { color: Option<String> },
    ResetTheme,
    ResetAll,
}

fn init_logging() -> Result<()> {
    let log_level = match std::env::var(env::LOG_LEVEL)
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_environment(cli: &Cli) -> Environment {
    let env = Environment::headless().with_desktop(!cli.mobile);
    if cli.no_storage {
        return env;
    }
    let dir = cli.dir.clone().unwrap_or_else(FileStore::default_dir);
    info!(dir = %dir.display(), "Using preference directory");
    env.with_storage(Rc::new(FileStore::new(dir)))
}

fn show(layout: &LayoutSession, theme: &ThemeSession) -> Result<()> {
    let report = serde_json::json!({
        "layout": layout.view(),
        "theme": theme.config(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let environment = build_environment(&cli);
    let layout = LayoutSession::new(&environment);
    let theme = ThemeSession::new(&environment);

    match cli.command {
        Command::Show => return show(&layout, &theme),
        Command::SetOverallMode { mode } => layout.set_overall_mode(mode),
        Command::SetSidebarMode { mode } => layout.set_sidebar_mode(mode),
        Command::SetSidebarVariant { variant } => layout.set_sidebar_variant(variant),
        Command::SetSidebarCanCollapse { can_collapse } => layout.set_sidebar_can_collapse(can_collapse),
        Command::SetSidebarInitiallyOpenDesktop { is_open } => layout.set_sidebar_initially_open_desktop(is_open),
        Command::ToggleSidebar => layout.toggle_sidebar(),
        Command::OpenSidebarOverlay => layout.open_sidebar_overlay(),
        Command::CloseSidebarOverlay => layout.close_sidebar_overlay(),
        Command::ResetLayout => layout.reset(),
        Command::SetDarkMode { dark } => theme.set_dark_mode(dark),
        Command::ToggleDarkMode => theme.toggle_dark_mode(),
        Command::SetPreset { preset } => theme.set_preset(preset),
        Command::SetPrimaryColor { color } => theme.set_primary_color(color),
        Command::SetSurfaceColor { color } => theme.set_surface_color(color),
        Command::ResetTheme => theme.reset(),
        Command::ResetAll => reset_all(&layout, &theme),
    }

    // Let the completion pulse settle before printing the result
    environment.reactor().tick();
    show(&layout, &theme)
}
