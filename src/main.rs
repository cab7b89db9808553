use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use umbra::collaborators::{Clock, Collaborators, SystemClock};
use umbra::headless::{
    FilterRenderer, GrantAll, HostConfig, LogContextMenus, LogIcon, LogObserver, LogTabs,
    LogWindowTheme, MemoryNews, MemoryShortcuts, StaticSiteConfig,
};
use umbra::{CommandGate, Extension, JsonFileStore, SystemColorScheme, TokioAlarms};

// ============================================================================
// Terminal commands
// ============================================================================

async fn handle_line(line: &str, extension: &Extension, gate: &CommandGate, tabs: &LogTabs) -> bool {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return true;
    };
    let arg = parts.next().map(str::to_string);

    match name {
        "quit" | "exit" => return false,
        "snapshot" => match extension.collect_snapshot().await {
            Ok(data) => match serde_json::to_string_pretty(&data) {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to serialize snapshot: {}", e),
            },
            Err(e) => log::error!("Failed to collect snapshot: {}", e),
        },
        "check" => {
            if let Err(e) = extension.handle_automation_check().await {
                log::error!("Automation check failed: {}", e);
            }
        }
        "dark" | "light" => {
            if let Err(e) = extension.on_color_scheme_change(name == "dark").await {
                log::error!("Color scheme change failed: {}", e);
            }
        }
        "open" => {
            let Some(url) = arg else {
                log::warn!("Usage: open <url>");
                return true;
            };
            tabs.open(&url);
            match extension.resolve_tab_message(&url, None).await {
                Ok(message) => match serde_json::to_string_pretty(&message) {
                    Ok(json) => println!("{}", json),
                    Err(e) => log::error!("Failed to serialize message: {}", e),
                },
                Err(e) => log::error!("Failed to resolve {}: {}", url, e),
            }
        }
        command => {
            if let Err(e) = gate.on_named_command(command, arg) {
                log::warn!("{}", e);
            }
        }
    }
    true
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logger
    env_logger::init();

    let config = HostConfig::from_env();
    log::info!("Using data dir {}", config.data_dir.display());

    let store = match JsonFileStore::new(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (alarms, mut fired) = TokioAlarms::new(Arc::clone(&clock));
    let tabs = Arc::new(LogTabs::default());

    let collaborators = Collaborators {
        settings_store: store.clone(),
        state_store: store,
        tabs: tabs.clone(),
        window_theme: Arc::new(LogWindowTheme),
        icon: Arc::new(LogIcon),
        news: Arc::new(MemoryNews::default()),
        alarms: Arc::new(alarms),
        permissions: Arc::new(GrantAll),
        context_menus: Arc::new(LogContextMenus),
        shortcuts: Arc::new(MemoryShortcuts::default()),
        observer: Arc::new(LogObserver),
        site_config: Arc::new(StaticSiteConfig::new(config.dark_sites.clone())),
        renderer: Arc::new(FilterRenderer),
        color_scheme: SystemColorScheme::platform(),
        clock,
        svg_encoding: config.svg_encoding,
    };

    let extension = Arc::new(Extension::new(collaborators));
    let gate = CommandGate::with_window(Arc::clone(&extension), config.debounce);

    // Alarm fires drive the automation check
    let alarm_extension = Arc::clone(&extension);
    tokio::spawn(async move {
        while let Some(name) = fired.recv().await {
            if let Err(e) = alarm_extension.on_alarm(&name).await {
                log::error!("Alarm '{}' handling failed: {}", name, e);
            }
        }
    });

    if let Err(e) = extension.start().await {
        log::error!("Failed to start: {}", e);
        std::process::exit(1);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !handle_line(line.trim(), &extension, &gate, &tabs).await {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    log::info!("Shutting down");
}
