//! astropixels-link console entry point.
//!
//! Connects to the controller configured in the environment, prints
//! inbound telemetry and sends each stdin line as a command. Lines that
//! start with `/` are local directives (see `/help`).

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use astropixels_link::auth::TokenStore;
use astropixels_link::domain::describe::annotate;
use astropixels_link::service::SendOutcome;
use astropixels_link::{LinkConfig, Observers, Session};

const HELP: &str = "\
commands: any Marcduino string, e.g. :OP00 or $R
  /token <value>     store the API token (no value clears it)
  /state             fetch the state snapshot
  /health            fetch the health report
  /prefs <k1,k2>     read preferences
  /pref <key> <val>  write a preference
  /reboot            restart the controller
  /firmware <path>   upload a firmware image
  /reconnect         skip the reconnect backoff
  /quit              exit";

fn stamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn console_observers() -> Observers {
    Observers::new()
        .on_state(|data| println!("{} state  {data}", stamp()))
        .on_log(|line| println!("{} log    {line}", stamp()))
        .on_health(|data| println!("{} health {data}", stamp()))
        .on_ota_progress(|p| println!("{} ota    {p}", stamp()))
        .on_connectivity(|up| {
            let status = if up { "Connected" } else { "Disconnected" };
            println!("{} link   {status}", stamp());
        })
        .on_notice(|err| eprintln!("{} notice {err}", stamp()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let logger = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);
    if std::env::var("AP_LOG_FORMAT").is_ok_and(|f| f == "json") {
        logger.json().init();
    } else {
        logger.init();
    }

    // Load configuration
    let config = LinkConfig::from_env()?;
    tracing::info!(base_url = %config.base_url, "starting astropixels-link");

    let token = TokenStore::file(&config.token_file);
    let session = Session::start(&config, console_observers(), token)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        if let Some(directive) = line.strip_prefix('/') {
            if !run_directive(&session, directive).await {
                break;
            }
            continue;
        }
        match session.send_command(line).await {
            SendOutcome::LiveChannel | SendOutcome::Fallback => {
                println!("{} sent   {}", stamp(), annotate(line));
            }
            SendOutcome::Dropped => println!("{} lost   {line}", stamp()),
            SendOutcome::Invalid | SendOutcome::Failed => {}
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Runs one `/` directive. Returns `false` when the console should exit.
async fn run_directive(session: &Session, directive: &str) -> bool {
    let (name, arg) = directive
        .split_once(' ')
        .map_or((directive, ""), |(n, a)| (n, a.trim()));
    let api = session.api();

    match name {
        "quit" | "exit" => return false,
        "help" => println!("{HELP}"),
        "token" => match session.token_store().try_set(Some(arg)) {
            Ok(()) => {
                let state = if arg.is_empty() { "cleared" } else { "stored" };
                println!("token {state}");
            }
            Err(e) => eprintln!("token: {e}"),
        },
        "reconnect" => session.reconnect_now(),
        "state" => match api.fetch_state().await {
            Ok(state) => println!("{state}"),
            Err(e) => eprintln!("state: {e}"),
        },
        "health" => match api.fetch_health().await {
            Ok(health) => println!("{health}"),
            Err(e) => eprintln!("health: {e}"),
        },
        "prefs" => {
            let keys: Vec<&str> = arg.split(',').map(str::trim).collect();
            match api.fetch_preferences(&keys).await {
                Ok(prefs) => {
                    for (key, val) in prefs {
                        println!("{key} = {val}");
                    }
                }
                Err(e) => eprintln!("prefs: {e}"),
            }
        }
        "pref" => {
            let (key, val) = arg.split_once(' ').unwrap_or((arg, ""));
            if api.set_preference(key, val.trim(), false).await.is_ok() {
                println!("{key} saved");
            }
        }
        "reboot" => {
            if let Ok(ack) = api.reboot().await {
                println!("reboot: {}", ack.msg.unwrap_or_else(|| "ok".into()));
            }
        }
        "firmware" => match tokio::fs::read(arg).await {
            Ok(image) => {
                let file_name = std::path::Path::new(arg)
                    .file_name()
                    .map_or_else(|| "firmware.bin".into(), |n| n.to_string_lossy().into_owned());
                if let Ok(reply) = api.upload_firmware(&file_name, image).await {
                    println!("firmware: {reply}");
                }
            }
            Err(e) => eprintln!("firmware: cannot read {arg}: {e}"),
        },
        other => eprintln!("unknown directive /{other}, try /help"),
    }
    true
}
