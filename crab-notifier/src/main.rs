use anyhow::Context;
use crab_notifier::message::TransportConfig;
use crab_notifier::{
    ConsoleView, HttpClient, NotificationClient, NotifierConfig, NotifierHandle, SocketIoTransport,
    init_logger, sound,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// 终端命令
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Accept(i64),
    Dismiss(i64),
    Open(i64),
    Mute,
    Refresh,
    Quit,
    Help,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("help");
    let order_id = |arg: Option<&str>| -> Result<i64, String> {
        let arg = arg.ok_or_else(|| format!("`{command}` needs an order id"))?;
        arg.trim_start_matches('#')
            .parse()
            .map_err(|_| format!("`{arg}` is not an order id"))
    };

    match command {
        "accept" | "a" => order_id(words.next()).map(Input::Accept),
        "dismiss" | "d" => order_id(words.next()).map(Input::Dismiss),
        "open" | "o" => order_id(words.next()).map(Input::Open),
        "mute" | "m" => Ok(Input::Mute),
        "refresh" | "r" => Ok(Input::Refresh),
        "quit" | "q" | "exit" => Ok(Input::Quit),
        "help" | "?" => Ok(Input::Help),
        other => Err(format!("unknown command `{other}`")),
    }
}

const HELP: &str = "commands: accept <id> | dismiss <id> | open <id> | mute | refresh | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量与日志
    dotenv::dotenv().ok();
    let config = NotifierConfig::from_env().context("invalid configuration")?;
    init_logger(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(server = %config.server_url, page = %config.page_path, "🦀 Crab Notifier starting...");

    // 2. 组装客户端
    let socket_url = config.socket_url()?;
    let transport = SocketIoTransport::spawn(
        socket_url,
        config.session_cookie.clone(),
        TransportConfig::default(),
    );
    let api = HttpClient::new(&config).context("failed to build HTTP client")?;
    let player = sound::from_config(config.sound_command.as_deref());

    let handle = NotificationClient::new(config, transport, ConsoleView::stdout(), player, api)
        .start()
        .context("notifier refused to start")?;

    println!("{HELP}");

    // 3. 终端输入 / Ctrl-C
    drive(handle, BufReader::new(tokio::io::stdin())).await
}

/// Feed terminal commands to the notifier until quit, EOF or Ctrl-C
///
/// The notifier is stopped on every exit path, read errors included.
async fn drive(handle: NotifierHandle, input: impl AsyncBufRead + Unpin) -> anyhow::Result<()> {
    let mut lines = input.lines();
    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received");
                break Ok(());
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    if !apply_input(&handle, &line) {
                        break Ok(());
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            },
        }
    };

    handle.stop().await;
    outcome.context("failed to read terminal input")
}

/// `false` when the user asked to quit
fn apply_input(handle: &NotifierHandle, line: &str) -> bool {
    let input = match parse_input(line) {
        Ok(input) => input,
        Err(e) => {
            println!("{e}\n{HELP}");
            return true;
        }
    };

    let sent = match input {
        Input::Accept(id) => handle.accept(id),
        Input::Dismiss(id) => handle.dismiss(id),
        Input::Open(id) => handle.open_details(id),
        Input::Mute => handle.toggle_mute(),
        Input::Refresh => handle.refresh(),
        Input::Help => {
            println!("{HELP}");
            Ok(())
        }
        Input::Quit => return false,
    };

    if let Err(e) = sent {
        tracing::error!("Command failed: {e}");
        return false;
    }
    true
}
