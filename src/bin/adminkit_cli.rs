//!
//! adminkit CLI binary
//! -------------------
//! Thin command-line front end over `AdminConsole`. The session is kept in a
//! JSON file between invocations, so `login` once and then run directory commands.

use std::env;

use anyhow::{anyhow, Context, Result};

use adminkit::config::parse_timeout_secs;
use adminkit::{AdminConsole, AuthError, ClientConfig, SessionState};

const DEFAULT_STORE: &str = ".adminkit/session.json";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--base-url <url>] [--store <path>] [--timeout <secs>] <command> [args]\n\nCommands:\n  login <email> <password>   exchange credentials for a token and keep it\n  whoami                     show session state and current user\n  logout                     drop the stored session\n  users                      list users\n  user <id>                  show one user\n  delete-user <id>           delete a user\n  roles                      list roles\n\nFlags:\n  --base-url <url>   backend base URL (env: ADMINKIT_BASE_URL, default http://127.0.0.1:8000)\n  --store <path>     session file (env: ADMINKIT_STORE, default {DEFAULT_STORE})\n  --timeout <secs>   connect/send/receive timeout (env: ADMINKIT_TIMEOUT_SECS, default 30)\n  -h, --help         show this help\n\nLogging is controlled by RUST_LOG (e.g. RUST_LOG=adminkit=debug)."
    );
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let i = args.iter().position(|a| a == flag)?;
    if i + 1 >= args.len() {
        args.remove(i);
        return None;
    }
    let val = args.remove(i + 1);
    args.remove(i);
    Some(val)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow!("missing <id>"))?;
    raw.parse::<i64>().with_context(|| format!("invalid id '{}'", raw))
}

fn print_json<T: serde::Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "adminkit_cli".to_string() } else { args.remove(0) };
    if args.is_empty() || has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_usage(&program);
        return Ok(());
    }

    // CLI flags override environment
    let mut cfg = ClientConfig::from_env();
    if let Some(url) = take_flag(&mut args, "--base-url") { cfg.base_url = url; }
    if let Some(p) = take_flag(&mut args, "--store") { cfg.store_path = Some(p.into()); }
    if let Some(secs) = take_flag(&mut args, "--timeout") {
        let timeout = parse_timeout_secs(&secs).context("invalid --timeout")?;
        cfg = cfg.with_timeouts(timeout);
    }
    if cfg.store_path.is_none() { cfg.store_path = Some(DEFAULT_STORE.into()); }

    let console = AdminConsole::from_config(&cfg).context("failed to build client")?;
    let state = console.initialize().await;
    tracing::debug!(?state, base_url = %cfg.base_url, "cli_ready");

    let command = args.first().cloned().unwrap_or_default();
    match command.as_str() {
        "login" => {
            let (Some(email), Some(password)) = (args.get(1), args.get(2)) else {
                return Err(anyhow!("usage: login <email> <password>"));
            };
            match console.try_login(email, password).await {
                Ok(session) => {
                    println!("login ok");
                    if let Some(u) = session.user { println!("signed in as {} ({})", u.display_name(), u.role.name); }
                }
                Err(AuthError::Rejected { source, .. }) if source.status() == Some(401) => {
                    return Err(anyhow!("login failed: invalid credentials"));
                }
                Err(e) => return Err(anyhow!("login failed ({}): {}", e.code_str(), e)),
            }
        }
        "whoami" => {
            match state {
                SessionState::Authenticated => println!("authenticated"),
                _ => println!("anonymous"),
            }
            if let Some(u) = console.current_user() { print_json(&u)?; }
        }
        "logout" => {
            console.logout().await;
            println!("logged out");
        }
        "users" => print_json(&console.fetch_users().await?)?,
        "user" => {
            let id = parse_id(args.get(1))?;
            print_json(&console.fetch_user(id).await?)?;
        }
        "delete-user" => {
            let id = parse_id(args.get(1))?;
            console.submit_user_delete(id).await?;
            println!("deleted user {}", id);
        }
        "roles" => print_json(&console.fetch_roles().await?)?,
        other => {
            print_usage(&program);
            return Err(anyhow!("unknown command '{}'", other));
        }
    }
    Ok(())
}
