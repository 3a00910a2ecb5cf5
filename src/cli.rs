//! Non-interactive subcommands sharing the client with the TUI.

use chrono::{Local, NaiveDate, Utc};
use clap::Subcommand;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::io::{self, BufRead, Write};

use crate::api::types::TimeSession;
use crate::context::AppContext;
use crate::stats::{self, DateRange};
use crate::tracker::{elapsed_seconds, format_hms, SessionTimer, TimerState};
use crate::validation;

pub const PASSWORD_ENV: &str = "PUNCH_PASSWORD";
const DEFAULT_COLOR: &str = "#3b82f6";

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Sign in
  Login {
    #[arg(long)]
    email: Option<String>,
    /// Keep the token for this run only
    #[arg(long)]
    session_only: bool,
  },
  /// Create an account and sign in
  Register {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    name: Option<String>,
  },
  /// Sign out and forget stored credentials
  Logout,
  /// Show the signed-in user
  Whoami,
  /// Change the password
  Passwd,
  /// Show the running session
  Status,
  /// Start a session
  Start {
    #[arg(short, long)]
    category: Option<u64>,
  },
  /// Pause the running session
  Pause,
  /// Resume the paused session
  Resume,
  /// Stop the running session
  Stop {
    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
  },
  /// Delete a time entry
  Delete { id: u64 },
  /// Manage categories
  Categories {
    #[command(subcommand)]
    action: CategoryCommand,
  },
  /// Totals for a date range (default: this month)
  Stats {
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
  },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
  List,
  Create {
    name: String,
    #[arg(long, default_value = DEFAULT_COLOR)]
    color: String,
  },
  Update {
    id: u64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    color: Option<String>,
  },
  Delete { id: u64 },
}

pub async fn run(ctx: &AppContext, command: Command) -> Result<()> {
  ctx.auth.on_auth_required(|| {
    eprintln!("Not signed in or the session expired. Run `punch login` first.");
  });

  match command {
    Command::Login { email, session_only } => {
      let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
      };
      let password = password("Password: ")?;
      let remember = ctx.remember_me && !session_only;
      let user = ctx.api.auth().login(&email, &password, remember).await?;
      println!("Signed in as {}", user.email);
    }
    Command::Register { email, name } => {
      let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
      };
      let password = password("Password: ")?;
      let confirm = match std::env::var(PASSWORD_ENV) {
        Ok(_) => password.clone(),
        Err(_) => prompt("Confirm password: ")?,
      };
      validation::registration(&email, &password, &confirm)?;
      let user = ctx
        .api
        .auth()
        .register(&email, &password, name.as_deref(), ctx.remember_me)
        .await?;
      println!("Account created, signed in as {}", user.email);
    }
    Command::Logout => {
      ctx.api.auth().logout();
      println!("Signed out");
    }
    Command::Whoami => match ctx.api.auth().current_user() {
      Some(user) => match user.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => println!("{} <{}>", name, user.email),
        None => println!("{}", user.email),
      },
      None => println!("Not signed in"),
    },
    Command::Passwd => {
      let old = prompt("Current password: ")?;
      let new = prompt("New password: ")?;
      let confirm = prompt("Confirm new password: ")?;
      validation::password_change(&old, &new, &confirm)?;
      let message = ctx.api.auth().change_password(&old, &new).await?;
      println!("{}", message);
    }
    Command::Status => {
      let mut timer = SessionTimer::new(ctx.api.time());
      timer.refresh().await?;
      print_session(timer.tracker().session(), timer.state());
    }
    Command::Start { category } => {
      let mut timer = loaded_timer(ctx).await?;
      let session = timer.start(category).await?;
      println!("Started session {}", session.id);
    }
    Command::Pause => {
      let mut timer = loaded_timer(ctx).await?;
      let session = timer.pause().await?;
      println!(
        "Paused at {}",
        format_hms(elapsed_seconds(session, Utc::now()))
      );
    }
    Command::Resume => {
      let mut timer = loaded_timer(ctx).await?;
      let session = timer.resume().await?;
      println!("Resumed session {}", session.id);
    }
    Command::Stop { yes } => {
      let mut timer = loaded_timer(ctx).await?;
      timer.request_stop()?;
      if !yes && !confirm("Stop the current session? [y/N] ")? {
        timer.cancel_stop();
        println!("Kept running");
        return Ok(());
      }
      let confirmation = timer.confirm_stop()?;
      let done = timer.stop(confirmation).await?;
      println!(
        "Stopped session {} after {}",
        done.id,
        format_hms(elapsed_seconds(&done, Utc::now()))
      );
    }
    Command::Delete { id } => {
      let mut timer = SessionTimer::new(ctx.api.time());
      let message = timer.delete(id).await?;
      println!("{}", message);
    }
    Command::Categories { action } => run_categories(ctx, action).await?,
    Command::Stats { from, to } => {
      let today = Local::now().date_naive();
      let default = DateRange::month_to_date(today);
      let range = DateRange::new(from.unwrap_or(default.start), to.unwrap_or(default.end))?;
      print_stats(ctx, range).await?;
    }
  }
  Ok(())
}

async fn loaded_timer(ctx: &AppContext) -> Result<SessionTimer<crate::api::TimeEntryApi>> {
  let mut timer = SessionTimer::new(ctx.api.time());
  timer.refresh().await?;
  Ok(timer)
}

async fn run_categories(ctx: &AppContext, action: CategoryCommand) -> Result<()> {
  let api = ctx.api.categories();
  match action {
    CategoryCommand::List => {
      let list = api.list(true).await?;
      if list.is_empty() {
        println!("No categories");
      }
      for c in list {
        println!("{:>5}  {}  {}", c.id, c.color_hex, c.name);
      }
    }
    CategoryCommand::Create { name, color } => {
      validation::category(&name, &color)?;
      let created = api.create(&name, &color).await?;
      println!("Created category {} ({})", created.name, created.id);
    }
    CategoryCommand::Update { id, name, color } => {
      let current = api
        .list(false)
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| eyre!("No category with id {}", id))?;
      let name = name.unwrap_or(current.name);
      let color = color.unwrap_or(current.color_hex);
      validation::category(&name, &color)?;
      let updated = api.update(id, &name, &color).await?;
      println!("Updated category {} ({})", updated.name, updated.id);
    }
    CategoryCommand::Delete { id } => {
      println!("{}", api.delete(id).await?);
    }
  }
  Ok(())
}

async fn print_stats(ctx: &AppContext, range: DateRange) -> Result<()> {
  let data = ctx.api.stats().custom(range.start, range.end, false).await?;

  println!("{}", range);
  println!("  Total            {}", stats::format_duration(data.total_duration));
  println!(
    "  Average per day  {}",
    stats::format_duration((data.average_daily_hours * 3600.0).round() as i64)
  );
  println!(
    "  Longest session  {} {}",
    stats::format_duration(data.longest_session),
    data.longest_session_date.get(..10).unwrap_or(&data.longest_session_date)
  );

  let breakdown = stats::category_breakdown(&data.entries);
  if !breakdown.is_empty() {
    println!("\nBy category");
    for (name, hours) in breakdown {
      println!("  {:<20} {:>7.2}h", name, hours);
    }
  }

  let daily = stats::daily_hours(&data.daily_stats, None);
  if !daily.is_empty() {
    println!("\nBy day");
    for (date, hours) in daily {
      println!("  {}  {:>5.2}h", date, hours);
    }
  }
  Ok(())
}

fn print_session(session: Option<&TimeSession>, state: TimerState) {
  let Some(session) = session.filter(|s| s.is_open()) else {
    println!("No session running");
    return;
  };
  println!(
    "{}  {}",
    state.label(),
    format_hms(elapsed_seconds(session, Utc::now()))
  );
  println!(
    "  started   {}",
    session.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M")
  );
  if let Some(name) = session.category_name() {
    println!("  category  {}", name);
  }
}

fn prompt(label: &str) -> Result<String> {
  let mut stdout = io::stdout();
  write!(stdout, "{}", label)?;
  stdout.flush()?;
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// `PUNCH_PASSWORD` when set, otherwise a stdin prompt
fn password(label: &str) -> Result<String> {
  match std::env::var(PASSWORD_ENV) {
    Ok(value) if !value.is_empty() => Ok(value),
    _ => prompt(label),
  }
}

fn confirm(question: &str) -> Result<bool> {
  let answer = prompt(question)?;
  Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
  matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
