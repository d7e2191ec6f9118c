use std::io::Write;

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::{Instant, sleep_until};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use certconsole::controllers::list::Resource;
use certconsole::models::certificate::CertificateUpdate;
use certconsole::models::user::UserUpdate;
use certconsole::pages::list_page::ListPage;
use certconsole::routes::{self, Navigation, Route};
use certconsole::views::table::{self, Row};
use certconsole::{AppError, AppState, Config};

mod cli;

use cli::{CertAction, Cli, Command, ListArgs, UserAction};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.api_url, cli.token_file)?;
    let state = AppState::new(&config).context("Failed to initialize the console")?;
    tracing::debug!("✅ Console ready for {}", config.api_url);

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match cli.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt(&mut input, "Password: ").await?,
            };
            login(&state, &username, &password).await
        }
        Command::Logout => {
            state.auth.logout().await;
            println!("{}", "✓ Signed out".green());
            Ok(())
        }
        Command::Whoami => whoami(&state).await,
        Command::Menu => {
            open_route(&state, routes::DEFAULT_AUTHENTICATED_PATH).await?;
            cli::print_menu(&routes::menu(&state.session.snapshot()));
            Ok(())
        }
        Command::Certs { action } => certificates(&state, action).await,
        Command::Users { action } => users(&state, action, &mut input).await,
        Command::Browse { path } => match open_route(&state, &path).await? {
            Route::UsersManagement => {
                let mut page = state.users_page();
                browse(&mut *page, &mut input).await
            }
            _ => {
                let mut page = state.certificates_page();
                browse(&mut *page, &mut input).await
            }
        },
    }
}

fn fail(e: AppError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.unwrap_or_default().trim().to_string())
}

async fn login(state: &AppState, username: &str, password: &str) -> anyhow::Result<()> {
    let user = state.auth.login(username, password).await.map_err(fail)?;
    println!(
        "{} Signed in as {} ({})",
        "✓".green().bold(),
        user.username.bold(),
        user.role.label()
    );
    cli::print_menu(&routes::menu(&state.session.snapshot()));
    Ok(())
}

async fn whoami(state: &AppState) -> anyhow::Result<()> {
    open_route(state, routes::DEFAULT_AUTHENTICATED_PATH).await?;
    let session = state.session.snapshot();
    let Some(user) = session.user else {
        bail!("Not signed in");
    };
    println!("{} {}", "Username:".bold(), user.username);
    println!("{} {}", "Name:    ".bold(), user.full_name());
    println!("{} {}", "Email:   ".bold(), user.email);
    println!("{} {}", "Role:    ".bold(), user.role.label());
    println!("{} {}", "Status:  ".bold(), user.status);
    Ok(())
}

/// Verifies the stored session and follows the guards from `path`.
///
/// # Returns
///
/// The route that ends up rendered. Redirects to login become an error.
async fn open_route(state: &AppState, path: &str) -> anyhow::Result<Route> {
    state.auth.restore().await;
    let (navigation, from) = routes::resolve(&state.session.snapshot(), path);
    match navigation {
        Navigation::Render(Route::Login) => match from {
            Some(from) => bail!("Not signed in, cannot open {}. Run `certconsole login <username>` first.", from),
            None => bail!("Not signed in. Run `certconsole login <username>` first."),
        },
        Navigation::Render(route) => {
            if route.path() != path {
                tracing::info!("{} redirected to {}", path, route.path());
            }
            Ok(route)
        }
        Navigation::Loading | Navigation::Redirect { .. } => bail!("Could not verify the session"),
    }
}

/// Like [`open_route`], but refuses to substitute another screen.
async fn require_route(state: &AppState, path: &str) -> anyhow::Result<()> {
    let route = open_route(state, path).await?;
    if route.path() != path {
        bail!("You are not allowed to open {}", path);
    }
    Ok(())
}

async fn list<R>(page: &mut ListPage<R>, args: ListArgs) -> anyhow::Result<()>
where
    R: Resource,
    R::Item: Row,
{
    let now = Instant::now();
    for (field, value) in &args.filters {
        page.edit_filter(field, value, now).map_err(fail)?;
    }
    if !args.filters.is_empty() {
        page.stage_panel();
    }
    if let Some(search) = args.search.as_deref() {
        page.stage_search(search);
    }
    if let Some(sort) = args.sort {
        page.stage_sort(sort);
    }
    page.reload().await;
    for _ in 1..args.pages {
        if page.load_more().await.is_none() {
            break;
        }
    }

    show(page);
    match page.error() {
        Some(error) => bail!(error),
        None => Ok(()),
    }
}

fn show<R>(page: &ListPage<R>)
where
    R: Resource,
    R::Item: Row,
{
    let items = page.items();
    let footer = table::footer(items.len(), page.is_loading(), page.has_more());
    cli::print_table(
        &items,
        page.sort(),
        footer,
        page.error().as_deref(),
        chrono::Local::now().date_naive(),
    );
}

async fn certificates(state: &AppState, action: CertAction) -> anyhow::Result<()> {
    require_route(state, routes::DEFAULT_AUTHENTICATED_PATH).await?;
    let mut page = state.certificates_page();

    let notice = match action {
        CertAction::List(args) => return list(&mut *page, args).await,
        CertAction::Create(fields) => {
            let draft = fields.into_new().map_err(fail)?;
            page.create(&draft).await
        }
        CertAction::Update { id, fields } => {
            let existing = state.certificate_service().get_by_id(id).await.map_err(fail)?;
            let mut patch = CertificateUpdate::from_certificate(&existing);
            fields.apply_to(&mut patch).map_err(fail)?;
            page.update(id, &patch).await
        }
        CertAction::Delete { id } => {
            let existing = state.certificate_service().get_by_id(id).await.map_err(fail)?;
            page.delete(&existing).await
        }
    };

    cli::print_notice(&notice);
    if !notice.is_success() {
        bail!("{}", notice.message);
    }
    Ok(())
}

async fn users(state: &AppState, action: UserAction, input: &mut Input) -> anyhow::Result<()> {
    require_route(state, routes::USERS_MANAGEMENT_PATH).await?;
    let mut page = state.users_page();

    let notice = match action {
        UserAction::List(args) => return list(&mut *page, args).await,
        UserAction::Create(fields) => {
            let draft = fields.into_new().map_err(fail)?;
            page.create(&draft).await
        }
        UserAction::Update { id, fields } => {
            let existing = state.user_service().get_by_id(id).await.map_err(fail)?;
            let mut patch = UserUpdate::from_user(&existing);
            fields.apply_to(&mut patch).map_err(fail)?;
            page.update(id, &patch).await
        }
        UserAction::Delete { id, yes } => {
            let existing = state.user_service().get_by_id(id).await.map_err(fail)?;
            let Some(pending) = page.request_delete(&existing) else {
                bail!("User {} is already deleted", existing.username);
            };
            if !yes {
                let expected = pending.id_number.clone();
                let label = format!("Type the id number of {} to confirm: ", existing.username);
                if prompt(input, &label).await? != expected {
                    page.cancel_delete();
                    bail!("Confirmation did not match, nothing was deleted");
                }
            }
            match page.confirm_delete().await {
                Some(notice) => notice,
                None => bail!("Nothing to delete"),
            }
        }
        UserAction::Revoke { id } => {
            let existing = state.user_service().get_by_id(id).await.map_err(fail)?;
            page.revoke_tokens(&existing).await
        }
    };

    cli::print_notice(&notice);
    if !notice.is_success() {
        bail!("{}", notice.message);
    }
    Ok(())
}

/// Interactive list: keystroke-like commands from stdin, with the search
/// and filter edits fired once they have been quiet long enough.
async fn browse<R>(page: &mut ListPage<R>, input: &mut Input) -> anyhow::Result<()>
where
    R: Resource,
    R::Item: Row,
{
    page.open().await;
    show(page);
    println!("{}", cli::BROWSE_HELP.dimmed());

    loop {
        let deadline = page.next_deadline();
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "q" || line == "quit" {
                    break;
                }
                if let Err(e) = handle(page, line).await {
                    eprintln!("{} {}", "✗".red().bold(), e.user_message());
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if page.poll_timers(Instant::now()).await.is_some() {
                    show(page);
                }
            }
        }
    }

    page.close();
    Ok(())
}

async fn handle<R>(page: &mut ListPage<R>, line: &str) -> certconsole::Result<()>
where
    R: Resource,
    R::Item: Row,
{
    let now = Instant::now();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    if let Some(text) = line.strip_prefix('/') {
        page.search_input(text, now);
        return Ok(());
    }

    let fetched = match command {
        "" => false,
        "!" => {
            page.submit_search().await;
            true
        }
        "f" | "filter" => {
            let (field, value) = rest.split_once('=').unwrap_or((rest, ""));
            page.edit_filter(field.trim(), value.trim(), now)?;
            false
        }
        "apply" => {
            page.apply_panel().await;
            true
        }
        "sort" => {
            let sort = match rest.split_whitespace().collect::<Vec<_>>()[..] {
                [field] => page.sort_by(field).await,
                [field, order] => page.set_sort(format!("{},{}", field, order).parse()?).await,
                _ => return Err(AppError::invalid("sort", "Usage: sort field [asc|desc]")),
            };
            sort.is_some()
        }
        "more" => {
            if page.load_more().await.is_none() {
                println!("{}", "Nothing more to load.".dimmed());
            }
            true
        }
        "reset" => {
            page.reset_filters().await;
            true
        }
        "help" | "?" => {
            println!("{}", cli::BROWSE_HELP.dimmed());
            false
        }
        other => return Err(AppError::invalid("command", format!("Unknown command '{}'", other))),
    };

    if fetched {
        show(page);
    }
    Ok(())
}
